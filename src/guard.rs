//! Gate the access to the task views

use crate::config::{HOME_ROUTE, LOGIN_ROUTE};

/// The outcome of [`check_access`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Allow,
    /// Go to the login entry point, then come back to `return_to` once logged in
    RedirectToLogin { return_to: String },
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        *self == Access::Allow
    }

    /// Where to navigate to right now
    pub fn route(&self) -> &str {
        match self {
            Access::Allow => HOME_ROUTE,
            Access::RedirectToLogin{ .. } => LOGIN_ROUTE,
        }
    }
}

/// Allow the access to `destination` if a credential is present, or redirect to login while remembering `destination`
pub fn check_access(has_credential: bool, destination: &str) -> Access {
    if has_credential {
        Access::Allow
    } else {
        Access::RedirectToLogin { return_to: destination.to_string() }
    }
}

/// Where to go after a successful login
pub fn destination_after_login(return_to: Option<&str>) -> &str {
    match return_to {
        // Never bounce back to the login page itself
        Some(dest) if dest.is_empty() == false && dest != LOGIN_ROUTE => dest,
        _ => HOME_ROUTE,
    }
}
