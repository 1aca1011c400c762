//! Support for library configuration options

use std::sync::{Arc, Mutex};
use once_cell::sync::Lazy;

/// The API URL that is used when neither `DAYBOOK_API_URL` nor [`set_api_url`] provide one
pub const DEFAULT_API_URL: &str = "http://localhost/api";

/// Environment variable that overrides [`DEFAULT_API_URL`]
pub const API_URL_ENV_VAR: &str = "DAYBOOK_API_URL";

/// Base URL of the backend (e.g. `https://my.server.com/api`). Every REST route is appended to it.
/// Feel free to override it when initing this library.
pub static API_URL: Lazy<Arc<Mutex<String>>> = Lazy::new(|| {
    let url = std::env::var(API_URL_ENV_VAR).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    Arc::new(Mutex::new(url))
});

/// The fixed key the bearer credential is stored under, in the durable local storage
pub const TOKEN_STORAGE_KEY: &str = "token";

/// The identity provider used by `POST /auth/{provider}/login` when none is specified
pub const DEFAULT_IDENTITY_PROVIDER: &str = "google";

/// Where unauthenticated accesses are redirected to
pub const LOGIN_ROUTE: &str = "/login";
/// Where a successful login lands when no destination has been remembered
pub const HOME_ROUTE: &str = "/";

/// Format of dates in routes (`/logs/2024-05-01`) and exported file names
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Format of the `scheduled_time` field
pub const TIME_FORMAT: &str = "%H:%M";

/// Exported documents are named `<prefix>-<date>.<extension>`
pub const EXPORT_FILE_PREFIX: &str = "tasks";

/// Returns the currently configured API URL
pub fn api_url() -> String {
    API_URL.lock().unwrap().clone()
}

/// Override the API URL for every transport created afterwards
pub fn set_api_url<S: ToString>(url: S) {
    *API_URL.lock().unwrap() = url.to_string();
}
