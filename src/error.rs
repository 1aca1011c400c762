//! Errors that can happen when talking to the backend, and how they are reported to users

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// A coarse classification of every failure this crate can report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport-level failure, no response was received
    NetworkFailure,
    /// The server responded with a non-2xx status (other than 401)
    HttpFailure { status: u16 },
    /// A local precondition failed, or a response did not have the expected shape
    ValidationFailure,
    /// The server rejected the credential (HTTP 401). This always ends the session.
    AuthFailure,
    /// Data could not be written locally (e.g. an exported document)
    StorageFailure,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NetworkFailure => write!(f, "network failure"),
            ErrorKind::HttpFailure{ status } => write!(f, "HTTP failure ({})", status),
            ErrorKind::ValidationFailure => write!(f, "validation failure"),
            ErrorKind::AuthFailure => write!(f, "authentication failure"),
            ErrorKind::StorageFailure => write!(f, "storage failure"),
        }
    }
}

/// An error returned by the [`Client`](crate::client::Client)
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("unexpected HTTP status code {status}")]
    Http { status: u16 },
    #[error("invalid response: {0}")]
    Validation(String),
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::Network(_) => ErrorKind::NetworkFailure,
            RequestError::Http{ status: 401 } => ErrorKind::AuthFailure,
            RequestError::Http{ status } => ErrorKind::HttpFailure{ status: *status },
            RequestError::Validation(_) => ErrorKind::ValidationFailure,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.kind() == ErrorKind::AuthFailure
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RequestError::Http{ status: status.as_u16() },
            None => RequestError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        RequestError::Validation(err.to_string())
    }
}

/// An error returned by the [`Session`](crate::session::Session)
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("login was rejected: {0}")]
    Login(#[source] RequestError),
    #[error("the credential was rejected: {0}")]
    Rejected(#[source] RequestError),
    #[error("no credential is available")]
    NoCredential,
    #[error("the credential changed while this request was in flight")]
    Superseded,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Login(err) => err.kind(),
            SessionError::Rejected(_) => ErrorKind::AuthFailure,
            SessionError::NoCredential => ErrorKind::AuthFailure,
            SessionError::Superseded => ErrorKind::AuthFailure,
        }
    }
}

/// The logical operations of the [`Provider`](crate::provider::Provider)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Load,
    Create,
    Update,
    Delete,
    Export,
}

impl Operation {
    /// The message that is displayed to the user when this operation fails
    pub fn user_message(&self) -> &'static str {
        match self {
            Operation::Load => "Could not fetch tasks.",
            Operation::Create => "Add failed.",
            Operation::Update => "Update failed.",
            Operation::Delete => "Delete failed.",
            Operation::Export => "Export failed.",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Load => write!(f, "load"),
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Export => write!(f, "export"),
        }
    }
}

/// An error returned by the [`Provider`](crate::provider::Provider)
#[derive(Debug, Error)]
pub enum TaskError {
    /// The operation was refused locally and never sent
    #[error("{0}")]
    Validation(String),
    /// The credential has been rejected, and the session has been logged out
    #[error("the session has expired")]
    Unauthenticated,
    #[error("{operation} failed: {source}")]
    Failed {
        operation: Operation,
        #[source]
        source: RequestError,
    },
    #[error("unable to save the exported document: {0}")]
    Save(#[source] std::io::Error),
}

impl TaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::Validation(_) => ErrorKind::ValidationFailure,
            TaskError::Unauthenticated => ErrorKind::AuthFailure,
            TaskError::Failed{ source, .. } => source.kind(),
            TaskError::Save(_) => ErrorKind::StorageFailure,
        }
    }
}
