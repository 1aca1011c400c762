//! Utilities to follow the state of a session

use std::fmt::{Display, Error, Formatter};

/// Why a session has ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked for it
    Requested,
    /// The backend rejected the credential
    CredentialRejected,
}

/// An event that happens during the lifetime of a session
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// No credential is known
    Anonymous,
    /// A credential is known, and is being checked against the backend
    Resolving,
    /// The credential is valid
    Authenticated{ username: String },
    /// The session has just ended. Listeners should navigate back to the login entry point
    LoggedOut{ reason: LogoutReason },
}

impl SessionEvent {
    /// Whether listeners should now show the login entry point
    pub fn requires_login(&self) -> bool {
        match self {
            SessionEvent::LoggedOut{ .. } => true,
            _ => false,
        }
    }
}

impl Display for SessionEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            SessionEvent::Anonymous => write!(f, "Not logged in"),
            SessionEvent::Resolving => write!(f, "Checking credentials..."),
            SessionEvent::Authenticated{username} => write!(f, "Logged in as {}", username),
            SessionEvent::LoggedOut{reason} => match reason {
                LogoutReason::Requested => write!(f, "Logged out"),
                LogoutReason::CredentialRejected => write!(f, "Session expired, please log in again"),
            }
        }
    }
}

impl Default for SessionEvent {
    fn default() -> Self {
        Self::Anonymous
    }
}



/// See [`event_channel`]
pub type EventSender = tokio::sync::watch::Sender<SessionEvent>;
/// See [`event_channel`]
pub type EventReceiver = tokio::sync::watch::Receiver<SessionEvent>;

/// Create an event channel, that can be used to follow the state of a session
pub fn event_channel() -> (EventSender, EventReceiver) {
    tokio::sync::watch::channel(SessionEvent::default())
}
