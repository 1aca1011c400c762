//! This module owns the lifetime of a session
//!
//! A session goes `Anonymous` -> `Resolving` -> `Authenticated`, and back to `Anonymous` on logout.
//! Identity resolution is decoupled from login, so that a credential persisted by a previous run is
//! re-validated at startup without going through the identity provider again. Whatever the reason a
//! credential becomes invalid, it ends up in the same forced logout.

use std::sync::{Arc, Mutex};

use crate::client::Client;
use crate::error::SessionError;
use crate::guard::Access;
use crate::token_store::Credential;
use crate::traits::Transport;
use crate::user::User;

pub mod events;
use events::{EventSender, LogoutReason, SessionEvent};

/// The states of a [`Session`]
#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    /// No credential
    Anonymous,
    /// A credential is present, but has not been confirmed by the backend yet
    Resolving,
    /// A credential is present, and the backend told who it belongs to
    Authenticated(User),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        match self {
            SessionState::Authenticated(_) => true,
            _ => false,
        }
    }

    fn to_event(&self) -> SessionEvent {
        match self {
            SessionState::Anonymous => SessionEvent::Anonymous,
            SessionState::Resolving => SessionEvent::Resolving,
            SessionState::Authenticated(user) => SessionEvent::Authenticated{ username: user.username().to_string() },
        }
    }
}

/// The session manager.
///
/// This is the only component that writes into the [`TokenStore`](crate::token_store::TokenStore).
pub struct Session<T: Transport> {
    client: Arc<Client<T>>,
    state: Mutex<SessionState>,
    events: Option<EventSender>,
}

impl<T: Transport> Session<T> {
    /// Create a session. Call [`Self::restore`] to pick up a credential from a previous run
    pub fn new(client: Arc<Client<T>>) -> Self {
        Self { client, state: Mutex::new(SessionState::Anonymous), events: None }
    }

    /// Create a session that reports its state changes to `sender` (see [`events::event_channel`])
    pub fn new_with_event_channel(client: Arc<Client<T>>, sender: EventSender) -> Self {
        Self { client, state: Mutex::new(SessionState::Anonymous), events: Some(sender) }
    }

    pub fn client(&self) -> &Arc<Client<T>> {
        &self.client
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().unwrap().clone()
    }

    /// The current user, if the credential has been confirmed
    pub fn user(&self) -> Option<User> {
        match &*self.state.lock().unwrap() {
            SessionState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.client.credential().is_some()
    }

    /// Whether `destination` can be accessed right now, see [`guard::check_access`](crate::guard::check_access)
    pub fn check_access(&self, destination: &str) -> Access {
        crate::guard::check_access(self.has_credential(), destination)
    }

    /// Pick up the credential persisted by a previous run (if any), and check it against the backend
    pub async fn restore(&self) -> SessionState {
        if self.has_credential() {
            log::debug!("Found a persisted credential");
            if let Err(err) = self.resolve_identity().await {
                log::info!("Unable to restore the previous session: {}", err);
            }
        } else {
            self.set_state(SessionState::Anonymous);
        }
        self.state()
    }

    /// Exchange an assertion from an identity provider (e.g. `google`) for a credential, then resolve who we are
    pub async fn login(&self, provider: &str, assertion: &str) -> Result<User, SessionError> {
        let credential = match self.client.login(provider, assertion).await {
            Ok(c) => c,
            Err(err) => {
                log::warn!("Login with {} failed: {}", provider, err);
                return Err(SessionError::Login(err));
            }
        };

        self.client.token_store().lock().unwrap().set(credential);
        self.resolve_identity().await
    }

    /// Ask the backend who the current credential belongs to.
    ///
    /// Any failure is treated as a rejection of the credential, and ends the session.
    pub async fn resolve_identity(&self) -> Result<User, SessionError> {
        let credential = match self.client.credential() {
            None => {
                self.set_state(SessionState::Anonymous);
                return Err(SessionError::NoCredential);
            },
            Some(c) => c,
        };
        self.set_state(SessionState::Resolving);

        let result = self.client.current_user().await;

        if self.client.credential().as_ref() != Some(&credential) {
            log::debug!("The credential has changed while resolving the identity, ignoring the answer");
            return Err(SessionError::Superseded);
        }

        match result {
            Ok(user) => {
                log::info!("Logged in as {}", user.username());
                self.set_state(SessionState::Authenticated(user.clone()));
                Ok(user)
            },
            Err(err) => {
                log::warn!("The credential has been rejected ({}). Logging out", err);
                self.end(LogoutReason::CredentialRejected);
                Err(SessionError::Rejected(err))
            }
        }
    }

    /// Forget the credential and the user. Listeners are told to navigate back to the login entry point
    pub fn logout(&self) {
        log::info!("Logging out");
        self.end(LogoutReason::Requested);
    }

    /// A request made with `rejected` has been answered with an authentication failure.
    ///
    /// This ends the session, unless the credential has changed since that request was sent
    /// (e.g. the user has logged in again in the meantime).
    pub fn reject_credential(&self, rejected: Option<&Credential>) {
        let current = self.client.credential();
        if current.is_none() && self.state() == SessionState::Anonymous {
            log::debug!("Already logged out");
            return;
        }
        if current.as_ref() != rejected {
            log::debug!("Ignoring an authentication failure for an older credential");
            return;
        }
        log::warn!("The backend rejected the credential. Logging out");
        self.end(LogoutReason::CredentialRejected);
    }

    fn end(&self, reason: LogoutReason) {
        self.client.token_store().lock().unwrap().clear();
        *self.state.lock().unwrap() = SessionState::Anonymous;
        self.feedback(SessionEvent::LoggedOut{ reason });
    }

    fn set_state(&self, new_state: SessionState) {
        let event = new_state.to_event();
        *self.state.lock().unwrap() = new_state;
        self.feedback(event);
    }

    /// Send an event to the listener (if any).
    fn feedback(&self, event: SessionEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::mock_behaviour::{MockBehaviour, MockFailure, MockRoute};
    use crate::mock_server::MockServer;
    use crate::storage::MemoryStorage;
    use crate::token_store::TokenStore;

    fn new_session(server: &Arc<MockServer>, storage: MemoryStorage) -> (Session<Arc<MockServer>>, events::EventReceiver) {
        let client = Arc::new(Client::new(Arc::clone(server), TokenStore::new(storage)));
        let (sender, receiver) = events::event_channel();
        (Session::new_with_event_channel(client, sender), receiver)
    }

    #[tokio::test]
    async fn login_then_logout() {
        let _ = env_logger::builder().is_test(true).try_init();
        let server = Arc::new(MockServer::new());
        server.register_identity("assertion", "alice");
        let (session, receiver) = new_session(&server, MemoryStorage::new());

        assert_eq!(session.restore().await, SessionState::Anonymous);

        let user = session.login("google", "assertion").await.unwrap();
        assert_eq!(user.username(), "alice");
        assert!(session.state().is_authenticated());
        assert!(session.has_credential());
        assert_eq!(*receiver.borrow(), SessionEvent::Authenticated{ username: "alice".to_string() });

        session.logout();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(session.user(), None);
        assert!(session.has_credential() == false);
        assert!(receiver.borrow().requires_login());
    }

    #[tokio::test]
    async fn failed_login_stays_anonymous() {
        let server = Arc::new(MockServer::new());
        let (session, _receiver) = new_session(&server, MemoryStorage::new());

        let err = session.login("google", "unknown assertion").await.unwrap_err();
        assert!(matches!(err, SessionError::Login(_)));
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(session.has_credential() == false);
        // Identity resolution has not been attempted
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn persisted_credential_is_revalidated() {
        let server = Arc::new(MockServer::new());
        let token = server.issue_token("bob");
        let mut storage = MemoryStorage::new();
        crate::traits::LocalStorage::set_item(&mut storage, crate::config::TOKEN_STORAGE_KEY, token.as_str());

        let (session, _receiver) = new_session(&server, storage.clone());
        let state = session.restore().await;
        assert_eq!(state.is_authenticated(), true);
        assert_eq!(session.user().unwrap().username(), "bob");

        // Same persisted token, but it has expired meanwhile
        server.revoke_tokens();
        let (session, receiver) = new_session(&server, storage);
        assert_eq!(session.restore().await, SessionState::Anonymous);
        assert!(session.has_credential() == false);
        assert_eq!(*receiver.borrow(), SessionEvent::LoggedOut{ reason: LogoutReason::CredentialRejected });
    }

    #[tokio::test]
    async fn any_resolution_failure_logs_out() {
        let server = Arc::new(MockServer::new());
        server.register_identity("assertion", "alice");
        server.set_behaviour(MockBehaviour::fail_route(MockRoute::CurrentUser, 1, MockFailure::Network));
        let (session, _receiver) = new_session(&server, MemoryStorage::new());

        let err = session.login("google", "assertion").await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(_)));
        assert!(session.has_credential() == false);
        assert_eq!(session.user(), None);
    }

    #[tokio::test]
    async fn logout_during_resolution_wins() {
        let server = Arc::new(MockServer::new());
        let token = server.issue_token("alice");
        let mut storage = MemoryStorage::new();
        crate::traits::LocalStorage::set_item(&mut storage, crate::config::TOKEN_STORAGE_KEY, token.as_str());
        server.push_latency(MockRoute::CurrentUser, Duration::from_millis(50));
        let (session, _receiver) = new_session(&server, storage);

        let (restored, _) = tokio::join!(
            session.restore(),
            async { session.logout() },
        );
        assert_eq!(restored, SessionState::Anonymous);
        assert_eq!(session.user(), None);
    }

    /// A backend that only sends the bare minimum in its replies
    struct TerseBackend;

    #[async_trait::async_trait]
    impl Transport for TerseBackend {
        async fn send(&self, request: crate::transport::HttpRequest) -> Result<crate::transport::HttpResponse, crate::error::RequestError> {
            let segments: Vec<&str> = request.path.segments().iter().map(|s| s.as_str()).collect();
            let body = match segments.as_slice() {
                ["auth", "google", "login"] => serde_json::json!({ "access_token": "tok" }),
                ["users", "me"] => serde_json::json!({ "username": "alice" }),
                _ => return Ok(crate::transport::HttpResponse::empty(404)),
            };
            Ok(crate::transport::HttpResponse::json(200, &body))
        }
    }

    #[tokio::test]
    async fn username_is_enough_to_authenticate() {
        let client = Arc::new(Client::new(TerseBackend, TokenStore::new(MemoryStorage::new())));
        let session = Session::new(client);

        let user = session.login("google", "assertion").await.unwrap();
        assert_eq!(user.username(), "alice");
        assert_eq!(user.id(), None);
        assert_eq!(user.email(), None);
        assert!(matches!(session.state(), SessionState::Authenticated(ref u) if u.username() == "alice"));
        assert!(session.has_credential());
        assert_eq!(session.client().credential().unwrap().as_str(), "tok");
    }

    #[tokio::test]
    async fn stale_rejections_are_ignored() {
        let server = Arc::new(MockServer::new());
        server.register_identity("assertion", "alice");
        let (session, _receiver) = new_session(&server, MemoryStorage::new());
        session.login("google", "assertion").await.unwrap();

        session.reject_credential(Some(&Credential::new("an older token")));
        assert!(session.state().is_authenticated());

        let current = session.client().credential();
        session.reject_credential(current.as_ref());
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(session.has_credential() == false);
    }
}
