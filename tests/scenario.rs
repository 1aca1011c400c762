//! A whole session, as a user would go through it

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use daybook::client::Client;
use daybook::error::ErrorKind;
use daybook::export::MemorySaver;
use daybook::mock_behaviour::MockRoute;
use daybook::mock_server::MockServer;
use daybook::session::events::{event_channel, LogoutReason, SessionEvent};
use daybook::session::SessionState;
use daybook::storage::MemoryStorage;
use daybook::token_store::TokenStore;
use daybook::{Priority, Provider, Session};

fn may_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

#[tokio::test]
async fn day_planning_walkthrough() {
    let _ = env_logger::builder().is_test(true).try_init();

    let server = Arc::new(MockServer::new());
    server.register_identity("valid-google-assertion", "alice");

    let client = Arc::new(Client::new(Arc::clone(&server), TokenStore::new(MemoryStorage::new())));
    let (sender, receiver) = event_channel();
    let session = Arc::new(Session::new_with_event_channel(client, sender));
    let provider = Provider::new(Arc::clone(&session), MemorySaver::new());

    // Login, then identity resolution
    let user = session.login("google", "valid-google-assertion").await.unwrap();
    assert_eq!(user.username(), "alice");
    assert!(matches!(session.state(), SessionState::Authenticated(ref u) if u.username() == "alice"));
    assert_eq!(*receiver.borrow(), SessionEvent::Authenticated{ username: "alice".to_string() });

    // An empty day
    provider.select_date(may_first()).await.unwrap();
    assert!(provider.is_loaded());
    assert!(provider.tasks().is_empty());

    // Add a task
    let task = provider.create("Buy milk", Priority::A, NaiveTime::from_hms_opt(9, 0, 0)).await.unwrap();
    let tasks = provider.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id(), task.id());
    assert_eq!(tasks[0].title(), "Buy milk");
    assert_eq!(tasks[0].priority(), Priority::A);
    assert_eq!(tasks[0].scheduled_time(), NaiveTime::from_hms_opt(9, 0, 0));
    assert!(tasks[0].done() == false);

    // Toggle it
    provider.toggle_done(&task).await.unwrap();
    assert!(provider.task(task.id()).unwrap().done());

    // Remove it
    provider.remove(task.id()).await.unwrap();
    assert!(provider.tasks().is_empty());
    assert!(server.tasks_of("alice", may_first()).is_empty());

    // The backend does not export empty days
    let err = provider.export(may_first()).await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::HttpFailure{ .. }));
    assert_eq!(provider.last_error().as_deref(), Some("Export failed."));
    assert!(provider.tasks().is_empty());
    assert_eq!(provider.selected_date(), may_first());
}

#[tokio::test]
async fn switching_days_quickly() {
    let _ = env_logger::builder().is_test(true).try_init();

    let server = Arc::new(MockServer::new());
    let token = server.issue_token("alice");
    let mut storage = MemoryStorage::new();
    daybook::traits::LocalStorage::set_item(&mut storage, daybook::config::TOKEN_STORAGE_KEY, token.as_str());

    let client = Arc::new(Client::new(Arc::clone(&server), TokenStore::new(storage)));
    let session = Arc::new(Session::new(client));
    assert!(session.restore().await.is_authenticated());
    let provider = Provider::new(Arc::clone(&session), MemorySaver::new());

    let day_1 = may_first();
    let day_2 = day_1.succ_opt().unwrap();
    let day_3 = day_2.succ_opt().unwrap();
    server.seed_task("alice", day_1, "Monday thing", Priority::A, false);
    server.seed_task("alice", day_2, "Tuesday thing", Priority::B, false);
    server.seed_task("alice", day_3, "Wednesday thing", Priority::C, true);

    server.push_latency(MockRoute::GetTasks, std::time::Duration::from_millis(80));
    server.push_latency(MockRoute::GetTasks, std::time::Duration::from_millis(40));
    let (r1, r2, r3) = tokio::join!(
        provider.select_date(day_1),
        provider.select_date(day_2),
        provider.select_date(day_3),
    );
    assert!(r1.is_ok() && r2.is_ok() && r3.is_ok());

    assert_eq!(provider.selected_date(), day_3);
    assert_eq!(provider.tasks(), server.tasks_of("alice", day_3));
}

#[tokio::test]
async fn expired_session_while_working() {
    let _ = env_logger::builder().is_test(true).try_init();

    let server = Arc::new(MockServer::new());
    server.register_identity("assertion", "alice");
    let client = Arc::new(Client::new(Arc::clone(&server), TokenStore::new(MemoryStorage::new())));
    let (sender, receiver) = event_channel();
    let session = Arc::new(Session::new_with_event_channel(client, sender));
    let provider = Provider::new(Arc::clone(&session), MemorySaver::new());

    session.login("google", "assertion").await.unwrap();
    provider.select_date(may_first()).await.unwrap();
    let task = provider.create("Buy milk", Priority::A, None).await.unwrap();

    server.revoke_tokens();
    let err = provider.toggle_done(&task).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthFailure);

    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(session.user(), None);
    assert!(session.has_credential() == false);
    assert_eq!(*receiver.borrow(), SessionEvent::LoggedOut{ reason: LogoutReason::CredentialRejected });
    assert!(receiver.borrow().requires_login());
    assert_eq!(provider.last_error(), None);

    // Logging in again brings the (server-side) list back
    session.login("google", "assertion").await.unwrap();
    provider.select_date(may_first()).await.unwrap();
    assert_eq!(provider.tasks().len(), 1);
}
