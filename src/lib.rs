//! This crate provides a client for a personal to-do list service, where tasks are organized by date.
//!
//! It provides an authenticated HTTP client in the [`client`] module, that can be used as a stand-alone module.
//!
//! On top of it, a [`Session`](session::Session) manages the login/logout lifecycle of a bearer credential, that
//! is persisted in a [`TokenStore`](token_store::TokenStore) so that it survives restarts. \
//! A [`Provider`](provider::Provider) exposes the operations on the tasks of the selected date (create, update, delete, export),
//! and keeps a local [`cache`] consistent with what the server has acknowledged.

pub mod traits;
pub mod config;
pub mod error;

pub mod storage;
pub mod token_store;
pub mod resource;
pub mod transport;
pub mod client;

pub mod task;
pub use task::{NewTask, Priority, Task, TaskId, TaskPatch};
pub mod user;
pub use user::User;

pub mod session;
pub use session::Session;
pub mod cache;
pub mod provider;
pub use provider::Provider;
pub mod guard;
pub mod export;

#[cfg(any(test, feature = "mock_backend"))]
pub mod mock_behaviour;
#[cfg(any(test, feature = "mock_backend"))]
pub mod mock_server;
