//! This module provides a client to the to-do list backend
//!
//! The [`Client`] is the single place every request goes through: it attaches the bearer credential (if any),
//! and turns non-2xx statuses into errors. It never retries, and it never changes the credential.

use std::convert::TryFrom;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::json;

use crate::error::RequestError;
use crate::resource::ApiPath;
use crate::task::{NewTask, Task, TaskId, TaskPatch, TaskRecord};
use crate::token_store::{Credential, TokenStore};
use crate::traits::Transport;
use crate::transport::{HttpRequest, HttpResponse};
use crate::user::{TokenRecord, User, UserRecord};

/// A binary document, as returned by `GET /logs/{date}/export`
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

/// The authenticated request gateway
pub struct Client<T: Transport> {
    transport: T,
    tokens: Arc<Mutex<TokenStore>>,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, tokens: TokenStore) -> Self {
        Self {
            transport,
            tokens: Arc::new(Mutex::new(tokens)),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The token store this client reads its credential from.
    /// Only the [`Session`](crate::session::Session) writes into it.
    pub(crate) fn token_store(&self) -> &Arc<Mutex<TokenStore>> {
        &self.tokens
    }

    pub fn credential(&self) -> Option<Credential> {
        self.tokens.lock().unwrap().get()
    }

    /// Send a request, with the current credential (if any) as a bearer token.
    ///
    /// Returns the response if its status is 2xx, an error otherwise.
    pub async fn request(&self, method: Method, path: ApiPath, body: Option<serde_json::Value>) -> Result<HttpResponse, RequestError> {
        let bearer = self.credential();
        log::debug!("{} {}{}", method, path, if bearer.is_some() { " (authenticated)" } else { "" });

        let request = HttpRequest { method: method.clone(), path: path.clone(), body, bearer };
        let response = match self.transport.send(request).await {
            Ok(r) => r,
            Err(err) => {
                log::warn!("{} {} failed: {}", method, path, err);
                return Err(err);
            }
        };

        if response.is_success() == false {
            log::debug!("{} {} returned HTTP {}", method, path, response.status);
            return Err(RequestError::Http{ status: response.status });
        }
        Ok(response)
    }

    /// `POST /auth/{provider}/login`: exchange an assertion from an identity provider for a credential
    pub async fn login(&self, provider: &str, assertion: &str) -> Result<Credential, RequestError> {
        let response = self.request(Method::POST, ApiPath::login(provider), Some(json!({ "token": assertion }))).await?;
        let record: TokenRecord = response.decode()?;
        if record.access_token.is_empty() {
            return Err(RequestError::Validation("empty access token".to_string()));
        }
        match record.token_type.as_deref() {
            None => (),
            Some(t) if t.eq_ignore_ascii_case("bearer") => (),
            Some(other) => log::warn!("Unexpected token type {:?}, using it as a bearer token anyway", other),
        }
        Ok(Credential::new(record.access_token))
    }

    /// `GET /users/me`
    pub async fn current_user(&self) -> Result<User, RequestError> {
        let response = self.request(Method::GET, ApiPath::current_user(), None).await?;
        let record: UserRecord = response.decode()?;
        User::try_from(record)
    }

    /// `GET /logs/{date}`
    pub async fn get_tasks(&self, date: NaiveDate) -> Result<Vec<Task>, RequestError> {
        let response = self.request(Method::GET, ApiPath::log(date), None).await?;
        Task::decode_list(&response.body)
    }

    /// `POST /logs/{date}/tasks`
    pub async fn create_task(&self, date: NaiveDate, new_task: &NewTask) -> Result<Task, RequestError> {
        let response = self.request(Method::POST, ApiPath::tasks(date), Some(new_task.to_json())).await?;
        let record: TaskRecord = response.decode()?;
        Task::try_from(record)
    }

    /// `PUT /logs/{date}/tasks/{id}`
    pub async fn update_task(&self, date: NaiveDate, id: &TaskId, patch: &TaskPatch) -> Result<Task, RequestError> {
        let response = self.request(Method::PUT, ApiPath::task(date, id), Some(patch.to_json())).await?;
        let record: TaskRecord = response.decode()?;
        let task = Task::try_from(record)?;
        if task.id() != id {
            return Err(RequestError::Validation(format!("asked to update {}, but the server returned {}", id, task.id())));
        }
        Ok(task)
    }

    /// `DELETE /logs/{date}/tasks/{id}`
    pub async fn delete_task(&self, date: NaiveDate, id: &TaskId) -> Result<(), RequestError> {
        self.request(Method::DELETE, ApiPath::task(date, id), None).await?;
        Ok(())
    }

    /// `GET /logs/{date}/export`
    pub async fn export(&self, date: NaiveDate) -> Result<Document, RequestError> {
        let response = self.request(Method::GET, ApiPath::export(date), None).await?;
        Ok(Document {
            content_type: response.content_type,
            content: response.body,
        })
    }
}
