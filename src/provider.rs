//! This module exposes the operations on the tasks of the selected date
//!
//! Every operation is exactly one request to the backend. The local [`TaskCache`] is only changed
//! with what the server has acknowledged, so that it never knowingly diverges from the server.
//! Failures are turned into a [`TaskError`], and into a single user-facing message (see [`Provider::last_error`]),
//! except authentication failures, that end the session instead.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate, NaiveTime};

use crate::cache::{LoadTicket, TaskCache};
use crate::client::Client;
use crate::error::{Operation, RequestError, TaskError};
use crate::session::Session;
use crate::task::{NewTask, Priority, Task, TaskId, TaskPatch};
use crate::token_store::Credential;
use crate::traits::{FileSaver, Transport};

/// The task operations facade.
///
/// Methods take `&self`, so that several operations can be in flight at the same time.
/// Their responses may arrive in any order: every cache mutation is keyed on a task id, and responses
/// for a date that is not selected anymore are discarded.
pub struct Provider<T: Transport> {
    session: Arc<Session<T>>,
    cache: Mutex<TaskCache>,
    last_error: Mutex<Option<String>>,
    saver: Box<dyn FileSaver>,
}

impl<T: Transport> Provider<T> {
    /// Create a provider, with today selected. Exported documents will be handed to `saver`.
    ///
    /// Nothing is fetched until [`Self::refresh`] or [`Self::select_date`] is called.
    pub fn new<S: FileSaver + 'static>(session: Arc<Session<T>>, saver: S) -> Self {
        Self::with_date(session, saver, Local::now().date_naive())
    }

    /// Create a provider, with `date` selected
    pub fn with_date<S: FileSaver + 'static>(session: Arc<Session<T>>, saver: S, date: NaiveDate) -> Self {
        Self {
            session,
            cache: Mutex::new(TaskCache::new(date)),
            last_error: Mutex::new(None),
            saver: Box::new(saver),
        }
    }

    pub fn session(&self) -> &Arc<Session<T>> {
        &self.session
    }

    fn client(&self) -> &Client<T> {
        self.session.client()
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.cache.lock().unwrap().selected_date()
    }

    /// The tasks of the selected date, in the server order
    pub fn tasks(&self) -> Vec<Task> {
        self.cache.lock().unwrap().tasks().to_vec()
    }

    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.cache.lock().unwrap().get(id).cloned()
    }

    /// Whether the list of the selected date has been received
    pub fn is_loaded(&self) -> bool {
        self.cache.lock().unwrap().is_loaded()
    }

    /// The message describing the last failure, if the last operation failed
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    pub fn clear_error(&self) {
        *self.last_error.lock().unwrap() = None;
    }

    /// Select a date, and fetch its tasks.
    ///
    /// The previous list is discarded right away. In case another date is selected before this fetch
    /// completes, its response is ignored.
    pub async fn select_date(&self, date: NaiveDate) -> Result<(), TaskError> {
        let ticket = self.cache.lock().unwrap().select(date);
        self.load(ticket).await
    }

    /// Fetch the tasks of the selected date again
    pub async fn refresh(&self) -> Result<(), TaskError> {
        let ticket = self.cache.lock().unwrap().reload();
        self.load(ticket).await
    }

    async fn load(&self, ticket: LoadTicket) -> Result<(), TaskError> {
        let credential = self.client().credential();
        let result = self.client().get_tasks(ticket.date()).await;

        match result {
            Ok(tasks) => {
                log::debug!("Received {} tasks for {}", tasks.len(), ticket.date());
                if self.cache.lock().unwrap().load_for(ticket, tasks) {
                    self.clear_error();
                }
                Ok(())
            },
            Err(err) => {
                let still_wanted = {
                    let mut cache = self.cache.lock().unwrap();
                    cache.abandon(&ticket);
                    cache.is_current(&ticket)
                };
                Err(self.fail(Operation::Load, credential.as_ref(), err, still_wanted))
            }
        }
    }

    /// Create a task for the selected date.
    ///
    /// The task only shows up in the list once the server has acknowledged it (and assigned its id).
    pub async fn create(&self, title: &str, priority: Priority, scheduled_time: Option<NaiveTime>) -> Result<Task, TaskError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::Validation("A task needs a title".to_string()));
        }
        let date = self.selected_date();
        let new_task = NewTask { title: title.to_string(), priority, scheduled_time };

        let credential = self.client().credential();
        match self.client().create_task(date, &new_task).await {
            Ok(task) => {
                log::info!("Created task {} ({}) for {}", task.id(), task.title(), date);
                self.cache.lock().unwrap().apply_create(date, task.clone());
                self.clear_error();
                Ok(task)
            },
            Err(err) => Err(self.fail(Operation::Create, credential.as_ref(), err, true)),
        }
    }

    /// Mark a task as done if it is not, or as not done otherwise.
    ///
    /// The cached task is replaced by what the server returns, not merely flipped locally.
    pub async fn toggle_done(&self, task: &Task) -> Result<Task, TaskError> {
        let date = self.selected_date();
        self.send_update(date, task.id(), &TaskPatch::done(task.done() == false)).await
    }

    /// Change some fields of a task
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        if patch.is_empty() {
            return Err(TaskError::Validation("Nothing to update".to_string()));
        }
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(TaskError::Validation("A task needs a title".to_string()));
            }
        }
        let date = self.selected_date();
        self.send_update(date, id, &patch).await
    }

    async fn send_update(&self, date: NaiveDate, id: &TaskId, patch: &TaskPatch) -> Result<Task, TaskError> {
        let credential = self.client().credential();
        match self.client().update_task(date, id, patch).await {
            Ok(task) => {
                log::debug!("Updated task {}", task.id());
                self.cache.lock().unwrap().apply_update(date, task.clone());
                self.clear_error();
                Ok(task)
            },
            Err(err) => Err(self.fail(Operation::Update, credential.as_ref(), err, true)),
        }
    }

    /// Delete a task of the selected date
    pub async fn remove(&self, id: &TaskId) -> Result<(), TaskError> {
        let date = self.selected_date();

        let credential = self.client().credential();
        match self.client().delete_task(date, id).await {
            Ok(()) => {
                log::info!("Deleted task {}", id);
                self.cache.lock().unwrap().apply_remove(date, id);
                self.clear_error();
                Ok(())
            },
            Err(err) => Err(self.fail(Operation::Delete, credential.as_ref(), err, true)),
        }
    }

    /// Download the document listing the tasks of `date`, and save it as `tasks-<date>.<ext>`.
    ///
    /// The backend may refuse to export a day without tasks. The cache is never changed.
    pub async fn export(&self, date: NaiveDate) -> Result<PathBuf, TaskError> {
        let credential = self.client().credential();
        let document = match self.client().export(date).await {
            Ok(d) => d,
            Err(err) => return Err(self.fail(Operation::Export, credential.as_ref(), err, true)),
        };

        let file_name = crate::export::file_name_for(date, document.content_type.as_deref());
        match self.saver.save(&file_name, &document.content) {
            Ok(path) => {
                self.clear_error();
                Ok(path)
            },
            Err(err) => {
                log::warn!("Unable to save {}: {}", file_name, err);
                self.report(Operation::Export);
                Err(TaskError::Save(err))
            }
        }
    }

    fn report(&self, operation: Operation) {
        *self.last_error.lock().unwrap() = Some(operation.user_message().to_string());
    }

    /// Turn a failed request into a `TaskError`.
    ///
    /// Authentication failures end the session (and drop the cached list, but not the selected date) instead of being displayed.
    /// Other failures become the current user-facing message, unless they are not relevant anymore.
    fn fail(&self, operation: Operation, credential: Option<&Credential>, err: RequestError, relevant: bool) -> TaskError {
        if err.is_auth_failure() {
            self.session.reject_credential(credential);
            if self.session.has_credential() == false {
                self.cache.lock().unwrap().clear();
            }
            return TaskError::Unauthenticated;
        }

        log::warn!("Unable to {} ({})", operation, err);
        if relevant {
            self.report(operation);
        }
        TaskError::Failed { operation, source: err }
    }
}
