//! To-do tasks, and their representation on the wire

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::RequestError;

/// The identifier of a task. It is assigned by the backend
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How important a task is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// High
    A,
    /// Medium
    B,
    /// Low
    C,
}

impl Priority {
    pub fn description(&self) -> &'static str {
        match self {
            Priority::A => "high",
            Priority::B => "medium",
            Priority::C => "low",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::A => write!(f, "A"),
            Priority::B => write!(f, "B"),
            Priority::C => write!(f, "C"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Priority::A),
            "B" | "b" => Ok(Priority::B),
            "C" | "c" => Ok(Priority::C),
            other => Err(format!("Invalid priority {:?} (expected A, B or C)", other)),
        }
    }
}

/// A to-do task, as acknowledged by the backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    title: String,
    priority: Priority,
    scheduled_time: Option<NaiveTime>,
    done: bool,
}

impl Task {
    pub fn new(id: TaskId, title: String, priority: Priority, scheduled_time: Option<NaiveTime>, done: bool) -> Self {
        Self { id, title, priority, scheduled_time, done }
    }

    pub fn id(&self) -> &TaskId                      { &self.id }
    pub fn title(&self) -> &str                      { &self.title }
    pub fn priority(&self) -> Priority               { self.priority }
    pub fn scheduled_time(&self) -> Option<NaiveTime> { self.scheduled_time }
    pub fn done(&self) -> bool                       { self.done }

    /// Apply the fields that are set in `patch`
    pub(crate) fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(done) = patch.done {
            self.done = done;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(time) = patch.scheduled_time {
            self.scheduled_time = Some(time);
        }
    }

    /// Decode a list of tasks (`GET /logs/{date}`), keeping the server order
    pub fn decode_list(body: &[u8]) -> Result<Vec<Task>, RequestError> {
        let records: Vec<TaskRecord> = serde_json::from_slice(body)?;
        records.into_iter().map(Task::try_from).collect()
    }
}

/// The JSON shape of a task.
///
/// Every field is optional here, so that a missing field can be reported with a meaningful message
/// when converting into a [`Task`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Option<String>,
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub scheduled_time: Option<String>,
    pub done: Option<bool>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = RequestError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let id = match record.id {
            Some(id) if id.is_empty() == false => TaskId(id),
            _ => return Err(RequestError::Validation("task has no id".to_string())),
        };
        let title = match record.title {
            Some(title) if title.trim().is_empty() == false => title,
            _ => return Err(RequestError::Validation(format!("task {} has no title", id))),
        };
        let priority = record.priority
            .ok_or_else(|| RequestError::Validation(format!("task {} has no priority", id)))?;
        let done = record.done
            .ok_or_else(|| RequestError::Validation(format!("task {} has no completion status", id)))?;
        let scheduled_time = match record.scheduled_time.as_deref() {
            None | Some("") => None,
            Some(text) => Some(parse_time(text)
                .map_err(|err| RequestError::Validation(format!("task {}: {}", id, err)))?),
        };

        Ok(Task { id, title, priority, scheduled_time, done })
    }
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: Some(task.id.to_string()),
            title: Some(task.title.clone()),
            priority: Some(task.priority),
            scheduled_time: task.scheduled_time.map(format_time),
            done: Some(task.done),
        }
    }
}

/// Parse a time of day, either `HH:MM` or `HH:MM:SS`
pub fn parse_time(text: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(text, crate::config::TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .map_err(|_| format!("invalid time of day {:?}", text))
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(crate::config::TIME_FORMAT).to_string()
}

/// The payload of `POST /logs/{date}/tasks`
#[derive(Clone, Debug, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub priority: Priority,
    pub scheduled_time: Option<NaiveTime>,
}

impl NewTask {
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "title": self.title,
            "priority": self.priority,
        });
        if let (Some(time), Some(map)) = (self.scheduled_time, body.as_object_mut()) {
            map.insert("scheduled_time".to_string(), Value::String(format_time(time)));
        }
        body
    }
}

/// The payload of `PUT /logs/{date}/tasks/{id}`. Only the fields that are set are sent
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub done: Option<bool>,
    pub priority: Option<Priority>,
    pub scheduled_time: Option<NaiveTime>,
}

impl TaskPatch {
    /// A patch that only changes the completion status
    pub fn done(done: bool) -> Self {
        Self { done: Some(done), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.done.is_none() && self.priority.is_none() && self.scheduled_time.is_none()
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(title) = &self.title {
            map.insert("title".to_string(), Value::String(title.clone()));
        }
        if let Some(done) = self.done {
            map.insert("done".to_string(), Value::Bool(done));
        }
        if let Some(priority) = self.priority {
            map.insert("priority".to_string(), Value::String(priority.to_string()));
        }
        if let Some(time) = self.scheduled_time {
            map.insert("scheduled_time".to_string(), Value::String(format_time(time)));
        }
        Value::Object(map)
    }

    /// Parse a patch from its JSON payload. Unknown fields are ignored
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let title = value.get("title").and_then(Value::as_str).map(String::from);
        let done = value.get("done").and_then(Value::as_bool);
        let priority = match value.get("priority").and_then(Value::as_str) {
            None => None,
            Some(p) => Some(p.parse()?),
        };
        let scheduled_time = match value.get("scheduled_time").and_then(Value::as_str) {
            None => None,
            Some(t) => Some(parse_time(t)?),
        };
        Ok(Self { title, done, priority, scheduled_time })
    }
}
