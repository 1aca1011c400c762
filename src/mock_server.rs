//! An in-memory backend, that can stand in for the real server in tests
//!
//! This is only available with the `mock_backend` feature (which `integration_tests` enables).
//!
//! It honours the same REST routes as the real backend, keeps one task list per user and per date,
//! and can be told to fail (see [`MockBehaviour`]) or to answer late (see [`MockServer::push_latency`]).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::RequestError;
use crate::mock_behaviour::{MockBehaviour, MockFailure, MockRoute};
use crate::task::{parse_time, Priority, Task, TaskId, TaskPatch, TaskRecord};
use crate::token_store::Credential;
use crate::traits::Transport;
use crate::transport::{HttpRequest, HttpResponse};

#[derive(Default)]
struct MockState {
    /// identity provider assertion -> username
    identities: HashMap<String, String>,
    /// access token -> username
    tokens: HashMap<String, String>,
    /// (username, YYYY-MM-DD) -> ordered tasks
    logs: HashMap<(String, String), Vec<Task>>,
    next_task_id: u64,
    network_down: bool,
    latencies: HashMap<MockRoute, VecDeque<Duration>>,
    reply_delays: HashMap<MockRoute, VecDeque<Duration>>,
    requests: Vec<HttpRequest>,
}

/// A mocked backend. Share it with an `Arc` to keep tweaking it once a client uses it
#[derive(Default)]
pub struct MockServer {
    state: Mutex<MockState>,
    behaviour: Mutex<MockBehaviour>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `assertion` (as if it came from an identity provider) as a proof of being `username`
    pub fn register_identity(&self, assertion: &str, username: &str) {
        self.state.lock().unwrap().identities.insert(assertion.to_string(), username.to_string());
    }

    /// Issue a valid access token for `username`, without going through a login
    pub fn issue_token(&self, username: &str) -> Credential {
        self.state.lock().unwrap().issue_token(username)
    }

    /// Make every access token issued so far invalid (e.g. they have expired)
    pub fn revoke_tokens(&self) {
        self.state.lock().unwrap().tokens.clear();
    }

    /// Add a task to the list of `username` for `date`, as if it had been created by another client
    pub fn seed_task(&self, username: &str, date: NaiveDate, title: &str, priority: Priority, done: bool) -> Task {
        let mut state = self.state.lock().unwrap();
        let id = state.new_task_id();
        let task = Task::new(id, title.to_string(), priority, None, done);
        state.logs.entry((username.to_string(), crate::resource::format_date(date)))
            .or_default()
            .push(task.clone());
        task
    }

    /// The tasks the server currently knows for `username` and `date`
    pub fn tasks_of(&self, username: &str, date: NaiveDate) -> Vec<Task> {
        self.state.lock().unwrap().logs
            .get(&(username.to_string(), crate::resource::format_date(date)))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    /// When the network is down, every request fails without any response
    pub fn set_network_down(&self, down: bool) {
        self.state.lock().unwrap().network_down = down;
    }

    /// The next request to `route` will only be answered after `delay`.
    /// Delays are consumed in the order they have been pushed.
    pub fn push_latency(&self, route: MockRoute, delay: Duration) {
        self.state.lock().unwrap().latencies.entry(route).or_default().push_back(delay);
    }

    /// The next request to `route` will be handled right away, but its response will only arrive after `delay`.
    /// Delays are consumed in the order they have been pushed.
    pub fn push_reply_delay(&self, route: MockRoute, delay: Duration) {
        self.state.lock().unwrap().reply_delays.entry(route).or_default().push_back(delay);
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    fn handle(&self, request: &HttpRequest, route: Option<MockRoute>) -> HttpResponse {
        let mut state = self.state.lock().unwrap();
        let segments: Vec<&str> = request.path.segments().iter().map(|s| s.as_str()).collect();

        let route = match route {
            None => return error_response(404, "Not Found"),
            Some(MockRoute::Login) => return state.login(request),
            Some(r) => r,
        };

        let username = match request.bearer.as_ref().and_then(|b| state.tokens.get(b.as_str())) {
            None => return error_response(401, "Could not validate credentials"),
            Some(name) => name.clone(),
        };

        if route == MockRoute::CurrentUser {
            return HttpResponse::json(200, &json!({
                "id": format!("user-{}", username),
                "username": username,
                "email": format!("{}@example.com", username),
            }));
        }

        // Every other route is under /logs/{date}
        let date = match segments.get(1).and_then(|d| NaiveDate::parse_from_str(d, crate::config::DATE_FORMAT).ok()) {
            None => return error_response(422, "Invalid date"),
            Some(d) => crate::resource::format_date(d),
        };
        let key = (username.clone(), date.clone());

        match route {
            MockRoute::GetTasks => {
                let records: Vec<TaskRecord> = state.logs.get(&key)
                    .map(|tasks| tasks.iter().map(TaskRecord::from).collect())
                    .unwrap_or_default();
                HttpResponse::json(200, &json!(records))
            },
            MockRoute::CreateTask => {
                let body = request.body.clone().unwrap_or(Value::Null);
                let title = match body.get("title").and_then(Value::as_str) {
                    Some(t) if t.trim().is_empty() == false => t.to_string(),
                    _ => return error_response(422, "A title is required"),
                };
                let priority = match body.get("priority").and_then(Value::as_str).map(|p| p.parse::<Priority>()) {
                    Some(Ok(p)) => p,
                    _ => return error_response(422, "A valid priority is required"),
                };
                let scheduled_time = match body.get("scheduled_time").and_then(Value::as_str) {
                    None => None,
                    Some(t) => match parse_time(t) {
                        Ok(time) => Some(time),
                        Err(err) => return error_response(422, &err),
                    },
                };
                let id = state.new_task_id();
                let task = Task::new(id, title, priority, scheduled_time, false);
                state.logs.entry(key).or_default().push(task.clone());
                HttpResponse::json(201, &json!(TaskRecord::from(&task)))
            },
            MockRoute::UpdateTask => {
                let patch = match TaskPatch::from_json(request.body.as_ref().unwrap_or(&Value::Null)) {
                    Ok(p) => p,
                    Err(err) => return error_response(422, &err),
                };
                let id = TaskId::from(segments.get(3).copied().unwrap_or_default());
                let task = state.logs.get_mut(&key)
                    .and_then(|tasks| tasks.iter_mut().find(|t| t.id() == &id));
                match task {
                    None => error_response(404, "Task not found or permission denied"),
                    Some(task) => {
                        task.apply(&patch);
                        HttpResponse::json(200, &json!(TaskRecord::from(&*task)))
                    }
                }
            },
            MockRoute::DeleteTask => {
                let id = TaskId::from(segments.get(3).copied().unwrap_or_default());
                let tasks = state.logs.entry(key).or_default();
                let n_before = tasks.len();
                tasks.retain(|t| t.id() != &id);
                if tasks.len() == n_before {
                    error_response(404, "Task not found or permission denied")
                } else {
                    HttpResponse::empty(204)
                }
            },
            MockRoute::Export => {
                let tasks = state.logs.get(&key).cloned().unwrap_or_default();
                if tasks.is_empty() {
                    return error_response(400, "No tasks to export for this date");
                }
                HttpResponse::new(200, Some("application/pdf"), render_document(&username, &date, &tasks))
            },
            MockRoute::Login | MockRoute::CurrentUser => error_response(404, "Not Found"),
        }
    }
}

impl MockState {
    fn issue_token(&mut self, username: &str) -> Credential {
        let token = format!("token-{}", Uuid::new_v4().to_hyphenated());
        self.tokens.insert(token.clone(), username.to_string());
        Credential::new(token)
    }

    fn new_task_id(&mut self) -> TaskId {
        self.next_task_id += 1;
        TaskId::from(format!("t{}", self.next_task_id))
    }

    fn login(&mut self, request: &HttpRequest) -> HttpResponse {
        let assertion = request.body.as_ref()
            .and_then(|body| body.get("token"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let username = match self.identities.get(assertion) {
            None => return error_response(400, "Invalid identity token"),
            Some(name) => name.clone(),
        };
        let credential = self.issue_token(&username);
        HttpResponse::json(200, &json!({ "access_token": credential.as_str(), "token_type": "bearer" }))
    }
}

impl MockRoute {
    /// Find which route a request is for
    pub fn of(method: &Method, segments: &[String]) -> Option<Self> {
        let segments: Vec<&str> = segments.iter().map(|s| s.as_str()).collect();
        match (method.as_str(), segments.as_slice()) {
            ("POST", ["auth", _, "login"]) => Some(MockRoute::Login),
            ("GET", ["users", "me"]) => Some(MockRoute::CurrentUser),
            ("GET", ["logs", _]) => Some(MockRoute::GetTasks),
            ("POST", ["logs", _, "tasks"]) => Some(MockRoute::CreateTask),
            ("PUT", ["logs", _, "tasks", _]) => Some(MockRoute::UpdateTask),
            ("DELETE", ["logs", _, "tasks", _]) => Some(MockRoute::DeleteTask),
            ("GET", ["logs", _, "export"]) => Some(MockRoute::Export),
            _ => None,
        }
    }
}

fn error_response(status: u16, detail: &str) -> HttpResponse {
    HttpResponse::json(status, &json!({ "detail": detail }))
}

/// A (very) minimal document listing the tasks of a day
fn render_document(username: &str, date: &str, tasks: &[Task]) -> Vec<u8> {
    let mut text = format!("%PDF-1.4\n% THE TO-DO LIST\n% DATE {}\n% USER: {}\n", date, username);
    for task in tasks {
        let time = task.scheduled_time().map(crate::task::format_time).unwrap_or_default();
        let done = if task.done() { "Yes" } else { "No" };
        text.push_str(&format!("% {} | {} | {} | {}\n", task.priority(), task.title(), time, done));
    }
    text.push_str("%%EOF\n");
    text.into_bytes()
}

#[async_trait]
impl Transport for MockServer {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        let route = MockRoute::of(&request.method, request.path.segments());

        let (network_down, delay) = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            let delay = route
                .and_then(|r| state.latencies.get_mut(&r))
                .and_then(|queue| queue.pop_front());
            (state.network_down, delay)
        };

        if network_down {
            return Err(RequestError::Network("mocked network is down".to_string()));
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(route) = route {
            let allowed = self.behaviour.lock().unwrap().can(route);
            match allowed {
                Ok(()) => (),
                Err(MockFailure::Network) => return Err(RequestError::Network(format!("mocked network failure for {:?}", route))),
                Err(MockFailure::Status(status)) => return Ok(error_response(status, "Mocked failure")),
            }
        }

        let response = self.handle(&request, route);
        let reply_delay = route.and_then(|r| {
            self.state.lock().unwrap().reply_delays.get_mut(&r).and_then(|queue| queue.pop_front())
        });
        if let Some(delay) = reply_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ApiPath;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn request(method: Method, path: ApiPath, body: Option<Value>, bearer: Option<Credential>) -> HttpRequest {
        HttpRequest { method, path, body, bearer }
    }

    #[tokio::test]
    async fn logs_are_scoped_per_user_and_date() {
        let server = MockServer::new();
        let alice = server.issue_token("alice");
        let bob = server.issue_token("bob");
        server.seed_task("alice", date(), "Buy milk", Priority::A, false);

        let response = server.send(request(Method::GET, ApiPath::log(date()), None, Some(alice))).await.unwrap();
        assert_eq!(Task::decode_list(&response.body).unwrap().len(), 1);

        let response = server.send(request(Method::GET, ApiPath::log(date()), None, Some(bob.clone()))).await.unwrap();
        assert!(Task::decode_list(&response.body).unwrap().is_empty());

        let other_day = date().succ_opt().unwrap();
        let response = server.send(request(Method::GET, ApiPath::log(other_day), None, Some(bob))).await.unwrap();
        assert!(Task::decode_list(&response.body).unwrap().is_empty());
    }

    #[tokio::test]
    async fn revoked_tokens_are_rejected() {
        let server = MockServer::new();
        let alice = server.issue_token("alice");
        server.revoke_tokens();

        let response = server.send(request(Method::GET, ApiPath::current_user(), None, Some(alice))).await.unwrap();
        assert_eq!(response.status, 401);
    }

    #[tokio::test]
    async fn empty_export_is_rejected() {
        let server = MockServer::new();
        let alice = server.issue_token("alice");

        let response = server.send(request(Method::GET, ApiPath::export(date()), None, Some(alice.clone()))).await.unwrap();
        assert_eq!(response.status, 400);

        server.seed_task("alice", date(), "Buy milk", Priority::A, false);
        let response = server.send(request(Method::GET, ApiPath::export(date()), None, Some(alice))).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type.as_deref(), Some("application/pdf"));
        assert!(response.body.starts_with(b"%PDF"));
    }

    #[test]
    fn routing() {
        let seg = |p: ApiPath| p.segments().to_vec();
        assert_eq!(MockRoute::of(&Method::GET, &seg(ApiPath::log(date()))), Some(MockRoute::GetTasks));
        assert_eq!(MockRoute::of(&Method::PUT, &seg(ApiPath::task(date(), &TaskId::from("t1")))), Some(MockRoute::UpdateTask));
        assert_eq!(MockRoute::of(&Method::GET, &seg(ApiPath::tasks(date()))), None);
    }
}
