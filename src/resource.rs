use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use url::Url;

use crate::task::TaskId;

/// A route of the REST API, as a list of path segments (e.g. `["logs", "2024-05-01", "tasks"]`)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiPath {
    segments: Vec<String>,
}

impl ApiPath {
    pub fn new<S: ToString>(segments: &[S]) -> Self {
        Self { segments: segments.iter().map(|s| s.to_string()).collect() }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// `/auth/{provider}/login`
    pub fn login(provider: &str) -> Self {
        Self::new(&["auth", provider, "login"])
    }

    /// `/users/me`
    pub fn current_user() -> Self {
        Self::new(&["users", "me"])
    }

    /// `/logs/{date}`
    pub fn log(date: NaiveDate) -> Self {
        Self::new(&["logs".to_string(), format_date(date)])
    }

    /// `/logs/{date}/tasks`
    pub fn tasks(date: NaiveDate) -> Self {
        Self::new(&["logs".to_string(), format_date(date), "tasks".to_string()])
    }

    /// `/logs/{date}/tasks/{id}`
    pub fn task(date: NaiveDate, id: &TaskId) -> Self {
        Self::new(&["logs".to_string(), format_date(date), "tasks".to_string(), id.to_string()])
    }

    /// `/logs/{date}/export`
    pub fn export(date: NaiveDate) -> Self {
        Self::new(&["logs".to_string(), format_date(date), "export".to_string()])
    }
}

impl Display for ApiPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(crate::config::DATE_FORMAT).to_string()
}

/// Just a wrapper around the base URL of the API
#[derive(Clone, Debug)]
pub struct Resource {
    url: Url,
}

impl Resource {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url { &self.url }

    /// Build the full URL of a route, by appending its (percent-encoded) segments to the base URL path
    pub fn combine(&self, path: &ApiPath) -> Url {
        let mut built = self.url.clone();
        if let Ok(mut segments) = built.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(path.segments());
        }
        built
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(ApiPath::log(date).to_string(), "/logs/2024-05-01");
        assert_eq!(ApiPath::task(date, &TaskId::from("t1")).to_string(), "/logs/2024-05-01/tasks/t1");
        assert_eq!(ApiPath::login("google").to_string(), "/auth/google/login");
    }

    #[test]
    fn combine_keeps_base_path() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let with_slash = Resource::new("http://localhost/api/".parse().unwrap());
        assert_eq!(with_slash.combine(&ApiPath::tasks(date)).as_str(), "http://localhost/api/logs/2024-05-01/tasks");

        let without_slash = Resource::new("http://localhost/api".parse().unwrap());
        assert_eq!(without_slash.combine(&ApiPath::current_user()).as_str(), "http://localhost/api/users/me");

        let weird_id = TaskId::from("a/b");
        assert_eq!(without_slash.combine(&ApiPath::task(date, &weird_id)).as_str(), "http://localhost/api/logs/2024-05-01/tasks/a%2Fb");
    }
}
