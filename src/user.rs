//! The identity behind a credential

use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// The user a credential belongs to. This is never persisted, and re-fetched every time the credential changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// Not every backend sends it. The username is what identifies a user
    id: Option<String>,
    username: String,
    email: Option<String>,
}

impl User {
    pub fn new<S: ToString>(username: S, id: Option<String>, email: Option<String>) -> Self {
        Self { id, username: username.to_string(), email }
    }

    pub fn id(&self) -> Option<&str>        { self.id.as_deref() }
    pub fn username(&self) -> &str          { &self.username }
    pub fn email(&self) -> Option<&str>     { self.email.as_deref() }
}

/// The JSON shape of `GET /users/me`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl TryFrom<UserRecord> for User {
    type Error = RequestError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let username = match record.username {
            Some(name) if name.is_empty() == false => name,
            _ => return Err(RequestError::Validation("user has no username".to_string())),
        };
        Ok(User { id: record.id, username, email: record.email })
    }
}

/// The JSON shape of a successful login (`POST /auth/{provider}/login`)
#[derive(Clone, Debug, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_user() {
        let record: UserRecord = serde_json::from_str(r#"{"id": "65f0", "username": "alice", "email": "alice@example.com"}"#).unwrap();
        let user = User::try_from(record).unwrap();
        assert_eq!(user.username(), "alice");
        assert_eq!(user.email(), Some("alice@example.com"));
        assert_eq!(user.id(), Some("65f0"));

        let record: UserRecord = serde_json::from_str(r#"{"username": "bob"}"#).unwrap();
        assert_eq!(User::try_from(record).unwrap(), User::new("bob", None, None));

        let record: UserRecord = serde_json::from_str(r#"{"id": "65f0"}"#).unwrap();
        assert!(User::try_from(record).is_err());
        let record: UserRecord = serde_json::from_str(r#"{"username": ""}"#).unwrap();
        assert!(User::try_from(record).is_err());
    }
}
