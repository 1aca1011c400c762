//! Holds the bearer credential of the current session

use std::fmt::{Debug, Formatter};

use crate::traits::LocalStorage;

/// An opaque bearer token, as delivered by the backend
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new<S: ToString>(token: S) -> Self {
        Self(token.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Tokens must not end up in logs
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}

/// Stores the credential in a [`LocalStorage`], under a fixed key.
///
/// The structure or expiry of the token is never checked locally: only the backend tells whether it is valid.
/// Only the [`Session`](crate::session::Session) is supposed to `set` or `clear` it.
pub struct TokenStore {
    storage: Box<dyn LocalStorage>,
    key: String,
}

impl TokenStore {
    /// Create a store that uses the default key ([`TOKEN_STORAGE_KEY`](crate::config::TOKEN_STORAGE_KEY))
    pub fn new<S: LocalStorage + 'static>(storage: S) -> Self {
        Self::with_key(storage, crate::config::TOKEN_STORAGE_KEY)
    }

    pub fn with_key<S: LocalStorage + 'static, K: ToString>(storage: S, key: K) -> Self {
        Self {
            storage: Box::new(storage),
            key: key.to_string(),
        }
    }

    pub fn get(&self) -> Option<Credential> {
        self.storage.get_item(&self.key)
            .filter(|token| token.is_empty() == false)
            .map(Credential)
    }

    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }

    pub fn set(&mut self, credential: Credential) {
        self.storage.set_item(&self.key, credential.as_str());
    }

    pub fn clear(&mut self) {
        self.storage.remove_item(&self.key);
    }
}

impl Debug for TokenStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("key", &self.key)
            .field("present", &self.is_present())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    #[test]
    fn set_get_clear() {
        let mut store = TokenStore::new(MemoryStorage::new());
        assert_eq!(store.get(), None);

        store.set(Credential::new("secret"));
        assert_eq!(store.get(), Some(Credential::new("secret")));
        assert!(store.is_present());

        store.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn credential_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let mut store = TokenStore::new(FileStorage::open(&path));
        store.set(Credential::new("secret"));

        let reloaded = TokenStore::new(FileStorage::open(&path));
        assert_eq!(reloaded.get(), Some(Credential::new("secret")));
    }

    #[test]
    fn debug_does_not_leak() {
        let cred = Credential::new("very-secret-token");
        assert!(format!("{:?}", cred).contains("very-secret-token") == false);
    }
}
