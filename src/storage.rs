//! Durable key/value stores, used to persist the session credential

use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};

use crate::traits::LocalStorage;

/// A [`LocalStorage`] that keeps its items in a JSON file
#[derive(Debug, PartialEq)]
pub struct FileStorage {
    backing_file: PathBuf,
    data: HashMap<String, String>,
}

impl FileStorage {
    /// Initialize a storage from the content of a valid backing file if it exists.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let data = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };

        Ok(Self{
            backing_file: PathBuf::from(path),
            data,
        })
    }

    /// Initialize an empty storage. Nothing is written until an item is set
    pub fn new(path: &Path) -> Self {
        Self{
            backing_file: PathBuf::from(path),
            data: HashMap::new(),
        }
    }

    /// Open the storage at `path`, or start an empty one in case the file is missing or invalid
    pub fn open(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(storage) => storage,
            Err(err) => {
                log::debug!("Starting with an empty storage: {}", err);
                Self::new(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.backing_file
    }

    /// Store the current items to the backing file
    fn save_to_file(&self) {
        let path = &self.backing_file;
        let file = match std::fs::File::create(path) {
            Err(err) => {
                log::warn!("Unable to save file {:?}: {}", path, err);
                return;
            },
            Ok(f) => f,
        };

        if let Err(err) = serde_json::to_writer(file, &self.data) {
            log::warn!("Unable to serialize: {}", err);
        };
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) {
        self.data.insert(key.to_string(), value.to_string());
        self.save_to_file();
    }

    fn remove_item(&mut self, key: &str) {
        if self.data.remove(key).is_some() {
            self.save_to_file();
        }
    }
}

/// A [`LocalStorage`] that lives in memory only
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    data: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) {
        self.data.insert(key.to_string(), value.to_string());
    }

    fn remove_item(&mut self, key: &str) {
        self.data.remove(key);
    }
}
