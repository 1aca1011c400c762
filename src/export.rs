//! Saving exported documents

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::traits::FileSaver;

/// The file extension matching a document's content type
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match essence.as_deref() {
        Some("application/pdf") => "pdf",
        Some("text/csv") => "csv",
        _ => "bin",
    }
}

/// The deterministic name of the export of `date`, e.g. `tasks-2024-05-01.pdf`
pub fn file_name_for(date: NaiveDate, content_type: Option<&str>) -> String {
    format!("{}-{}.{}",
        crate::config::EXPORT_FILE_PREFIX,
        crate::resource::format_date(date),
        extension_for(content_type))
}

/// A [`FileSaver`] that writes documents into a folder
#[derive(Clone, Debug)]
pub struct DirectorySaver {
    folder: PathBuf,
}

impl DirectorySaver {
    pub fn new(folder: &Path) -> Self {
        Self { folder: PathBuf::from(folder) }
    }
}

impl FileSaver for DirectorySaver {
    fn save(&self, file_name: &str, content: &[u8]) -> Result<PathBuf, std::io::Error> {
        std::fs::create_dir_all(&self.folder)?;
        let path = self.folder.join(sanitize_filename::sanitize(file_name));
        std::fs::write(&path, content)?;
        log::info!("Saved {} bytes to {:?}", content.len(), path);
        Ok(path)
    }
}

/// A [`FileSaver`] that keeps the documents in memory
#[derive(Debug, Default)]
pub struct MemorySaver {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The (file name, content) of every document saved so far
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().unwrap().clone()
    }
}

impl FileSaver for MemorySaver {
    fn save(&self, file_name: &str, content: &[u8]) -> Result<PathBuf, std::io::Error> {
        self.saved.lock().unwrap().push((file_name.to_string(), content.to_vec()));
        Ok(PathBuf::from(file_name))
    }
}
