use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RequestError;
use crate::transport::{HttpRequest, HttpResponse};

/// Something that is able to send HTTP requests to the backend
///
/// This is usually a [`ReqwestTransport`](crate::transport::ReqwestTransport).
/// Tests use the `MockServer` of the `mock_backend` feature instead.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request, and return the response whatever its status code is.
    /// Only transport-level failures (no response at all) are errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        (**self).send(request).await
    }
}

/// A durable key/value store, that survives restarts of the program
pub trait LocalStorage: Send {
    fn get_item(&self, key: &str) -> Option<String>;
    /// Store a value. This is immediately written through to the backing store.
    fn set_item(&mut self, key: &str, value: &str);
    /// Remove a value. This is immediately written through to the backing store.
    fn remove_item(&mut self, key: &str);
}

/// Something that is able to "save as" a downloaded document
pub trait FileSaver: Send + Sync {
    /// Save `content` under the given file name, and return where it has been saved
    fn save(&self, file_name: &str, content: &[u8]) -> Result<PathBuf, std::io::Error>;
}
