//! HTTP plumbing: request/response types, and a [`Transport`] that actually goes to the network

use std::error::Error;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::RequestError;
use crate::resource::{ApiPath, Resource};
use crate::token_store::Credential;
use crate::traits::Transport;

/// A request, as it will be sent by a [`Transport`]
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub path: ApiPath,
    /// A JSON body, if any
    pub body: Option<serde_json::Value>,
    pub bearer: Option<Credential>,
}

/// A response, whatever its status code
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: Vec<u8>) -> Self {
        Self { status, content_type: content_type.map(String::from), body }
    }

    /// A response with a JSON body
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, Some("application/json"), value.to_string().into_bytes())
    }

    /// A response without body
    pub fn empty(status: u16) -> Self {
        Self::new(status, None, Vec::new())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body into a strict record type.
    /// Missing or ill-typed fields are reported as validation failures
    pub fn decode<D: DeserializeOwned>(&self) -> Result<D, RequestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// A [`Transport`] that sends requests to a real server, using `reqwest`
pub struct ReqwestTransport {
    resource: Resource,
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport. This does not start a connection
    pub fn new<S: AsRef<str>>(api_url: S) -> Result<Self, Box<dyn Error>> {
        let url = Url::parse(api_url.as_ref())?;
        Ok(Self {
            resource: Resource::new(url),
            http: reqwest::Client::new(),
        })
    }

    /// Create a transport to the URL set in [`config::API_URL`](crate::config::API_URL)
    pub fn from_config() -> Result<Self, Box<dyn Error>> {
        Self::new(crate::config::api_url())
    }

    pub fn api_url(&self) -> &Url {
        self.resource.url()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        let url = self.resource.combine(&request.path);

        let mut builder = self.http.request(request.method, url);
        if let Some(bearer) = &request.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", bearer.as_str()));
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response.headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, content_type, body })
    }
}
