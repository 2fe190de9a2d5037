//! REST transport
//!
//! Everything that talks to the backend goes through [`Transport`], so the
//! cache can be driven by the HTTP client in production and by an in-memory
//! double in tests.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::cache::Filter;
use crate::error::ApiError;

mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// One call against the API, relative to the configured base URL.
///
/// The path is kept as unencoded segments. The transport encodes each one,
/// so an id can never add segments or start a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    /// `path` is a fixed route such as `/companies/`. A trailing slash
    /// becomes an empty last segment.
    fn new(method: Method, path: &str, body: Option<Value>) -> Self {
        Self {
            method,
            segments: path
                .trim_start_matches('/')
                .split('/')
                .map(str::to_string)
                .collect(),
            query: Vec::new(),
            body,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path, None)
    }

    pub fn post(path: &str, body: Option<Value>) -> Self {
        Self::new(Method::Post, path, body)
    }

    pub fn put(path: &str, body: Value) -> Self {
        Self::new(Method::Put, path, Some(body))
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::Delete, path, None)
    }

    /// Append one segment, taken literally.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn with_filter(mut self, filter: &Filter) -> Self {
        self.query.extend(
            filter
                .pairs()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        self
    }

    /// Unencoded path, for logs and test routing.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// Sends requests to the CRM backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the decoded JSON body, or `Value::Null` for an empty body.
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}
