//! Request/response envelope shared by every backend endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// One backend call: query `params` for reads, body `data` for writes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequest {
    pub url: String,
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Json>,
}

impl ApiRequest {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            params: None,
            data: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, data: Json) -> Self {
        Self::new(Method::Post, url).with_data(data)
    }

    pub fn put(url: impl Into<String>, data: Json) -> Self {
        Self::new(Method::Put, url).with_data(data)
    }

    pub fn patch(url: impl Into<String>, data: Json) -> Self {
        Self::new(Method::Patch, url).with_data(data)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    #[must_use]
    pub fn with_params(mut self, params: Json) -> Self {
        self.params = Some(params);
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Json) -> Self {
        self.data = Some(data);
        self
    }
}

/// Response body `{code, data, msg}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: u16,
    #[serde(default)]
    pub data: Json,
    #[serde(default)]
    pub msg: Option<String>,
}

impl Envelope {
    pub fn ok(data: Json) -> Self {
        Self {
            code: 200,
            data,
            msg: None,
        }
    }

    pub fn created(data: Json) -> Self {
        Self {
            code: 201,
            data,
            msg: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.code, 200 | 201)
    }

    /// `Ok(data)` for 200/201, otherwise a server error carrying `msg`
    pub fn into_result(self) -> Result<Json, ApiError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ApiError::Server {
                code: self.code,
                message: self.msg.unwrap_or_else(|| detail_message(&self.data)),
            })
        }
    }
}

/// Pull `detail` out of an error body, falling back to the raw JSON
fn detail_message(data: &Json) -> String {
    match data.get("detail").and_then(Json::as_str) {
        Some(detail) => detail.to_string(),
        None if data.is_null() => "request failed".to_string(),
        None => data.to_string(),
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error {code}: {message}")]
    Server { code: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// The HTTP client abstraction every wrapper goes through. No retry,
/// auth or backoff lives at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: ApiRequest) -> Result<Envelope, ApiError>;
}
