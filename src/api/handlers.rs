//! API request handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use super::server::AppState;
use crate::excel::{ExportFile, MemoryDelivery, TabularExporter};
use crate::types::ExportRequest;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(RootResponse {
        name: "WMS Export API Server".to_string(),
        version: state.version.clone(),
        description: "Export main/sub tables to Excel or CSV".to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check endpoint"),
            EndpointInfo::new("GET", "/version", "Get server version"),
            EndpointInfo::new(
                "POST",
                "/api/v1/export",
                "Render an export request and return the file",
            ),
        ],
    }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub formats: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        formats: vec!["xlsx".to_string(), "csv".to_string()],
    }))
}

/// POST /api/v1/export - Render the request and return it as an attachment.
///
/// 400 for an unsupported format, 500 when the workbook cannot be written.
pub async fn export(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExportRequest>,
) -> Response {
    let format = req.format.clone();
    let config = state.export.clone();

    let rendered = tokio::task::spawn_blocking(move || {
        let exporter = TabularExporter::with_config(config, MemoryDelivery::new());
        let delivered = exporter.export(&req)?;
        Ok::<_, crate::error::ExportError>(if delivered {
            exporter.delivery().take().pop()
        } else {
            None
        })
    })
    .await;

    match rendered {
        Ok(Ok(Some(file))) => {
            info!(file = %file.filename, bytes = file.bytes.len(), "Served export");
            attachment(file)
        }
        Ok(Ok(None)) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::err(format!(
                "Unsupported export format: {}",
                format
            ))),
        )
            .into_response(),
        Ok(Err(e)) => {
            error!("Export failed: {}", e);
            internal_error(e.to_string())
        }
        Err(e) => {
            error!("Export task failed: {}", e);
            internal_error("Export task failed")
        }
    }
}

fn internal_error(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::err(message)),
    )
        .into_response()
}

fn attachment(file: ExportFile) -> Response {
    let disposition = HeaderValue::from_str(&content_disposition(&file.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(file.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response()
}

/// `attachment` header with an ASCII fallback name and the UTF-8 name
/// percent-encoded (RFC 5987)
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if fallback == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let mut encoded = String::new();
    for byte in filename.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_ok() {
        let response = ApiResponse::ok("payload");
        assert!(response.success);
        assert_eq!(response.data, Some("payload"));
        assert!(response.error.is_none());
        assert_eq!(response.request_id.len(), 36);
    }

    #[test]
    fn test_api_response_err_serialization() {
        let response = ApiResponse::<()>::err("bad format");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "bad format");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("orders.xlsx"),
            "attachment; filename=\"orders.xlsx\""
        );
    }

    #[test]
    fn test_content_disposition_utf8() {
        assert_eq!(
            content_disposition("訂單.csv"),
            "attachment; filename=\"__.csv\"; filename*=UTF-8''%E8%A8%82%E5%96%AE.csv"
        );
    }
}
