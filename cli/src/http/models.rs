//! HTTP API request/response models

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use gsctl_core::api::{
    decode_with_fallback, ConfigError, FileError, RestartError, StreamError, TextEncoding,
};
use serde::{Deserialize, Serialize};

use super::validation::validate_upload_size;

// ============= Restart =============

#[derive(Debug, Default, Deserialize)]
pub struct RestartQuery {
    #[serde(default)]
    pub force_delete_saves: bool,
}

// ============= Config files =============

#[derive(Debug, Serialize)]
pub struct ConfigContentResponse {
    pub status: &'static str,
    pub content: String,
    pub encoding: TextEncoding,
}

#[derive(Debug, Deserialize)]
pub struct OverrideConfigRequest {
    pub content: String,
    /// Forces the written encoding; by default the existing file's is kept.
    #[serde(default)]
    pub encoding: Option<TextEncoding>,
}

/// Body of an override request: JSON, or a `multipart/form-data` upload whose
/// file part is named `file` (or `config`/`content`) with an optional
/// `encoding` part.
#[derive(Debug)]
pub enum OverrideBody {
    Json(OverrideConfigRequest),
    Upload {
        bytes: Bytes,
        encoding: Option<TextEncoding>,
    },
}

const UPLOAD_FIELDS: &[&str] = &["file", "config", "content"];

impl OverrideBody {
    /// Uploaded bytes are decoded with the first encoding in `order` that fits.
    pub fn into_request(
        self,
        order: &[TextEncoding],
    ) -> Result<OverrideConfigRequest, HttpServerError> {
        match self {
            Self::Json(req) => Ok(req),
            Self::Upload { bytes, encoding } => {
                validate_upload_size(bytes.len())?;
                let (content, detected) = decode_with_fallback(&bytes, order).ok_or_else(|| {
                    HttpServerError::InvalidRequest(format!(
                        "uploaded file is not valid {}",
                        order
                            .iter()
                            .map(|e| e.label())
                            .collect::<Vec<_>>()
                            .join(" or ")
                    ))
                })?;
                tracing::debug!(bytes = bytes.len(), %detected, "decoded uploaded config");
                Ok(OverrideConfigRequest { content, encoding })
            }
        }
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("multipart/form-data"))
}

#[axum::async_trait]
impl<S> FromRequest<S> for OverrideBody
where
    S: Send + Sync,
{
    type Rejection = HttpServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Json(body) = Json::<OverrideConfigRequest>::from_request(req, state)
                .await
                .map_err(|e| HttpServerError::InvalidRequest(e.body_text()))?;
            return Ok(Self::Json(body));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| HttpServerError::InvalidRequest(e.body_text()))?;
        let mut file = None;
        let mut encoding = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| HttpServerError::InvalidRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if UPLOAD_FIELDS.contains(&name.as_str()) {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| HttpServerError::InvalidRequest(e.body_text()))?;
                file = Some(bytes);
            } else if name == "encoding" {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| HttpServerError::InvalidRequest(e.body_text()))?;
                if !raw.trim().is_empty() {
                    encoding = Some(raw.parse().map_err(HttpServerError::InvalidRequest)?);
                }
            }
        }

        let bytes = file.ok_or_else(|| {
            HttpServerError::InvalidRequest("multipart body has no 'file' field".into())
        })?;
        Ok(Self::Upload { bytes, encoding })
    }
}

#[derive(Debug, Serialize)]
pub struct OverrideConfigResponse {
    pub status: &'static str,
    pub encoding: TextEncoding,
}

// ============= Games =============

#[derive(Debug, Serialize)]
pub struct GameInfo {
    pub id: &'static str,
    pub configured: bool,
    pub config_files: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct GamesResponse {
    pub games: Vec<GameInfo>,
}

// ============= Health =============

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub session_id: String,
    pub uptime_seconds: f64,
    pub requests_handled: u64,
    pub timestamp: String,
}

// ============= Error Handling =============

#[derive(Debug)]
pub enum HttpServerError {
    GameNotFound(String),
    GameNotConfigured(String),
    InvalidRequest(String),
    /// Config file missing on disk; answered in the `{status, message}` shape.
    FileMissing(String),
    Config(String),
    SpawnFailure(String),
    Internal(String),
}

impl HttpServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::GameNotFound(_) | Self::GameNotConfigured(_) | Self::FileMissing(_) => {
                StatusCode::NOT_FOUND
            }
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::SpawnFailure(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::GameNotFound(_) => "GAME_NOT_FOUND",
            Self::GameNotConfigured(_) => "GAME_NOT_CONFIGURED",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::FileMissing(_) => "FILE_NOT_FOUND",
            Self::Config(_) => "CONFIG_ERROR",
            Self::SpawnFailure(_) => "SPAWN_FAILURE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        let body = match self {
            Self::FileMissing(message) => serde_json::json!({
                "status": "fail",
                "message": message,
            }),
            Self::GameNotFound(msg)
            | Self::GameNotConfigured(msg)
            | Self::InvalidRequest(msg)
            | Self::Config(msg)
            | Self::SpawnFailure(msg)
            | Self::Internal(msg) => serde_json::json!({
                "success": false,
                "error": msg,
                "error_code": error_code,
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<FileError> for HttpServerError {
    fn from(e: FileError) -> Self {
        match e {
            FileError::NotFound(_) => Self::FileMissing(e.to_string()),
            FileError::Unencodable { .. } => Self::InvalidRequest(e.to_string()),
            FileError::Io { .. } | FileError::Undecodable(_) | FileError::TooLarge { .. } => {
                Self::Internal(e.to_string())
            }
        }
    }
}

impl From<ConfigError> for HttpServerError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::GameNotConfigured(game) => {
                Self::GameNotConfigured(format!("game '{game}' is not configured"))
            }
            other => Self::Config(other.to_string()),
        }
    }
}

impl From<RestartError> for HttpServerError {
    fn from(e: RestartError) -> Self {
        match e {
            RestartError::Config(e) => e.into(),
            // A missing restart script is a server misconfiguration, not a missing config file.
            RestartError::File(FileError::NotFound(path)) => {
                Self::Config(format!("restart script not found: {}", path.display()))
            }
            RestartError::File(e) => e.into(),
        }
    }
}

impl From<StreamError> for HttpServerError {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Spawn { .. } => Self::SpawnFailure(e.to_string()),
            StreamError::AlreadyConsumed | StreamError::Pipe(_) => {
                Self::Internal(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_restart_query_defaults() {
        let q: RestartQuery = serde_json::from_str("{}").unwrap();
        assert!(!q.force_delete_saves);
    }

    #[test]
    fn test_override_request_encoding() {
        let req: OverrideConfigRequest =
            serde_json::from_str(r#"{"content":"a=1","encoding":"gbk"}"#).unwrap();
        assert_eq!(req.encoding, Some(TextEncoding::Gbk));

        let req: OverrideConfigRequest = serde_json::from_str(r#"{"content":"a=1"}"#).unwrap();
        assert_eq!(req.encoding, None);
    }

    #[test]
    fn test_content_response_serialize() {
        let resp = ConfigContentResponse {
            status: "success",
            content: "PVP=true\n".into(),
            encoding: TextEncoding::Utf8,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status":"success","content":"PVP=true\n","encoding":"utf-8"})
        );
    }

    #[test]
    fn test_error_mapping() {
        let missing: HttpServerError = FileError::NotFound(PathBuf::from("/x.ini")).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.error_code(), "FILE_NOT_FOUND");

        let spawn: HttpServerError = StreamError::Spawn {
            program: "pwsh".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        assert_eq!(spawn.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(spawn.error_code(), "SPAWN_FAILURE");

        let script: HttpServerError =
            RestartError::File(FileError::NotFound(PathBuf::from("/r.ps1"))).into();
        assert_eq!(script.error_code(), "CONFIG_ERROR");
    }
}
