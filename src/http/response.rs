//! Request and response bodies, and error-to-response mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::Error;
use crate::ftp::FileEntry;

/// Value of every successful body's `status` field
pub const STATUS_SUCCESS: &str = "success";

fn default_ftp_port() -> u16 {
    21
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub host: String,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OperationResponse {
    pub status: String,
    pub message: String,
}

impl OperationResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub files: Vec<FileEntry>,
    pub current_path: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChangeDirectoryResponse {
    pub status: String,
    pub message: String,
    pub current_path: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDirectoryRequest {
    pub directory_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub old_name: String,
    pub new_name: String,
}

/// Body of every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    pub kind: String,
}

/// An [`Error`] with the operation that produced it
#[derive(Debug)]
pub struct ApiError {
    context: &'static str,
    source: Error,
}

impl ApiError {
    pub fn new(context: &'static str, source: impl Into<Error>) -> Self {
        Self {
            context,
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        if self.source.is_domain_failure() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = format!("{}: {}", self.context, self.source);
        if status.is_server_error() {
            error!("{}", detail);
        } else {
            warn!("{}", detail);
        }

        let body = ErrorBody {
            detail,
            kind: self.source.kind().as_str().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Attach the failing operation's name to an error
pub trait Context<T> {
    fn context(self, context: &'static str) -> Result<T, ApiError>;
}

impl<T, E: Into<Error>> Context<T> for Result<T, E> {
    fn context(self, context: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(context, e))
    }
}
