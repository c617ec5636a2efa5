//! Error types for ftp-gateway
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `Display` and `Error` impls.
//! Every error maps to a stable [`ErrorKind`] so HTTP clients can tell an unknown
//! session from a refused login without parsing message text.

use std::path::PathBuf;

use thiserror::Error;

use crate::session::SessionId;

/// Top-level error type for ftp-gateway
#[derive(Error, Debug)]
pub enum Error {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("FTP error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid request: {0}")]
    Request(#[from] RequestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session registry errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No active FTP connection for session {0}")]
    NotFound(String),

    #[error("Session {0} is busy with another operation")]
    Busy(SessionId),
}

/// Failures reported by the remote FTP server or the connection to it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("File unavailable: {0}")]
    Unavailable(String),

    #[error("Server refused the request ({code}): {message}")]
    Rejected { code: u32, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Classify a negative FTP reply by its status code
    pub fn from_reply(code: u32, message: impl Into<String>) -> Self {
        let message = message.into().trim().to_string();
        match code {
            421 => RemoteError::Network(message),
            530 | 532 => RemoteError::Authentication(message),
            550 => RemoteError::Unavailable(message),
            _ => RemoteError::Rejected { code, message },
        }
    }
}

/// Blocking worker pool errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker pool is shut down")]
    Closed,

    #[error("Worker task panicked: {0}")]
    Panicked(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to create config directory: {0}")]
    DirectoryCreationFailed(PathBuf),
}

/// Malformed HTTP requests
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Missing form field '{0}'")]
    MissingField(&'static str),

    #[error("Uploaded file has no filename")]
    MissingFilename,

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

/// Machine-readable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SessionNotFound,
    SessionBusy,
    Network,
    Authentication,
    Unavailable,
    Rejected,
    Protocol,
    BadRequest,
    Config,
    Internal,
}

impl ErrorKind {
    /// Stable identifier used in HTTP error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "session_not_found",
            Self::SessionBusy => "session_busy",
            Self::Network => "network",
            Self::Authentication => "authentication",
            Self::Unavailable => "unavailable",
            Self::Rejected => "rejected",
            Self::Protocol => "protocol",
            Self::BadRequest => "bad_request",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

impl Error {
    /// Categorize this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Session(SessionError::NotFound(_)) => ErrorKind::SessionNotFound,
            Error::Session(SessionError::Busy(_)) => ErrorKind::SessionBusy,
            Error::Remote(RemoteError::Network(_)) => ErrorKind::Network,
            Error::Remote(RemoteError::Authentication(_)) => ErrorKind::Authentication,
            Error::Remote(RemoteError::Unavailable(_)) => ErrorKind::Unavailable,
            Error::Remote(RemoteError::Rejected { .. }) => ErrorKind::Rejected,
            Error::Remote(RemoteError::Protocol(_)) => ErrorKind::Protocol,
            Error::Request(_) => ErrorKind::BadRequest,
            Error::Config(_) => ErrorKind::Config,
            Error::Worker(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Whether the failure was caused by the caller or the remote server
    /// rather than by the gateway itself
    pub fn is_domain_failure(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal | ErrorKind::Config)
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<suppaftp::FtpError> for RemoteError {
    fn from(e: suppaftp::FtpError) -> Self {
        match e {
            suppaftp::FtpError::ConnectionError(err) => RemoteError::Network(err.to_string()),
            suppaftp::FtpError::UnexpectedResponse(response) => RemoteError::from_reply(
                response.status.code(),
                String::from_utf8_lossy(&response.body),
            ),
            other => RemoteError::Protocol(other.to_string()),
        }
    }
}

impl From<suppaftp::FtpError> for Error {
    fn from(e: suppaftp::FtpError) -> Self {
        Error::Remote(e.into())
    }
}
