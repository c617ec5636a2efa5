//! Core session types
//!
//! Defines the session model:
//! - `SessionId` is the opaque token handed to HTTP clients
//! - `FtpSession` binds one live connection to its working-directory state
//! - `SessionInfo` is the connection-free view used in responses and logs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ftp::RemoteFs;

/// Unique identifier for an FTP session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 chars, for log lines
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Clients echo this back, so always the full UUID
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// What to do when an operation arrives while another one holds the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentionPolicy {
    /// Queue behind the in-flight operation
    #[default]
    Wait,
    /// Fail fast with a busy error
    Reject,
}

impl fmt::Display for ContentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wait => write!(f, "wait"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Public view of a session, without the connection handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub current_path: String,
    pub connected_at: DateTime<Utc>,
}

/// A live FTP session
pub struct FtpSession {
    /// Session metadata
    pub info: SessionInfo,
    /// The connection; exactly one per session
    pub conn: Box<dyn RemoteFs>,
}

impl FtpSession {
    /// Wrap a freshly authenticated connection
    pub fn new(id: SessionId, host: String, port: u16, username: String, conn: Box<dyn RemoteFs>) -> Self {
        Self {
            info: SessionInfo {
                id,
                host,
                port,
                username,
                current_path: "/".to_string(),
                connected_at: Utc::now(),
            },
            conn,
        }
    }

    /// Re-read the server's working directory and remember it
    pub fn refresh_path(&mut self) -> Result<String, crate::error::RemoteError> {
        let path = self.conn.pwd()?;
        self.info.current_path = path.clone();
        Ok(path)
    }
}

impl fmt::Debug for FtpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpSession")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Parent of an absolute remote path, or `None` at the root
///
/// `/a/b/` and `/a/b` both yield `/a`; `/a` yields `/`.
pub fn parent_path(path: &str) -> Option<String> {
    if path == "/" || path.is_empty() {
        return None;
    }
    let trimmed = path.trim_end_matches('/');
    let parts: Vec<&str> = trimmed.split('/').collect();
    if parts.len() <= 1 {
        return None;
    }
    let parent = parts[..parts.len() - 1].join("/");
    if parent.is_empty() {
        Some("/".to_string())
    } else {
        Some(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_display_and_parse() {
        let id = SessionId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.parse::<SessionId>().unwrap(), id);
        assert_eq!(id.short(), text[..8]);
    }

    #[test]
    fn test_session_id_rejects_garbage() {
        assert!("not-a-session".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_contention_policy_serialization() {
        let json = serde_json::to_string(&ContentionPolicy::Reject).unwrap();
        assert_eq!(json, "\"reject\"");
        assert_eq!(ContentionPolicy::default(), ContentionPolicy::Wait);
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("/"), None);
        assert_eq!(parent_path("/pub"), Some("/".to_string()));
        assert_eq!(parent_path("/pub/docs"), Some("/pub".to_string()));
        assert_eq!(parent_path("/pub/docs/"), Some("/pub".to_string()));
        assert_eq!(parent_path("relative"), None);
    }
}
