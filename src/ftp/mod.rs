//! Remote filesystem access
//!
//! The session layer talks to FTP servers only through two traits:
//! - [`Connector`] opens and authenticates a connection
//! - [`RemoteFs`] is one live, stateful connection
//!
//! Both are blocking; callers run them on the blocking executor.

mod client;
pub mod listing;
mod memory;

use std::fmt;
use std::sync::Arc;

pub use client::FtpConnector;
pub use listing::{parse_listing, EntryType, FileEntry};
pub use memory::{MemoryConnector, MemoryServer};

use crate::config::{Backend, Config};
use crate::error::RemoteError;

/// Result of a remote operation
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Connection parameters for one session
#[derive(Clone)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl ConnectTarget {
    /// `host:port` form accepted by socket address resolution
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A live, stateful connection to a remote file server
pub trait RemoteFs: Send {
    /// Current working directory
    fn pwd(&mut self) -> RemoteResult<String>;

    /// Change working directory
    fn cwd(&mut self, path: &str) -> RemoteResult<()>;

    /// Raw `LIST` lines for the working directory
    fn list(&mut self) -> RemoteResult<Vec<String>>;

    /// Store `data` as `name`, returning the number of bytes written
    fn put(&mut self, name: &str, data: &[u8]) -> RemoteResult<u64>;

    /// Fetch the whole content of `name`
    fn retrieve(&mut self, name: &str) -> RemoteResult<Vec<u8>>;

    fn mkdir(&mut self, name: &str) -> RemoteResult<()>;

    fn rename(&mut self, from: &str, to: &str) -> RemoteResult<()>;

    fn remove_file(&mut self, name: &str) -> RemoteResult<()>;

    fn remove_dir(&mut self, name: &str) -> RemoteResult<()>;

    /// Graceful close
    fn quit(&mut self) -> RemoteResult<()>;
}

/// Opens authenticated connections
pub trait Connector: Send + Sync {
    fn connect(&self, target: &ConnectTarget) -> RemoteResult<Box<dyn RemoteFs>>;
}

/// Connector for the configured backend
pub fn connector_for(config: &Config) -> Arc<dyn Connector> {
    match config.backend {
        Backend::Ftp => Arc::new(FtpConnector::new().with_command_timeout(config.command_timeout())),
        Backend::Memory => Arc::new(MemoryConnector::new(
            MemoryServer::new().with_user(&config.memory_username, &config.memory_password),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_target_debug_hides_password() {
        let target = ConnectTarget {
            host: "ftp.example.com".to_string(),
            port: 21,
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", target);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(target.address(), "ftp.example.com:21");
    }

    #[test]
    fn test_memory_backend_uses_configured_account() {
        let mut config = Config::default();
        config.backend = Backend::Memory;
        let connector = connector_for(&config);

        let good = ConnectTarget {
            host: "localhost".to_string(),
            port: 21,
            username: config.memory_username.clone(),
            password: config.memory_password.clone(),
        };
        assert!(connector.connect(&good).is_ok());

        let bad = ConnectTarget {
            password: "wrong".to_string(),
            ..good
        };
        assert!(connector.connect(&bad).is_err());
    }
}
