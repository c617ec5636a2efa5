//! FTP Gateway - exposes FTP server sessions over a plain HTTP API
//!
//! A web client connects once, receives an opaque session id, and then
//! lists, uploads, downloads and navigates through that id while the
//! gateway keeps the stateful FTP connection alive on its behalf.
//!
//! # Architecture
//!
//! - **HTTP facade** - axum routes, one per operation
//! - **SessionManager** - registry of live sessions with per-session locking
//! - **BlockingExecutor** - bounded pool the blocking FTP calls run on
//! - **Connector / RemoteFs** - seam between sessions and the FTP client
//!
//! # Modules
//!
//! - [`session`] - Session registry and operations
//! - [`ftp`] - FTP client backends and the `LIST` parser
//! - [`http`] - Router, handlers and response shapes
//! - [`config`] - Layered configuration
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod ftp;
pub mod http;
pub mod session;

pub use config::{Backend, Config};
pub use error::{Error, ErrorKind, Result};
pub use session::{ContentionPolicy, SessionId, SessionInfo, SessionManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
