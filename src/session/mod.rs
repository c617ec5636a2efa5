//! Session management module
//!
//! Provides the session registry:
//! - `FtpSession` - one live connection and its working directory
//! - `SessionManager` - the registry and every operation on it
//! - `BlockingExecutor` - bounded pool the blocking FTP calls run on

mod executor;
mod manager;
mod types;

pub use executor::*;
pub use manager::*;
pub use types::*;
