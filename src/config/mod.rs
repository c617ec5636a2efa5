//! Configuration module
//!
//! Handles:
//! - Gateway configuration (`~/.config/ftp-gateway/config.toml` on Linux)
//! - `FTPGW_*` environment overrides

mod settings;

pub use settings::*;
