//! Gateway configuration settings
//!
//! Layered configuration: defaults → config file → environment variables → CLI args

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, Result};
use crate::session::ContentionPolicy;

/// Environment variable prefix (`FTPGW_PORT`, `FTPGW_WORKER_THREADS`, ...)
pub const ENV_PREFIX: &str = "FTPGW_";

/// Which remote filesystem implementation sessions connect through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Real FTP servers
    #[default]
    Ftp,
    /// Built-in in-memory server, for local development
    Memory,
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub host: String,

    /// Port to bind the HTTP server to
    pub port: u16,

    /// Prefix all routes are nested under
    pub api_prefix: String,

    /// Maximum concurrent blocking FTP calls
    pub worker_threads: usize,

    /// Behaviour when a request arrives for a session that is in use
    pub session_contention: ContentionPolicy,

    /// Read/write timeout on the FTP control connection (unset = none)
    pub command_timeout_secs: Option<u64>,

    /// Largest accepted upload request body, in bytes
    pub max_upload_bytes: usize,

    /// Allowed CORS origins; `*` allows any
    pub cors_allowed_origins: Vec<String>,

    /// Remote filesystem backend
    pub backend: Backend,

    /// Username accepted by the memory backend
    pub memory_username: String,

    /// Password accepted by the memory backend
    pub memory_password: String,

    /// Enable debug logging
    pub debug: bool,

    /// Log file path (if set, logs to file instead of stderr)
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            api_prefix: "/api".to_string(),
            worker_threads: 10,
            session_contention: ContentionPolicy::Wait,
            command_timeout_secs: None,
            max_upload_bytes: 100 * 1024 * 1024,
            cors_allowed_origins: vec!["*".to_string()],
            backend: Backend::Ftp,
            memory_username: "ftpuser".to_string(),
            memory_password: "1234".to_string(),
            debug: false,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration with `path` as the config file
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::figment(path)
            .extract::<Config>()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()).into())
            .and_then(Config::validated)
    }

    /// The provider stack, without extraction
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            // Layer config file if it exists
            .merge(Toml::file(path))
            // Layer environment variables (FTPGW_PORT, FTPGW_API_PREFIX, ...)
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(invalid("worker_threads", "must be at least 1"));
        }
        if !self.api_prefix.starts_with('/') {
            return Err(invalid("api_prefix", "must start with '/'"));
        }
        if self.max_upload_bytes == 0 {
            return Err(invalid("max_upload_bytes", "must be non-zero"));
        }
        if self.command_timeout_secs == Some(0) {
            return Err(invalid("command_timeout_secs", "must be at least 1 second"));
        }
        if self.cors_allowed_origins.is_empty() {
            return Err(invalid("cors_allowed_origins", "must list at least one origin"));
        }
        self.bind_addr()?;
        Ok(())
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Socket address for the HTTP listener
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| invalid("host", &format!("{}", e)))
    }

    /// Control connection timeout as a `Duration`
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// `api_prefix` without a trailing slash; empty means routes sit at the root
    pub fn normalized_prefix(&self) -> &str {
        self.api_prefix.trim_end_matches('/')
    }

    /// Whether any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.cors_allowed_origins.iter().any(|o| o == "*")
    }

    /// Get the configuration file path
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Save current configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|_e| {
                Error::Config(ConfigError::DirectoryCreationFailed(parent.to_path_buf()))
            })?;
        }

        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "ftp-gateway", "ftp-gateway").ok_or_else(|| {
            Error::Config(ConfigError::LoadFailed(
                "Could not determine home directory".to_string(),
            ))
        })
    }
}

fn invalid(key: &str, reason: &str) -> Error {
    Error::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}
