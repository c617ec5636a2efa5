//! Session manager - coordinates session lifecycle
//!
//! Owns the registry of live FTP sessions and runs every connection
//! operation on the blocking executor. Each session sits behind its own
//! async mutex so two requests never drive one connection at the same time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{Result, SessionError, WorkerError};
use crate::ftp::{parse_listing, ConnectTarget, Connector, FileEntry};
use crate::session::{
    parent_path, BlockingExecutor, ContentionPolicy, FtpSession, SessionId, SessionInfo,
};

/// Registry entry
struct SessionSlot {
    session: Arc<Mutex<FtpSession>>,
    /// Set by disconnect before it waits for the lock; checked after every acquire
    closed: AtomicBool,
}

impl SessionSlot {
    fn new(session: FtpSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            closed: AtomicBool::new(false),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

type SessionHandle = Arc<SessionSlot>;

/// A directory listing together with the directory it was taken in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub entries: Vec<FileEntry>,
    pub current_path: String,
}

/// Outcome of a disconnect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnected {
    /// `QUIT` failed; the session was dropped anyway
    pub quit_error: Option<String>,
}

impl Disconnected {
    pub fn message(&self) -> String {
        match &self.quit_error {
            None => "Disconnected successfully".to_string(),
            Some(e) => format!("Disconnected (with error): {}", e),
        }
    }
}

/// Session manager coordinates all session operations
pub struct SessionManager {
    /// Opens new connections
    connector: Arc<dyn Connector>,
    /// Live sessions
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    /// Blocking worker pool
    executor: BlockingExecutor,
    /// What to do when a session is already in use
    contention: ContentionPolicy,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(config: &Config, connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            sessions: RwLock::new(HashMap::new()),
            executor: BlockingExecutor::with_max_workers(config.worker_threads),
            contention: config.session_contention,
        }
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Public view of a session
    pub async fn session_info(&self, session_id: &SessionId) -> Result<SessionInfo> {
        let slot = self.lookup(session_id).await?;
        let session = slot.session.lock().await;
        if slot.is_closed() {
            return Err(SessionError::NotFound(session_id.to_string()).into());
        }
        Ok(session.info.clone())
    }

    /// Open and authenticate a new connection
    #[instrument(skip(self, password))]
    pub async fn connect(
        &self,
        host: String,
        port: u16,
        username: String,
        password: String,
    ) -> Result<SessionId> {
        let session_id = SessionId::new();
        let target = ConnectTarget {
            host: host.clone(),
            port,
            username: username.clone(),
            password,
        };
        let connector = self.connector.clone();

        let session = self
            .executor
            .run(move || {
                let conn = connector.connect(&target)?;
                let mut session = FtpSession::new(session_id, host, port, username, conn);
                if let Err(e) = session.refresh_path() {
                    debug!("PWD after login failed, assuming '/': {}", e);
                }
                Ok(session)
            })
            .await?;

        info!(
            "Connected session {} to {}:{} as {}",
            session_id.short(),
            session.info.host,
            session.info.port,
            session.info.username
        );

        self.sessions
            .write()
            .await
            .insert(session_id, Arc::new(SessionSlot::new(session)));

        Ok(session_id)
    }

    /// Close a session; a failed `QUIT` still removes it
    ///
    /// Operations still waiting for the session fail as not found. The one
    /// in flight finishes first, then `QUIT` is sent. Closing runs as its own
    /// task, so it completes even if the caller stops waiting.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, session_id: &SessionId) -> Result<Disconnected> {
        let slot = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        slot.closed.store(true, Ordering::Release);

        let closing = tokio::spawn(close_session(*session_id, slot, self.executor.clone()));
        closing
            .await
            .map_err(|e| WorkerError::Panicked(e.to_string()).into())
    }

    /// List a directory
    ///
    /// When `path` is given the session first tries to enter it; if that
    /// fails the current directory is listed instead.
    #[instrument(skip(self))]
    pub async fn list(&self, session_id: &SessionId, path: Option<String>) -> Result<Listing> {
        self.with_session(session_id, move |session| {
            if let Some(path) = path.filter(|p| !p.is_empty()) {
                if let Err(e) = session.conn.cwd(&path) {
                    warn!("Cannot enter '{}', listing current directory: {}", path, e);
                }
            }

            let current_path = session.refresh_path()?;
            let lines = session.conn.list()?;
            Ok(Listing {
                entries: parse_listing(&lines),
                current_path,
            })
        })
        .await
    }

    /// Store `data` as `filename` in the current directory
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn upload(&self, session_id: &SessionId, filename: String, data: Vec<u8>) -> Result<u64> {
        self.with_session(session_id, move |session| {
            let written = session.conn.put(&filename, &data)?;
            debug!("Stored {} bytes as {}", written, filename);
            Ok(written)
        })
        .await
    }

    /// Fetch the whole content of `filename`
    #[instrument(skip(self))]
    pub async fn download(&self, session_id: &SessionId, filename: String) -> Result<Vec<u8>> {
        self.with_session(session_id, move |session| Ok(session.conn.retrieve(&filename)?))
            .await
    }

    /// Change the working directory; `..` moves to the parent
    #[instrument(skip(self))]
    pub async fn change_directory(&self, session_id: &SessionId, path: String) -> Result<String> {
        self.with_session(session_id, move |session| {
            if path == ".." {
                let current = session.conn.pwd()?;
                if let Some(parent) = parent_path(&current) {
                    session.conn.cwd(&parent)?;
                }
            } else {
                session.conn.cwd(&path)?;
            }
            Ok(session.refresh_path()?)
        })
        .await
    }

    /// Create a directory in the current directory
    #[instrument(skip(self))]
    pub async fn create_directory(&self, session_id: &SessionId, name: String) -> Result<()> {
        self.with_session(session_id, move |session| Ok(session.conn.mkdir(&name)?))
            .await
    }

    /// Rename an entry of the current directory
    #[instrument(skip(self))]
    pub async fn rename(&self, session_id: &SessionId, old_name: String, new_name: String) -> Result<()> {
        self.with_session(session_id, move |session| {
            Ok(session.conn.rename(&old_name, &new_name)?)
        })
        .await
    }

    /// Delete a file, or an empty directory if the server refuses `DELE`
    #[instrument(skip(self))]
    pub async fn delete(&self, session_id: &SessionId, name: String) -> Result<()> {
        self.with_session(session_id, move |session| match session.conn.remove_file(&name) {
            Ok(()) => Ok(()),
            Err(file_err) => match session.conn.remove_dir(&name) {
                Ok(()) => Ok(()),
                Err(dir_err) => {
                    debug!("RMD fallback for '{}' failed too: {}", name, dir_err);
                    Err(file_err.into())
                }
            },
        })
        .await
    }

    /// Disconnect every session and stop the worker pool; used on shutdown
    pub async fn close_all(&self) {
        let ids: Vec<SessionId> = self.sessions.read().await.keys().copied().collect();
        if !ids.is_empty() {
            info!("Closing {} FTP session(s)", ids.len());
            let results = join_all(ids.iter().map(|id| self.disconnect(id))).await;
            for (id, result) in ids.iter().zip(results) {
                if let Err(e) = result {
                    debug!("Ignoring close failure for {}: {}", id.short(), e);
                }
            }
        }
        self.executor.close();
    }

    async fn lookup(&self, session_id: &SessionId) -> Result<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()).into())
    }

    async fn acquire(&self, session_id: &SessionId) -> Result<OwnedMutexGuard<FtpSession>> {
        let slot = self.lookup(session_id).await?;
        let guard = match self.contention {
            ContentionPolicy::Wait => slot.session.clone().lock_owned().await,
            ContentionPolicy::Reject => slot
                .session
                .clone()
                .try_lock_owned()
                .map_err(|_| SessionError::Busy(*session_id))?,
        };

        // Disconnected while we were queued
        if slot.is_closed() {
            return Err(SessionError::NotFound(session_id.to_string()).into());
        }
        Ok(guard)
    }

    /// Run `op` against the session on the blocking executor
    async fn with_session<T, F>(&self, session_id: &SessionId, op: F) -> Result<T>
    where
        F: FnOnce(&mut FtpSession) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut guard = self.acquire(session_id).await?;
        self.executor.run(move || op(&mut *guard)).await
    }
}

/// Wait for the in-flight operation, then send `QUIT`
async fn close_session(session_id: SessionId, slot: SessionHandle, executor: BlockingExecutor) -> Disconnected {
    let mut session = slot.session.clone().lock_owned().await;

    let quit = executor.run(move || Ok(session.conn.quit())).await;
    let quit_error = match quit {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(e) => Some(e.to_string()),
    };

    match &quit_error {
        None => info!("Disconnected session {}", session_id.short()),
        Some(e) => warn!("Session {} closed with error: {}", session_id.short(), e),
    }

    Disconnected { quit_error }
}
