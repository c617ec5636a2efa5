//! suppaftp-backed connector
//!
//! One `FtpStream` per session. Transfers use passive mode and binary type.

use std::io::Cursor;
use std::time::Duration;

use suppaftp::types::{FileType, Mode};
use suppaftp::FtpStream;
use tracing::{debug, instrument};

use super::{ConnectTarget, Connector, RemoteFs, RemoteResult};
use crate::error::RemoteError;

/// Connects to real FTP servers
#[derive(Debug, Clone, Default)]
pub struct FtpConnector {
    /// Read/write timeout on the control connection
    command_timeout: Option<Duration>,
}

impl FtpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every control-connection read and write after the greeting
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    fn apply_command_timeout(&self, stream: &FtpStream) -> RemoteResult<()> {
        let Some(timeout) = self.command_timeout else {
            return Ok(());
        };
        let socket = stream.get_ref();
        socket
            .set_read_timeout(Some(timeout))
            .and_then(|_| socket.set_write_timeout(Some(timeout)))
            .map_err(|e| RemoteError::Network(format!("cannot set command timeout: {}", e)))
    }
}

impl Connector for FtpConnector {
    #[instrument(skip(self), fields(host = %target.host, port = target.port))]
    fn connect(&self, target: &ConnectTarget) -> RemoteResult<Box<dyn RemoteFs>> {
        // Every resolved address is tried in turn
        let mut stream = FtpStream::connect(target.address())?;
        self.apply_command_timeout(&stream)?;

        // 530/532 become authentication failures, 421 a network failure
        stream.login(&target.username, &target.password)?;

        stream.set_mode(Mode::Passive);
        stream.transfer_type(FileType::Binary)?;

        debug!("Logged in as {}", target.username);
        Ok(Box::new(SuppaConnection { stream }))
    }
}

/// A logged-in suppaftp stream
struct SuppaConnection {
    stream: FtpStream,
}

impl RemoteFs for SuppaConnection {
    fn pwd(&mut self) -> RemoteResult<String> {
        Ok(self.stream.pwd()?)
    }

    fn cwd(&mut self, path: &str) -> RemoteResult<()> {
        Ok(self.stream.cwd(path)?)
    }

    fn list(&mut self) -> RemoteResult<Vec<String>> {
        Ok(self.stream.list(None)?)
    }

    fn put(&mut self, name: &str, data: &[u8]) -> RemoteResult<u64> {
        let mut reader = Cursor::new(data);
        Ok(self.stream.put_file(name, &mut reader)?)
    }

    fn retrieve(&mut self, name: &str) -> RemoteResult<Vec<u8>> {
        let cursor = self.stream.retr_as_buffer(name)?;
        Ok(cursor.into_inner())
    }

    fn mkdir(&mut self, name: &str) -> RemoteResult<()> {
        Ok(self.stream.mkdir(name)?)
    }

    fn rename(&mut self, from: &str, to: &str) -> RemoteResult<()> {
        Ok(self.stream.rename(from, to)?)
    }

    fn remove_file(&mut self, name: &str) -> RemoteResult<()> {
        Ok(self.stream.rm(name)?)
    }

    fn remove_dir(&mut self, name: &str) -> RemoteResult<()> {
        Ok(self.stream.rmdir(name)?)
    }

    fn quit(&mut self) -> RemoteResult<()> {
        Ok(self.stream.quit()?)
    }
}
