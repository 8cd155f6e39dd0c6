// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! FTP connection provider.
//!
//! A [`Connector`] turns configuration into an authenticated, single-use
//! [`RemoteSession`]. The production connector iterates an ordered list of
//! candidate text encodings and returns the first session that survives a
//! full connect/login/probe cycle; the caller owns the session and it is
//! released exactly once (explicit [`RemoteSession::close`] on the success
//! path, `Drop` everywhere else).
//!
//! The trait seam exists so the fetcher, retry wrapper and orchestrator can
//! be exercised against scripted in-memory sessions.

pub mod list;

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

use chrono::{DateTime, Utc};
use suppaftp::list::File as ListLine;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode, Status};
use tracing::{debug, warn};

use crate::config::FtpConfig;
use crate::error::{ConnectionError, RemoteError};

/// Candidate text encoding for an FTP session.
///
/// The control channel is byte-transparent for UTF-8 paths, so candidates
/// differ in the connect/login/probe cycle and in which paths they accept:
/// a GBK or Big5 session refuses paths that are not representable in that
/// codepage instead of silently corrupting them on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Binary,
    Gbk,
    Big5,
}

impl TextEncoding {
    /// Default candidate order; first success wins.
    pub fn default_order() -> &'static [TextEncoding] {
        &[TextEncoding::Utf8, TextEncoding::Binary, TextEncoding::Gbk, TextEncoding::Big5]
    }

    /// Lowercase label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf8",
            TextEncoding::Binary => "binary",
            TextEncoding::Gbk => "gbk",
            TextEncoding::Big5 => "big5",
        }
    }

    /// Reject paths that cannot be expressed in this encoding.
    ///
    /// `Utf8` and `Binary` pass everything through; the legacy codepages
    /// check representability via `encoding_rs`.
    pub fn validate_path(&self, path: &str) -> Result<(), RemoteError> {
        let encoder = match self {
            TextEncoding::Utf8 | TextEncoding::Binary => return Ok(()),
            TextEncoding::Gbk => encoding_rs::GBK,
            TextEncoding::Big5 => encoding_rs::BIG5,
        };
        let (_, _, had_errors) = encoder.encode(path);
        if had_errors {
            return Err(RemoteError::Protocol(format!(
                "path not representable in {}: {}",
                self.label(),
                path
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of a raw directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks and anything else we do not follow.
    Other,
}

/// One raw entry from a remote directory listing.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    /// Entry name within its directory.
    pub name: String,
    /// Size in bytes (zero for directories on most servers).
    pub size: u64,
    /// Server-reported modification time, when parseable.
    pub modified_at: Option<DateTime<Utc>>,
    /// File, directory, or other.
    pub kind: EntryKind,
}

/// An authenticated, single-use handle to the remote file server.
///
/// Implementations are exclusively owned by whichever call created them
/// and must release their transport exactly once on every exit path.
pub trait RemoteSession {
    /// Enumerate one directory, non-recursively.
    fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Stream one remote file into `local_path`, returning the byte count.
    fn download_to(&mut self, remote_path: &str, local_path: &Path) -> Result<u64, RemoteError>;

    /// Release the session. The default consumes `self`; transports that
    /// need a goodbye (FTP `QUIT`) send it from `Drop` so error paths are
    /// covered too.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

/// Source of fresh sessions. Every retry attempt and every listing calls
/// `connect` anew; sessions are never pooled or reused.
pub trait Connector: Send + Sync {
    type Session: RemoteSession + Send;

    fn connect(&self) -> Result<Self::Session, ConnectionError>;
}

/// Live FTP session backed by `suppaftp`.
pub struct FtpSession {
    stream: FtpStream,
    encoding: TextEncoding,
}

impl FtpSession {
    /// The encoding this session was negotiated with.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

impl std::fmt::Debug for FtpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpSession")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        // Best effort; the TCP stream closes regardless.
        let _ = self.stream.quit();
    }
}

impl RemoteSession for FtpSession {
    fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.encoding.validate_path(path)?;
        let lines = self
            .stream
            .list(Some(path))
            .map_err(|e| map_ftp_error(e, path))?;

        let mut entries = Vec::with_capacity(lines.len());
        for line in lines {
            match ListLine::try_from(line.as_str()) {
                Ok(parsed) => entries.push(to_remote_entry(&parsed)),
                Err(err) => debug!(%path, %err, "skipping unparsable listing line"),
            }
        }
        Ok(entries)
    }

    fn download_to(&mut self, remote_path: &str, local_path: &Path) -> Result<u64, RemoteError> {
        self.encoding.validate_path(remote_path)?;
        let mut out = std::fs::File::create(local_path)?;
        let bytes = self
            .stream
            .retr(remote_path, |reader| {
                std::io::copy(reader, &mut out).map_err(FtpError::ConnectionError)
            })
            .map_err(|e| map_ftp_error(e, remote_path))?;
        out.sync_all()?;
        Ok(bytes)
    }
}

/// Production connector: full connect/login/probe cycle per candidate
/// encoding, first success wins.
#[derive(Debug, Clone)]
pub struct FtpConnector {
    config: FtpConfig,
}

impl FtpConnector {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }

    /// The configuration this connector dials with.
    pub fn config(&self) -> &FtpConfig {
        &self.config
    }

    fn resolve_addr(&self) -> Result<SocketAddr, RemoteError> {
        let addrs: Vec<SocketAddr> = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| RemoteError::Connection(format!("resolving {}: {}", self.config.host, e)))?
            .collect();
        // IPv4 preferred; IPv6 passive mode is unreliable on the NAS.
        addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| {
                RemoteError::Connection(format!("no addresses for {}", self.config.host))
            })
    }

    fn try_connect(&self, encoding: TextEncoding) -> Result<FtpSession, RemoteError> {
        let addr = self.resolve_addr()?;
        let mut stream = FtpStream::connect_timeout(addr, self.config.connect_timeout)
            .map_err(|e| map_ftp_error(e, &self.config.host))?;
        stream
            .get_ref()
            .set_read_timeout(Some(self.config.session_timeout))?;
        stream
            .get_ref()
            .set_write_timeout(Some(self.config.session_timeout))?;
        stream
            .login(&self.config.user, &self.config.password)
            .map_err(|e| map_ftp_error(e, &self.config.host))?;
        stream.set_mode(Mode::Passive);
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| map_ftp_error(e, &self.config.host))?;
        // Probe: a session that cannot answer PWD is no use to anyone.
        stream.pwd().map_err(|e| map_ftp_error(e, &self.config.host))?;
        Ok(FtpSession { stream, encoding })
    }
}

impl Connector for FtpConnector {
    type Session = FtpSession;

    fn connect(&self) -> Result<FtpSession, ConnectionError> {
        let mut last: Option<RemoteError> = None;
        for &encoding in &self.config.encodings {
            match self.try_connect(encoding) {
                Ok(session) => {
                    debug!(%encoding, host = %self.config.host, "ftp session established");
                    return Ok(session);
                }
                Err(err) => {
                    // The half-open stream was dropped inside try_connect.
                    warn!(%encoding, %err, "encoding candidate failed");
                    last = Some(err);
                }
            }
        }
        Err(ConnectionError {
            last: last.unwrap_or_else(|| {
                RemoteError::Connection("no candidate encodings configured".to_string())
            }),
        })
    }
}

fn to_remote_entry(parsed: &ListLine) -> RemoteEntry {
    let kind = if parsed.is_file() {
        EntryKind::File
    } else if parsed.is_directory() {
        EntryKind::Directory
    } else {
        EntryKind::Other
    };
    RemoteEntry {
        name: parsed.name().to_string(),
        size: parsed.size() as u64,
        modified_at: Some(DateTime::<Utc>::from(parsed.modified())),
        kind,
    }
}

/// Collapse `suppaftp` failures into the engine's transport taxonomy.
/// FTP 550 becomes `NotFound`; socket errors keep their timeout/connection
/// distinction so retry policy can log them as connection-level.
fn map_ftp_error(err: FtpError, context: &str) -> RemoteError {
    match err {
        FtpError::UnexpectedResponse(ref response)
            if response.status == Status::FileUnavailable =>
        {
            RemoteError::NotFound(context.to_string())
        }
        FtpError::ConnectionError(io) => match io.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                RemoteError::Timeout(format!("{context}: {io}"))
            }
            _ => RemoteError::Connection(format!("{context}: {io}")),
        },
        other => RemoteError::Protocol(format!("{context}: {other}")),
    }
}
