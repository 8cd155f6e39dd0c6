// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Error taxonomy for the sync engine.
//!
//! Per-file failures (`DownloadError`) are caught at the worker boundary
//! and become a tally increment; folder-level failures (`SyncError`)
//! propagate to the caller. `ListError::NotFound` stays distinguishable so
//! callers can tell "target not found" from "transient failure, retry
//! later".

use thiserror::Error;

/// Transport-level failure talking to the remote file server.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server rejected the path (FTP 550).
    #[error("remote path not found: {0}")]
    NotFound(String),

    /// The control or data connection failed or was closed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A network operation exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The server answered with something we could not handle.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local filesystem failure while staging a transfer.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    /// True for FTP 550-class "no such file or directory" rejections.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }

    /// True when the session itself is suspect and must not be reused.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            RemoteError::Connection(_) | RemoteError::Timeout(_) | RemoteError::Io(_)
        )
    }
}

/// No candidate encoding produced an authenticated session.
///
/// Carries the last underlying error; fatal for the whole sync.
#[derive(Debug, Error)]
#[error("unable to establish an FTP session with any candidate encoding; last error: {last}")]
pub struct ConnectionError {
    /// The failure from the final candidate tried.
    pub last: RemoteError,
}

/// A remote directory could not be enumerated.
#[derive(Debug, Error)]
pub enum ListError {
    /// The directory does not exist on the server.
    #[error("remote directory not found: {path}")]
    NotFound { path: String },

    /// Any other listing failure.
    #[error("failed to list {path}")]
    Remote {
        path: String,
        #[source]
        source: RemoteError,
    },
}

impl ListError {
    /// True when the target folder simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ListError::NotFound { .. })
    }
}

/// A single file exhausted its retries (or an individual attempt failed).
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The transfer completed but produced a missing or zero-byte file.
    /// Treated as transient; retried like any other cause.
    #[error("downloaded file is missing or empty: {remote}")]
    EmptyTransfer { remote: String },

    /// All allowed attempts failed; wraps the last underlying cause.
    #[error("download of {remote} failed after {attempts} attempts")]
    RetriesExhausted {
        remote: String,
        attempts: u32,
        #[source]
        source: Box<DownloadError>,
    },

    /// Transport failure during a transfer attempt.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A fresh session could not be acquired for the attempt.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Local filesystem failure (temp file, rename, parent dir).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// True when the cause indicates a dead or hung session. The fetcher
    /// logs these specially; reconnection belongs to the retry wrapper.
    pub fn is_connection(&self) -> bool {
        match self {
            DownloadError::Remote(e) => e.is_connection(),
            DownloadError::Connection(_) => true,
            DownloadError::RetriesExhausted { source, .. } => source.is_connection(),
            _ => false,
        }
    }
}

/// Folder-level failure: the sync as a whole could not run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Could not authenticate at all.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Could not enumerate the target folder (after any alias fallback).
    #[error(transparent)]
    List(#[from] ListError),

    /// Month/day/name parameters failed validation.
    #[error("invalid search parameters: {0}")]
    InvalidRequest(String),

    /// No remote top-level folder is configured for this month.
    #[error("no folder mapping for month {0}")]
    UnmappedMonth(String),

    /// A worker task was lost (panic or runtime shutdown).
    #[error("sync worker failed: {0}")]
    Worker(String),

    /// Local cache directory could not be prepared.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// True when the target folder was not found on the server, which the
    /// caller should surface as a user-actionable condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::List(e) if e.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_classifiers() {
        assert!(RemoteError::NotFound("/x".into()).is_not_found());
        assert!(!RemoteError::NotFound("/x".into()).is_connection());
        assert!(RemoteError::Connection("closed".into()).is_connection());
        assert!(RemoteError::Timeout("60s".into()).is_connection());
        assert!(!RemoteError::Protocol("garbled".into()).is_connection());
    }

    #[test]
    fn list_error_not_found() {
        let err = ListError::NotFound { path: "/a/b".into() };
        assert!(err.is_not_found());
        let err = ListError::Remote {
            path: "/a/b".into(),
            source: RemoteError::Protocol("bad line".into()),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn sync_error_surfaces_not_found() {
        let err = SyncError::List(ListError::NotFound { path: "/a".into() });
        assert!(err.is_not_found());
        let err = SyncError::UnmappedMonth("13".into());
        assert!(!err.is_not_found());
    }

    #[test]
    fn download_error_connection_classifier_recurses() {
        let inner = DownloadError::Remote(RemoteError::Connection("reset".into()));
        let err = DownloadError::RetriesExhausted {
            remote: "/a.jpg".into(),
            attempts: 3,
            source: Box::new(inner),
        };
        assert!(err.is_connection());
        assert!(!DownloadError::EmptyTransfer { remote: "/a.jpg".into() }.is_connection());
    }
}
