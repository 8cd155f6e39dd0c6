// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Photosync: pulls clinic comparison photos from the office NAS into a
//! local cache.
//!
//! Staff search by a client's birthday month/day and name; the engine maps
//! the month to the NAS's birthday folder, lists the matching client
//! folder recursively, and downloads every image through a bounded worker
//! pool. Downloads are idempotent (complete local copies are skipped) and
//! resilient (each retry gets a brand-new FTP session).
//!
//! The pieces, bottom up:
//!
//! - [`ftp`]: the connection provider and recursive lister, behind the
//!   [`ftp::Connector`] / [`ftp::RemoteSession`] seams.
//! - [`download`]: the idempotent per-file fetch and the fresh-connection
//!   retry wrapper.
//! - [`sync`]: the orchestrator tying search keys, listing, the worker
//!   pool and the tally together.
//! - [`cache`]: local cache inspection for gallery-style consumers.

pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod ftp;
pub mod search;
pub mod sync;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{FtpConfig, SyncConfig};
pub use error::{DownloadError, ListError, RemoteError, SyncError};
pub use search::SearchKey;
pub use sync::{SyncReport, SyncTally, Syncer};
