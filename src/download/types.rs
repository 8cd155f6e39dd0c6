// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Download result types.

use serde::{Serialize, Serializer};

/// Content hash slot of a [`DownloadResult`].
///
/// A hash is computed at most once per distinct local file: only on the
/// first attempt that actually performs a transfer. Serializes to
/// `"existing"`, `"skipped"`, or the hex digest, matching the JSON the
/// gallery consumers expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileHash {
    /// A valid local copy was already present; no transfer happened.
    Existing,
    /// The transfer that stuck happened on a retry, so no hash was taken.
    Skipped,
    /// MD5 of the bytes staged on the first transfer attempt.
    Md5(String),
}

impl Serialize for FileHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FileHash::Existing => serializer.serialize_str("existing"),
            FileHash::Skipped => serializer.serialize_str("skipped"),
            FileHash::Md5(hex) => serializer.serialize_str(hex),
        }
    }
}

/// Outcome of one idempotent fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadResult {
    /// True when bytes actually moved over the network.
    pub downloaded: bool,
    /// See [`FileHash`].
    pub hash: FileHash,
}

impl DownloadResult {
    /// A skip because a complete local copy already exists.
    pub fn existing() -> Self {
        Self { downloaded: false, hash: FileHash::Existing }
    }
}
