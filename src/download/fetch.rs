// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Idempotent single-file download.
//!
//! Fast-skips files that already exist locally with a plausible size,
//! stages transfers through a `.tmp` sibling, renames atomically, and
//! retries within the current session. Reconnection is deliberately not
//! done here — this component does not own session creation; the outer
//! retry wrapper provides fresh connections.

use std::path::{Path, PathBuf};
use std::time::Duration;

use md5::{Digest, Md5};
use tracing::{debug, warn};

use crate::error::DownloadError;
use crate::ftp::RemoteSession;

use super::types::{DownloadResult, FileHash};

/// Smallest size a cached photo can plausibly have. Anything at or below
/// this is treated as a truncated artifact and re-fetched.
pub const MIN_PLAUSIBLE_BYTES: u64 = 1024;

/// Delay before retrying a failed attempt within the same session:
/// `1000ms * min(attempt, 3)`.
pub fn inner_backoff(attempt: u32) -> Duration {
    Duration::from_millis(1000 * u64::from(attempt.min(3)))
}

/// Download `remote_path` to `local_path` through an existing session.
///
/// Returns `{downloaded:false, hash:"existing"}` without touching the
/// network when a complete local copy is already present. Otherwise tries
/// up to `max_retries` attempts; the hash is computed only on attempt 1.
pub fn fetch_file<S: RemoteSession>(
    session: &mut S,
    remote_path: &str,
    local_path: &Path,
    max_retries: u32,
) -> Result<DownloadResult, DownloadError> {
    if is_complete(local_path) {
        debug!(local = %local_path.display(), "local copy present, skipping download");
        return Ok(DownloadResult::existing());
    }

    let temp_path = temp_path_for(local_path);
    let max_retries = max_retries.max(1);

    for attempt in 1..=max_retries {
        match fetch_attempt(session, remote_path, local_path, &temp_path, attempt) {
            Ok(result) => return Ok(result),
            Err(err) => {
                let _ = std::fs::remove_file(&temp_path);
                if err.is_connection() {
                    warn!(
                        remote = remote_path,
                        attempt,
                        %err,
                        "connection-level failure; a fresh session is required to continue"
                    );
                } else {
                    warn!(remote = remote_path, attempt, %err, "download attempt failed");
                }
                if attempt == max_retries {
                    return Err(DownloadError::RetriesExhausted {
                        remote: remote_path.to_string(),
                        attempts: max_retries,
                        source: Box::new(err),
                    });
                }
                std::thread::sleep(inner_backoff(attempt));
            }
        }
    }
    unreachable!("retry loop returns on the final attempt");
}

fn fetch_attempt<S: RemoteSession>(
    session: &mut S,
    remote_path: &str,
    local_path: &Path,
    temp_path: &Path,
    attempt: u32,
) -> Result<DownloadResult, DownloadError> {
    if let Some(parent) = local_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if temp_path.exists() {
        std::fs::remove_file(temp_path)?;
    }

    session.download_to(remote_path, temp_path)?;

    let size = std::fs::metadata(temp_path).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(DownloadError::EmptyTransfer { remote: remote_path.to_string() });
    }

    // One hash per distinct local file, taken from the first transfer only.
    let hash = if attempt == 1 {
        let bytes = std::fs::read(temp_path)?;
        FileHash::Md5(hex::encode(Md5::digest(&bytes)))
    } else {
        FileHash::Skipped
    };

    std::fs::rename(temp_path, local_path)?;
    debug!(remote = remote_path, local = %local_path.display(), size, "download complete");
    Ok(DownloadResult { downloaded: true, hash })
}

/// Completeness signal: the file exists and is larger than the plausible
/// minimum. The cache keeps no manifest; the filesystem is the state.
fn is_complete(local_path: &Path) -> bool {
    std::fs::metadata(local_path)
        .map(|m| m.is_file() && m.len() > MIN_PLAUSIBLE_BYTES)
        .unwrap_or(false)
}

fn temp_path_for(local_path: &Path) -> PathBuf {
    let mut os = local_path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRemote;

    fn md5_hex(bytes: &[u8]) -> String {
        hex::encode(Md5::digest(bytes))
    }

    #[test]
    fn inner_backoff_caps_at_three_seconds() {
        assert_eq!(inner_backoff(1), Duration::from_millis(1000));
        assert_eq!(inner_backoff(2), Duration::from_millis(2000));
        assert_eq!(inner_backoff(3), Duration::from_millis(3000));
        assert_eq!(inner_backoff(7), Duration::from_millis(3000));
    }

    #[test]
    fn existing_large_file_skips_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.jpg");
        std::fs::write(&local, vec![9u8; 2000]).unwrap();

        let remote = FakeRemote::new();
        remote.add_file("/r/a.jpg", vec![1u8; 2000]);
        let mut session = remote.session();

        let result = fetch_file(&mut session, "/r/a.jpg", &local, 3).unwrap();
        assert_eq!(result, DownloadResult::existing());
        assert_eq!(remote.download_calls(), 0);
        // Local bytes untouched.
        assert_eq!(std::fs::read(&local).unwrap(), vec![9u8; 2000]);
    }

    #[test]
    fn small_existing_file_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.jpg");
        std::fs::write(&local, vec![9u8; 100]).unwrap();

        let remote = FakeRemote::new();
        remote.add_file("/r/a.jpg", vec![1u8; 2000]);
        let mut session = remote.session();

        let result = fetch_file(&mut session, "/r/a.jpg", &local, 3).unwrap();
        assert!(result.downloaded);
        assert_eq!(remote.download_calls(), 1);
        assert_eq!(std::fs::read(&local).unwrap(), vec![1u8; 2000]);
    }

    #[test]
    fn first_attempt_hash_matches_final_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("nested").join("a.jpg");
        let content = b"comparison photo bytes".repeat(100);

        let remote = FakeRemote::new();
        remote.add_file("/r/a.jpg", content.clone());
        let mut session = remote.session();

        let result = fetch_file(&mut session, "/r/a.jpg", &local, 3).unwrap();
        assert!(result.downloaded);
        assert_eq!(result.hash, FileHash::Md5(md5_hex(&std::fs::read(&local).unwrap())));
        assert!(!local.with_extension("jpg.tmp").exists());
    }

    #[test]
    fn retried_transfer_skips_hashing() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.jpg");
        let content = vec![7u8; 4096];

        let remote = FakeRemote::new();
        remote.add_file("/r/a.jpg", content.clone());
        remote.fail_download("/r/a.jpg", 1);
        let mut session = remote.session();

        let result = fetch_file(&mut session, "/r/a.jpg", &local, 3).unwrap();
        assert!(result.downloaded);
        assert_eq!(result.hash, FileHash::Skipped);
        assert_eq!(std::fs::read(&local).unwrap(), content);
        assert_eq!(remote.download_calls(), 2);
    }

    #[test]
    fn empty_transfer_retries_then_exhausts_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.jpg");

        let remote = FakeRemote::new();
        remote.add_file("/r/a.jpg", vec![1u8; 2000]);
        remote.make_empty("/r/a.jpg");
        let mut session = remote.session();

        let err = fetch_file(&mut session, "/r/a.jpg", &local, 2).unwrap_err();
        match err {
            DownloadError::RetriesExhausted { attempts, source, .. } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, DownloadError::EmptyTransfer { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(remote.download_calls(), 2);
        // Directory must be clean: no temp file, no destination file.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "leftovers: {leftovers:?}");
    }

    #[test]
    fn permanent_failure_reports_attempt_count() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.jpg");

        let remote = FakeRemote::new();
        remote.add_file("/r/a.jpg", vec![1u8; 2000]);
        remote.fail_download_always("/r/a.jpg");
        let mut session = remote.session();

        let err = fetch_file(&mut session, "/r/a.jpg", &local, 3).unwrap_err();
        assert!(matches!(err, DownloadError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(remote.download_calls(), 3);
        assert!(!local.exists());
    }
}
