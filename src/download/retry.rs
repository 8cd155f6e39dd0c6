// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Outer retry loop with fresh connections.
//!
//! A stale or half-dead session must never poison a retry, so every
//! attempt acquires a brand-new session from the [`Connector`] and
//! releases it before the next attempt, whatever the outcome.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::DownloadError;
use crate::ftp::{Connector, RemoteSession};

use super::fetch::fetch_file;
use super::types::DownloadResult;

/// Base delay for the fresh-connection backoff (milliseconds).
const OUTER_BACKOFF_BASE_MS: u64 = 2000;

/// Ceiling for the fresh-connection backoff (milliseconds).
const OUTER_BACKOFF_MAX_MS: u64 = 10_000;

/// Exponential backoff between full connect-fetch-close cycles:
/// `min(2000 * 2^(attempt-1), 10000)` ms. No delay follows the final
/// attempt.
pub fn outer_backoff(attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    let millis = OUTER_BACKOFF_BASE_MS
        .saturating_mul(factor)
        .min(OUTER_BACKOFF_MAX_MS);
    Duration::from_millis(millis)
}

/// Download one file, giving each attempt an isolated session.
pub fn fetch_with_fresh_connection<C: Connector>(
    connector: &C,
    remote_path: &str,
    local_path: &Path,
    max_retries: u32,
) -> Result<DownloadResult, DownloadError> {
    let max_retries = max_retries.max(1);

    for attempt in 1..=max_retries {
        debug!(remote = remote_path, attempt, max_retries, "starting download cycle");
        let outcome = run_cycle(connector, remote_path, local_path, max_retries);
        match outcome {
            Ok(result) => return Ok(result),
            Err(err) => {
                warn!(remote = remote_path, attempt, %err, "download cycle failed");
                if attempt == max_retries {
                    return Err(DownloadError::RetriesExhausted {
                        remote: remote_path.to_string(),
                        attempts: max_retries,
                        source: Box::new(err),
                    });
                }
                std::thread::sleep(outer_backoff(attempt));
            }
        }
    }
    unreachable!("retry loop returns on the final attempt");
}

/// One full connect → fetch → close cycle. The session is released on
/// every exit path: explicitly on success, by drop on failure.
fn run_cycle<C: Connector>(
    connector: &C,
    remote_path: &str,
    local_path: &Path,
    max_retries: u32,
) -> Result<DownloadResult, DownloadError> {
    let mut session = connector.connect()?;
    let result = fetch_file(&mut session, remote_path, local_path, max_retries);
    session.close();
    result
}
