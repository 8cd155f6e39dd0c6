// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Per-file download machinery: idempotent fetch plus the
//! fresh-connection retry wrapper.

pub mod fetch;
pub mod retry;
pub mod types;

pub use fetch::{fetch_file, inner_backoff, MIN_PLAUSIBLE_BYTES};
pub use retry::{fetch_with_fresh_connection, outer_backoff};
pub use types::{DownloadResult, FileHash};
