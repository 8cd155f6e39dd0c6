// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Recursive remote directory listing.
//!
//! Walks a remote folder depth-first up to a depth limit, keeping only
//! image files. Paths are absolute and forward-slash normalized, rooted at
//! the configured FTP root. Listing failures propagate; directories beyond
//! the depth limit are silently skipped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{ListError, RemoteError};
use crate::ftp::{EntryKind, RemoteSession};

/// Extensions the remote lister accepts. The local cache walk accepts a
/// wider set; see [`crate::cache`].
pub const REMOTE_IMAGE_EXTS: &[&str] = &["jpg", "png"];

/// Default recursion limit.
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Metadata for one image found on the remote server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteFile {
    /// File name within its directory.
    pub name: String,
    /// Absolute, forward-slash remote path.
    pub path: String,
    /// Size in bytes as reported by the listing.
    pub size: u64,
    /// Server-reported modification time, when available.
    pub modified_at: Option<DateTime<Utc>>,
    /// Directory depth relative to the listed folder (0 = directly inside).
    pub depth: u32,
}

/// Join a remote path segment onto a base, forward-slash normalized.
pub fn join_remote(base: &str, segment: &str) -> String {
    let base = base.trim_end_matches('/');
    let segment = segment.trim_start_matches('/');
    if base.is_empty() {
        format!("/{segment}")
    } else {
        format!("{base}/{segment}")
    }
}

/// Resolve `dir` to an absolute remote path under `root`, unless it is
/// already absolute.
pub fn resolve_remote_dir(root: &str, dir: &str) -> String {
    if dir.starts_with('/') {
        dir.to_string()
    } else {
        join_remote(&join_remote("", root), dir)
    }
}

/// True when `name` carries one of `exts` (case-insensitive).
pub fn has_extension(name: &str, exts: &[&str]) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => exts.iter().any(|e| ext.eq_ignore_ascii_case(e)),
        None => false,
    }
}

/// Recursively enumerate image files under `dir` (resolved under `root`).
///
/// Ordering follows server listing order per directory, depth-first; no
/// cross-directory sort is imposed here.
pub fn list_files<S: RemoteSession>(
    session: &mut S,
    root: &str,
    dir: &str,
    max_depth: u32,
) -> Result<Vec<RemoteFile>, ListError> {
    let abs = resolve_remote_dir(root, dir);
    let mut files = Vec::new();
    walk(session, &abs, 0, max_depth, &mut files)?;
    Ok(files)
}

fn walk<S: RemoteSession>(
    session: &mut S,
    dir: &str,
    depth: u32,
    max_depth: u32,
    out: &mut Vec<RemoteFile>,
) -> Result<(), ListError> {
    let entries = session.list_dir(dir).map_err(|e| to_list_error(dir, e))?;
    for entry in entries {
        match entry.kind {
            EntryKind::File if has_extension(&entry.name, REMOTE_IMAGE_EXTS) => {
                out.push(RemoteFile {
                    path: join_remote(dir, &entry.name),
                    name: entry.name,
                    size: entry.size,
                    modified_at: entry.modified_at,
                    depth,
                });
            }
            EntryKind::Directory if depth < max_depth => {
                let sub = join_remote(dir, &entry.name);
                walk(session, &sub, depth + 1, max_depth, out)?;
            }
            EntryKind::Directory => {
                debug!(%dir, name = %entry.name, depth, "skipping directory beyond depth limit");
            }
            _ => {}
        }
    }
    Ok(())
}

fn to_list_error(path: &str, source: RemoteError) -> ListError {
    if source.is_not_found() {
        ListError::NotFound { path: path.to_string() }
    } else {
        ListError::Remote { path: path.to_string(), source }
    }
}
