// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Local cache inspection.
//!
//! Walks a search's cache directory and returns its images with a capture
//! timestamp, so callers can present them chronologically. The timestamp
//! comes from EXIF when the file carries one (`DateTimeOriginal`, then
//! `DateTimeDigitized`) and falls back to the filesystem mtime.

use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{In, Reader, Tag};
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::ftp::list::has_extension;

/// Extensions the cache walk accepts. Wider than the remote lister: files
/// placed in the cache by hand still show up in the gallery.
pub const CACHE_IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// One image found in a search's cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedImage {
    /// Path relative to the cache directory, forward-slash separated.
    pub name: String,
    /// Capture time, milliseconds since the Unix epoch.
    #[serde(rename = "takenAt")]
    pub taken_at_ms: i64,
}

/// List the images cached for one search, oldest first.
///
/// A missing directory is an empty result, not an error: "nothing synced
/// yet" and "nothing matched" look the same to the caller.
pub fn list_cached_images(cache_dir: &Path) -> std::io::Result<Vec<CachedImage>> {
    if !cache_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(cache_dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(%err, "skipping unreadable cache entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if !has_extension(&file_name, CACHE_IMAGE_EXTS) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(cache_dir)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        images.push(CachedImage {
            name: relative,
            taken_at_ms: taken_at(entry.path())?.timestamp_millis(),
        });
    }

    images.sort_by(|a, b| (a.taken_at_ms, &a.name).cmp(&(b.taken_at_ms, &b.name)));
    Ok(images)
}

/// Capture time for one image: EXIF first, filesystem mtime otherwise.
fn taken_at(path: &Path) -> std::io::Result<DateTime<Utc>> {
    if let Some(exif_time) = exif_timestamp(path) {
        return Ok(exif_time);
    }
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Read `DateTimeOriginal` (then `DateTimeDigitized`) from the file's EXIF
/// block. Any failure, including a file with no EXIF at all, is a `None`.
fn exif_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let file = std::fs::File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new().read_from_container(&mut reader).ok()?;

    for tag in [Tag::DateTimeOriginal, Tag::DateTimeDigitized] {
        if let Some(field) = exif.get_field(tag, In::PRIMARY) {
            if let Some(parsed) = parse_exif_datetime(&field.display_value().to_string()) {
                return Some(parsed.and_utc());
            }
        }
    }
    None
}

fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S").ok()
}
