// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Scripted in-memory remote server for tests.
//!
//! `FakeRemote` holds the shared state; `FakeSession` / `FakeConnector`
//! plug into the [`RemoteSession`] / [`Connector`] seams so the fetcher,
//! retry wrapper and orchestrator run without a live FTP server. Failures
//! are scripted per path or per connect attempt.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{ConnectionError, RemoteError};
use crate::ftp::{Connector, EntryKind, RemoteEntry, RemoteSession};

#[derive(Default)]
struct State {
    dirs: HashMap<String, Vec<RemoteEntry>>,
    files: HashMap<String, Vec<u8>>,
    list_failures: HashMap<String, String>,
    download_failures: HashMap<String, u32>,
    empty_downloads: HashSet<String>,
    connect_failures: u32,
    download_calls: u32,
    connect_calls: u32,
}

/// Shared scripted remote; clone-cheap handle.
#[derive(Clone, Default)]
pub struct FakeRemote {
    state: Arc<Mutex<State>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a listable directory and announce it in its parent.
    pub fn add_dir(&self, path: &str) {
        let mut state = self.lock();
        state.dirs.entry(path.to_string()).or_default();
        if let Some((parent, name)) = path.rsplit_once('/') {
            if !parent.is_empty() {
                let entry = RemoteEntry {
                    name: name.to_string(),
                    size: 0,
                    modified_at: Some(default_mtime()),
                    kind: EntryKind::Directory,
                };
                state.dirs.entry(parent.to_string()).or_default().push(entry);
            }
        }
    }

    /// Register a file with content and a fixed modification time.
    pub fn add_file_with_mtime(&self, path: &str, bytes: Vec<u8>, mtime: DateTime<Utc>) {
        let mut state = self.lock();
        if let Some((parent, name)) = path.rsplit_once('/') {
            let entry = RemoteEntry {
                name: name.to_string(),
                size: bytes.len() as u64,
                modified_at: Some(mtime),
                kind: EntryKind::File,
            };
            state.dirs.entry(parent.to_string()).or_default().push(entry);
        }
        state.files.insert(path.to_string(), bytes);
    }

    pub fn add_file(&self, path: &str, bytes: Vec<u8>) {
        self.add_file_with_mtime(path, bytes, default_mtime());
    }

    /// Same as `add_file`; named for readability in lister tests.
    pub fn add_text_file(&self, path: &str, bytes: &[u8]) {
        self.add_file(path, bytes.to_vec());
    }

    /// Make listing `path` fail with a connection-class error.
    pub fn fail_listing(&self, path: &str, message: &str) {
        self.lock().list_failures.insert(path.to_string(), message.to_string());
    }

    /// Make the next `times` downloads of `path` fail.
    pub fn fail_download(&self, path: &str, times: u32) {
        self.lock().download_failures.insert(path.to_string(), times);
    }

    /// Make every download of `path` fail.
    pub fn fail_download_always(&self, path: &str) {
        self.fail_download(path, u32::MAX);
    }

    /// Make downloads of `path` produce a zero-byte file.
    pub fn make_empty(&self, path: &str) {
        self.lock().empty_downloads.insert(path.to_string());
    }

    /// Make the next `times` connect attempts fail.
    pub fn fail_connects(&self, times: u32) {
        self.lock().connect_failures = times;
    }

    /// Number of transfer attempts that reached the fake server.
    pub fn download_calls(&self) -> u32 {
        self.lock().download_calls
    }

    /// Number of sessions handed out (or refused).
    pub fn connect_calls(&self) -> u32 {
        self.lock().connect_calls
    }

    pub fn session(&self) -> FakeSession {
        FakeSession { remote: self.clone() }
    }

    pub fn connector(&self) -> FakeConnector {
        FakeConnector { remote: self.clone() }
    }
}

fn default_mtime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 5, 12, 0, 0).unwrap()
}

/// Session over the scripted remote.
pub struct FakeSession {
    remote: FakeRemote,
}

impl RemoteSession for FakeSession {
    fn list_dir(&mut self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let state = self.remote.lock();
        if let Some(message) = state.list_failures.get(path) {
            return Err(RemoteError::Connection(message.clone()));
        }
        match state.dirs.get(path) {
            Some(entries) => Ok(entries.clone()),
            None => Err(RemoteError::NotFound(path.to_string())),
        }
    }

    fn download_to(&mut self, remote_path: &str, local_path: &Path) -> Result<u64, RemoteError> {
        let bytes = {
            let mut state = self.remote.lock();
            state.download_calls += 1;
            if let Some(remaining) = state.download_failures.get_mut(remote_path) {
                if *remaining > 0 {
                    *remaining = remaining.saturating_sub(1);
                    return Err(RemoteError::Connection(format!(
                        "connection closed during {remote_path}"
                    )));
                }
            }
            if state.empty_downloads.contains(remote_path) {
                Vec::new()
            } else {
                match state.files.get(remote_path) {
                    Some(bytes) => bytes.clone(),
                    None => return Err(RemoteError::NotFound(remote_path.to_string())),
                }
            }
        };
        std::fs::write(local_path, &bytes)?;
        Ok(bytes.len() as u64)
    }
}

/// Connector over the scripted remote.
#[derive(Clone)]
pub struct FakeConnector {
    remote: FakeRemote,
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    fn connect(&self) -> Result<FakeSession, ConnectionError> {
        let mut state = self.remote.lock();
        state.connect_calls += 1;
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(ConnectionError {
                last: RemoteError::Connection("login refused".to_string()),
            });
        }
        drop(state);
        Ok(self.remote.session())
    }
}
