// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Sync orchestrator.
//!
//! Lists a target remote folder with one session, then drains a shared
//! work queue across a bounded pool of blocking workers. Each worker pops
//! one file at a time and downloads it through the fresh-connection retry
//! wrapper; a single file's permanent failure becomes a tally increment,
//! never an aborted batch. Only folder-level failures (cannot
//! authenticate, cannot list) surface as errors.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::download::fetch_with_fresh_connection;
use crate::error::SyncError;
use crate::ftp::list::{join_remote, list_files, resolve_remote_dir, RemoteFile, DEFAULT_MAX_DEPTH};
use crate::ftp::{Connector, FtpConnector, RemoteSession};
use crate::search::{apply_alias, SearchKey};

/// Aggregate counters for one sync run. Order-independent by
/// construction; `downloaded + skipped + errors == total` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncTally {
    pub total: u64,
    pub downloaded: u64,
    pub skipped: u64,
    pub errors: u64,
}

/// Everything a caller needs to answer a search request: the id naming
/// the cache subdirectory, the listed files (sorted by modification
/// time), and the tally.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    #[serde(rename = "searchId")]
    pub search_id: String,
    pub files: Vec<RemoteFile>,
    #[serde(flatten)]
    pub tally: SyncTally,
}

/// One unit of worker work: a remote path and where it lands locally.
#[derive(Debug, Clone)]
struct Job {
    remote: String,
    local: PathBuf,
}

#[derive(Default)]
struct Counters {
    downloaded: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
}

/// The sync engine entry point.
pub struct Syncer<C: Connector> {
    connector: Arc<C>,
    config: SyncConfig,
}

impl Syncer<FtpConnector> {
    /// Production syncer dialing the configured FTP server.
    pub fn new(config: SyncConfig) -> Self {
        let connector = FtpConnector::new(config.ftp.clone());
        Self::with_connector(config, connector)
    }
}

impl<C: Connector + 'static> Syncer<C> {
    /// Syncer over an arbitrary connector; the test seam.
    pub fn with_connector(config: SyncConfig, connector: C) -> Self {
        Self { connector: Arc::new(connector), config }
    }

    /// The configuration this syncer runs with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync the photos for one month/day/name search.
    ///
    /// The search id (and thus the cache subdirectory) always reflects the
    /// requested name, even when a configured alias corrected the remote
    /// folder lookup.
    pub async fn sync_search(&self, key: &SearchKey) -> Result<SyncReport, SyncError> {
        let month_folder = self
            .config
            .month_folder(&key.month)
            .ok_or_else(|| SyncError::UnmappedMonth(key.month.clone()))?
            .to_string();

        let cache_dir = self.config.cache_root.join(key.search_id());
        std::fs::create_dir_all(&cache_dir)?;

        let connector = self.connector.clone();
        let root = self.config.ftp.root_path.clone();
        let aliases = self.config.name_aliases.clone();
        let key = key.clone();
        let search_id = key.search_id();

        let (mut files, target_abs) = tokio::task::spawn_blocking(move || {
            list_with_alias_fallback(connector.as_ref(), &root, &month_folder, &key, &aliases)
        })
        .await
        .map_err(|e| SyncError::Worker(e.to_string()))??;

        // Oldest first, so galleries read chronologically.
        files.sort_by(|a, b| a.modified_at.cmp(&b.modified_at));

        let tally = self.download_all(&files, &target_abs, &cache_dir).await?;
        info!(
            search_id,
            total = tally.total,
            downloaded = tally.downloaded,
            skipped = tally.skipped,
            errors = tally.errors,
            "sync finished"
        );
        Ok(SyncReport { search_id, files, tally })
    }

    /// Sync an explicit remote folder into an explicit cache directory.
    ///
    /// Lower-level sibling of [`Syncer::sync_search`]: no month mapping,
    /// no alias fallback.
    pub async fn sync_folder(
        &self,
        remote_dir: &str,
        cache_dir: &Path,
    ) -> Result<(Vec<RemoteFile>, SyncTally), SyncError> {
        std::fs::create_dir_all(cache_dir)?;

        let connector = self.connector.clone();
        let root = self.config.ftp.root_path.clone();
        let dir = remote_dir.to_string();

        let (mut files, target_abs) = tokio::task::spawn_blocking(move || {
            let mut session = connector.connect()?;
            let result = list_files(&mut session, &root, &dir, DEFAULT_MAX_DEPTH);
            session.close();
            let files = result.map_err(SyncError::List)?;
            Ok::<_, SyncError>((files, resolve_remote_dir(&root, &dir)))
        })
        .await
        .map_err(|e| SyncError::Worker(e.to_string()))??;

        files.sort_by(|a, b| a.modified_at.cmp(&b.modified_at));

        let tally = self.download_all(&files, &target_abs, cache_dir).await?;
        Ok((files, tally))
    }

    /// Drain the worklist across the bounded worker pool.
    async fn download_all(
        &self,
        files: &[RemoteFile],
        target_abs: &str,
        cache_dir: &Path,
    ) -> Result<SyncTally, SyncError> {
        let jobs: VecDeque<Job> = files
            .iter()
            .map(|file| Job {
                remote: file.path.clone(),
                local: local_path_for(cache_dir, target_abs, file),
            })
            .collect();
        let total = jobs.len() as u64;

        let queue = Arc::new(Mutex::new(jobs));
        let counters = Arc::new(Counters::default());
        let workers = self.config.concurrency.max(1);
        let max_retries = self.config.max_retries;

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let queue = queue.clone();
            let counters = counters.clone();
            let connector = self.connector.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                worker_loop(worker, connector, queue, counters, max_retries)
            }));
        }
        for handle in handles {
            handle.await.map_err(|e| SyncError::Worker(e.to_string()))?;
        }

        Ok(SyncTally {
            total,
            downloaded: counters.downloaded.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
            errors: counters.errors.load(Ordering::Relaxed),
        })
    }
}

/// Worker body: pop, download, tally, repeat until the queue is empty.
/// The queue lock is held only for the pop, never across a network call.
fn worker_loop<C: Connector>(
    worker: usize,
    connector: Arc<C>,
    queue: Arc<Mutex<VecDeque<Job>>>,
    counters: Arc<Counters>,
    max_retries: u32,
) {
    loop {
        let job = resilient_lock(&queue).pop_front();
        let Some(job) = job else { break };

        match fetch_with_fresh_connection(connector.as_ref(), &job.remote, &job.local, max_retries)
        {
            Ok(result) if result.downloaded => {
                counters.downloaded.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                warn!(worker, remote = %job.remote, %err, "file failed permanently");
                counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// List the search's remote folder, retrying once with an alias-corrected
/// name after a not-found rejection. On a double miss the original error
/// is the one reported. Listing and downloading never share a session.
fn list_with_alias_fallback<C: Connector>(
    connector: &C,
    root: &str,
    month_folder: &str,
    key: &SearchKey,
    aliases: &[crate::config::NameAlias],
) -> Result<(Vec<RemoteFile>, String), SyncError> {
    let mut session = connector.connect()?;

    let target_rel = join_remote(month_folder, &key.folder_name());
    let listed = match list_files(&mut session, root, &target_rel, DEFAULT_MAX_DEPTH) {
        Ok(files) => Ok((files, resolve_remote_dir(root, &target_rel))),
        Err(err) if err.is_not_found() => match apply_alias(&key.name, aliases) {
            Some(corrected) => {
                let alt_key = key.with_name(corrected.clone());
                let alt_rel = join_remote(month_folder, &alt_key.folder_name());
                info!(requested = %key.name, %corrected, "folder not found, retrying with alias");
                match list_files(&mut session, root, &alt_rel, DEFAULT_MAX_DEPTH) {
                    Ok(files) => Ok((files, resolve_remote_dir(root, &alt_rel))),
                    // The corrected lookup failed too; report the original.
                    Err(_) => Err(SyncError::List(err)),
                }
            }
            None => Err(SyncError::List(err)),
        },
        Err(err) => Err(SyncError::List(err)),
    };

    session.close();
    listed
}

/// Local destination: the cache directory plus the file's path relative
/// to the listed folder, so remote subfolders survive in the cache.
fn local_path_for(cache_dir: &Path, target_abs: &str, file: &RemoteFile) -> PathBuf {
    let prefix = format!("{}/", target_abs.trim_end_matches('/'));
    let relative = file.path.strip_prefix(&prefix).unwrap_or(&file.name);
    let mut local = cache_dir.to_path_buf();
    for segment in relative.split('/').filter(|s| !s.is_empty()) {
        local.push(segment);
    }
    local
}

fn resilient_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!("work queue mutex poisoned; recovering. A worker panicked while popping.");
            poisoned.into_inner()
        }
    }
}
