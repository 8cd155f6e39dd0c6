// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Configuration for the sync engine.
//!
//! Everything the engine needs arrives through explicit structs; nothing
//! reads process-wide state behind the caller's back. `from_env()` is a
//! convenience for the binary, not a hidden default.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::ftp::TextEncoding;

/// Default FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Timeout for establishing the control connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle timeout guarding a hung transfer on an established session.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of concurrent download workers.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default retry budget, used by both the per-file fetch loop and the
/// fresh-connection outer loop.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Connection settings for the clinic NAS.
#[derive(Debug, Clone)]
pub struct FtpConfig {
    /// Server hostname or address.
    pub host: String,
    /// Control port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Root folder every relative remote path is resolved under.
    pub root_path: String,
    /// Candidate text encodings, tried in order until one session succeeds.
    pub encodings: Vec<TextEncoding>,
    /// Timeout for connect and passive-mode negotiation.
    pub connect_timeout: Duration,
    /// Read/write timeout on an established session.
    pub session_timeout: Duration,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: "192.168.68.105".to_string(),
            port: DEFAULT_FTP_PORT,
            user: String::new(),
            password: String::new(),
            root_path: "緻妍外科診所/顧客比對圖".to_string(),
            encodings: TextEncoding::default_order().to_vec(),
            connect_timeout: CONNECT_TIMEOUT,
            session_timeout: SESSION_TIMEOUT,
        }
    }
}

impl FtpConfig {
    /// Read connection settings from `FTP_HOST`, `FTP_PORT`, `FTP_USER`,
    /// `FTP_PASSWORD` and `FTP_ROOT_PATH`, falling back to defaults for
    /// anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("FTP_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("FTP_PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        if let Ok(user) = std::env::var("FTP_USER") {
            config.user = user;
        }
        if let Ok(password) = std::env::var("FTP_PASSWORD") {
            config.password = password;
        }
        if let Ok(root) = std::env::var("FTP_ROOT_PATH") {
            config.root_path = root;
        }
        config
    }

    /// Set the login credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }
}

/// A single name substitution tried when a name-based folder lookup fails
/// with "not found". Applied at most once per search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAlias {
    /// Substring of the requested name that is commonly mistyped.
    pub from: String,
    /// Replacement substring to try instead.
    pub to: String,
}

impl NameAlias {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

/// Settings for a whole sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote server settings.
    pub ftp: FtpConfig,
    /// Local cache root; each search gets a subdirectory named after its
    /// search id.
    pub cache_root: PathBuf,
    /// Number of concurrent download workers.
    pub concurrency: usize,
    /// Retry budget for the fetch loop and the fresh-connection loop.
    pub max_retries: u32,
    /// Two-digit month string to top-level remote folder name.
    pub month_folders: HashMap<String, String>,
    /// Homophone substitutions tried after a not-found folder lookup.
    pub name_aliases: Vec<NameAlias>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ftp: FtpConfig::default(),
            cache_root: PathBuf::from("cache"),
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            month_folders: default_month_folders(),
            name_aliases: vec![NameAlias::new("叔華", "淑華")],
        }
    }
}

impl SyncConfig {
    /// Build a config with FTP settings from the environment and defaults
    /// for everything else.
    pub fn from_env() -> Self {
        Self { ftp: FtpConfig::from_env(), ..Self::default() }
    }

    /// Override the cache root.
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = root.into();
        self
    }

    /// Override the worker count. Zero is clamped to one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Look up the remote top-level folder for a zero-padded month string.
    pub fn month_folder(&self, month: &str) -> Option<&str> {
        self.month_folders.get(month).map(String::as_str)
    }
}

/// The clinic NAS groups client folders by birthday, two months per
/// top-level folder.
fn default_month_folders() -> HashMap<String, String> {
    let pairs = [
        ("01", "生日1-2月"),
        ("02", "生日1-2月"),
        ("03", "生日3-4月"),
        ("04", "生日3-4月"),
        ("05", "生日5-6月"),
        ("06", "生日5-6月"),
        ("07", "生日7-8月"),
        ("08", "生日7-8月"),
        ("09", "生日9-10月"),
        ("10", "生日9-10月"),
        ("11", "生日11-12月"),
        ("12", "生日11-12月"),
    ];
    pairs
        .iter()
        .map(|(month, folder)| (month.to_string(), folder.to_string()))
        .collect()
}
