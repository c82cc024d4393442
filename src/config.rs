/// The config module provides the config spec and parsing logic.
///
/// We take special care to optimize the configuration experience: syncopate
/// provides detailed errors when an invalid configuration is detected, and
/// emits warnings when unrecognized keys are found.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::warn;

use crate::error::{Result, SyncExpectedError};

pub const DEFAULT_WATCH_INTERVAL_MINUTES: u64 = 10;
const MIN_WATCH_INTERVAL_MINUTES: u64 = 1;
const MAX_WATCH_INTERVAL_MINUTES: u64 = 1440;

/// What to do with files whose tracks were removed from the remote playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupPolicy {
    /// Surface the plan to the caller and await per-item decisions. Without a
    /// decider, nothing is deleted.
    #[default]
    Interactive,
    /// Delete without confirmation.
    AutoDelete,
    /// Transition entries to kept; never delete.
    Keep,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub download_folder: PathBuf,
    pub ledger_folder: PathBuf,
    pub playlists_file: PathBuf,
    pub cleanup_policy: CleanupPolicy,
    pub filter_results: bool,
    pub watch_interval_minutes: u64,
}

#[derive(Deserialize)]
struct RawConfig {
    download_folder: Option<String>,
    ledger_folder: Option<String>,
    playlists_file: Option<String>,
    cleanup_policy: Option<toml::Value>,
    filter_results: Option<bool>,
    watch_interval_minutes: Option<i64>,
    #[serde(flatten)]
    unrecognized: toml::map::Map<String, toml::Value>,
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).to_string())
}

impl Config {
    /// Default config file location: the platform config dir.
    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "syncopate").ok_or_else(|| {
            crate::error::SyncError::Generic("failed to get project directories".to_string())
        })?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    pub fn parse(config_path_override: Option<&Path>) -> Result<Config> {
        let path = match config_path_override {
            Some(p) => p.to_path_buf(),
            None => Config::default_config_path()?,
        };
        if !path.exists() {
            return Err(SyncExpectedError::ConfigNotFound { path }.into());
        }
        let contents = fs::read_to_string(&path)?;
        let raw: RawConfig = toml::from_str(&contents).map_err(|e| SyncExpectedError::ConfigDecode {
            path: path.clone(),
            message: e.to_string(),
        })?;

        for key in raw.unrecognized.keys() {
            warn!("unrecognized key in configuration file ({}): {}", path.display(), key);
        }

        let download_folder = raw
            .download_folder
            .as_deref()
            .map(expand_path)
            .ok_or_else(|| SyncExpectedError::MissingConfigKey {
                key: "download_folder".to_string(),
                path: path.clone(),
            })?;

        let ledger_folder = raw
            .ledger_folder
            .as_deref()
            .map(expand_path)
            .unwrap_or_else(|| download_folder.join("!ledgers"));

        let playlists_file = raw
            .playlists_file
            .as_deref()
            .map(expand_path)
            .unwrap_or_else(|| download_folder.join("playlists.txt"));

        let cleanup_policy = match raw.cleanup_policy {
            None => CleanupPolicy::default(),
            Some(v) => CleanupPolicy::deserialize(v).map_err(|_| SyncExpectedError::InvalidConfigValue {
                key: "cleanup_policy".to_string(),
                path: path.clone(),
                message: "must be one of: interactive, auto-delete, keep".to_string(),
            })?,
        };

        let watch_interval_minutes = match raw.watch_interval_minutes {
            None => DEFAULT_WATCH_INTERVAL_MINUTES,
            Some(m) if m < MIN_WATCH_INTERVAL_MINUTES as i64 || m > MAX_WATCH_INTERVAL_MINUTES as i64 => {
                return Err(SyncExpectedError::InvalidConfigValue {
                    key: "watch_interval_minutes".to_string(),
                    path,
                    message: format!(
                        "must be between {MIN_WATCH_INTERVAL_MINUTES} and {MAX_WATCH_INTERVAL_MINUTES}: got {m}"
                    ),
                }
                .into());
            }
            Some(m) => m as u64,
        };

        Ok(Config {
            download_folder,
            ledger_folder,
            playlists_file,
            cleanup_policy,
            filter_results: raw.filter_results.unwrap_or(true),
            watch_interval_minutes,
        })
    }
}

/// Read playlist IDs/URLs from the playlists file, one per line. Blank lines
/// and `#` comments are skipped.
pub fn read_playlist_refs(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(SyncExpectedError::FileNotFound { path: path.to_path_buf() }.into());
    }
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
