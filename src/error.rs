use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync error: {0}")]
    Generic(String),
    #[error(transparent)]
    Expected(#[from] SyncExpectedError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that stem from expected situations: a bad config file, a playlist
/// that does not exist remotely, the catalog refusing our credentials. They
/// abort the current pass but are not bugs.
#[derive(Error, Debug)]
pub enum SyncExpectedError {
    #[error("{0}")]
    Generic(String),
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },
    #[error("Failed to decode configuration file ({path}): {message}")]
    ConfigDecode { path: PathBuf, message: String },
    #[error("Missing key {key} in configuration file ({path})")]
    MissingConfigKey { key: String, path: PathBuf },
    #[error("Invalid value for {key} in configuration file ({path}): {message}")]
    InvalidConfigValue { key: String, path: PathBuf, message: String },
    #[error("Remote catalog authentication failed: {message}")]
    Auth { message: String },
    #[error("Playlist does not exist in remote catalog: {playlist}")]
    PlaylistNotFound { playlist: String },
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },
    #[error("Download folder is unreadable: {path}: {message}")]
    UnreadableFolder { path: PathBuf, message: String },
}

impl SyncExpectedError {
    /// Whether the error should abort the whole reconciliation pass for the
    /// playlist, as opposed to being absorbed into the cleanup report.
    pub fn aborts_pass(&self) -> bool {
        matches!(self, SyncExpectedError::Auth { .. } | SyncExpectedError::PlaylistNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
