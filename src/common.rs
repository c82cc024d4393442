/// The common module holds the few cross-cutting helpers every other module
/// leans on: the ledger timestamp format and the logging bootstrap.

use std::fs;
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, Local};
use directories::ProjectDirs;
use tracing_subscriber::{fmt, EnvFilter};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::error::{Result, SyncError};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Current local time in the format stored in ledger files.
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a ledger timestamp back into an instant. Returns None for anything
/// hand-edited into an unparseable shape.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

static LOGGING_INITIALIZED: Mutex<bool> = Mutex::new(false);

pub fn initialize_logging(output: &str) -> Result<()> {
    let mut initialized = LOGGING_INITIALIZED.lock().unwrap();
    if *initialized {
        return Ok(());
    }
    *initialized = true;
    drop(initialized);

    let proj_dirs = ProjectDirs::from("", "", "syncopate")
        .ok_or_else(|| SyncError::Generic("failed to get project directories".to_string()))?;
    let log_dir = if cfg!(target_os = "macos") {
        proj_dirs.cache_dir()
    } else {
        proj_dirs.state_dir().unwrap_or(proj_dirs.cache_dir())
    };

    let log_despite_testing = std::env::var("LOG_TEST").is_ok();
    let is_testing = std::env::var("CARGO_TEST").is_ok();
    if is_testing && !log_despite_testing {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if output == "stderr" {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(!log_despite_testing)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| SyncError::Generic(format!("failed to set subscriber: {e}")))?;
    } else if output == "file" {
        fs::create_dir_all(log_dir)?;
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .max_log_files(10)
            .filename_prefix("syncopate")
            .filename_suffix("log")
            .build(log_dir)
            .map_err(|e| SyncError::Generic(format!("failed to build log appender: {e}")))?;
        let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(non_blocking)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| SyncError::Generic(format!("failed to set subscriber: {e}")))?;
    }

    Ok(())
}
