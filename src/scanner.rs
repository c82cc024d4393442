/// The scanner module enumerates the audio files actually present in a
/// playlist's download folder, independent of anything the ledger claims.
/// Scanning is side-effect-free. An unreadable folder is an error, never an
/// empty listing: "nothing to clean" must not be fabricated from a
/// permissions problem.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, SyncExpectedError};

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "flac", "wav", "ogg", "opus"];

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// List every audio file under the folder. Files in subdirectories are
/// included: some download tools nest by album.
pub fn scan_download_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(SyncExpectedError::UnreadableFolder {
            path: folder.to_path_buf(),
            message: "not a directory".to_string(),
        }
        .into());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(folder) {
        let entry = entry.map_err(|e| SyncExpectedError::UnreadableFolder {
            path: folder.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() && is_audio_file(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    debug!("scanned {} audio files under {:?}", files.len(), folder);
    Ok(files)
}

/// The filename stem used to infer a track identity from a physical file.
pub fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default()
}
