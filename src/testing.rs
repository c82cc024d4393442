use std::fs;
use std::sync::Once;

use tempfile::TempDir;

use crate::config::{CleanupPolicy, Config};
use crate::error::{Result, SyncExpectedError};
use crate::ledger::{LedgerEntry, TrackId, TrackStatus};
use crate::remote::{PlaylistRef, PlaylistSnapshot, RemoteCatalog, RemoteTrack};

static INIT: Once = Once::new();

pub fn init() -> TempDir {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    });
    TempDir::new().expect("failed to create temp dir")
}

// Creates a test config with a download folder and ledger folder on disk.
pub fn config() -> (Config, TempDir) {
    let temp_dir = init();
    let base_path = temp_dir.path();

    fs::create_dir_all(base_path.join("downloads")).expect("failed to create downloads dir");
    fs::create_dir_all(base_path.join("ledgers")).expect("failed to create ledgers dir");

    let config = Config {
        download_folder: base_path.join("downloads"),
        ledger_folder: base_path.join("ledgers"),
        playlists_file: base_path.join("playlists.txt"),
        cleanup_policy: CleanupPolicy::Interactive,
        filter_results: true,
        watch_interval_minutes: 10,
    };
    (config, temp_dir)
}

pub fn entry(artist: &str, title: &str, status: TrackStatus) -> LedgerEntry {
    let mut e = LedgerEntry::new(&TrackId::new(artist, title, ""));
    e.status = status;
    e
}

/// In-memory remote catalog for tests. Playlists it does not know about fail
/// with PlaylistNotFound, like the real thing.
pub struct FakeCatalog {
    pub playlists: Vec<(String, Vec<RemoteTrack>)>,
    pub auth_failure: bool,
}

impl FakeCatalog {
    pub fn new() -> Self {
        FakeCatalog { playlists: Vec::new(), auth_failure: false }
    }

    pub fn with_playlist(mut self, id: &str, tracks: Vec<(&str, &str)>) -> Self {
        let tracks = tracks
            .into_iter()
            .enumerate()
            .map(|(i, (artist, title))| RemoteTrack {
                artist: artist.to_string(),
                title: title.to_string(),
                remote_id: format!("{id}-{i}"),
            })
            .collect();
        self.playlists.push((id.to_string(), tracks));
        self
    }
}

impl RemoteCatalog for FakeCatalog {
    fn get_playlist_tracks(&self, playlist: &PlaylistRef) -> Result<PlaylistSnapshot> {
        if self.auth_failure {
            return Err(SyncExpectedError::Auth { message: "bad credentials".to_string() }.into());
        }
        self.playlists
            .iter()
            .find(|(id, _)| *id == playlist.id)
            .map(|(_, tracks)| PlaylistSnapshot { tracks: tracks.clone() })
            .ok_or_else(|| SyncExpectedError::PlaylistNotFound { playlist: playlist.id.clone() }.into())
    }
}
