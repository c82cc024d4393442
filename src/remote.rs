/// The remote module defines the seams to our external collaborators: the
/// remote catalog that tells us what a playlist currently contains, and the
/// acquisition backend that turns a missing track into bytes on disk. The
/// core never talks to the network itself; it only consumes these contracts.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ledger::TrackId;
use crate::matcher::sanitize_name;

/// One track as the remote catalog reports it, in playlist order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrack {
    pub artist: String,
    pub title: String,
    pub remote_id: String,
}

impl RemoteTrack {
    pub fn track_id(&self) -> TrackId {
        TrackId::new(&self.artist, &self.title, &self.remote_id)
    }
}

/// Point-in-time view of the remote playlist. Not persisted beyond one
/// reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct PlaylistSnapshot {
    pub tracks: Vec<RemoteTrack>,
}

impl PlaylistSnapshot {
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.track_id()).collect()
    }
}

pub trait RemoteCatalog {
    /// Fetch the current contents of a playlist, in order. Fails with
    /// `SyncExpectedError::Auth` or `SyncExpectedError::PlaylistNotFound`;
    /// either aborts the pass for this playlist with the ledger untouched.
    fn get_playlist_tracks(&self, playlist: &PlaylistRef) -> Result<PlaylistSnapshot>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub success: bool,
    pub file_path: Option<PathBuf>,
    pub error: Option<String>,
}

pub trait Acquirer {
    /// Resolve a track to an audio source and fetch it. Retry/backoff is the
    /// backend's business, not ours.
    fn acquire(&mut self, id: &TrackId) -> Acquisition;
}

/// A playlist as the user names it: a bare catalog ID, a share URL, or a
/// human name. Share URLs have the ID extracted from the `playlist/<id>`
/// segment with any query string dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRef {
    pub id: String,
    pub name: Option<String>,
}

impl PlaylistRef {
    pub fn parse(raw: &str) -> PlaylistRef {
        let id = match raw.split_once("playlist/") {
            Some((_, rest)) => rest.split('?').next().unwrap_or(rest).to_string(),
            None => raw.to_string(),
        };
        PlaylistRef { id, name: None }
    }

    pub fn with_name(mut self, name: &str) -> PlaylistRef {
        self.name = Some(name.to_string());
        self
    }

    /// Folder/ledger name for this playlist: the sanitized human name when we
    /// have one, the catalog ID otherwise.
    pub fn local_name(&self) -> String {
        match &self.name {
            Some(name) => sanitize_name(name),
            None => self.id.clone(),
        }
    }
}
