/// The ledger module persists the per-playlist record of every track we have
/// ever seen: identity, download status, and file reference. One TOML file
/// per playlist, row-oriented and human-editable. The ledger is the memory
/// that survives between reconciliation passes; entries are never deleted
/// outright, only transitioned, unless the caller explicitly purges history.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::{now_timestamp, parse_timestamp};
use crate::config::Config;
use crate::error::Result;
use crate::matcher::sanitize_name;

/// Immutable identity of a track as the remote catalog names it. Ledger
/// lookups use case-sensitive exact match on (artist, title); fuzzy matching
/// against filenames lives in the matcher module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId {
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub remote_id: String,
}

impl TrackId {
    pub fn new(artist: &str, title: &str, remote_id: &str) -> Self {
        TrackId { artist: artist.to_string(), title: title.to_string(), remote_id: remote_id.to_string() }
    }

    /// The exact-match ledger key.
    pub fn key(&self) -> (String, String) {
        (self.artist.clone(), self.title.clone())
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    /// Observed in the remote playlist, acquisition not yet confirmed.
    #[default]
    Pending,
    /// On disk, file_path was valid when set.
    Downloaded,
    /// Expected on disk but not found there.
    Missing,
    /// Removed from the remote playlist; local file deleted.
    Removed,
    /// Removed from the remote playlist; local file deliberately kept.
    Kept,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub remote_id: String,
    #[serde(default)]
    pub status: TrackStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default = "now_timestamp")]
    pub last_seen_remote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
}

impl LedgerEntry {
    pub fn new(id: &TrackId) -> Self {
        LedgerEntry {
            artist: id.artist.clone(),
            title: id.title.clone(),
            remote_id: id.remote_id.clone(),
            status: TrackStatus::Pending,
            file_path: None,
            last_seen_remote: now_timestamp(),
            bytes: None,
        }
    }

    pub fn id(&self) -> TrackId {
        TrackId::new(&self.artist, &self.title, &self.remote_id)
    }

    pub fn key(&self) -> (String, String) {
        (self.artist.clone(), self.title.clone())
    }
}

/// In-memory view of one playlist's ledger file. Exclusively owned by one
/// reconciliation pass at a time; passes over different playlists never share
/// a ledger.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub entries: HashMap<(String, String), LedgerEntry>,
}

impl Ledger {
    pub fn get(&self, id: &TrackId) -> Option<&LedgerEntry> {
        self.entries.get(&id.key())
    }

    pub fn get_mut(&mut self, id: &TrackId) -> Option<&mut LedgerEntry> {
        self.entries.get_mut(&id.key())
    }

    /// Insert or replace by identity. The stored last_seen_remote never moves
    /// backward: if the existing row carries a later parseable timestamp than
    /// the incoming one, the later timestamp wins.
    pub fn upsert(&mut self, mut entry: LedgerEntry) {
        if let Some(existing) = self.entries.get(&entry.key()) {
            let old = parse_timestamp(&existing.last_seen_remote);
            let new = parse_timestamp(&entry.last_seen_remote);
            if let (Some(old), Some(new)) = (old, new) {
                if old > new {
                    entry.last_seen_remote = existing.last_seen_remote.clone();
                }
            }
        }
        self.entries.insert(entry.key(), entry);
    }

    /// Rows sorted case-insensitively by "Artist - Title", the order the
    /// ledger file is written in.
    pub fn sorted_entries(&self) -> Vec<&LedgerEntry> {
        let mut rows: Vec<&LedgerEntry> = self.entries.values().collect();
        rows.sort_by_key(|e| format!("{} - {}", e.artist, e.title).to_lowercase());
        rows
    }
}

#[derive(Serialize)]
struct LedgerDocOut<'a> {
    tracks: Vec<&'a LedgerEntry>,
}

/// Path of the ledger file for a playlist.
pub fn ledger_path(c: &Config, playlist_name: &str) -> PathBuf {
    c.ledger_folder.join(format!("{}.toml", sanitize_name(playlist_name)))
}

/// Load a ledger file. A missing file is an empty ledger. Corrupt rows are
/// skipped with a data integrity warning rather than failing the pass; the
/// worst consequence of a skipped row is a redundant acquisition, never a
/// wrongful deletion.
pub fn load_ledger(path: &Path) -> Result<Ledger> {
    if !path.exists() {
        return Ok(Ledger::default());
    }
    let contents = fs::read_to_string(path)?;
    let doc: toml::Value = match toml::from_str(&contents) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("data integrity: failed to parse ledger file {:?}: {}; treating as empty", path, e);
            return Ok(Ledger::default());
        }
    };

    let mut ledger = Ledger::default();
    let rows = match doc.get("tracks").and_then(|t| t.as_array()) {
        Some(rows) => rows,
        None => return Ok(ledger),
    };
    for (i, row) in rows.iter().enumerate() {
        let entry: LedgerEntry = match LedgerEntry::deserialize(row.clone()) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("data integrity: skipping corrupt row {} in ledger {:?}: {}", i, path, e);
                continue;
            }
        };
        if entry.artist.is_empty() && entry.title.is_empty() {
            warn!("data integrity: skipping row {} in ledger {:?}: no identity", i, path);
            continue;
        }
        if ledger.entries.contains_key(&entry.key()) {
            warn!("data integrity: duplicate identity {} - {} in ledger {:?}; keeping the first row", entry.artist, entry.title, path);
            continue;
        }
        ledger.entries.insert(entry.key(), entry);
    }
    Ok(ledger)
}

/// Whole-file replace. Rows go out alphabetized so the file diffs cleanly and
/// reads like the playlist.
pub fn save_ledger(path: &Path, ledger: &Ledger) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let doc = LedgerDocOut { tracks: ledger.sorted_entries() };
    let toml_string = toml::to_string_pretty(&doc)
        .map_err(|e| crate::error::SyncError::Generic(format!("failed to serialize ledger: {e}")))?;
    fs::write(path, toml_string)?;
    Ok(())
}
