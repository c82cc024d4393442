/// The sync module stitches the pieces together: fetch the remote snapshot,
/// load the ledger, scan the download folder, plan, apply cleanup, write the
/// ledger back. One call reconciles one playlist; passes over different
/// playlists are independent because each owns its own ledger file and
/// folder.

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::cleanup::{self, CleanupReport, Decider};
use crate::config::{CleanupPolicy, Config};
use crate::error::Result;
use crate::ledger::{ledger_path, load_ledger, save_ledger, Ledger, LedgerEntry, TrackId, TrackStatus};
use crate::matcher::{clean_spacing_artifacts, fingerprint, fuzzy_equal, track_stem};
use crate::reconcile::{plan, Action};
use crate::remote::{Acquirer, PlaylistRef, RemoteCatalog};
use crate::scanner::{file_stem, scan_download_folder};

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub playlist: String,
    pub tracks_in_playlist: usize,
    /// Identities the acquisition backend should fetch, in playlist order.
    pub pending_acquisitions: Vec<TrackId>,
    /// Ledger/file desyncs repaired by reattaching files to entries.
    pub repaired_count: usize,
    pub cleanup: CleanupReport,
}

/// Folder a playlist's audio files are downloaded into.
pub fn playlist_folder(c: &Config, playlist: &PlaylistRef) -> PathBuf {
    c.download_folder.join(playlist.local_name())
}

fn observe(ledger: &mut Ledger, id: &TrackId) {
    match ledger.get_mut(id) {
        Some(entry) => {
            entry.last_seen_remote = crate::common::now_timestamp();
            if entry.remote_id.is_empty() && !id.remote_id.is_empty() {
                entry.remote_id = id.remote_id.clone();
            }
        }
        None => {
            ledger.upsert(LedgerEntry::new(id));
        }
    }
}

/// The single synchronous entry point: reconcile one playlist against the
/// remote catalog under the given cleanup policy. Remote catalog failures
/// abort the pass with the ledger untouched; everything recoverable lands in
/// the report instead.
pub fn reconcile_playlist(
    c: &Config,
    catalog: &dyn RemoteCatalog,
    playlist: &PlaylistRef,
    policy: CleanupPolicy,
    decider: Option<&mut dyn Decider>,
) -> Result<SyncReport> {
    let snapshot = catalog.get_playlist_tracks(playlist)?;
    let name = playlist.local_name();
    info!("reconciling playlist {} ({} tracks remote)", name, snapshot.tracks.len());

    let folder = playlist_folder(c, playlist);
    fs::create_dir_all(&folder)?;
    let fs_listing = scan_download_folder(&folder)?;

    let lpath = ledger_path(c, &name);
    let mut ledger = load_ledger(&lpath)?;

    let ids = snapshot.track_ids();
    for id in &ids {
        observe(&mut ledger, id);
    }

    let plan = plan(&ids, &ledger, &fs_listing);

    for (id, path) in &plan.repairs {
        if let Some(entry) = ledger.get_mut(id) {
            info!("repairing ledger entry {}: reattaching file {:?}", id, path);
            entry.file_path = Some(path.clone());
            entry.status = TrackStatus::Downloaded;
            entry.bytes = fs::metadata(path).ok().map(|m| m.len());
        }
    }

    // A downloaded entry that the plan wants re-acquired has lost its file;
    // downgrade it so the ledger reflects reality.
    for action in &plan.actions {
        if let Action::Acquire(id) = action {
            if let Some(entry) = ledger.get_mut(id) {
                if entry.status == TrackStatus::Downloaded {
                    warn!("file for {} no longer on disk; downgrading to missing", id);
                    entry.status = TrackStatus::Missing;
                    entry.file_path = None;
                    entry.bytes = None;
                }
            }
        }
    }

    let cleanup_report = cleanup::apply(&plan, policy, decider, &mut ledger);

    save_ledger(&lpath, &ledger)?;

    Ok(SyncReport {
        playlist: name,
        tracks_in_playlist: snapshot.tracks.len(),
        pending_acquisitions: plan.acquisitions().into_iter().cloned().collect(),
        repaired_count: plan.repairs.len(),
        cleanup: cleanup_report,
    })
}

/// Drive the acquisition backend for every pending or missing entry in a
/// playlist's ledger. Successes become downloaded entries; failures stay
/// where they were for the next pass. Returns the number of tracks acquired.
pub fn acquire_pending(c: &Config, acquirer: &mut dyn Acquirer, playlist: &PlaylistRef) -> Result<usize> {
    let lpath = ledger_path(c, &playlist.local_name());
    let mut ledger = load_ledger(&lpath)?;

    let pending: Vec<TrackId> = ledger
        .sorted_entries()
        .iter()
        .filter(|e| matches!(e.status, TrackStatus::Pending | TrackStatus::Missing))
        .map(|e| e.id())
        .collect();

    let mut acquired = 0;
    for id in pending {
        let outcome = acquirer.acquire(&id);
        if outcome.success {
            if let Some(entry) = ledger.get_mut(&id) {
                entry.status = TrackStatus::Downloaded;
                entry.bytes = outcome.file_path.as_deref().and_then(|p| fs::metadata(p).ok()).map(|m| m.len());
                entry.file_path = outcome.file_path;
            }
            acquired += 1;
        } else {
            warn!("acquisition failed for {}: {}", id, outcome.error.unwrap_or_else(|| "unknown error".to_string()));
        }
    }

    save_ledger(&lpath, &ledger)?;
    Ok(acquired)
}

/// Re-derive downloaded/missing statuses from what is actually on disk.
/// Upgrades use fuzzy matching (a false positive here cannot destroy data);
/// a downloaded entry whose file is gone is downgraded to missing. Returns
/// the number of rows changed.
pub fn refresh_ledger_from_disk(c: &Config, playlist: &PlaylistRef) -> Result<usize> {
    let lpath = ledger_path(c, &playlist.local_name());
    let mut ledger = load_ledger(&lpath)?;
    let folder = playlist_folder(c, playlist);
    let fs_listing = if folder.is_dir() { scan_download_folder(&folder)? } else { Vec::new() };

    let stems: Vec<(PathBuf, String)> = fs_listing
        .iter()
        .map(|p| (p.clone(), clean_spacing_artifacts(&file_stem(p))))
        .collect();

    let mut updated = 0;
    for entry in ledger.entries.values_mut() {
        let referenced_alive = entry.file_path.as_deref().map(|p| p.exists()).unwrap_or(false);
        if referenced_alive {
            continue;
        }
        let expected = track_stem(&entry.artist, &entry.title);
        let title_fp = fingerprint(&entry.title);
        // Exact fingerprint match first; then the looser title-in-filename
        // fallback, acceptable here because an upgrade never deletes anything.
        let found = stems
            .iter()
            .find(|(_, stem)| fuzzy_equal(&expected, stem))
            .or_else(|| stems.iter().find(|(_, stem)| !title_fp.is_empty() && fingerprint(stem).contains(&title_fp)));
        match (found, entry.status) {
            // Never rewrite history rows; the user decided what these were.
            (Some(_), TrackStatus::Removed | TrackStatus::Kept) => {}
            (Some((path, _)), _) => {
                if entry.status != TrackStatus::Downloaded || entry.file_path.as_deref() != Some(path.as_path()) {
                    entry.status = TrackStatus::Downloaded;
                    entry.file_path = Some(path.clone());
                    entry.bytes = fs::metadata(path).ok().map(|m| m.len());
                    updated += 1;
                }
            }
            (None, TrackStatus::Downloaded) => {
                entry.status = TrackStatus::Missing;
                entry.file_path = None;
                entry.bytes = None;
                updated += 1;
            }
            _ => {}
        }
    }

    if updated > 0 {
        save_ledger(&lpath, &ledger)?;
    }
    info!("refreshed {} ledger rows for playlist {}", updated, playlist.local_name());
    Ok(updated)
}

/// Explicitly purge removed/kept history rows from a playlist's ledger.
/// This is the only way entries leave the ledger. Returns the number purged.
pub fn purge_ledger(c: &Config, playlist: &PlaylistRef) -> Result<usize> {
    let lpath = ledger_path(c, &playlist.local_name());
    let mut ledger = load_ledger(&lpath)?;
    let before = ledger.entries.len();
    ledger
        .entries
        .retain(|_, e| !matches!(e.status, TrackStatus::Removed | TrackStatus::Kept));
    let purged = before - ledger.entries.len();
    if purged > 0 {
        save_ledger(&lpath, &ledger)?;
    }
    info!("purged {} history rows from playlist {}", purged, playlist.local_name());
    Ok(purged)
}
