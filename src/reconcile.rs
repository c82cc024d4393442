/// The reconcile module computes the authoritative three-way diff between
/// what the remote playlist says should exist, what the ledger says we
/// previously downloaded, and what is actually on disk. It produces an action
/// plan and performs no I/O mutation itself; applying the plan is the cleanup
/// module's job. Because every pass recomputes the full diff from scratch,
/// an interrupted pass is healed by the next one.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ledger::{Ledger, TrackId, TrackStatus};
use crate::matcher::{clean_spacing_artifacts, fingerprint, track_stem};
use crate::scanner::file_stem;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// In the remote playlist but not downloaded: new, previously failed, or
    /// the file has gone missing from disk.
    Acquire(TrackId),
    /// Downloaded per the ledger but gone from the remote playlist. Carries
    /// every on-disk file the track claims.
    MarkRemoved { id: TrackId, files: Vec<PathBuf> },
    /// On disk with no ledger reference and no fuzzy match to any identity.
    Orphan(PathBuf),
    /// Present remotely, downloaded, file still on disk.
    Noop(TrackId),
}

#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub actions: Vec<Action>,
    /// Ledger/file desync repairs: entries whose file reference was stale or
    /// absent, reattached to a file that fuzzy-matched their identity.
    pub repairs: Vec<(TrackId, PathBuf)>,
}

impl Plan {
    pub fn acquisitions(&self) -> Vec<&TrackId> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Acquire(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// True when the pass has converged: nothing to acquire, remove, or
    /// orphan.
    pub fn is_noop(&self) -> bool {
        self.actions.iter().all(|a| matches!(a, Action::Noop(_)))
    }
}

/// Compute the action plan for one playlist. Single pass with hashed identity
/// lookups; removed-status assignment runs before orphan resolution so a file
/// belonging to a just-removed track is classified as removed-cleanup rather
/// than as an unrelated orphan.
pub fn plan(snapshot: &[TrackId], ledger: &Ledger, fs_listing: &[PathBuf]) -> Plan {
    let snapshot_keys: HashSet<(String, String)> = snapshot.iter().map(|id| id.key()).collect();
    let fs_set: HashSet<&Path> = fs_listing.iter().map(|p| p.as_path()).collect();

    // Files already referenced by a ledger entry, whatever its status. A kept
    // or removed entry still accounts for its file.
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    for entry in ledger.entries.values() {
        if let Some(fp) = &entry.file_path {
            if fs_set.contains(fp.as_path()) {
                claimed.insert(fp.clone());
            }
        }
    }

    // Step 3 comes before step 4: decide which downloaded entries are gone
    // from the remote before classifying unclaimed files.
    let mut removed_ids: Vec<TrackId> = Vec::new();
    let mut removed_files: HashMap<(String, String), Vec<PathBuf>> = HashMap::new();
    for entry in ledger.sorted_entries() {
        if entry.status == TrackStatus::Downloaded && !snapshot_keys.contains(&entry.key()) {
            let mut files = Vec::new();
            if let Some(fp) = &entry.file_path {
                if fs_set.contains(fp.as_path()) {
                    files.push(fp.clone());
                }
            }
            removed_files.insert(entry.key(), files);
            removed_ids.push(entry.id());
        }
    }
    let removed_keys: HashSet<(String, String)> = removed_ids.iter().map(|id| id.key()).collect();

    // Step 4: classify files the ledger does not reference. A fuzzy match to
    // exactly one identity claims the file; a tie is a non-match by design.
    // Removed/kept history rows stay out of the index: a file matching one is
    // new material, and repairing it onto the row would resurrect history and
    // feed the file to removal cleanup on the next pass.
    let mut fingerprints: Vec<((String, String), String)> = ledger
        .entries
        .values()
        .filter(|e| !matches!(e.status, TrackStatus::Removed | TrackStatus::Kept))
        .map(|e| (e.key(), fingerprint(&track_stem(&e.artist, &e.title))))
        .collect();
    fingerprints.retain(|(_, fp)| !fp.is_empty());

    let mut repairs: Vec<(TrackId, PathBuf)> = Vec::new();
    let mut repaired_keys: HashSet<(String, String)> = HashSet::new();
    let mut orphans: Vec<PathBuf> = Vec::new();
    for path in fs_listing {
        if claimed.contains(path) {
            continue;
        }
        let stem_fp = fingerprint(&clean_spacing_artifacts(&file_stem(path)));
        let matches: Vec<&(String, String)> = fingerprints
            .iter()
            .filter(|(_, fp)| !stem_fp.is_empty() && *fp == stem_fp)
            .map(|(key, _)| key)
            .collect();
        match matches.as_slice() {
            [] => orphans.push(path.clone()),
            [key] => {
                let entry = &ledger.entries[*key];
                if removed_keys.contains(*key) {
                    // The file belongs to a just-removed track; let the
                    // removal cleanup own it instead of double-processing.
                    removed_files.get_mut(*key).unwrap().push(path.clone());
                } else if entry.file_path.as_deref().map(|fp| fs_set.contains(fp)).unwrap_or(false) {
                    // Entry already owns a live file; this one is a fuzzy
                    // duplicate. Accounted for, but nothing to do.
                    debug!("file {:?} duplicates ledger entry {}; leaving it alone", path, entry.id());
                } else {
                    repairs.push((entry.id(), path.clone()));
                    repaired_keys.insert(entry.key());
                }
            }
            _ => {
                debug!("file {:?} fuzzy-matches multiple identities; treating as orphan", path);
                orphans.push(path.clone());
            }
        }
    }

    // Step 2, emitted in playlist order.
    let mut actions: Vec<Action> = Vec::new();
    for id in snapshot {
        let entry = ledger.get(id);
        // A repaired entry counts as downloaded: we just reattached its file,
        // so acquiring it again would be wasted work.
        let repaired = repaired_keys.contains(&id.key());
        let downloaded = entry.map(|e| e.status == TrackStatus::Downloaded).unwrap_or(false) || repaired;
        let has_file = repaired
            || entry
                .and_then(|e| e.file_path.as_deref())
                .map(|fp| fs_set.contains(fp))
                .unwrap_or(false);
        if downloaded && has_file {
            actions.push(Action::Noop(id.clone()));
        } else {
            actions.push(Action::Acquire(id.clone()));
        }
    }

    for id in removed_ids {
        let mut files = removed_files.remove(&id.key()).unwrap_or_default();
        files.sort();
        files.dedup();
        actions.push(Action::MarkRemoved { id, files });
    }

    for path in orphans {
        actions.push(Action::Orphan(path));
    }

    Plan { actions, repairs }
}
