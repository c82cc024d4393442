use std::fs;
use std::path::PathBuf;

use crate::config::CleanupPolicy;
use crate::error::{SyncError, SyncExpectedError};
use crate::ledger::{ledger_path, load_ledger, save_ledger, Ledger, TrackId, TrackStatus};
use crate::remote::{Acquirer, Acquisition, PlaylistRef};
use crate::sync::*;
use crate::testing::{self, FakeCatalog};

#[test]
fn test_new_playlist_queues_acquisitions() {
    let (config, _temp_dir) = testing::config();
    let catalog = FakeCatalog::new().with_playlist("pl1", vec![("Queen", "Bohemian Rhapsody")]);
    let playlist = PlaylistRef::parse("pl1");

    let report = reconcile_playlist(&config, &catalog, &playlist, CleanupPolicy::Interactive, None).unwrap();

    assert_eq!(report.tracks_in_playlist, 1);
    assert_eq!(report.pending_acquisitions.len(), 1);
    assert_eq!(report.pending_acquisitions[0].key(), ("Queen".to_string(), "Bohemian Rhapsody".to_string()));

    // The ledger now tracks the pending entry.
    let ledger = load_ledger(&ledger_path(&config, "pl1")).unwrap();
    let entry = ledger.get(&TrackId::new("Queen", "Bohemian Rhapsody", "")).unwrap();
    assert_eq!(entry.status, TrackStatus::Pending);
    assert_eq!(entry.remote_id, "pl1-0");
}

#[test]
fn test_removed_track_deleted_under_auto_delete() {
    let (config, _temp_dir) = testing::config();
    let playlist = PlaylistRef::parse("pl1");
    let folder = playlist_folder(&config, &playlist);
    fs::create_dir_all(&folder).unwrap();
    let file = folder.join("Queen - Bohemian Rhapsody.mp3");
    fs::write(&file, "audio").unwrap();

    let mut ledger = Ledger::default();
    let mut e = testing::entry("Queen", "Bohemian Rhapsody", TrackStatus::Downloaded);
    e.file_path = Some(file.clone());
    ledger.upsert(e);
    save_ledger(&ledger_path(&config, "pl1"), &ledger).unwrap();

    // Remote playlist is now empty.
    let catalog = FakeCatalog::new().with_playlist("pl1", vec![]);
    let report = reconcile_playlist(&config, &catalog, &playlist, CleanupPolicy::AutoDelete, None).unwrap();

    assert!(!file.exists());
    assert_eq!(report.cleanup.removed_count, 1);
    assert_eq!(report.cleanup.deleted_count, 1);
    let ledger = load_ledger(&ledger_path(&config, "pl1")).unwrap();
    assert_eq!(
        ledger.get(&TrackId::new("Queen", "Bohemian Rhapsody", "")).unwrap().status,
        TrackStatus::Removed
    );
}

#[test]
fn test_readded_file_for_removed_row_stays_removed() {
    // A file landing in the folder that matches a removed history row must
    // not resurrect the row; it surfaces as an orphan instead.
    let (config, _temp_dir) = testing::config();
    let playlist = PlaylistRef::parse("pl1");
    let folder = playlist_folder(&config, &playlist);
    fs::create_dir_all(&folder).unwrap();
    let file = folder.join("Queen - Bohemian Rhapsody.mp3");
    fs::write(&file, "audio").unwrap();

    let mut ledger = Ledger::default();
    ledger.upsert(testing::entry("Queen", "Bohemian Rhapsody", TrackStatus::Removed));
    save_ledger(&ledger_path(&config, "pl1"), &ledger).unwrap();

    let catalog = FakeCatalog::new().with_playlist("pl1", vec![]);
    let report = reconcile_playlist(&config, &catalog, &playlist, CleanupPolicy::Interactive, None).unwrap();

    assert_eq!(report.repaired_count, 0);
    assert_eq!(report.cleanup.removed_count, 0);
    assert!(file.exists());
    let ledger = load_ledger(&ledger_path(&config, "pl1")).unwrap();
    let entry = ledger.get(&TrackId::new("Queen", "Bohemian Rhapsody", "")).unwrap();
    assert_eq!(entry.status, TrackStatus::Removed);
    assert!(entry.file_path.is_none());
}

#[test]
fn test_second_pass_is_idempotent() {
    let (config, _temp_dir) = testing::config();
    let playlist = PlaylistRef::parse("pl1");
    let folder = playlist_folder(&config, &playlist);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("Queen - Bohemian Rhapsody.mp3"), "audio").unwrap();

    let catalog = FakeCatalog::new().with_playlist("pl1", vec![("Queen", "Bohemian Rhapsody")]);

    // First pass repairs the ledger/file desync (file on disk, no ledger).
    let first = reconcile_playlist(&config, &catalog, &playlist, CleanupPolicy::AutoDelete, None).unwrap();
    assert_eq!(first.repaired_count, 1);
    assert!(first.pending_acquisitions.is_empty());

    // Second pass with no external changes does nothing at all.
    let second = reconcile_playlist(&config, &catalog, &playlist, CleanupPolicy::AutoDelete, None).unwrap();
    assert_eq!(second.repaired_count, 0);
    assert!(second.pending_acquisitions.is_empty());
    assert_eq!(second.cleanup.removed_count, 0);
    assert_eq!(second.cleanup.deleted_count, 0);
    assert_eq!(second.cleanup.orphans_deleted, 0);
    assert!(second.cleanup.errors.is_empty());
}

#[test]
fn test_orphan_file_reported_and_deleted() {
    let (config, _temp_dir) = testing::config();
    let playlist = PlaylistRef::parse("pl1");
    let folder = playlist_folder(&config, &playlist);
    fs::create_dir_all(&folder).unwrap();
    let orphan = folder.join("unknown_song.mp3");
    fs::write(&orphan, "audio").unwrap();

    let catalog = FakeCatalog::new().with_playlist("pl1", vec![]);
    let report = reconcile_playlist(&config, &catalog, &playlist, CleanupPolicy::AutoDelete, None).unwrap();

    assert!(!orphan.exists());
    assert_eq!(report.cleanup.orphans_deleted, 1);
}

#[test]
fn test_auth_failure_aborts_with_ledger_untouched() {
    let (config, _temp_dir) = testing::config();
    let playlist = PlaylistRef::parse("pl1");

    let mut ledger = Ledger::default();
    ledger.upsert(testing::entry("Queen", "Bohemian Rhapsody", TrackStatus::Downloaded));
    let lpath = ledger_path(&config, "pl1");
    save_ledger(&lpath, &ledger).unwrap();
    let before = fs::read_to_string(&lpath).unwrap();

    let mut catalog = FakeCatalog::new();
    catalog.auth_failure = true;

    match reconcile_playlist(&config, &catalog, &playlist, CleanupPolicy::AutoDelete, None).unwrap_err() {
        SyncError::Expected(e @ SyncExpectedError::Auth { .. }) => assert!(e.aborts_pass()),
        e => panic!("expected Auth error, got {e}"),
    }
    assert_eq!(fs::read_to_string(&lpath).unwrap(), before);
}

#[test]
fn test_unknown_playlist_aborts() {
    let (config, _temp_dir) = testing::config();
    let catalog = FakeCatalog::new();
    let result = reconcile_playlist(&config, &catalog, &PlaylistRef::parse("nope"), CleanupPolicy::Keep, None);
    match result.unwrap_err() {
        SyncError::Expected(SyncExpectedError::PlaylistNotFound { playlist }) => assert_eq!(playlist, "nope"),
        e => panic!("expected PlaylistNotFound, got {e}"),
    }
}

#[test]
fn test_downloaded_entry_with_missing_file_downgraded() {
    let (config, _temp_dir) = testing::config();
    let playlist = PlaylistRef::parse("pl1");

    let mut ledger = Ledger::default();
    let mut e = testing::entry("Queen", "Bohemian Rhapsody", TrackStatus::Downloaded);
    e.file_path = Some(playlist_folder(&config, &playlist).join("gone.mp3"));
    ledger.upsert(e);
    save_ledger(&ledger_path(&config, "pl1"), &ledger).unwrap();

    let catalog = FakeCatalog::new().with_playlist("pl1", vec![("Queen", "Bohemian Rhapsody")]);
    let report = reconcile_playlist(&config, &catalog, &playlist, CleanupPolicy::Interactive, None).unwrap();

    assert_eq!(report.pending_acquisitions.len(), 1);
    let ledger = load_ledger(&ledger_path(&config, "pl1")).unwrap();
    let entry = ledger.get(&TrackId::new("Queen", "Bohemian Rhapsody", "")).unwrap();
    assert_eq!(entry.status, TrackStatus::Missing);
    assert!(entry.file_path.is_none());
}

struct FakeAcquirer {
    folder: PathBuf,
    fail: Vec<String>,
}

impl Acquirer for FakeAcquirer {
    fn acquire(&mut self, id: &TrackId) -> Acquisition {
        if self.fail.contains(&id.title) {
            return Acquisition { success: false, file_path: None, error: Some("no source found".to_string()) };
        }
        let path = self.folder.join(format!("{} - {}.mp3", id.artist, id.title));
        fs::write(&path, "audio").unwrap();
        Acquisition { success: true, file_path: Some(path), error: None }
    }
}

#[test]
fn test_acquire_pending_updates_ledger() {
    let (config, _temp_dir) = testing::config();
    let playlist = PlaylistRef::parse("pl1");
    let folder = playlist_folder(&config, &playlist);
    fs::create_dir_all(&folder).unwrap();

    let mut ledger = Ledger::default();
    ledger.upsert(testing::entry("Queen", "Bohemian Rhapsody", TrackStatus::Pending));
    ledger.upsert(testing::entry("Daft Punk", "Around the World", TrackStatus::Missing));
    ledger.upsert(testing::entry("Rarity", "Unfindable", TrackStatus::Pending));
    save_ledger(&ledger_path(&config, "pl1"), &ledger).unwrap();

    let mut acquirer = FakeAcquirer { folder, fail: vec!["Unfindable".to_string()] };
    let acquired = acquire_pending(&config, &mut acquirer, &playlist).unwrap();
    assert_eq!(acquired, 2);

    let ledger = load_ledger(&ledger_path(&config, "pl1")).unwrap();
    let queen = ledger.get(&TrackId::new("Queen", "Bohemian Rhapsody", "")).unwrap();
    assert_eq!(queen.status, TrackStatus::Downloaded);
    assert!(queen.file_path.as_deref().unwrap().exists());
    assert!(queen.bytes.is_some());
    // The failure stays where it was for the next pass.
    assert_eq!(ledger.get(&TrackId::new("Rarity", "Unfindable", "")).unwrap().status, TrackStatus::Pending);
}

#[test]
fn test_refresh_upgrades_and_downgrades() {
    let (config, _temp_dir) = testing::config();
    let playlist = PlaylistRef::parse("pl1");
    let folder = playlist_folder(&config, &playlist);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("Queen - Bohemian Rhapsody.mp3"), "audio").unwrap();

    let mut ledger = Ledger::default();
    // Pending, but its file is on disk: upgrade.
    ledger.upsert(testing::entry("Queen", "Bohemian Rhapsody", TrackStatus::Pending));
    // Downloaded, but its file is gone: downgrade.
    let mut e = testing::entry("Daft Punk", "Around the World", TrackStatus::Downloaded);
    e.file_path = Some(folder.join("vanished.mp3"));
    ledger.upsert(e);
    save_ledger(&ledger_path(&config, "pl1"), &ledger).unwrap();

    let updated = refresh_ledger_from_disk(&config, &playlist).unwrap();
    assert_eq!(updated, 2);

    let ledger = load_ledger(&ledger_path(&config, "pl1")).unwrap();
    let queen = ledger.get(&TrackId::new("Queen", "Bohemian Rhapsody", "")).unwrap();
    assert_eq!(queen.status, TrackStatus::Downloaded);
    assert!(queen.file_path.is_some());
    let daft = ledger.get(&TrackId::new("Daft Punk", "Around the World", "")).unwrap();
    assert_eq!(daft.status, TrackStatus::Missing);
    assert!(daft.file_path.is_none());
}

#[test]
fn test_refresh_leaves_history_rows_alone() {
    let (config, _temp_dir) = testing::config();
    let playlist = PlaylistRef::parse("pl1");
    let folder = playlist_folder(&config, &playlist);
    fs::create_dir_all(&folder).unwrap();
    fs::write(folder.join("Queen - Bohemian Rhapsody.mp3"), "audio").unwrap();

    let mut ledger = Ledger::default();
    ledger.upsert(testing::entry("Queen", "Bohemian Rhapsody", TrackStatus::Removed));
    save_ledger(&ledger_path(&config, "pl1"), &ledger).unwrap();

    let updated = refresh_ledger_from_disk(&config, &playlist).unwrap();
    assert_eq!(updated, 0);
    let ledger = load_ledger(&ledger_path(&config, "pl1")).unwrap();
    assert_eq!(
        ledger.get(&TrackId::new("Queen", "Bohemian Rhapsody", "")).unwrap().status,
        TrackStatus::Removed
    );
}

#[test]
fn test_purge_drops_only_history_rows() {
    let (config, _temp_dir) = testing::config();
    let playlist = PlaylistRef::parse("pl1");

    let mut ledger = Ledger::default();
    ledger.upsert(testing::entry("A", "One", TrackStatus::Downloaded));
    ledger.upsert(testing::entry("B", "Two", TrackStatus::Removed));
    ledger.upsert(testing::entry("C", "Three", TrackStatus::Kept));
    ledger.upsert(testing::entry("D", "Four", TrackStatus::Pending));
    save_ledger(&ledger_path(&config, "pl1"), &ledger).unwrap();

    let purged = purge_ledger(&config, &playlist).unwrap();
    assert_eq!(purged, 2);

    let ledger = load_ledger(&ledger_path(&config, "pl1")).unwrap();
    assert_eq!(ledger.entries.len(), 2);
    assert!(ledger.get(&TrackId::new("A", "One", "")).is_some());
    assert!(ledger.get(&TrackId::new("D", "Four", "")).is_some());
}

#[test]
fn test_playlist_ref_parsing() {
    assert_eq!(PlaylistRef::parse("abc123").id, "abc123");
    assert_eq!(PlaylistRef::parse("https://example.com/playlist/def456?si=xyz").id, "def456");
    assert_eq!(PlaylistRef::parse("abc").with_name("Road Trip: Vol 1").local_name(), "Road Trip- Vol 1");
    assert_eq!(PlaylistRef::parse("abc").local_name(), "abc");
}
