pub mod cleanup;
pub mod common;
pub mod config;
pub mod error;
pub mod ledger;
pub mod matcher;
pub mod reconcile;
pub mod remote;
pub mod scanner;
pub mod sync;

pub use cleanup::{CleanupReport, Decider, Decision};
pub use config::{CleanupPolicy, Config};
pub use error::{Result, SyncError, SyncExpectedError};
pub use ledger::{Ledger, LedgerEntry, TrackId, TrackStatus};
pub use reconcile::{plan, Action, Plan};
pub use remote::{Acquirer, Acquisition, PlaylistRef, PlaylistSnapshot, RemoteCatalog, RemoteTrack};
pub use sync::{acquire_pending, purge_ledger, reconcile_playlist, refresh_ledger_from_disk, SyncReport};

#[cfg(test)]
mod testing;

#[cfg(test)]
mod sync_test;
