/// The cleanup module applies the delete/keep portion of an action plan and
/// writes the resulting status transitions into the in-memory ledger. Each
/// action is atomic on its own: a status transition happens only after the
/// deletion it depends on succeeds, and a failure mid-plan leaves the ledger
/// consistent with exactly the actions that succeeded. There is no global
/// rollback.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::config::CleanupPolicy;
use crate::ledger::{Ledger, TrackStatus};
use crate::reconcile::{Action, Plan};

/// Per-item resolution for the interactive policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Delete,
    Keep,
    Skip,
}

/// Seam for interactive callers (CLI prompt, dashboard). The engine itself
/// never prompts; with no decider supplied, interactive resolves every item
/// to Skip and nothing is deleted.
pub trait Decider {
    fn decide(&mut self, action: &Action) -> Decision;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    /// Entries transitioned to removed.
    pub removed_count: usize,
    /// Files deleted for removed tracks.
    pub deleted_count: usize,
    /// Orphaned files deleted.
    pub orphans_deleted: usize,
    /// Entries transitioned to kept.
    pub kept_count: usize,
    pub errors: Vec<String>,
}

fn resolve(policy: CleanupPolicy, decider: &mut Option<&mut dyn Decider>, action: &Action) -> Decision {
    match policy {
        CleanupPolicy::AutoDelete => Decision::Delete,
        CleanupPolicy::Keep => Decision::Keep,
        CleanupPolicy::Interactive => match decider {
            Some(d) => d.decide(action),
            None => Decision::Skip,
        },
    }
}

fn delete_file(path: &Path, report: &mut CleanupReport) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("deleted {:?}", path);
            true
        }
        Err(e) => {
            warn!("failed to delete {:?}: {}", path, e);
            report.errors.push(format!("failed to delete {}: {}", path.display(), e));
            false
        }
    }
}

/// Apply the plan's removal and orphan actions under the given policy.
/// Acquire and Noop actions pass through untouched; acquisition belongs to
/// the caller's acquisition backend.
pub fn apply(plan: &Plan, policy: CleanupPolicy, mut decider: Option<&mut dyn Decider>, ledger: &mut Ledger) -> CleanupReport {
    let mut report = CleanupReport::default();

    for action in &plan.actions {
        match action {
            Action::MarkRemoved { id, files } => match resolve(policy, &mut decider, action) {
                Decision::Delete => {
                    let mut all_deleted = true;
                    for file in files {
                        if delete_file(file, &mut report) {
                            report.deleted_count += 1;
                        } else {
                            all_deleted = false;
                        }
                    }
                    // Only transition once every file is gone; a failed delete
                    // leaves the entry in its prior state for the next pass.
                    if all_deleted {
                        if let Some(entry) = ledger.get_mut(id) {
                            entry.status = TrackStatus::Removed;
                        }
                        report.removed_count += 1;
                        info!("marked removed: {}", id);
                    }
                }
                Decision::Keep => {
                    if let Some(entry) = ledger.get_mut(id) {
                        entry.status = TrackStatus::Kept;
                    }
                    report.kept_count += 1;
                    info!("keeping files for removed track {}", id);
                }
                Decision::Skip => {
                    info!("skipping cleanup for removed track {}", id);
                }
            },
            Action::Orphan(path) => match resolve(policy, &mut decider, action) {
                Decision::Delete => {
                    if delete_file(path, &mut report) {
                        report.orphans_deleted += 1;
                    }
                }
                Decision::Keep | Decision::Skip => {
                    info!("leaving orphaned file {:?} in place", path);
                }
            },
            Action::Acquire(_) | Action::Noop(_) => {}
        }
    }

    report
}
