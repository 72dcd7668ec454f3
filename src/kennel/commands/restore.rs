//! Manual restores from the backup sources of the recovery chain.

use crate::commands::{require_admin, Actor, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Document;
use crate::prompt::Prompter;
use crate::recovery::BackupKind;
use crate::repository::Repository;
use crate::store::facade::SaveOutcome;
use crate::store::local::Snapshot;
use crate::store::transport::Transport;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSummary {
    pub items: usize,
    pub accounts: usize,
    pub taken_at: DateTime<Utc>,
}

impl SnapshotSummary {
    fn of(snapshot: &Snapshot) -> Self {
        Self {
            items: snapshot.document.item_count(),
            accounts: snapshot.document.accounts.len(),
            taken_at: snapshot.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotInfo {
    pub last_known_good: Option<SnapshotSummary>,
    pub emergency: Option<SnapshotSummary>,
    pub local_items: usize,
}

pub fn snapshot_info<T: Transport>(repo: &Repository<T>, actor: Option<&Actor>) -> Result<CmdResult> {
    require_admin(actor)?;
    let recovery = repo.recovery();
    let info = SnapshotInfo {
        last_known_good: recovery.last_known_good().map(SnapshotSummary::of),
        emergency: recovery.emergency().as_ref().map(SnapshotSummary::of),
        local_items: recovery.local_mirror().map_or(0, |d| d.item_count()),
    };
    let mut result = CmdResult::default();
    if info.last_known_good.is_none() && info.emergency.is_none() && info.local_items == 0 {
        result.add_message(CmdMessage::info("No backups on this device"));
    }
    result.snapshot = Some(info);
    Ok(result)
}

fn apply<T: Transport>(
    repo: &mut Repository<T>,
    kind: BackupKind,
    document: Document,
    prompter: &dyn Prompter,
) -> Option<CmdResult> {
    let question = format!(
        "Restore {} items from the {kind}? The current {} items will be replaced",
        document.item_count(),
        repo.items().len()
    );
    if !prompter.confirm(&question) {
        let mut result = CmdResult::default();
        result.add_message(CmdMessage::info("Restore cancelled"));
        return Some(result);
    }
    repo.replace(document);
    None
}

fn missing(kind: BackupKind) -> CmdResult {
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::warning(format!("No {kind} with items was found")));
    result
}

/// Local mirror into the repository, then saved.
pub fn restore_local<T: Transport>(
    repo: &mut Repository<T>,
    actor: Option<&Actor>,
    prompter: &dyn Prompter,
) -> Result<CmdResult> {
    require_admin(actor)?;
    let Some(document) = repo.recovery().local_mirror() else {
        return Ok(missing(BackupKind::LocalMirror));
    };
    if let Some(cancelled) = apply(repo, BackupKind::LocalMirror, document, prompter) {
        return Ok(cancelled);
    }
    let outcome = repo.save(prompter)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Restored {} items from the local backup",
        repo.items().len()
    )));
    Ok(result.with_save(outcome))
}

/// Last known good copy into the repository. Memory only.
pub fn restore_snapshot<T: Transport>(
    repo: &mut Repository<T>,
    actor: Option<&Actor>,
    prompter: &dyn Prompter,
) -> Result<CmdResult> {
    require_admin(actor)?;
    let Some(document) = repo
        .recovery()
        .last_known_good()
        .map(|s| s.document.clone())
    else {
        return Ok(missing(BackupKind::LastKnownGood));
    };
    if let Some(cancelled) = apply(repo, BackupKind::LastKnownGood, document, prompter) {
        return Ok(cancelled);
    }
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Restored {} items from the last known good copy (not saved yet)",
        repo.items().len()
    )));
    Ok(result)
}

/// Emergency snapshot into the repository, then saved. When the save could
/// not be published the user is told to sync once they can.
pub fn emergency_restore<T: Transport>(
    repo: &mut Repository<T>,
    actor: Option<&Actor>,
    prompter: &dyn Prompter,
) -> Result<CmdResult> {
    require_admin(actor)?;
    let Some(snapshot) = repo.recovery().emergency() else {
        return Ok(missing(BackupKind::Emergency));
    };
    if let Some(cancelled) = apply(repo, BackupKind::Emergency, snapshot.document, prompter) {
        return Ok(cancelled);
    }
    let outcome = repo.save(prompter)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Restored {} items from the emergency snapshot taken {}",
        repo.items().len(),
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    )));
    if repo.facade().can_read() && outcome != SaveOutcome::Committed {
        result.add_message(CmdMessage::warning(
            "Not published yet: run `kennel sync` as an administrator with a token",
        ));
    }
    Ok(result.with_save(outcome))
}
