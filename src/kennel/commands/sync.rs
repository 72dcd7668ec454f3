use crate::commands::{require_admin, Actor, CmdMessage, CmdResult};
use crate::error::Result;
use crate::prompt::Prompter;
use crate::repository::Repository;
use crate::store::transport::Transport;
use crate::sync::{AutoSyncPolicy, SyncCoordinator, SyncReport};
use std::time::Instant;

fn report_message(report: &SyncReport) -> Option<CmdMessage> {
    match report {
        SyncReport::Busy => Some(CmdMessage::info("A sync is already running")),
        SyncReport::EmptyCatalogue => Some(CmdMessage::error(
            "The catalogue is empty; refusing to sync. Restore a backup first",
        )),
        SyncReport::Unchanged => Some(CmdMessage::info("Already up to date")),
        SyncReport::NotWritable => Some(CmdMessage::warning(
            "Cannot publish: no remote store or no GitHub token",
        )),
        // the save notification covers it
        SyncReport::Saved(_) => None,
    }
}

fn into_result(report: SyncReport) -> CmdResult {
    let mut result = CmdResult::default();
    if let Some(message) = report_message(&report) {
        result.add_message(message);
    }
    if let SyncReport::Saved(outcome) = &report {
        result = result.with_save(outcome.clone());
    }
    result.sync_report = Some(report);
    result
}

/// Administrator "publish now".
pub fn force<T: Transport>(
    coordinator: &SyncCoordinator,
    repo: &mut Repository<T>,
    actor: Option<&Actor>,
    prompter: &dyn Prompter,
) -> Result<CmdResult> {
    let actor = require_admin(actor)?;
    let report = coordinator.force_sync(actor.role, repo, prompter)?;
    Ok(into_result(report))
}

/// One step of the periodic loop: syncs when due, otherwise `None`.
pub fn tick<T: Transport>(
    policy: &mut AutoSyncPolicy,
    coordinator: &SyncCoordinator,
    repo: &mut Repository<T>,
    prompter: &dyn Prompter,
    now: Instant,
) -> Result<Option<CmdResult>> {
    if !policy.is_due(now) {
        return Ok(None);
    }
    policy.mark_ran(now);
    let report = coordinator.sync_data(repo, prompter)?;
    Ok(Some(into_result(report)))
}
