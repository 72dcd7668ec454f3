//! # Sync Coordinator
//!
//! Pushes the working copy to the shared store on demand, skipping the write
//! when nothing changed since the last successful push. Changes are detected
//! with a SHA-256 fingerprint of the serialized document.
//!
//! Periodic pushing is described by [`AutoSyncPolicy`] and is off by default:
//! a background save racing an interactive one is how catalogues got wiped.

use crate::error::{KennelError, Result};
use crate::model::{Document, Role};
use crate::prompt::Prompter;
use crate::repository::Repository;
use crate::store::facade::SaveOutcome;
use crate::store::transport::Transport;
use sha2::{Digest, Sha256};
use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncReport {
    /// Another sync is running; this call did nothing.
    Busy,
    /// The working copy has no items; nothing was written.
    EmptyCatalogue,
    /// Same content as the last successful push.
    Unchanged,
    /// No remote store or no credential.
    NotWritable,
    Saved(SaveOutcome),
}

/// Clears the in-progress flag when dropped.
pub struct SyncGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

#[derive(Default)]
pub struct SyncCoordinator {
    in_progress: Cell<bool>,
    last_fingerprint: RefCell<Option<String>>,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_syncing(&self) -> bool {
        self.in_progress.get()
    }

    /// Claim the sync slot, or `None` if it is taken.
    pub fn try_begin(&self) -> Option<SyncGuard<'_>> {
        if self.in_progress.replace(true) {
            return None;
        }
        Some(SyncGuard {
            flag: &self.in_progress,
        })
    }

    pub fn last_fingerprint(&self) -> Option<String> {
        self.last_fingerprint.borrow().clone()
    }

    /// Administrator-triggered push.
    pub fn force_sync<T: Transport>(
        &self,
        actor: Role,
        repo: &mut Repository<T>,
        prompter: &dyn Prompter,
    ) -> Result<SyncReport> {
        if actor != Role::Admin {
            return Err(KennelError::PermissionDenied(
                "only administrators can publish changes".to_string(),
            ));
        }
        self.push(repo, prompter)
    }

    /// Timer-triggered push. Silently does nothing when writes are impossible.
    pub fn sync_data<T: Transport>(
        &self,
        repo: &mut Repository<T>,
        prompter: &dyn Prompter,
    ) -> Result<SyncReport> {
        if !repo.facade().can_write() {
            debug!("periodic sync skipped, store is not writable");
            return Ok(SyncReport::NotWritable);
        }
        self.push(repo, prompter)
    }

    fn push<T: Transport>(
        &self,
        repo: &mut Repository<T>,
        prompter: &dyn Prompter,
    ) -> Result<SyncReport> {
        let Some(_guard) = self.try_begin() else {
            debug!("sync already in progress");
            return Ok(SyncReport::Busy);
        };

        if repo.items().is_empty() {
            warn!("refusing to sync an empty catalogue");
            return Ok(SyncReport::EmptyCatalogue);
        }

        let fingerprint = fingerprint(repo.document())?;
        if self.last_fingerprint.borrow().as_deref() == Some(fingerprint.as_str()) {
            debug!("no changes since last sync");
            return Ok(SyncReport::Unchanged);
        }

        let outcome = repo.save(prompter)?;
        if outcome == SaveOutcome::Committed {
            info!(items = repo.items().len(), "sync committed");
            *self.last_fingerprint.borrow_mut() = Some(fingerprint);
        }
        Ok(SyncReport::Saved(outcome))
    }
}

/// Hex SHA-256 of the serialized document.
pub fn fingerprint(doc: &Document) -> Result<String> {
    let bytes = serde_json::to_vec(doc)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// When the periodic sync runs.
#[derive(Debug, Clone)]
pub struct AutoSyncPolicy {
    enabled: bool,
    interval: Duration,
    running: bool,
    last_run: Option<Instant>,
}

impl Default for AutoSyncPolicy {
    fn default() -> Self {
        Self::new(false, Duration::from_secs(30))
    }
}

impl AutoSyncPolicy {
    pub fn new(enabled: bool, interval: Duration) -> Self {
        Self {
            enabled,
            interval,
            running: false,
            last_run: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start the timer. Returns whether it is running; a disabled policy never
    /// starts.
    pub fn start(&mut self, now: Instant) -> bool {
        if !self.enabled {
            debug!("periodic sync is disabled");
            return false;
        }
        if !self.running {
            self.running = true;
            self.last_run = Some(now);
            info!(interval_secs = self.interval.as_secs(), "periodic sync started");
        }
        true
    }

    pub fn stop(&mut self) {
        if self.running {
            info!("periodic sync stopped");
        }
        self.running = false;
        self.last_run = None;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match (self.running, self.last_run) {
            (true, Some(last)) => now.duration_since(last) >= self.interval,
            _ => false,
        }
    }

    pub fn mark_ran(&mut self, now: Instant) {
        self.last_run = Some(now);
    }
}
