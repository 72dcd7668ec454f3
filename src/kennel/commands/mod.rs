use crate::config::KennelConfig;
use crate::error::{KennelError, Result};
use crate::model::{Item, Role};
use crate::session::Session;
use crate::store::facade::{LocalOnlyReason, SaveOutcome};
use crate::sync::SyncReport;
use std::path::PathBuf;

pub mod auth;
pub mod backup;
pub mod config;
pub mod items;
pub mod restore;
pub mod status;
pub mod sync;

/// Who is issuing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn require_admin(actor: Option<&Actor>) -> Result<&Actor> {
    match actor {
        Some(actor) if actor.is_admin() => Ok(actor),
        Some(actor) => Err(KennelError::PermissionDenied(format!(
            "'{}' is not an administrator",
            actor.username
        ))),
        None => Err(KennelError::PermissionDenied(
            "log in as an administrator first".to_string(),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub affected_items: Vec<Item>,
    pub listed_items: Vec<Item>,
    pub save_outcome: Option<SaveOutcome>,
    pub sync_report: Option<SyncReport>,
    pub status: Option<status::StatusReport>,
    pub snapshot: Option<restore::SnapshotInfo>,
    pub session: Option<Session>,
    pub config: Option<KennelConfig>,
    pub written_path: Option<PathBuf>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_affected_items(mut self, items: Vec<Item>) -> Self {
        self.affected_items = items;
        self
    }

    pub fn with_listed_items(mut self, items: Vec<Item>) -> Self {
        self.listed_items = items;
        self
    }

    pub fn with_config(mut self, config: KennelConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Record a save and the notification that goes with it.
    pub fn with_save(mut self, outcome: SaveOutcome) -> Self {
        self.add_message(describe_save(&outcome));
        self.save_outcome = Some(outcome);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.level == MessageLevel::Error)
    }
}

/// User-facing notification for a save result.
pub fn describe_save(outcome: &SaveOutcome) -> CmdMessage {
    match outcome {
        SaveOutcome::Committed => CmdMessage::success("Changes published"),
        SaveOutcome::LocalOnly(LocalOnlyReason::NoRemote) => {
            CmdMessage::info("Saved locally (no remote store configured)")
        }
        SaveOutcome::LocalOnly(LocalOnlyReason::NoCredential) => CmdMessage::warning(
            "Saved on this device only: log in as an administrator with a GitHub token to publish",
        ),
        SaveOutcome::LocalOnly(LocalOnlyReason::RemoteFailed(reason)) => CmdMessage::warning(
            format!("Could not publish ({reason}); saved on this device only"),
        ),
        SaveOutcome::AdoptedRemote(doc) => CmdMessage::warning(format!(
            "Loaded the server copy ({} items); your unsaved changes were discarded",
            doc.item_count()
        )),
        SaveOutcome::Cancelled => CmdMessage::info("Save cancelled, nothing was written"),
    }
}
