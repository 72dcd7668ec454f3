//! # API Facade
//!
//! [`KennelApi`] is the application context: one per process, holding the
//! repository, the sync coordinator, the credential provider, the session and
//! the configuration. UIs talk to kennel only through it.
//!
//! Like the command layer underneath, it does no I/O of its own: no printing,
//! no prompting. Every method returns `Result<CmdResult>`, and decisions that
//! need a person go through the [`Prompter`] the caller passes in.
//!
//! ## Generic Over Transport
//!
//! `KennelApi<T: Transport>` is generic over the HTTP layer:
//! - Production: `KennelApi<UreqTransport>`
//! - Testing: `KennelApi<Rc<MemContentsApi>>`

use crate::commands::{self, auth, backup, items, restore, status, Actor};
use crate::config::KennelConfig;
use crate::credentials::{CredentialProvider, StoredCredentials};
use crate::error::Result;
use crate::model::{ItemId, ItemPatch, LifecycleStatus, NewItem};
use crate::prompt::Prompter;
use crate::repository::{LoadReport, Repository};
use crate::session::SessionManager;
use crate::store::backend::StorageBackend;
use crate::store::facade::StoreFacade;
use crate::store::local::LocalSnapshotStore;
use crate::store::remote::RemoteDocumentStore;
use crate::store::transport::Transport;
use crate::sync::{AutoSyncPolicy, SyncCoordinator};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;
use std::time::{Duration, Instant};

pub struct KennelApi<T: Transport> {
    repo: Repository<T>,
    sync: SyncCoordinator,
    credentials: Rc<dyn CredentialProvider>,
    sessions: SessionManager,
    config: KennelConfig,
    config_dir: PathBuf,
    load_report: Option<LoadReport>,
}

impl<T: Transport> KennelApi<T> {
    /// Wire the stores together. Nothing is read until [`KennelApi::load`].
    pub fn new(
        transport: T,
        backend: Rc<dyn StorageBackend>,
        config: KennelConfig,
        config_dir: PathBuf,
    ) -> Self {
        let credentials: Rc<dyn CredentialProvider> =
            Rc::new(StoredCredentials::new(backend.clone()));
        let remote = config
            .remote()
            .cloned()
            .map(|remote| RemoteDocumentStore::new(transport, credentials.clone(), remote));
        let local = LocalSnapshotStore::new(backend.clone());
        let facade = StoreFacade::new(remote, local, config.asset_mode);
        Self {
            repo: Repository::new(facade, config.admin.clone()),
            sync: SyncCoordinator::new(),
            credentials,
            sessions: SessionManager::new(backend),
            config,
            config_dir,
            load_report: None,
        }
    }

    /// Load the shared document. `prompter` answers the questions a first
    /// run may raise when it persists the bootstrap administrator.
    pub fn load(&mut self, prompter: &dyn Prompter) -> &LoadReport {
        self.load_report.insert(self.repo.load(prompter))
    }

    pub fn load_report(&self) -> Option<&LoadReport> {
        self.load_report.as_ref()
    }

    pub fn repository(&self) -> &Repository<T> {
        &self.repo
    }

    pub fn config(&self) -> &KennelConfig {
        &self.config
    }

    pub fn actor(&self) -> Option<Actor> {
        auth::current_actor(&self.repo, &self.sessions)
    }

    pub fn auto_sync_policy(&self) -> AutoSyncPolicy {
        AutoSyncPolicy::new(
            self.config.auto_sync.enabled,
            Duration::from_secs(self.config.auto_sync.interval_secs.max(1)),
        )
    }

    pub fn list_items(&mut self, status: Option<LifecycleStatus>) -> Result<commands::CmdResult> {
        Ok(items::list(&mut self.repo, status))
    }

    pub fn view_items<I: AsRef<str>>(&self, ids: &[I]) -> Result<commands::CmdResult> {
        items::view(&self.repo, &parse_ids(ids)?)
    }

    pub fn add_item(
        &mut self,
        new: NewItem,
        photos: &[items::PhotoUpload],
        prompter: &dyn Prompter,
    ) -> Result<commands::CmdResult> {
        let actor = self.actor();
        items::add(&mut self.repo, actor.as_ref(), new, photos, prompter)
    }

    pub fn edit_item(
        &mut self,
        id: &str,
        patch: ItemPatch,
        photos: &[items::PhotoUpload],
        prompter: &dyn Prompter,
    ) -> Result<commands::CmdResult> {
        let id = ItemId::from_str(id)?;
        let actor = self.actor();
        items::edit(&mut self.repo, actor.as_ref(), id, patch, photos, prompter)
    }

    pub fn delete_items<I: AsRef<str>>(
        &mut self,
        ids: &[I],
        prompter: &dyn Prompter,
    ) -> Result<commands::CmdResult> {
        let ids = parse_ids(ids)?;
        let actor = self.actor();
        items::delete(&mut self.repo, actor.as_ref(), &ids, prompter)
    }

    pub fn login(
        &mut self,
        username: &str,
        password: &str,
        token: Option<&str>,
        remember: bool,
    ) -> Result<commands::CmdResult> {
        auth::login(
            &self.repo,
            self.credentials.as_ref(),
            &self.sessions,
            username,
            password,
            token,
            remember,
        )
    }

    pub fn logout(&mut self) -> Result<commands::CmdResult> {
        auth::logout(self.credentials.as_ref(), &self.sessions)
    }

    pub fn register(
        &mut self,
        form: auth::Registration,
        prompter: &dyn Prompter,
    ) -> Result<commands::CmdResult> {
        auth::register(&mut self.repo, form, prompter)
    }

    pub fn sync(&mut self, prompter: &dyn Prompter) -> Result<commands::CmdResult> {
        let actor = self.actor();
        commands::sync::force(&self.sync, &mut self.repo, actor.as_ref(), prompter)
    }

    pub fn sync_tick(
        &mut self,
        policy: &mut AutoSyncPolicy,
        prompter: &dyn Prompter,
        now: Instant,
    ) -> Result<Option<commands::CmdResult>> {
        commands::sync::tick(policy, &self.sync, &mut self.repo, prompter, now)
    }

    pub fn export(&self, output: &Path) -> Result<commands::CmdResult> {
        backup::export(&self.repo, self.actor().as_ref(), output)
    }

    pub fn import(&mut self, input: &Path, prompter: &dyn Prompter) -> Result<commands::CmdResult> {
        let actor = self.actor();
        backup::import(&mut self.repo, actor.as_ref(), input, prompter)
    }

    pub fn restore(
        &mut self,
        source: RestoreSource,
        prompter: &dyn Prompter,
    ) -> Result<commands::CmdResult> {
        let actor = self.actor();
        match source {
            RestoreSource::Local => restore::restore_local(&mut self.repo, actor.as_ref(), prompter),
            RestoreSource::Snapshot => {
                restore::restore_snapshot(&mut self.repo, actor.as_ref(), prompter)
            }
            RestoreSource::Emergency => {
                restore::emergency_restore(&mut self.repo, actor.as_ref(), prompter)
            }
        }
    }

    /// Save the working copy as it is (after a memory-only restore).
    pub fn save(&mut self, prompter: &dyn Prompter) -> Result<commands::CmdResult> {
        let outcome = self.repo.save(prompter)?;
        Ok(commands::CmdResult::default().with_save(outcome))
    }

    pub fn snapshot_info(&self) -> Result<commands::CmdResult> {
        restore::snapshot_info(&self.repo, self.actor().as_ref())
    }

    pub fn status(&self) -> Result<commands::CmdResult> {
        Ok(status::run(
            &self.repo,
            &self.config,
            self.load_report.as_ref().map(|r| r.origin),
            self.sessions.current(),
            self.actor(),
        ))
    }

    pub fn configure(&mut self, action: ConfigAction) -> Result<commands::CmdResult> {
        let result = commands::config::run(&self.config_dir, action)?;
        if let Some(config) = &result.config {
            self.config = config.clone();
        }
        Ok(result)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    Local,
    Snapshot,
    Emergency,
}

fn parse_ids<I: AsRef<str>>(inputs: &[I]) -> Result<Vec<ItemId>> {
    inputs
        .iter()
        .map(|s| ItemId::from_str(s.as_ref()))
        .collect()
}

pub use crate::commands::config::ConfigAction;
pub use crate::commands::{CmdMessage, CmdResult, MessageLevel};
