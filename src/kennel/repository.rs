//! # In-Memory Repository
//!
//! The authoritative working copy of the [`Document`] for one session. Edits
//! only touch memory (plus the emergency snapshot); nothing reaches a store
//! until [`Repository::save`] is called, so a multi-step edit such as "add an
//! item, then upload its pictures" is committed once, at the end.
//!
//! ## Loss protection
//!
//! - Every mutation rewrites the emergency snapshot (non-empty states only).
//! - A load that comes back empty consults the emergency snapshot, then the
//!   local mirror, before accepting an empty catalogue.
//! - [`Repository::ensure_not_empty`] lets callers restore a wiped working
//!   copy before doing anything destructive with it.
//! - The last non-empty state seen at load or save time is kept in memory.

use crate::config::AdminConfig;
use crate::error::{KennelError, Result};
use crate::model::{Account, Document, Item, ItemId, ItemPatch, LifecycleStatus, NewItem, Role};
use crate::prompt::{ConflictChoice, ConflictReport, Prompter};
use crate::recovery::{BackupKind, RecoveryChain};
use crate::store::facade::{LoadOrigin, SaveOutcome, StoreFacade};
use crate::store::transport::Transport;
use tracing::{info, warn};
use uuid::Uuid;

/// A bootstrap administrator created during load.
#[derive(Debug, Clone, PartialEq)]
pub struct Bootstrapped {
    pub username: String,
    /// Only reported here; it is not recoverable later.
    pub password: String,
    /// `None` when the account was kept in memory only: the remote could not
    /// be read, or persisting failed (logged).
    pub persisted: Option<SaveOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub origin: LoadOrigin,
    pub recovered: Option<BackupKind>,
    pub bootstrapped: Option<Bootstrapped>,
}

/// Prompter for persisting a freshly created bootstrap account. The write
/// only adds an account, so a fuller remote always wins; every other
/// question goes to the caller's prompter.
struct BootstrapPrompter<'a> {
    inner: &'a dyn Prompter,
}

impl Prompter for BootstrapPrompter<'_> {
    fn resolve_conflict(&self, _report: &ConflictReport) -> ConflictChoice {
        ConflictChoice::TakeRemote
    }

    fn confirm_empty_write(&self) -> bool {
        self.inner.confirm_empty_write()
    }

    fn confirm(&self, question: &str) -> bool {
        self.inner.confirm(question)
    }
}

pub struct Repository<T: Transport> {
    facade: StoreFacade<T>,
    recovery: RecoveryChain,
    admin: AdminConfig,
    document: Document,
}

impl<T: Transport> Repository<T> {
    pub fn new(facade: StoreFacade<T>, admin: AdminConfig) -> Self {
        let recovery = RecoveryChain::new(facade.local().clone());
        Self {
            facade,
            recovery,
            admin,
            document: Document::new(),
        }
    }

    pub fn facade(&self) -> &StoreFacade<T> {
        &self.facade
    }

    pub fn recovery(&self) -> &RecoveryChain {
        &self.recovery
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn items(&self) -> &[Item] {
        &self.document.items
    }

    pub fn find_item(&self, id: ItemId) -> Option<&Item> {
        self.document.find_item(id)
    }

    pub fn items_by_status(&self, status: LifecycleStatus) -> Vec<&Item> {
        self.document.items_by_status(status)
    }

    pub fn find_account(&self, username: &str) -> Option<(&str, &Account)> {
        self.document.find_account(username)
    }

    /// Load from the facade, recovering from local backups when the result is
    /// empty, then make sure the bootstrap administrator exists. A new
    /// administrator is persisted only when the shared data was readable;
    /// `prompter` answers the empty-write confirmation that may take.
    pub fn load(&mut self, prompter: &dyn Prompter) -> LoadReport {
        let loaded = self.facade.load();
        let mut recovered = None;

        self.document = if loaded.document.is_empty() {
            match self.recovery.recover_after_load() {
                Some(found) => {
                    warn!(
                        source = %found.kind,
                        items = found.document.item_count(),
                        "loaded an empty document, restored from backup"
                    );
                    recovered = Some(found.kind);
                    found.document
                }
                None => {
                    info!("no data anywhere, starting with an empty catalogue");
                    loaded.document
                }
            }
        } else {
            loaded.document
        };

        self.recovery.remember(&self.document);
        info!(
            origin = ?loaded.origin,
            items = self.document.item_count(),
            accounts = self.document.accounts.len(),
            "document loaded"
        );

        let bootstrapped = self.ensure_bootstrap_admin().map(|(username, password)| {
            let persisted = if loaded.origin == LoadOrigin::Unavailable {
                warn!("shared data unreadable, bootstrap administrator kept in memory only");
                None
            } else {
                match self.save(&BootstrapPrompter { inner: prompter }) {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        warn!(error = %e, "could not persist the bootstrap administrator");
                        None
                    }
                }
            };
            Bootstrapped {
                username,
                password,
                persisted,
            }
        });

        LoadReport {
            origin: loaded.origin,
            recovered,
            bootstrapped,
        }
    }

    /// Insert the configured administrator if missing. Returns its credentials.
    fn ensure_bootstrap_admin(&mut self) -> Option<(String, String)> {
        if self.document.find_account(&self.admin.username).is_some() {
            return None;
        }
        let password = self
            .admin
            .bootstrap_password
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        self.document.accounts.insert(
            self.admin.username.clone(),
            Account {
                password: password.clone(),
                role: Role::Admin,
                email: self.admin.email.clone(),
            },
        );
        info!(username = %self.admin.username, "bootstrap administrator created");
        Some((self.admin.username.clone(), password))
    }

    fn capture(&self) {
        if let Err(e) = self.recovery.capture(&self.document) {
            warn!(error = %e, "emergency snapshot failed");
        }
    }

    pub fn add_item(&mut self, new: NewItem) -> Result<ItemId> {
        let id = match new.id {
            Some(id) if self.document.find_item(id).is_some() => {
                return Err(KennelError::DuplicateItem(id))
            }
            Some(id) => id,
            None => ItemId::generate(&self.document.items)?,
        };
        self.document.items.push(new.into_item(id));
        self.capture();
        info!(%id, items = self.document.item_count(), "item added");
        Ok(id)
    }

    pub fn update_item(&mut self, id: ItemId, patch: ItemPatch) -> Result<()> {
        let item = self
            .document
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(KennelError::RecordNotFound(id))?;
        patch.apply(item);
        self.capture();
        info!(%id, "item updated");
        Ok(())
    }

    pub fn delete_item(&mut self, id: ItemId) -> Result<Item> {
        let pos = self
            .document
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(KennelError::RecordNotFound(id))?;
        let removed = self.document.items.remove(pos);
        self.capture();
        info!(%id, items = self.document.item_count(), "item deleted");
        Ok(removed)
    }

    pub fn add_account(&mut self, username: &str, account: Account) -> Result<()> {
        if self.document.find_account(username).is_some() {
            return Err(KennelError::Validation(format!(
                "user '{username}' already exists"
            )));
        }
        self.document
            .accounts
            .insert(username.to_string(), account);
        Ok(())
    }

    /// Restore the working copy if it has lost every item while a backup has
    /// not. Returns the source used.
    pub fn ensure_not_empty(&mut self) -> Option<BackupKind> {
        if !self.document.items.is_empty() {
            return None;
        }
        let found = self.recovery.recover_in_session()?;
        warn!(source = %found.kind, items = found.document.item_count(), "working copy was empty, restored");
        self.document = found.document;
        self.ensure_bootstrap_admin();
        Some(found.kind)
    }

    /// Swap in a whole document (import, restore). Memory only.
    pub fn replace(&mut self, doc: Document) {
        self.document = doc;
        self.ensure_bootstrap_admin();
        self.recovery.remember(&self.document);
        self.capture();
    }

    /// Persist the working copy through the facade.
    pub fn save(&mut self, prompter: &dyn Prompter) -> Result<SaveOutcome> {
        let outcome = self.facade.save(&self.document, prompter)?;
        match &outcome {
            SaveOutcome::AdoptedRemote(remote) => {
                self.document = remote.clone();
                self.ensure_bootstrap_admin();
                self.recovery.remember(&self.document);
            }
            SaveOutcome::Committed | SaveOutcome::LocalOnly(_) => {
                self.recovery.remember(&self.document);
            }
            SaveOutcome::Cancelled => {}
        }
        Ok(outcome)
    }
}
