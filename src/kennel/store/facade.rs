//! Single entry point for persistence.
//!
//! Routes reads and writes to the remote store when one is configured, and to
//! the local snapshot store otherwise. All data-loss protection that applies
//! at write time lives in [`StoreFacade::save`]:
//!
//! 1. conflict check: a remote holding more items than the local copy is
//!    never overwritten without asking, and the write is pinned to the
//!    revision that check read;
//! 2. empty-write guard: an empty catalogue is never written while any backup
//!    still has items;
//! 3. the write itself, mirrored locally on success.

use super::assets::{self, AssetMode};
use super::local::LocalSnapshotStore;
use super::remote::{RemoteDocumentStore, RemoteWrite};
use super::transport::Transport;
use crate::error::{KennelError, Result};
use crate::model::{AssetRef, Document};
use crate::prompt::{ConflictChoice, ConflictReport, Prompter};
use crate::recovery::BackupKind;
use tracing::{debug, info, warn};

/// Why a save did not reach the shared document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOnlyReason {
    NoRemote,
    NoCredential,
    RemoteFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Written remotely and mirrored locally.
    Committed,
    /// Written to this device only; not visible to other visitors.
    LocalOnly(LocalOnlyReason),
    /// Nothing written: the remote copy was chosen over the local one.
    AdoptedRemote(Document),
    /// Nothing written: the empty write was declined.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Remote,
    Public,
    Local,
    /// A remote is configured but could not be read.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub document: Document,
    pub origin: LoadOrigin,
}

pub struct StoreFacade<T: Transport> {
    remote: Option<RemoteDocumentStore<T>>,
    local: LocalSnapshotStore,
    asset_mode: AssetMode,
}

impl<T: Transport> StoreFacade<T> {
    pub fn new(
        remote: Option<RemoteDocumentStore<T>>,
        local: LocalSnapshotStore,
        asset_mode: AssetMode,
    ) -> Self {
        Self {
            remote,
            local,
            asset_mode,
        }
    }

    pub fn local(&self) -> &LocalSnapshotStore {
        &self.local
    }

    pub fn remote(&self) -> Option<&RemoteDocumentStore<T>> {
        self.remote.as_ref()
    }

    pub fn can_read(&self) -> bool {
        self.remote.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.remote.as_ref().is_some_and(|r| r.has_credential())
    }

    pub fn load(&self) -> Loaded {
        let Some(remote) = &self.remote else {
            return Loaded {
                document: self.local.load(),
                origin: LoadOrigin::Local,
            };
        };

        if remote.has_credential() {
            match remote.read_for_update() {
                Ok(Some(head)) => match head.document {
                    Some(document) => {
                        return Loaded {
                            document,
                            origin: LoadOrigin::Remote,
                        }
                    }
                    None => warn!("remote document unreadable, trying public mirror"),
                },
                // the contents API answered 404: nothing has been published yet
                Ok(None) => {
                    debug!("no document published yet");
                    return Loaded {
                        document: Document::default(),
                        origin: LoadOrigin::Remote,
                    };
                }
                Err(e) => warn!(error = %e, "authenticated read failed, trying public mirror"),
            }
        }

        match remote.try_read_public() {
            Ok(Some(document)) => Loaded {
                document,
                origin: LoadOrigin::Public,
            },
            Ok(None) => Loaded {
                document: Document::default(),
                origin: LoadOrigin::Unavailable,
            },
            Err(e) => {
                warn!(error = %e, "remote store unavailable");
                Loaded {
                    document: Document::default(),
                    origin: LoadOrigin::Unavailable,
                }
            }
        }
    }

    pub fn save(&self, doc: &Document, prompter: &dyn Prompter) -> Result<SaveOutcome> {
        // revision the write must land on, taken from the same read as the conflict check
        let mut expected_sha = None;
        if let Some(remote) = self.remote.as_ref().filter(|r| r.has_credential()) {
            match remote.read_for_update() {
                Ok(Some(head)) => {
                    if let Some(current) = head
                        .document
                        .filter(|current| current.item_count() > doc.item_count())
                    {
                        let report = ConflictReport {
                            local_items: doc.item_count(),
                            remote_items: current.item_count(),
                        };
                        warn!(
                            local = report.local_items,
                            remote = report.remote_items,
                            "remote holds more items than the copy being saved"
                        );
                        if prompter.resolve_conflict(&report) == ConflictChoice::TakeRemote {
                            info!("adopting remote document");
                            return Ok(SaveOutcome::AdoptedRemote(current));
                        }
                    }
                    expected_sha = Some(head.sha);
                }
                Ok(None) => debug!("no remote document yet"),
                Err(e) if doc.items.is_empty() => {
                    warn!(error = %e, "cannot check the remote before an empty write");
                    return Err(KennelError::Transport(format!(
                        "the published catalogue could not be checked before saving an empty one ({e})"
                    )));
                }
                Err(e) => {
                    warn!(error = %e, "conflict check failed, keeping the change on this device");
                    self.local.save(doc)?;
                    return Ok(SaveOutcome::LocalOnly(LocalOnlyReason::RemoteFailed(
                        e.to_string(),
                    )));
                }
            }
        }

        if doc.items.is_empty() {
            if let Some((backup, items)) = self.non_empty_backup() {
                warn!(%backup, items, "refusing to overwrite a backup with an empty catalogue");
                return Err(KennelError::RefusedEmptyOverwrite { backup, items });
            }
            if !prompter.confirm_empty_write() {
                return Ok(SaveOutcome::Cancelled);
            }
        }

        let remote = match &self.remote {
            None => {
                self.local.save(doc)?;
                return Ok(SaveOutcome::LocalOnly(LocalOnlyReason::NoRemote));
            }
            Some(remote) if !remote.has_credential() => {
                self.local.save(doc)?;
                return Ok(SaveOutcome::LocalOnly(LocalOnlyReason::NoCredential));
            }
            Some(remote) => remote,
        };

        match remote.write_at(doc, expected_sha.as_deref())? {
            RemoteWrite::Committed { .. } => {
                self.local.save(doc)?;
                Ok(SaveOutcome::Committed)
            }
            RemoteWrite::Conflict => Err(KennelError::RevisionConflict),
            RemoteWrite::Failed(reason) => {
                self.local.save(doc)?;
                Ok(SaveOutcome::LocalOnly(LocalOnlyReason::RemoteFailed(reason)))
            }
        }
    }

    fn non_empty_backup(&self) -> Option<(BackupKind, usize)> {
        let mirror = self.local.load().item_count();
        if mirror > 0 {
            return Some((BackupKind::LocalMirror, mirror));
        }
        self.local
            .load_emergency()
            .map(|s| s.document.item_count())
            .filter(|n| *n > 0)
            .map(|n| (BackupKind::Emergency, n))
    }

    /// Store a picture and return the reference to put in an item.
    pub fn upload_asset(&self, bytes: &[u8], name: &str, mime: &str) -> Result<AssetRef> {
        assets::validate(bytes, mime, name)?;
        match (&self.remote, self.asset_mode) {
            (Some(remote), AssetMode::Commit) if remote.has_credential() => {
                remote.commit_asset(bytes, name)
            }
            _ => Ok(self.local.upload_asset(bytes, mime)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialProvider, StaticCredentials};
    use crate::model::{ItemId, NewItem};
    use crate::prompt::{FixedPrompter, ScriptedPrompter};
    use crate::store::mem_backend::MemBackend;
    use crate::store::mem_remote::{Interleaved, MemContentsApi};
    use std::rc::Rc;

    struct Fixture {
        api: Rc<MemContentsApi>,
        local: LocalSnapshotStore,
        facade: StoreFacade<Rc<MemContentsApi>>,
    }

    fn fixture(token: Option<&str>, mode: AssetMode) -> Fixture {
        let api = Rc::new(MemContentsApi::new());
        let creds: Rc<dyn CredentialProvider> = Rc::new(StaticCredentials::new(token));
        let remote = RemoteDocumentStore::new(api.clone(), creds, MemContentsApi::remote_config());
        let local = LocalSnapshotStore::new(Rc::new(MemBackend::new()));
        let facade = StoreFacade::new(Some(remote), local.clone(), mode);
        Fixture { api, local, facade }
    }

    fn local_only() -> (LocalSnapshotStore, StoreFacade<Rc<MemContentsApi>>) {
        let local = LocalSnapshotStore::new(Rc::new(MemBackend::new()));
        (local.clone(), StoreFacade::new(None, local, AssetMode::Inline))
    }

    fn doc_with(n: u64) -> Document {
        let mut doc = Document::new();
        for i in 0..n {
            doc.items.push(
                NewItem {
                    name: format!("pet {i}"),
                    ..Default::default()
                }
                .into_item(ItemId(i + 1)),
            );
        }
        doc
    }

    #[test]
    fn capabilities() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        assert!(f.facade.can_read());
        assert!(f.facade.can_write());

        let f = fixture(None, AssetMode::Inline);
        assert!(f.facade.can_read());
        assert!(!f.facade.can_write());

        let (_, facade) = local_only();
        assert!(!facade.can_read());
        assert!(!facade.can_write());
    }

    #[test]
    fn empty_save_refused_while_local_mirror_has_items() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        f.local.save(&doc_with(3)).unwrap();

        let err = f.facade.save(&Document::new(), &FixedPrompter::yes()).unwrap_err();
        assert!(matches!(
            err,
            KennelError::RefusedEmptyOverwrite {
                backup: BackupKind::LocalMirror,
                items: 3
            }
        ));
        assert_eq!(f.api.put_count(), 0);
        assert_eq!(f.local.load().item_count(), 3);
    }

    #[test]
    fn empty_save_refused_while_emergency_snapshot_has_items() {
        let (local, facade) = local_only();
        local.save_emergency(&doc_with(2)).unwrap();
        assert!(matches!(
            facade.save(&Document::new(), &FixedPrompter::yes()),
            Err(KennelError::RefusedEmptyOverwrite {
                backup: BackupKind::Emergency,
                items: 2
            })
        ));
    }

    #[test]
    fn empty_save_without_backups_asks_first() {
        let (local, facade) = local_only();
        assert_eq!(
            facade.save(&Document::new(), &FixedPrompter::no()).unwrap(),
            SaveOutcome::Cancelled
        );
        assert_eq!(
            facade.save(&Document::new(), &FixedPrompter::yes()).unwrap(),
            SaveOutcome::LocalOnly(LocalOnlyReason::NoRemote)
        );
        assert!(local.load().is_empty());
    }

    #[test]
    fn committed_save_is_mirrored_locally() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        let doc = doc_with(2);
        assert_eq!(
            f.facade.save(&doc, &FixedPrompter::yes()).unwrap(),
            SaveOutcome::Committed
        );
        assert_eq!(f.api.document("data.json").unwrap(), doc);
        assert_eq!(f.local.load(), doc);
    }

    #[test]
    fn without_token_saves_locally_only() {
        let f = fixture(None, AssetMode::Inline);
        let outcome = f.facade.save(&doc_with(1), &FixedPrompter::yes()).unwrap();
        assert_eq!(outcome, SaveOutcome::LocalOnly(LocalOnlyReason::NoCredential));
        assert_eq!(f.api.put_count(), 0);
        assert_eq!(f.local.load().item_count(), 1);
    }

    #[test]
    fn remote_failure_falls_back_to_local() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        f.api.fail_next_put(502);
        let outcome = f.facade.save(&doc_with(1), &FixedPrompter::yes()).unwrap();
        assert!(matches!(
            outcome,
            SaveOutcome::LocalOnly(LocalOnlyReason::RemoteFailed(_))
        ));
        assert_eq!(f.local.load().item_count(), 1);
    }

    #[test]
    fn larger_remote_declined_adopts_remote_without_writing() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        let remote_doc = doc_with(5);
        f.api.seed_document("data.json", &remote_doc);

        let prompter = ScriptedPrompter::new().on_conflict(ConflictChoice::TakeRemote);
        let outcome = f.facade.save(&doc_with(2), &prompter).unwrap();
        assert_eq!(outcome, SaveOutcome::AdoptedRemote(remote_doc.clone()));
        assert_eq!(f.api.put_count(), 0);
        assert_eq!(f.api.document("data.json").unwrap(), remote_doc);
        assert_eq!(prompter.asked(), vec!["conflict: local 2 / remote 5"]);
    }

    #[test]
    fn larger_remote_kept_local_overwrites() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        f.api.seed_document("data.json", &doc_with(5));
        let prompter = ScriptedPrompter::new().on_conflict(ConflictChoice::KeepLocal);
        assert_eq!(
            f.facade.save(&doc_with(2), &prompter).unwrap(),
            SaveOutcome::Committed
        );
        assert_eq!(f.api.document("data.json").unwrap().item_count(), 2);
    }

    #[test]
    fn stale_revision_is_a_hard_error() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        f.api.seed_document("data.json", &doc_with(1));
        f.api.edit_before_next_put("data.json", &Document::new());

        let err = f.facade.save(&doc_with(2), &FixedPrompter::yes()).unwrap_err();
        assert!(matches!(err, KennelError::RevisionConflict));
        // nothing mirrored either
        assert!(f.local.load().is_empty());
    }

    fn interleaved(token: Option<&str>) -> (Rc<MemContentsApi>, Rc<Interleaved>, StoreFacade<Rc<Interleaved>>) {
        let api = Rc::new(MemContentsApi::new());
        let transport = Rc::new(Interleaved::new(api.clone()));
        let creds: Rc<dyn CredentialProvider> = Rc::new(StaticCredentials::new(token));
        let remote =
            RemoteDocumentStore::new(transport.clone(), creds, MemContentsApi::remote_config());
        let local = LocalSnapshotStore::new(Rc::new(MemBackend::new()));
        let facade = StoreFacade::new(Some(remote), local, AssetMode::Inline);
        (api, transport, facade)
    }

    #[test]
    fn commit_between_check_and_write_is_a_conflict() {
        let (api, transport, facade) = interleaved(Some("tok"));
        api.seed_document("data.json", &doc_with(2));
        transport.commit_after_next_get("data.json", &doc_with(6));

        let err = facade.save(&doc_with(3), &FixedPrompter::yes()).unwrap_err();
        assert!(matches!(err, KennelError::RevisionConflict));
        assert_eq!(api.document("data.json").unwrap().item_count(), 6);
        assert!(facade.local().load().is_empty());
    }

    #[test]
    fn empty_write_is_refused_when_the_remote_cannot_be_checked() {
        let (api, transport, facade) = interleaved(Some("tok"));
        api.seed_document("data.json", &doc_with(5));
        transport.fail_gets(1);

        let err = facade.save(&Document::new(), &FixedPrompter::yes()).unwrap_err();
        assert!(matches!(err, KennelError::Transport(_)));
        assert_eq!(api.put_count(), 0);
        assert_eq!(api.document("data.json").unwrap().item_count(), 5);
    }

    #[test]
    fn failed_remote_check_keeps_the_change_on_this_device() {
        let (api, transport, facade) = interleaved(Some("tok"));
        api.seed_document("data.json", &doc_with(5));
        transport.fail_gets(1);

        let outcome = facade.save(&doc_with(1), &FixedPrompter::yes()).unwrap();
        assert!(matches!(
            outcome,
            SaveOutcome::LocalOnly(LocalOnlyReason::RemoteFailed(_))
        ));
        assert_eq!(api.put_count(), 0);
        assert_eq!(facade.local().load().item_count(), 1);
    }

    #[test]
    fn load_prefers_credentialed_then_public() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        f.api.seed_document("data.json", &doc_with(2));
        let loaded = f.facade.load();
        assert_eq!(loaded.origin, LoadOrigin::Remote);
        assert_eq!(loaded.document.item_count(), 2);

        let g = fixture(None, AssetMode::Inline);
        g.api.seed_document("data.json", &doc_with(1));
        assert_eq!(g.facade.load().origin, LoadOrigin::Public);
    }

    #[test]
    fn credentialed_load_of_a_new_repository_is_empty_not_unavailable() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        let loaded = f.facade.load();
        assert_eq!(loaded.origin, LoadOrigin::Remote);
        assert!(loaded.document.is_empty());

        let g = fixture(None, AssetMode::Inline);
        assert_eq!(g.facade.load().origin, LoadOrigin::Unavailable);
    }

    #[test]
    fn load_reports_unavailable_remote() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        f.api.set_offline(true);
        f.local.save(&doc_with(4)).unwrap();
        let loaded = f.facade.load();
        assert_eq!(loaded.origin, LoadOrigin::Unavailable);
        assert!(loaded.document.is_empty());
    }

    #[test]
    fn load_without_remote_reads_local() {
        let (local, facade) = local_only();
        local.save(&doc_with(2)).unwrap();
        assert_eq!(facade.load().origin, LoadOrigin::Local);
        assert_eq!(facade.load().document.item_count(), 2);
    }

    #[test]
    fn assets_inline_by_default() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        let asset = f.facade.upload_asset(b"jpegbytes", "a.jpg", "image/jpeg").unwrap();
        assert!(asset.starts_with("data:image/jpeg;base64,"));
        assert_eq!(f.api.put_count(), 0);
    }

    #[test]
    fn assets_committed_when_configured() {
        let f = fixture(Some("tok"), AssetMode::Commit);
        let asset = f.facade.upload_asset(b"png", "7_x.png", "image/png").unwrap();
        assert_eq!(asset, "mem://raw/breeder/site/main/pets/images/7_x.png");

        // no token: commit mode degrades to inline
        let g = fixture(None, AssetMode::Commit);
        assert!(g
            .facade
            .upload_asset(b"png", "7_x.png", "image/png")
            .unwrap()
            .starts_with("data:"));
    }

    #[test]
    fn invalid_assets_rejected() {
        let f = fixture(Some("tok"), AssetMode::Inline);
        assert!(matches!(
            f.facade.upload_asset(b"", "a.png", "image/png"),
            Err(KennelError::InvalidAsset(_))
        ));
        assert!(matches!(
            f.facade.upload_asset(b"%PDF", "a.pdf", "application/pdf"),
            Err(KennelError::InvalidAsset(_))
        ));
    }
}
