//! Backup sources consulted when the working copy comes up empty.
//!
//! Three places can hold a previous good catalogue: the in-memory copy taken at
//! the last non-empty load or save, the emergency snapshot written after every
//! mutation, and the local mirror written after every save. A source only
//! counts when it has at least one item.

use crate::model::Document;
use crate::store::local::{LocalSnapshotStore, Snapshot};
use chrono::Utc;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    LastKnownGood,
    Emergency,
    LocalMirror,
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupKind::LastKnownGood => f.write_str("last known good copy"),
            BackupKind::Emergency => f.write_str("emergency snapshot"),
            BackupKind::LocalMirror => f.write_str("local backup"),
        }
    }
}

/// A backup that was found, and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub kind: BackupKind,
    pub document: Document,
}

pub struct RecoveryChain {
    local: LocalSnapshotStore,
    last_known_good: Option<Snapshot>,
}

impl RecoveryChain {
    pub fn new(local: LocalSnapshotStore) -> Self {
        Self {
            local,
            last_known_good: None,
        }
    }

    /// Keep a deep copy of `doc` as the last known good state.
    pub fn remember(&mut self, doc: &Document) {
        if doc.items.is_empty() {
            return;
        }
        self.last_known_good = Some(Snapshot {
            document: doc.clone(),
            timestamp: Utc::now(),
            backup_type: "memory".to_string(),
        });
        debug!(items = doc.item_count(), "last known good updated");
    }

    pub fn last_known_good(&self) -> Option<&Snapshot> {
        self.last_known_good.as_ref()
    }

    /// Write the emergency snapshot. Returns whether anything was written.
    pub fn capture(&self, doc: &Document) -> crate::error::Result<bool> {
        self.local.save_emergency(doc)
    }

    pub fn emergency(&self) -> Option<Snapshot> {
        self.local
            .load_emergency()
            .filter(|s| !s.document.items.is_empty())
    }

    pub fn local_mirror(&self) -> Option<Document> {
        Some(self.local.load()).filter(|d| !d.items.is_empty())
    }

    fn source(&self, kind: BackupKind) -> Option<Document> {
        match kind {
            BackupKind::LastKnownGood => self
                .last_known_good
                .as_ref()
                .map(|s| s.document.clone())
                .filter(|d| !d.items.is_empty()),
            BackupKind::Emergency => self.emergency().map(|s| s.document),
            BackupKind::LocalMirror => self.local_mirror(),
        }
    }

    /// First non-empty source in `order`.
    pub fn first_available(&self, order: &[BackupKind]) -> Option<Recovered> {
        let found = order.iter().find_map(|kind| {
            self.source(*kind).map(|document| Recovered {
                kind: *kind,
                document,
            })
        });
        if let Some(found) = &found {
            info!(source = %found.kind, items = found.document.item_count(), "backup available");
        }
        found
    }

    /// Sources for an empty load: nothing in memory is trustworthy yet.
    pub fn recover_after_load(&self) -> Option<Recovered> {
        self.first_available(&[BackupKind::Emergency, BackupKind::LocalMirror])
    }

    /// Sources for an in-session wipe: the memory copy is freshest.
    pub fn recover_in_session(&self) -> Option<Recovered> {
        self.first_available(&[
            BackupKind::LastKnownGood,
            BackupKind::Emergency,
            BackupKind::LocalMirror,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemId, NewItem};
    use crate::store::mem_backend::MemBackend;
    use std::rc::Rc;

    fn doc_with(n: u64) -> Document {
        let mut doc = Document::new();
        for i in 0..n {
            doc.items.push(NewItem::default().into_item(ItemId(i + 1)));
        }
        doc
    }

    fn chain() -> (LocalSnapshotStore, RecoveryChain) {
        let local = LocalSnapshotStore::new(Rc::new(MemBackend::new()));
        (local.clone(), RecoveryChain::new(local))
    }

    #[test]
    fn nothing_to_recover() {
        let (_, chain) = chain();
        assert!(chain.recover_in_session().is_none());
        assert!(chain.recover_after_load().is_none());
    }

    #[test]
    fn emergency_wins_over_mirror_after_load() {
        let (local, chain) = chain();
        local.save(&doc_with(1)).unwrap();
        chain.capture(&doc_with(4)).unwrap();
        let found = chain.recover_after_load().unwrap();
        assert_eq!(found.kind, BackupKind::Emergency);
        assert_eq!(found.document.item_count(), 4);
    }

    #[test]
    fn memory_copy_wins_in_session() {
        let (local, mut chain) = chain();
        local.save(&doc_with(1)).unwrap();
        chain.capture(&doc_with(4)).unwrap();
        chain.remember(&doc_with(2));
        let found = chain.recover_in_session().unwrap();
        assert_eq!(found.kind, BackupKind::LastKnownGood);
        assert_eq!(found.document.item_count(), 2);
    }

    #[test]
    fn empty_documents_are_not_remembered() {
        let (_, mut chain) = chain();
        chain.remember(&doc_with(2));
        chain.remember(&Document::new());
        assert_eq!(chain.last_known_good().unwrap().document.item_count(), 2);
    }

    #[test]
    fn falls_back_to_mirror() {
        let (local, chain) = chain();
        local.save(&doc_with(3)).unwrap();
        assert_eq!(chain.recover_after_load().unwrap().kind, BackupKind::LocalMirror);
    }
}
