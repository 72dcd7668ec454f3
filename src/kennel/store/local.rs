use super::assets;
use super::backend::StorageBackend;
use crate::error::Result;
use crate::model::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, warn};

pub const DATA_KEY: &str = "kennel_data";
pub const EMERGENCY_KEY: &str = "kennel_emergency_backup";

/// A document copy tagged with when and why it was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub document: Document,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "backupType", default = "default_backup_type")]
    pub backup_type: String,
}

fn default_backup_type() -> String {
    "emergency".to_string()
}

impl Snapshot {
    pub fn emergency(document: Document) -> Self {
        Self {
            document,
            timestamp: Utc::now(),
            backup_type: default_backup_type(),
        }
    }
}

/// Same-device persistence. Always available, single writer.
#[derive(Clone)]
pub struct LocalSnapshotStore {
    backend: Rc<dyn StorageBackend>,
}

impl LocalSnapshotStore {
    pub fn new(backend: Rc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn save(&self, doc: &Document) -> Result<()> {
        let content = serde_json::to_string(doc)?;
        self.backend.write_key(DATA_KEY, &content)?;
        debug!(items = doc.item_count(), "local mirror written");
        Ok(())
    }

    /// The mirrored document, or the empty default when missing or unreadable.
    pub fn load(&self) -> Document {
        match self.backend.read_key(DATA_KEY) {
            Ok(Some(content)) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(error = %e, "local mirror is corrupt, ignoring it");
                Document::default()
            }),
            Ok(None) => Document::default(),
            Err(e) => {
                warn!(error = %e, "local mirror unreadable");
                Document::default()
            }
        }
    }

    pub fn upload_asset(&self, bytes: &[u8], mime: &str) -> String {
        assets::to_data_url(bytes, mime)
    }

    /// Record an emergency snapshot. Empty documents are never recorded, so a
    /// good snapshot cannot be replaced by an empty one.
    pub fn save_emergency(&self, doc: &Document) -> Result<bool> {
        if doc.items.is_empty() {
            return Ok(false);
        }
        let snapshot = Snapshot::emergency(doc.clone());
        self.backend
            .write_key(EMERGENCY_KEY, &serde_json::to_string(&snapshot)?)?;
        Ok(true)
    }

    pub fn load_emergency(&self) -> Option<Snapshot> {
        let content = self.backend.read_key(EMERGENCY_KEY).ok().flatten()?;
        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "emergency snapshot is corrupt, ignoring it");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemId, NewItem};
    use crate::store::mem_backend::MemBackend;

    fn store() -> (Rc<MemBackend>, LocalSnapshotStore) {
        let backend = Rc::new(MemBackend::new());
        (backend.clone(), LocalSnapshotStore::new(backend))
    }

    fn doc_with(n: u64) -> Document {
        let mut doc = Document::new();
        for i in 0..n {
            doc.items.push(NewItem::default().into_item(ItemId(i + 1)));
        }
        doc
    }

    #[test]
    fn missing_or_corrupt_loads_default() {
        let (backend, local) = store();
        assert_eq!(local.load(), Document::default());
        backend.write_key(DATA_KEY, "{not json").unwrap();
        assert_eq!(local.load(), Document::default());
    }

    #[test]
    fn save_then_load() {
        let (_, local) = store();
        local.save(&doc_with(2)).unwrap();
        assert_eq!(local.load().item_count(), 2);
    }

    #[test]
    fn emergency_snapshot_skips_empty() {
        let (_, local) = store();
        assert!(!local.save_emergency(&Document::new()).unwrap());
        assert!(local.load_emergency().is_none());

        assert!(local.save_emergency(&doc_with(3)).unwrap());
        assert!(!local.save_emergency(&Document::new()).unwrap());
        let snap = local.load_emergency().unwrap();
        assert_eq!(snap.document.item_count(), 3);
        assert_eq!(snap.backup_type, "emergency");
    }

    #[test]
    fn emergency_wire_format() {
        let (backend, local) = store();
        local.save_emergency(&doc_with(1)).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&backend.read_key(EMERGENCY_KEY).unwrap().unwrap()).unwrap();
        assert!(raw["pets"].is_array());
        assert!(raw["users"].is_object());
        assert!(raw["timestamp"].is_i64());
        assert_eq!(raw["backupType"], "emergency");
    }

    #[test]
    fn inline_asset() {
        let (_, local) = store();
        assert!(local
            .upload_asset(b"abc", "image/png")
            .starts_with("data:image/png;base64,"));
    }
}
