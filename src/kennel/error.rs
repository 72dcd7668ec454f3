use crate::model::ItemId;
use crate::recovery::BackupKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KennelError {
    #[error("Remote store unreachable: {0}")]
    Transport(String),

    #[error("No GitHub token configured: log in as an administrator with a token to publish changes")]
    NoCredential,

    #[error("The shared data changed on the server while saving. Nothing was committed; reload and repeat the edit")]
    RevisionConflict,

    #[error("Refusing to save an empty catalogue: the {backup} still holds {items} items. Restore it first or delete the backup deliberately")]
    RefusedEmptyOverwrite { backup: BackupKind, items: usize },

    #[error("Item not found: {0}. Reload the data and try again")]
    RecordNotFound(ItemId),

    #[error("Item id already in use: {0}")]
    DuplicateItem(ItemId),

    #[error("Invalid item id: {0}")]
    InvalidId(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    #[error("Invalid import file: {0}")]
    InvalidImport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, KennelError>;
