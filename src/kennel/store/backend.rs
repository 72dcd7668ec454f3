use crate::error::Result;

/// Abstract interface for device-local key/value persistence.
///
/// This trait handles the "how" of local storage (filesystem vs memory), while
/// the snapshot store, credential provider and session manager decide "what"
/// goes under which key. Values are JSON text, except the credential which is
/// stored raw.
pub trait StorageBackend {
    /// Read a key. Returns Ok(None) when the key was never written.
    /// Returns Err only on actual I/O errors (permissions, disk failure).
    fn read_key(&self, key: &str) -> Result<Option<String>>;

    /// Write a key.
    /// MUST be atomic (e.g. write to tmp then rename) to avoid partial writes.
    fn write_key(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove_key(&self, key: &str) -> Result<()>;
}
