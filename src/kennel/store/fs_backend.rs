use super::backend::StorageBackend;
use crate::error::{KennelError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Filesystem backend: one file per key inside the data directory.
///
/// Keys map to `{root}/{key}.json`; the credential key holds raw text but uses
/// the same naming so the directory stays uniform.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(KennelError::Store(format!("invalid storage key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(KennelError::Io)?;
        }
        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn read_key(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(KennelError::Io)?;
        Ok(Some(content))
    }

    fn write_key(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        self.ensure_dir()?;

        // Atomic write
        let tmp_path = self.root.join(format!(".{key}-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_path, value).map_err(KennelError::Io)?;
        fs::rename(&tmp_path, &path).map_err(KennelError::Io)?;
        Ok(())
    }

    fn remove_key(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        if path.exists() {
            fs::remove_file(path).map_err(KennelError::Io)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path().join("nested"));
        assert!(backend.read_key("kennel_data").unwrap().is_none());

        backend.write_key("kennel_data", "{\"pets\":[]}").unwrap();
        assert!(dir.path().join("nested/kennel_data.json").exists());
        assert_eq!(
            backend.read_key("kennel_data").unwrap().as_deref(),
            Some("{\"pets\":[]}")
        );

        backend.remove_key("kennel_data").unwrap();
        assert!(backend.read_key("kennel_data").unwrap().is_none());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path().to_path_buf());
        backend.write_key("a", "1").unwrap();
        backend.write_key("a", "2").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a.json".to_string()]);
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path().to_path_buf());
        assert!(backend.write_key("../escape", "x").is_err());
        assert!(backend.read_key("").is_err());
    }
}
