use crate::api::KennelApi;
use crate::config::KennelConfig;
use crate::error::{KennelError, Result};
use crate::store::backend::StorageBackend;
use crate::store::fs_backend::FsBackend;
use crate::store::transport::UreqTransport;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

/// Overrides the per-user data directory. Tests point it at a temp dir.
pub const HOME_ENV: &str = "KENNEL_HOME";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// The directory holding `config.json` and the local storage keys.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("com", "kennel", "kennel")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| KennelError::Config("could not determine a data directory".into()))
}

pub fn initialize_at(dir: &Path) -> Result<KennelApi<UreqTransport>> {
    let config = KennelConfig::load(dir)?;
    let timeout = config.remote().map_or(DEFAULT_TIMEOUT, |r| r.timeout());
    debug!(dir = %dir.display(), remote = config.remote().is_some(), "initializing");

    let backend: Rc<dyn StorageBackend> = Rc::new(FsBackend::new(dir.to_path_buf()));
    let transport = UreqTransport::new(timeout);
    Ok(KennelApi::new(transport, backend, config, dir.to_path_buf()))
}

/// Production context: filesystem storage and the GitHub contents API.
pub fn initialize() -> Result<KennelApi<UreqTransport>> {
    initialize_at(&data_dir()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::FixedPrompter;
    use crate::store::facade::LoadOrigin;

    #[test]
    fn local_only_without_remote() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = initialize_at(dir.path()).unwrap();
        let report = api.load(&FixedPrompter::yes());
        assert_eq!(report.origin, LoadOrigin::Local);
        assert!(!api.repository().facade().can_read());
    }

    #[test]
    fn bootstrap_admin_lands_in_local_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = initialize_at(dir.path()).unwrap();
        api.load(&FixedPrompter::yes());
        assert!(dir.path().join("kennel_data.json").exists());

        let mut again = initialize_at(dir.path()).unwrap();
        assert!(again.load(&FixedPrompter::yes()).bootstrapped.is_none());
    }
}
