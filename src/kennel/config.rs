//! # Configuration
//!
//! Stored as `config.json` in the kennel data directory. Every field has a
//! serde default, so a missing file or a partial file both load.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `remote.owner` / `remote.repo` | unset | GitHub repository holding the shared document |
//! | `remote.branch` | `main` | Branch read by the public mirror and written by commits |
//! | `remote.path` | `data.json` | Path of the document inside the repository |
//! | `remote.api_base` | `https://api.github.com` | Contents API root |
//! | `remote.raw_base` | `https://raw.githubusercontent.com` | Public mirror root |
//! | `remote.asset_dir` | `pets/images` | Directory for committed pictures |
//! | `remote.timeout_secs` | `15` | HTTP timeout |
//! | `asset_mode` | `inline` | `inline` data URLs or `commit` repository files |
//! | `auto_sync.enabled` | `false` | Periodic sync; off because it once lost data |
//! | `auto_sync.interval_secs` | `30` | Period when enabled |
//! | `admin.username` | `Admin` | Bootstrap administrator |
//! | `admin.email` | empty | Bootstrap administrator email |
//! | `admin.bootstrap_password` | unset | Password given to a freshly created bootstrap admin |

use crate::error::{KennelError, Result};
use crate::store::assets::AssetMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    #[serde(default = "default_asset_dir")]
    pub asset_dir: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_path() -> String {
    "data.json".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_asset_dir() -> String {
    "pets/images".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: default_branch(),
            path: default_path(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            asset_dir: default_asset_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.owner.trim().is_empty() && !self.repo.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutoSyncConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    30
}

impl Default for AutoSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_password: Option<String>,
}

fn default_admin_username() -> String {
    "Admin".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            email: String::new(),
            bootstrap_password: None,
        }
    }
}

/// Configuration for kennel, stored in `{data_dir}/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct KennelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,

    #[serde(default)]
    pub asset_mode: AssetMode,

    #[serde(default)]
    pub auto_sync: AutoSyncConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

impl KennelConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(KennelError::Io)?;
        let config: KennelConfig =
            serde_json::from_str(&content).map_err(KennelError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(KennelError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(KennelError::Serialization)?;
        fs::write(config_path, content).map_err(KennelError::Io)?;
        Ok(())
    }

    /// The remote store settings, only when owner and repo are both set.
    pub fn remote(&self) -> Option<&RemoteConfig> {
        self.remote.as_ref().filter(|r| r.is_complete())
    }

    /// Set a dotted key, e.g. `remote.owner` or `auto_sync.enabled`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        if let Some(field) = key.strip_prefix("remote.") {
            let remote = self.remote.get_or_insert_with(RemoteConfig::default);
            match field {
                "owner" => remote.owner = value.to_string(),
                "repo" => remote.repo = value.to_string(),
                "branch" => remote.branch = value.to_string(),
                "path" => remote.path = value.trim_start_matches('/').to_string(),
                "api_base" => remote.api_base = value.trim_end_matches('/').to_string(),
                "raw_base" => remote.raw_base = value.trim_end_matches('/').to_string(),
                "asset_dir" => remote.asset_dir = value.trim_matches('/').to_string(),
                "timeout_secs" => remote.timeout_secs = parse_number(key, value)?,
                _ => return Err(unknown_key(key)),
            }
            return Ok(());
        }

        match key {
            "asset_mode" => {
                self.asset_mode = match value {
                    "inline" => AssetMode::Inline,
                    "commit" => AssetMode::Commit,
                    other => {
                        return Err(KennelError::Config(format!(
                            "asset_mode must be 'inline' or 'commit', got '{other}'"
                        )))
                    }
                }
            }
            "auto_sync.enabled" => self.auto_sync.enabled = parse_bool(key, value)?,
            "auto_sync.interval_secs" => self.auto_sync.interval_secs = parse_number(key, value)?,
            "admin.username" => self.admin.username = value.to_string(),
            "admin.email" => self.admin.email = value.to_string(),
            "admin.bootstrap_password" => {
                self.admin.bootstrap_password = Some(value.to_string()).filter(|v| !v.is_empty())
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Remove a persisted override. `remote` drops the whole remote section.
    pub fn unset_value(&mut self, key: &str) -> Result<()> {
        let defaults = KennelConfig::default();
        match key {
            "remote" => self.remote = None,
            "asset_mode" => self.asset_mode = defaults.asset_mode,
            "auto_sync" => self.auto_sync = defaults.auto_sync,
            "admin.bootstrap_password" => self.admin.bootstrap_password = None,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> KennelError {
    KennelError::Config(format!("unknown config key '{key}'"))
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| KennelError::Config(format!("{key} expects a number, got '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(KennelError::Config(format!(
            "{key} expects true or false, got '{value}'"
        ))),
    }
}
