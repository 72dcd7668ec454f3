use crate::commands::restore::SnapshotSummary;
use crate::commands::{Actor, CmdResult};
use crate::config::{AutoSyncConfig, KennelConfig};
use crate::model::LifecycleStatus;
use crate::repository::Repository;
use crate::session::Session;
use crate::store::assets::AssetMode;
use crate::store::facade::LoadOrigin;
use crate::store::transport::Transport;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub items: usize,
    pub buckets: Vec<(LifecycleStatus, usize)>,
    pub accounts: usize,
    /// `owner/repo@branch:path`, when a remote store is configured.
    pub remote: Option<String>,
    pub can_read: bool,
    pub can_write: bool,
    pub origin: Option<LoadOrigin>,
    pub session: Option<Session>,
    pub actor: Option<Actor>,
    pub emergency: Option<SnapshotSummary>,
    pub auto_sync: AutoSyncConfig,
    pub asset_mode: AssetMode,
}

pub fn run<T: Transport>(
    repo: &Repository<T>,
    config: &KennelConfig,
    origin: Option<LoadOrigin>,
    session: Option<Session>,
    actor: Option<Actor>,
) -> CmdResult {
    let facade = repo.facade();
    let report = StatusReport {
        items: repo.items().len(),
        buckets: LifecycleStatus::ALL
            .iter()
            .map(|status| (*status, repo.items_by_status(*status).len()))
            .collect(),
        accounts: repo.document().accounts.len(),
        remote: facade.remote().map(|r| {
            let c = r.config();
            format!("{}/{}@{}:{}", c.owner, c.repo, c.branch, c.path)
        }),
        can_read: facade.can_read(),
        can_write: facade.can_write(),
        origin,
        session,
        actor,
        emergency: repo
            .recovery()
            .emergency()
            .map(|s| SnapshotSummary {
                items: s.document.item_count(),
                accounts: s.document.accounts.len(),
                taken_at: s.timestamp,
            }),
        auto_sync: config.auto_sync.clone(),
        asset_mode: config.asset_mode,
    };
    CmdResult {
        status: Some(report),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{admin, fixture};
    use crate::model::NewItem;

    #[test]
    fn counts_and_capabilities() {
        let mut f = fixture();
        f.repo
            .add_item(NewItem {
                status: LifecycleStatus::Graduate,
                ..Default::default()
            })
            .unwrap();
        let result = run(&f.repo, &KennelConfig::default(), Some(LoadOrigin::Remote), None, Some(admin()));
        let status = result.status.unwrap();
        assert_eq!(status.items, 1);
        assert_eq!(status.accounts, 1);
        assert!(status
            .buckets
            .contains(&(LifecycleStatus::Graduate, 1)));
        assert!(status.buckets.contains(&(LifecycleStatus::Breeding, 0)));
        assert_eq!(status.remote.as_deref(), Some("breeder/site@main:data.json"));
        assert!(status.can_write);
        assert_eq!(status.emergency.unwrap().items, 1);
        assert!(!status.auto_sync.enabled);
    }
}
