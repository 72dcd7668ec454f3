use crate::commands::{CmdMessage, CmdResult};
use crate::config::KennelConfig;
use crate::error::Result;
use std::path::Path;

#[derive(Debug, Clone)]
pub enum ConfigAction {
    Show,
    Set(String, String),
    Unset(String),
}

pub fn run(dir: &Path, action: ConfigAction) -> Result<CmdResult> {
    let mut config = KennelConfig::load(dir)?;
    match action {
        ConfigAction::Show => Ok(CmdResult::default().with_config(config)),
        ConfigAction::Set(key, value) => {
            if let Err(e) = config.set_value(&key, &value) {
                let mut res = CmdResult::default();
                res.add_message(CmdMessage::error(e.to_string()));
                return Ok(res);
            }
            config.save(dir)?;
            let mut result = CmdResult::default().with_config(config);
            result.add_message(CmdMessage::success(format!("{key} set to {value}")));
            Ok(result)
        }
        ConfigAction::Unset(key) => {
            if let Err(e) = config.unset_value(&key) {
                let mut res = CmdResult::default();
                res.add_message(CmdMessage::error(e.to_string()));
                return Ok(res);
            }
            config.save(dir)?;
            let mut result = CmdResult::default().with_config(config);
            result.add_message(CmdMessage::success(format!("{key} reset")));
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_persists_and_bad_keys_report_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(
            dir.path(),
            ConfigAction::Set("remote.owner".into(), "breeder".into()),
        )
        .unwrap();
        assert!(!result.has_errors());
        assert_eq!(
            KennelConfig::load(dir.path()).unwrap().remote.unwrap().owner,
            "breeder"
        );

        let bad = run(dir.path(), ConfigAction::Set("nope".into(), "1".into())).unwrap();
        assert!(bad.has_errors());

        run(dir.path(), ConfigAction::Unset("remote".into())).unwrap();
        assert!(KennelConfig::load(dir.path()).unwrap().remote.is_none());
    }
}
