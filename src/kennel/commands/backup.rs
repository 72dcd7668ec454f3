//! Whole-catalogue export and import as a JSON file.

use crate::commands::{require_admin, Actor, CmdMessage, CmdResult};
use crate::error::{KennelError, Result};
use crate::model::Document;
use crate::prompt::Prompter;
use crate::repository::Repository;
use crate::store::transport::Transport;
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct ExportFile<'a> {
    #[serde(flatten)]
    document: &'a Document,
    #[serde(rename = "exportDate")]
    export_date: String,
}

pub fn default_file_name() -> String {
    format!("kennel_backup_{}.json", Utc::now().format("%Y-%m-%d"))
}

/// Write the catalogue to `output`, a file or a directory (default name).
pub fn export<T: Transport>(
    repo: &Repository<T>,
    actor: Option<&Actor>,
    output: &Path,
) -> Result<CmdResult> {
    require_admin(actor)?;
    let path: PathBuf = if output.is_dir() {
        output.join(default_file_name())
    } else {
        output.to_path_buf()
    };

    let file = ExportFile {
        document: repo.document(),
        export_date: Utc::now().to_rfc3339(),
    };
    fs::write(&path, serde_json::to_string_pretty(&file)?)?;

    let doc = repo.document();
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Exported {} items and {} accounts to {}",
        doc.item_count(),
        doc.accounts.len(),
        path.display()
    )));
    result.written_path = Some(path);
    Ok(result)
}

/// Parse an export file. Both `users` and `pets` must be present.
pub fn parse_import(content: &str) -> Result<Document> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| KennelError::InvalidImport(format!("not JSON: {e}")))?;
    if !value.get("users").is_some_and(|v| v.is_object()) {
        return Err(KennelError::InvalidImport("missing 'users' object".to_string()));
    }
    if !value.get("pets").is_some_and(|v| v.is_array()) {
        return Err(KennelError::InvalidImport("missing 'pets' array".to_string()));
    }
    serde_json::from_value(value).map_err(|e| KennelError::InvalidImport(e.to_string()))
}

pub fn import<T: Transport>(
    repo: &mut Repository<T>,
    actor: Option<&Actor>,
    input: &Path,
    prompter: &dyn Prompter,
) -> Result<CmdResult> {
    require_admin(actor)?;
    let incoming = parse_import(&fs::read_to_string(input)?)?;

    let current = repo.document();
    let question = format!(
        "Replace the catalogue?\n  now:    {} items, {} accounts\n  import: {} items, {} accounts",
        current.item_count(),
        current.accounts.len(),
        incoming.item_count(),
        incoming.accounts.len()
    );
    let mut result = CmdResult::default();
    if !prompter.confirm(&question) {
        result.add_message(CmdMessage::info("Import cancelled"));
        return Ok(result);
    }

    let count = incoming.item_count();
    repo.replace(incoming);
    let outcome = repo.save(prompter)?;
    result.add_message(CmdMessage::success(format!(
        "Imported {count} items from {}",
        input.display()
    )));
    Ok(result.with_save(outcome))
}
