//! Terminal rendering. Every `render_*` returns a `String` so output can be
//! tested without a terminal; the `print_*` wrappers only write it out.

use super::styles::{status_style, HEADER, ITEM_ID, ITEM_NAME, MUTED};
use chrono::{DateTime, Utc};
use colored::Colorize;
use kennel::api::{CmdMessage, MessageLevel};
use kennel::commands::restore::{SnapshotInfo, SnapshotSummary};
use kennel::commands::status::StatusReport;
use kennel::config::KennelConfig;
use kennel::model::Item;
use kennel::store::assets::AssetMode;
use kennel::store::facade::LoadOrigin;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ID_WIDTH: usize = 15;
const NAME_WIDTH: usize = 24;
const BREED_WIDTH: usize = 20;
const STATUS_WIDTH: usize = 10;

pub fn render_messages(messages: &[CmdMessage]) -> String {
    messages
        .iter()
        .map(|message| {
            let line = match message.level {
                MessageLevel::Info => message.content.dimmed(),
                MessageLevel::Success => message.content.green(),
                MessageLevel::Warning => message.content.yellow(),
                MessageLevel::Error => message.content.red(),
            };
            format!("{}\n", line)
        })
        .collect()
}

pub fn print_messages(messages: &[CmdMessage]) {
    print!("{}", render_messages(messages));
}

/// The table, or nothing for an empty list (the command says why).
pub fn render_item_list(items: &[Item]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut out = format!(
        "{}{}{}{}{}\n",
        HEADER.apply_to(pad_to_width("ID", ID_WIDTH)),
        HEADER.apply_to(pad_to_width("Name", NAME_WIDTH)),
        HEADER.apply_to(pad_to_width("Breed", BREED_WIDTH)),
        HEADER.apply_to(pad_to_width("Status", STATUS_WIDTH)),
        HEADER.apply_to("Photos"),
    );
    for item in items {
        let status = item.status.as_str();
        out.push_str(&format!(
            "{}{}{}{}{}\n",
            ITEM_ID.apply_to(pad_to_width(&item.id.to_string(), ID_WIDTH)),
            pad_to_width(&item.name, NAME_WIDTH),
            pad_to_width(&item.breed, BREED_WIDTH),
            status_style(status).apply_to(pad_to_width(status, STATUS_WIDTH)),
            item.media.len(),
        ));
    }
    out
}

pub fn print_item_list(items: &[Item]) {
    print!("{}", render_item_list(items));
}

fn describe_media(media: &str) -> String {
    if media.starts_with("data:") {
        // the payload is base64, three bytes per four characters
        let encoded = media.split_once(',').map_or(0, |(_, data)| data.len());
        format!("inline picture, ~{} KB", encoded * 3 / 4 / 1024)
    } else {
        media.to_string()
    }
}

pub fn render_full_items(items: &[Item]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str("\n================================\n\n");
        }
        out.push_str(&format!(
            "{} {}\n",
            ITEM_ID.apply_to(item.id),
            ITEM_NAME.apply_to(&item.name)
        ));
        out.push_str("--------------------------------\n");
        let fields = [
            ("Type", item.species.as_str()),
            ("Breed", item.breed.as_str()),
            ("Age", item.age.as_str()),
            ("Gender", item.gender.as_str()),
            ("Status", item.status.as_str()),
        ];
        for (label, value) in fields.iter().filter(|(_, v)| !v.is_empty()) {
            out.push_str(&format!("{:<8}{}\n", label, value));
        }
        if !item.description.is_empty() {
            out.push_str(&format!("\n{}\n", item.description));
        }
        if !item.media.is_empty() {
            out.push_str("\nPhotos:\n");
            for media in &item.media {
                out.push_str(&format!("  - {}\n", describe_media(media)));
            }
        }
    }
    out
}

pub fn print_full_items(items: &[Item]) {
    print!("{}", render_full_items(items));
}

fn origin_label(origin: LoadOrigin) -> &'static str {
    match origin {
        LoadOrigin::Remote => "GitHub (authenticated)",
        LoadOrigin::Public => "GitHub (public mirror)",
        LoadOrigin::Local => "this device",
        LoadOrigin::Unavailable => "nothing (remote unreachable)",
    }
}

fn asset_mode_label(mode: AssetMode) -> &'static str {
    match mode {
        AssetMode::Inline => "inline",
        AssetMode::Commit => "commit",
    }
}

pub fn render_status(status: &StatusReport) -> String {
    let mut out = String::new();
    let remote = status.remote.as_deref().unwrap_or("not configured");
    out.push_str(&format!("Remote      {}\n", remote));
    if let Some(origin) = status.origin {
        out.push_str(&format!("Loaded from {}\n", origin_label(origin)));
    }
    out.push_str(&format!(
        "Access      {}\n",
        match (status.can_read, status.can_write) {
            (_, true) => "read and publish",
            (true, false) => "read only (no token)",
            (false, false) => "local only",
        }
    ));
    match (&status.actor, &status.session) {
        (Some(actor), Some(session)) => out.push_str(&format!(
            "User        {} ({}), logged in {}\n",
            actor.username,
            actor.role,
            format_time_ago(session.timestamp).trim_start()
        )),
        _ => out.push_str("User        not logged in\n"),
    }

    out.push_str(&format!("\nItems       {}\n", status.items));
    for (bucket, count) in &status.buckets {
        out.push_str(&format!("  {:<10}{}\n", bucket.as_str(), count));
    }
    out.push_str(&format!("Accounts    {}\n", status.accounts));

    out.push('\n');
    match &status.emergency {
        Some(snapshot) => out.push_str(&format!(
            "Emergency   {} items, {}\n",
            snapshot.items,
            format_time_ago(snapshot.taken_at).trim_start()
        )),
        None => out.push_str("Emergency   none\n"),
    }
    out.push_str(&format!(
        "Auto-sync   {}\n",
        if status.auto_sync.enabled {
            format!("every {}s", status.auto_sync.interval_secs)
        } else {
            "off".to_string()
        }
    ));
    out.push_str(&format!("Pictures    {}\n", asset_mode_label(status.asset_mode)));
    out
}

fn summary_line(label: &str, summary: Option<&SnapshotSummary>) -> String {
    match summary {
        Some(s) => format!(
            "{:<16}{} items, {} accounts, {}\n",
            label,
            s.items,
            s.accounts,
            MUTED.apply_to(format_time_ago(s.taken_at).trim_start())
        ),
        None => format!("{:<16}{}\n", label, MUTED.apply_to("none")),
    }
}

pub fn render_snapshot_info(info: &SnapshotInfo) -> String {
    let mut out = String::new();
    out.push_str(&summary_line("Last known good", info.last_known_good.as_ref()));
    out.push_str(&summary_line("Emergency", info.emergency.as_ref()));
    out.push_str(&format!("{:<16}{} items\n", "Local backup", info.local_items));
    out
}

pub fn render_config(config: &KennelConfig) -> String {
    let mut lines = Vec::new();
    match &config.remote {
        Some(remote) => {
            lines.push(("remote.owner", remote.owner.clone()));
            lines.push(("remote.repo", remote.repo.clone()));
            lines.push(("remote.branch", remote.branch.clone()));
            lines.push(("remote.path", remote.path.clone()));
            lines.push(("remote.api_base", remote.api_base.clone()));
            lines.push(("remote.raw_base", remote.raw_base.clone()));
            lines.push(("remote.asset_dir", remote.asset_dir.clone()));
            lines.push(("remote.timeout_secs", remote.timeout_secs.to_string()));
        }
        None => lines.push(("remote", "(not configured)".to_string())),
    }
    lines.push(("asset_mode", asset_mode_label(config.asset_mode).to_string()));
    lines.push(("auto_sync.enabled", config.auto_sync.enabled.to_string()));
    lines.push((
        "auto_sync.interval_secs",
        config.auto_sync.interval_secs.to_string(),
    ));
    lines.push(("admin.username", config.admin.username.clone()));
    lines.push(("admin.email", config.admin.email.clone()));
    lines.push((
        "admin.bootstrap_password",
        if config.admin.bootstrap_password.is_some() {
            "(set)".to_string()
        } else {
            "(unset)".to_string()
        },
    ));

    lines
        .into_iter()
        .map(|(key, value)| format!("{} = {}\n", key, value))
        .collect()
}

fn pad_to_width(s: &str, width: usize) -> String {
    let cell = truncate_to_width(s, width.saturating_sub(1));
    let padding = width.saturating_sub(cell.width());
    format!("{}{}", cell, " ".repeat(padding))
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }
    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = Formatter::new();
    format!("{:>14}", formatter.convert(duration.to_std().unwrap_or_default()))
}
