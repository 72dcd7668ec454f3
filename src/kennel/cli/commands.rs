//! # CLI Layer
//!
//! One possible client of [`KennelApi`]. This is the only place that knows
//! about stdout, stderr, exit codes and terminal prompts.
//!
//! - `run()`: parse, set up logging, build the context, dispatch
//! - `handle_*()`: per-command handlers that call the API and print the result
//! - rendering lives in `print.rs`, questions in `prompt.rs`

use super::print::{
    print_full_items, print_item_list, print_messages, render_config, render_snapshot_info,
    render_status,
};
use super::prompt::ConsolePrompter;
use super::setup::{
    print_grouped_help, print_help_for_command, print_subcommand_help, Cli, Commands,
    ConfigCommands, ItemFields, RestoreArg,
};
use clap::Parser;
use kennel::api::{CmdMessage, ConfigAction, KennelApi, MessageLevel, RestoreSource};
use kennel::commands::auth::Registration;
use kennel::commands::items::PhotoUpload;
use kennel::commands::{describe_save, require_admin};
use kennel::error::{KennelError, Result};
use kennel::init::initialize;
use kennel::model::{ItemId, ItemPatch, NewItem};
use kennel::repository::LoadReport;
use kennel::store::assets::mime_for_path;
use kennel::store::facade::{LoadOrigin, SaveOutcome};
use kennel::store::transport::UreqTransport;
use kennel::sync::AutoSyncPolicy;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Overrides the log filter, e.g. `KENNEL_LOG=kennel=debug`.
const LOG_ENV: &str = "KENNEL_LOG";

struct AppContext {
    api: KennelApi<UreqTransport>,
    prompter: ConsolePrompter,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.help {
        if cli.command.is_none() {
            print_grouped_help();
        } else {
            print_subcommand_help(&cli.command);
        }
        return Ok(());
    }

    init_logging(cli.verbose);

    let command = match cli.command {
        Some(Commands::Help { command }) => {
            match command {
                Some(name) => print_help_for_command(&name),
                None => print_grouped_help(),
            }
            return Ok(());
        }
        Some(command) => command,
        None => Commands::List { status: None },
    };

    let mut ctx = AppContext {
        api: initialize()?,
        prompter: ConsolePrompter::new(cli.yes),
    };

    // configuration never needs the shared document
    if let Commands::Config { action } = command {
        return handle_config(&mut ctx, action);
    }

    let report = ctx.api.load(&ctx.prompter).clone();
    print_messages(&load_notices(&report));

    match command {
        Commands::List { status } => handle_list(&mut ctx, status.map(Into::into)),
        Commands::View { ids } => handle_view(&mut ctx, ids),
        Commands::Add { id, fields } => handle_add(&mut ctx, id, fields),
        Commands::Edit {
            id,
            fields,
            clear_photos,
        } => handle_edit(&mut ctx, id, fields, clear_photos),
        Commands::Delete { ids } => handle_delete(&mut ctx, ids),
        Commands::Login {
            username,
            password,
            token,
            remember,
        } => handle_login(&mut ctx, username, password, token, remember),
        Commands::Logout => handle_logout(&mut ctx),
        Commands::Register {
            username,
            email,
            password,
        } => handle_register(&mut ctx, username, email, password),
        Commands::Sync => handle_sync(&mut ctx),
        Commands::Watch { interval } => handle_watch(&mut ctx, interval),
        Commands::Export { path } => handle_export(&mut ctx, path),
        Commands::Import { path } => handle_import(&mut ctx, &path),
        Commands::Restore { source, save } => handle_restore(&mut ctx, source, save),
        Commands::Backups => handle_backups(&mut ctx),
        Commands::Status => handle_status(&mut ctx),
        Commands::Config { .. } | Commands::Help { .. } => Ok(()),
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn load_notices(report: &LoadReport) -> Vec<CmdMessage> {
    let mut notices = Vec::new();
    if report.origin == LoadOrigin::Unavailable {
        notices.push(CmdMessage::warning(
            "Could not read the shared data from GitHub; nothing is shown and nothing will be published until it can be read",
        ));
    }
    if let Some(kind) = report.recovered {
        notices.push(CmdMessage::warning(format!(
            "The loaded catalogue was empty; using the {kind} instead"
        )));
    }
    if let Some(boot) = &report.bootstrapped {
        notices.push(CmdMessage::warning(format!(
            "Created administrator '{}' with password '{}'. Write it down, it is not shown again",
            boot.username, boot.password
        )));
        match &boot.persisted {
            Some(SaveOutcome::Cancelled) => notices.push(CmdMessage::info(
                "The account was not saved; run with --yes to keep it",
            )),
            Some(outcome) => notices.push(describe_save(outcome)),
            None => notices.push(CmdMessage::warning(
                "The account exists for this run only; it is saved with the next change",
            )),
        }
    }
    notices
}

fn handle_list(
    ctx: &mut AppContext,
    status: Option<kennel::model::LifecycleStatus>,
) -> Result<()> {
    let result = ctx.api.list_items(status)?;
    print_item_list(&result.listed_items);
    print_messages(&result.messages);
    Ok(())
}

fn handle_view(ctx: &mut AppContext, ids: Vec<String>) -> Result<()> {
    let result = ctx.api.view_items(&ids)?;
    print_full_items(&result.listed_items);
    print_messages(&result.messages);
    Ok(())
}

fn read_photos(paths: &[PathBuf]) -> Result<Vec<PhotoUpload>> {
    paths.iter().map(|path| read_photo(path)).collect()
}

fn read_photo(path: &Path) -> Result<PhotoUpload> {
    let mime = mime_for_path(path).ok_or_else(|| {
        KennelError::InvalidAsset(format!("{} is not a supported picture", path.display()))
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    Ok(PhotoUpload {
        file_name,
        mime: mime.to_string(),
        bytes: std::fs::read(path)?,
    })
}

fn handle_add(ctx: &mut AppContext, id: Option<String>, fields: ItemFields) -> Result<()> {
    let id = id.as_deref().map(ItemId::from_str).transpose()?;
    let photos = read_photos(&fields.photos)?;
    let new = NewItem {
        id,
        name: fields.name.unwrap_or_default(),
        breed: fields.breed.unwrap_or_default(),
        age: fields.age.unwrap_or_default(),
        species: fields.species.unwrap_or_default(),
        gender: fields.gender.unwrap_or_default(),
        status: fields.status.map(Into::into).unwrap_or_default(),
        description: fields.description.unwrap_or_default(),
        media: Vec::new(),
    };
    let result = ctx.api.add_item(new, &photos, &ctx.prompter)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_edit(
    ctx: &mut AppContext,
    id: String,
    fields: ItemFields,
    clear_photos: bool,
) -> Result<()> {
    let photos = read_photos(&fields.photos)?;
    let patch = ItemPatch {
        name: fields.name,
        breed: fields.breed,
        age: fields.age,
        species: fields.species,
        gender: fields.gender,
        status: fields.status.map(Into::into),
        description: fields.description,
        media: clear_photos.then(Vec::new),
    };
    let result = ctx.api.edit_item(&id, patch, &photos, &ctx.prompter)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_delete(ctx: &mut AppContext, ids: Vec<String>) -> Result<()> {
    let result = ctx.api.delete_items(&ids, &ctx.prompter)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_login(
    ctx: &mut AppContext,
    username: String,
    password: Option<String>,
    token: Option<String>,
    remember: bool,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => ctx.prompter.read_secret("Password")?,
    };
    let result = ctx
        .api
        .login(&username, &password, token.as_deref(), remember)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_logout(ctx: &mut AppContext) -> Result<()> {
    let result = ctx.api.logout()?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_register(
    ctx: &mut AppContext,
    username: String,
    email: String,
    password: Option<String>,
) -> Result<()> {
    let (password, confirm) = match password {
        Some(p) => (p.clone(), p),
        None => (
            ctx.prompter.read_secret("Password")?,
            ctx.prompter.read_secret("Repeat password")?,
        ),
    };
    let form = Registration {
        username,
        password,
        confirm,
        email,
    };
    let result = ctx.api.register(form, &ctx.prompter)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_sync(ctx: &mut AppContext) -> Result<()> {
    let result = ctx.api.sync(&ctx.prompter)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_watch(ctx: &mut AppContext, interval: Option<u64>) -> Result<()> {
    let actor = ctx.api.actor();
    require_admin(actor.as_ref())?;

    let mut policy = match interval {
        Some(secs) => AutoSyncPolicy::new(true, Duration::from_secs(secs.max(1))),
        None => ctx.api.auto_sync_policy(),
    };
    if !policy.start(Instant::now()) {
        print_messages(&[CmdMessage::warning(
            "Auto-sync is off. Enable it with `kennel config set auto_sync.enabled true` or pass --interval",
        )]);
        return Ok(());
    }
    print_messages(&[CmdMessage::info(format!(
        "Syncing every {}s, press Ctrl-C to stop",
        policy.interval().as_secs()
    ))]);

    loop {
        if let Some(result) = ctx.api.sync_tick(&mut policy, &ctx.prompter, Instant::now())? {
            print_messages(&result.messages);
        }
        std::thread::sleep(Duration::from_secs(1));
    }
}

fn handle_export(ctx: &mut AppContext, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from("."));
    let result = ctx.api.export(&path)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_import(ctx: &mut AppContext, path: &Path) -> Result<()> {
    let result = ctx.api.import(path, &ctx.prompter)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_restore(ctx: &mut AppContext, source: RestoreArg, save: bool) -> Result<()> {
    let source = match source {
        RestoreArg::Local => RestoreSource::Local,
        RestoreArg::Snapshot => RestoreSource::Snapshot,
        RestoreArg::Emergency => RestoreSource::Emergency,
    };
    let result = ctx.api.restore(source, &ctx.prompter)?;
    print_messages(&result.messages);

    let restored = result
        .messages
        .iter()
        .any(|m| m.level == MessageLevel::Success);
    if source == RestoreSource::Snapshot && restored {
        if save {
            let saved = ctx.api.save(&ctx.prompter)?;
            print_messages(&saved.messages);
        } else {
            print_messages(&[CmdMessage::info(
                "Run the restore again with --save to keep it",
            )]);
        }
    }
    Ok(())
}

fn handle_backups(ctx: &mut AppContext) -> Result<()> {
    let result = ctx.api.snapshot_info()?;
    if let Some(info) = &result.snapshot {
        print!("{}", render_snapshot_info(info));
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_status(ctx: &mut AppContext) -> Result<()> {
    let result = ctx.api.status()?;
    if let Some(status) = &result.status {
        print!("{}", render_status(status));
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_config(ctx: &mut AppContext, action: Option<ConfigCommands>) -> Result<()> {
    let action = match action {
        None | Some(ConfigCommands::Show) => ConfigAction::Show,
        Some(ConfigCommands::Set { key, value }) => ConfigAction::Set(key, value),
        Some(ConfigCommands::Unset { key }) => ConfigAction::Unset(key),
    };
    let show = matches!(action, ConfigAction::Show);
    let result = ctx.api.configure(action)?;
    if show {
        if let Some(config) = &result.config {
            print!("{}", render_config(config));
        }
    }
    print_messages(&result.messages);
    Ok(())
}
