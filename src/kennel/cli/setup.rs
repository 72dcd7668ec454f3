use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use kennel::model::LifecycleStatus;
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "kennel",
    bin_name = "kennel",
    version = get_version(),
    disable_help_flag = true,
    disable_help_subcommand = true
)]
#[command(about = "Manage a breeder's showcase catalogue stored on GitHub", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Answer yes to confirmations (conflicts still keep the published copy)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub yes: bool,

    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help_heading = "Options")]
    pub verbose: u8,

    /// Print help
    #[arg(short, long, global = true)]
    pub help: bool,
}

/// Command group definitions for help output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    Catalogue,
    Account,
    Publish,
    Misc,
}

impl CommandGroup {
    const ALL: [CommandGroup; 4] = [
        CommandGroup::Catalogue,
        CommandGroup::Account,
        CommandGroup::Publish,
        CommandGroup::Misc,
    ];

    pub fn heading(&self) -> &'static str {
        match self {
            CommandGroup::Catalogue => "Catalogue:",
            CommandGroup::Account => "Accounts:",
            CommandGroup::Publish => "Publishing and Backups:",
            CommandGroup::Misc => "Miscellaneous:",
        }
    }

    pub fn for_command(name: &str) -> Option<Self> {
        match name {
            "list" | "view" | "add" | "edit" | "delete" => Some(CommandGroup::Catalogue),
            "login" | "logout" | "register" => Some(CommandGroup::Account),
            "sync" | "watch" | "export" | "import" | "restore" | "backups" => {
                Some(CommandGroup::Publish)
            }
            "status" | "config" | "help" => Some(CommandGroup::Misc),
            _ => None,
        }
    }
}

pub fn get_grouped_help() -> String {
    let cmd = Cli::command();
    let mut output = String::new();

    output.push_str(&format!("kennel {}\n", get_version()));
    if let Some(about) = cmd.get_about() {
        output.push_str(&format!("{}\n", about));
    }
    output.push_str("\nUsage: kennel [OPTIONS] <COMMAND>\n");

    for group in CommandGroup::ALL {
        let entries: Vec<(String, String)> = cmd
            .get_subcommands()
            .filter(|sub| !sub.is_hide_set())
            .filter(|sub| CommandGroup::for_command(sub.get_name()) == Some(group))
            .map(|sub| {
                let about = sub.get_about().map(|a| a.to_string()).unwrap_or_default();
                (sub.get_name().to_string(), about)
            })
            .collect();
        if entries.is_empty() {
            continue;
        }
        output.push_str(&format!("\n{}\n", group.heading()));
        for (name, about) in entries {
            output.push_str(&format!("  {:<10} {}\n", name, about));
        }
    }

    output.push_str("\nOptions:\n");
    output.push_str("  -y, --yes        Answer yes to confirmations\n");
    output.push_str("  -v, --verbose    Verbose output (repeat for more)\n");
    output.push_str("  -h, --help       Print help\n");
    output.push_str("  -V, --version    Print version\n");

    output
}

pub fn print_grouped_help() {
    print!("{}", get_grouped_help());
}

/// Prints help for a command by name
pub fn print_help_for_command(name: &str) {
    let mut cmd = Cli::command();
    for subcmd in cmd.get_subcommands_mut() {
        if subcmd.get_name() == name {
            print!("{}", subcmd.render_help());
            return;
        }
    }

    eprintln!("Unknown command: {}", name);
    eprintln!();
    print_grouped_help();
}

pub fn print_subcommand_help(command: &Option<Commands>) {
    match command {
        Some(cmd) => print_help_for_command(cmd.name()),
        None => print_grouped_help(),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum StatusArg {
    Breeding,
    Puppy,
    Graduate,
    Memorial,
}

impl From<StatusArg> for LifecycleStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Breeding => LifecycleStatus::Breeding,
            StatusArg::Puppy => LifecycleStatus::Puppy,
            StatusArg::Graduate => LifecycleStatus::Graduate,
            StatusArg::Memorial => LifecycleStatus::Memorial,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RestoreArg {
    /// The copy mirrored on this device by the last save
    Local,
    /// The last known good copy from this session's saves
    Snapshot,
    /// The emergency snapshot refreshed on every change
    Emergency,
}

/// Record fields shared by `add` and `edit`.
#[derive(Args, Debug, Default)]
pub struct ItemFields {
    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub breed: Option<String>,

    /// Free-form age, e.g. "3 months"
    #[arg(long)]
    pub age: Option<String>,

    /// Species shown on the site (dog, cat, ...)
    #[arg(long = "type", value_name = "TYPE")]
    pub species: Option<String>,

    #[arg(long)]
    pub gender: Option<String>,

    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,

    #[arg(long)]
    pub description: Option<String>,

    /// Picture to attach (repeatable)
    #[arg(long = "photo", value_name = "FILE")]
    pub photos: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the catalogue
    #[command(alias = "ls", display_order = 1)]
    List {
        /// Only show one lifecycle bucket
        #[arg(short, long, value_enum)]
        status: Option<StatusArg>,
    },

    /// Show items in full
    #[command(alias = "v", display_order = 2)]
    View {
        /// Item ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Add an item (administrators)
    #[command(alias = "n", display_order = 3)]
    Add {
        /// Use this id instead of a generated one
        #[arg(long)]
        id: Option<String>,

        #[command(flatten)]
        fields: ItemFields,
    },

    /// Change fields of an item (administrators)
    #[command(alias = "e", display_order = 4)]
    Edit {
        /// Item id
        id: String,

        #[command(flatten)]
        fields: ItemFields,

        /// Drop existing pictures before attaching new ones
        #[arg(long)]
        clear_photos: bool,
    },

    /// Delete items (administrators)
    #[command(alias = "rm", display_order = 5)]
    Delete {
        /// Item ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Log in on this device
    #[command(display_order = 10)]
    Login {
        username: String,

        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,

        /// GitHub token, required for administrators to publish
        #[arg(long)]
        token: Option<String>,

        /// Keep the session for 30 days instead of one
        #[arg(long)]
        remember: bool,
    },

    /// Log out and forget the token
    #[command(display_order = 11)]
    Logout,

    /// Create a guest account
    #[command(display_order = 12)]
    Register {
        username: String,

        #[arg(long)]
        email: String,

        /// Password (prompted for twice when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Publish the catalogue now (administrators)
    #[command(display_order = 20)]
    Sync,

    /// Keep running and sync on the auto-sync interval
    #[command(display_order = 21)]
    Watch {
        /// Seconds between syncs; enables watching even when auto-sync is off
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Write the catalogue to a JSON backup file (administrators)
    #[command(display_order = 22)]
    Export {
        /// File or directory (defaults to the current directory)
        path: Option<PathBuf>,
    },

    /// Replace the catalogue with a JSON backup file (administrators)
    #[command(display_order = 23)]
    Import { path: PathBuf },

    /// Restore the catalogue from a backup on this device (administrators)
    #[command(display_order = 24)]
    Restore {
        #[arg(value_enum)]
        source: RestoreArg,

        /// Save right away (only needed for `snapshot`, the others always save)
        #[arg(long)]
        save: bool,
    },

    /// Show the backups available on this device (administrators)
    #[command(display_order = 25)]
    Backups,

    /// Show where the data comes from and who is logged in
    #[command(display_order = 30)]
    Status,

    /// Show or change configuration
    #[command(display_order = 31)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },

    /// Print help for kennel or a subcommand
    #[command(display_order = 32)]
    Help {
        /// Subcommand to get help for
        command: Option<String>,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::List { .. } => "list",
            Commands::View { .. } => "view",
            Commands::Add { .. } => "add",
            Commands::Edit { .. } => "edit",
            Commands::Delete { .. } => "delete",
            Commands::Login { .. } => "login",
            Commands::Logout => "logout",
            Commands::Register { .. } => "register",
            Commands::Sync => "sync",
            Commands::Watch { .. } => "watch",
            Commands::Export { .. } => "export",
            Commands::Import { .. } => "import",
            Commands::Restore { .. } => "restore",
            Commands::Backups => "backups",
            Commands::Status => "status",
            Commands::Config { .. } => "config",
            Commands::Help { .. } => "help",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the current configuration
    Show,
    /// Set a key, e.g. `remote.owner breeder`
    Set { key: String, value: String },
    /// Reset a key to its default
    Unset { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_visible_command_has_a_group() {
        for sub in Cli::command().get_subcommands() {
            assert!(
                CommandGroup::for_command(sub.get_name()).is_some(),
                "{} has no help group",
                sub.get_name()
            );
        }
    }

    #[test]
    fn parses_add_with_photos() {
        let cli = Cli::try_parse_from([
            "kennel", "add", "--name", "Rex", "--status", "puppy", "--photo", "a.jpg", "--photo",
            "b.png",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Add { fields, id }) => {
                assert_eq!(fields.name.as_deref(), Some("Rex"));
                assert!(matches!(fields.status, Some(StatusArg::Puppy)));
                assert_eq!(fields.photos.len(), 2);
                assert!(id.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["kennel", "-vv", "status"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn grouped_help_lists_commands() {
        let help = get_grouped_help();
        assert!(help.contains("Catalogue:"));
        assert!(help.contains("restore"));
    }
}
