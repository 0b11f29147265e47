//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Atrium - extension lifecycle state administration
#[derive(Parser, Debug)]
#[command(name = "atrium")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration directory (defaults to ~/.atrium)
    #[arg(short, long, global = true, env = "ATRIUM_CONFIG_DIR")]
    pub config_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Settings management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Auto-update allow and deny lists
    #[command(subcommand)]
    AutoUpdate(AutoUpdateCommands),

    /// Dismissed extension notifications
    #[command(subcommand)]
    Notifications(NotificationCommands),
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective settings
    Show(ConfigShowArgs),
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Auto-update commands
#[derive(Subcommand, Debug)]
pub enum AutoUpdateCommands {
    /// Show the auto-update mode, or whether one extension would be updated
    Status(AutoUpdateStatusArgs),

    /// Allow auto-update for an extension (publisher.name) or a publisher
    Allow(AutoUpdateTargetArgs),

    /// Stop auto-updating an extension (publisher.name) or a publisher
    Deny(AutoUpdateTargetArgs),

    /// List the persisted allow and deny entries
    List(AutoUpdateListArgs),
}

#[derive(Args, Debug)]
pub struct AutoUpdateStatusArgs {
    /// Extension identifier to evaluate
    pub extension: Option<String>,

    /// Treat the extension as disabled
    #[arg(long, requires = "extension")]
    pub disabled: bool,

    /// Treat the extension as pinned to its installed version
    #[arg(long, requires = "extension")]
    pub pinned: bool,
}

#[derive(Args, Debug)]
pub struct AutoUpdateTargetArgs {
    /// Extension identifier or publisher name
    pub target: String,
}

#[derive(Args, Debug)]
pub struct AutoUpdateListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Notification commands
#[derive(Subcommand, Debug)]
pub enum NotificationCommands {
    /// Show dismissed notification keys
    List,

    /// Forget every dismissed notification so they are shown again
    Reset,
}
