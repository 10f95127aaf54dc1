//! CLI command definitions and handlers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crossfade_core::config::Config;
use crossfade_core::context::AppContext;

pub mod completions;
pub mod config;
pub mod connect;
pub mod disconnect;
pub mod playlists;
pub mod status;
pub mod transfer;
pub mod version;
pub mod watch;

/// Load configuration and apply command line overrides.
///
/// A missing default config file falls back to defaults. An explicit
/// `--config` path that fails to parse is an error.
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = match &global.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable config file: {}", e);
            Config::default()
        }),
    };

    if let Some(server) = &global.server {
        config.server.url.clone_from(server);
    }
    config.validate()?;
    Ok(config)
}

/// Build the application context and take a first auth poll.
pub async fn connect_context(global: &GlobalArgs) -> Result<AppContext> {
    let config = load_config(global)?;
    let ctx = AppContext::from_config(&config)?;
    ctx.poll_auth().await?;
    Ok(ctx)
}

/// Crossfade - move playlists between streaming services
#[derive(Parser)]
#[command(name = "crossfade")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Options shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Options accepted by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Transfer backend URL
    #[arg(long, global = true, env = "CROSSFADE_SERVER")]
    pub server: Option<String>,

    /// Read configuration from this file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Detailed logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Show which services are connected
    Status(StatusArgs),

    /// Connect a streaming service
    Connect(ConnectArgs),

    /// Disconnect a streaming service
    Disconnect(DisconnectArgs),

    /// List playlists of a service
    Playlists(PlaylistsArgs),

    /// Transfer playlists to another service
    Transfer(TransferArgs),

    /// Follow connection changes until interrupted
    Watch,

    /// Show client and server versions
    Version(VersionArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the status command
#[derive(Parser)]
pub struct StatusArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the connect command
#[derive(Parser)]
pub struct ConnectArgs {
    /// Service to connect (spotify, tidal, qobuz, ...)
    pub service: String,

    /// Account email, for services that log in with credentials
    #[arg(long)]
    pub email: Option<String>,

    /// Account password, for services that log in with credentials
    #[arg(long, env = "CROSSFADE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Seconds to wait for a browser authorization to complete
    #[arg(long, default_value = "120")]
    pub timeout: u64,

    /// Print the authorization URL instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,
}

/// Arguments for the disconnect command
#[derive(Parser)]
pub struct DisconnectArgs {
    /// Service to disconnect
    pub service: String,
}

/// Arguments for the playlists command
#[derive(Parser)]
pub struct PlaylistsArgs {
    /// Service to list (defaults to the configured source)
    #[arg(short, long)]
    pub service: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the transfer command
#[derive(Parser)]
pub struct TransferArgs {
    /// Destination service
    #[arg(long)]
    pub to: String,

    /// Source service (defaults to the configured source)
    #[arg(long)]
    pub from: Option<String>,

    /// Select every playlist of the source
    #[arg(short, long)]
    pub all: bool,

    /// Pick playlists from a numbered list
    #[arg(short, long)]
    pub interactive: bool,

    /// Playlist ids to toggle into the selection
    pub playlists: Vec<String>,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output the run report in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the version command
#[derive(Parser)]
pub struct VersionArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config action to perform
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Clone, Copy)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Reset configuration to defaults
    Reset,
}

/// Arguments for the completions command
#[derive(Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,
}

/// Supported shell types
#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum ShellType {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell
    Elvish,
}
