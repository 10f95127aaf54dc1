//! Crossfade CLI - move playlists between streaming services
//!
//! Crossfade talks to a running transfer backend: it shows which services
//! are connected, lists their playlists and moves a selection of them to
//! another service, one playlist at a time.
//!
//! ## Quick Start
//!
//! ```bash
//! # Connect both ends
//! crossfade connect spotify
//! crossfade connect tidal
//!
//! # Move everything from Spotify to Tidal
//! crossfade transfer --to tidal --all
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::struct_excessive_bools)]

use std::process::ExitCode;

use clap::Parser;

mod commands;
pub mod ui;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match cli.command {
        Command::Status(args) => commands::status::run(args, &cli.global).await,
        Command::Connect(args) => commands::connect::run(args, &cli.global).await,
        Command::Disconnect(args) => commands::disconnect::run(args, &cli.global).await,
        Command::Playlists(args) => commands::playlists::run(args, &cli.global).await,
        Command::Transfer(args) => commands::transfer::run(args, &cli.global).await,
        Command::Watch => commands::watch::run(&cli.global).await,
        Command::Version(args) => commands::version::run(args, &cli.global).await,
        Command::Config(args) => commands::config::run(args, &cli.global),
        Command::Completions(args) => {
            commands::completions::run(args.shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "info,crossfade=debug,crossfade_core=debug"
    } else {
        "warn,crossfade=info,crossfade_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
