//! Transfer command implementation.

use std::collections::HashSet;

use anyhow::{bail, Result};
use crossfade_core::catalog::{Collection, CollectionId};
use crossfade_core::context::AppContext;
use crossfade_core::service::ServiceId;
use crossfade_core::transfer::{RunEvent, RunReport};
use crossfade_core::Error;
use tokio::sync::broadcast::{self, error::RecvError};

use super::playlists::listing_row;
use super::{GlobalArgs, TransferArgs};
use crate::ui::{self, plural, Prompter};

/// Run the transfer command.
pub async fn run(args: TransferArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = super::connect_context(global).await?;

    if let Some(from) = &args.from {
        ctx.set_source(&ServiceId::from(from.as_str())).await?;
    }
    let source = ctx.source().await;
    let destination = ServiceId::from(args.to.as_str());

    if !ctx.is_authenticated(&source).await {
        return Err(Error::NotConnected(source.to_string()).into());
    }
    ctx.refresh_catalog(&source).await?;

    if args.all {
        ctx.select_all().await;
    }
    for id in &args.playlists {
        ctx.toggle(&CollectionId::from(id.as_str())).await?;
    }
    if args.interactive && !pick(&ctx, &source).await? {
        println!("  Cancelled.");
        return Ok(());
    }

    let selection = ctx.selection().await;
    let interactive_output = !args.quiet && !args.json;
    if interactive_output && !selection.is_empty() {
        println!();
        println!(
            "  Transferring {} from {} to {}",
            plural(selection.len(), "playlist"),
            source,
            destination
        );
        println!();
    }

    let display = interactive_output
        .then(|| tokio::spawn(display_progress(ctx.events(), selection.len())));

    let report = match ctx.transfer(&destination).await {
        Ok(report) => report,
        Err(e) => {
            if let Some(handle) = display {
                handle.abort();
            }
            return Err(e.into());
        }
    };
    if let Some(handle) = display {
        let _ = handle.await;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !args.quiet {
        print_summary(&report);
    }
    Ok(())
}

/// Interactive selection loop. Returns false when the user cancels.
async fn pick(ctx: &AppContext, source: &ServiceId) -> Result<bool> {
    let listing = ctx.listing(source).await;
    if listing.is_empty() {
        bail!("{source} has no playlists");
    }
    let mut prompter = Prompter::new();

    loop {
        let selected: HashSet<CollectionId> =
            ctx.selection().await.into_iter().map(|c| c.id).collect();
        print_choices(&listing, &selected);

        println!();
        println!("Enter numbers to toggle, 'a' for all, Enter to start, 'q' to quit:");
        let Some(input) = prompter.ask("  > ").await? else {
            return Ok(false);
        };

        match input.as_str() {
            "" => return Ok(true),
            "q" | "Q" => return Ok(false),
            "a" | "A" => {
                ctx.select_all().await;
            }
            other => {
                for token in other.split(|c: char| c == ',' || c.is_whitespace()) {
                    if token.is_empty() {
                        continue;
                    }
                    match parse_choice(token, listing.len()) {
                        Some(index) => {
                            ctx.toggle(&listing[index].id).await?;
                        }
                        None => println!("  Ignoring '{token}'"),
                    }
                }
            }
        }
    }
}

fn print_choices(listing: &[Collection], selected: &HashSet<CollectionId>) {
    println!();
    for (i, collection) in listing.iter().enumerate() {
        let mark = if selected.contains(&collection.id) { "x" } else { " " };
        println!("  [{mark}] {:>3}. {}", i + 1, listing_row(collection));
    }
}

/// 1-based choice to index.
fn parse_choice(token: &str, len: usize) -> Option<usize> {
    let n: usize = token.parse().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

/// Render run events as a single progress line plus one line per result.
async fn display_progress(mut events: broadcast::Receiver<RunEvent>, total: usize) {
    let mut percent = 0.0;
    let mut current: Option<(usize, String)> = None;

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Progress display skipped {} events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match event {
            RunEvent::Started { .. } | RunEvent::Reset => {}
            RunEvent::JobStarted { index, name } => {
                current = Some((index, name));
            }
            RunEvent::Progress { percent: p } => percent = p,
            RunEvent::JobFinished(result) => {
                ui::clear_line();
                println!("{}", ui::result_line(&result));
                current = None;
            }
            RunEvent::Completed { .. } => {
                ui::clear_line();
                break;
            }
        }

        if let Some((index, name)) = &current {
            ui::redraw(&ui::progress_line(percent, index + 1, total, name));
        }
    }
}

fn print_summary(report: &RunReport) {
    let elapsed = report.finished_at - report.started_at;
    println!();
    println!(
        "  Done: {} succeeded, {} failed ({}s)",
        report.succeeded(),
        report.failed(),
        elapsed.num_seconds()
    );
    println!();
}
