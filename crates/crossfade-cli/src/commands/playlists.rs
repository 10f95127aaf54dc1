//! Playlists command implementation.

use anyhow::Result;
use crossfade_core::catalog::{Collection, CollectionKind};
use crossfade_core::service::ServiceId;
use crossfade_core::Error;

use super::{GlobalArgs, PlaylistsArgs};
use crate::ui::{plural, truncate};

/// Run the playlists command.
pub async fn run(args: PlaylistsArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = super::connect_context(global).await?;
    let service = match args.service {
        Some(service) => ServiceId::from(service),
        None => ctx.source().await,
    };
    let name = ctx.registry().get(&service)?.display_name.clone();

    if !ctx.is_authenticated(&service).await {
        return Err(Error::NotConnected(service.to_string()).into());
    }
    ctx.refresh_catalog(&service).await?;
    let listing = ctx.listing(&service).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!();
    println!("  {} on {}", plural(listing.len(), "playlist"), name);
    println!();
    if !listing.is_empty() {
        println!("  {:<24} {:<36} {:>7}", "ID", "NAME", "TRACKS");
        println!("  {}", "─".repeat(69));
        for collection in &listing {
            println!("  {}", listing_row(collection));
        }
        println!();
    }
    Ok(())
}

/// One table row; favorites are marked with a star.
pub fn listing_row(collection: &Collection) -> String {
    let name = match collection.kind {
        CollectionKind::Favorites => format!("★ {}", collection.name),
        CollectionKind::Normal => collection.name.clone(),
    };
    format!(
        "{:<24} {:<36} {:>7}",
        truncate(collection.id.as_str(), 24),
        truncate(&name, 36),
        collection.item_count
    )
}
