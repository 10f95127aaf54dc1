//! Disconnect command implementation.

use anyhow::Result;
use crossfade_core::service::ServiceId;

use super::{DisconnectArgs, GlobalArgs};

/// Run the disconnect command.
pub async fn run(args: DisconnectArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = super::connect_context(global).await?;
    let service = ServiceId::from(args.service);
    let name = ctx.registry().get(&service)?.display_name.clone();

    if !ctx.is_authenticated(&service).await {
        println!("{name} is not connected.");
        return Ok(());
    }

    ctx.disconnect(&service).await?;
    println!("Disconnected from {name}.");
    Ok(())
}
