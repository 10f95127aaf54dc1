//! Watch command implementation.

use anyhow::Result;
use chrono::Local;
use crossfade_core::service::ServiceRegistry;
use crossfade_core::session::SessionEffect;
use tokio_util::sync::CancellationToken;

use super::GlobalArgs;

/// Run the watch command.
pub async fn run(global: &GlobalArgs) -> Result<()> {
    let config = super::load_config(global)?;
    let ctx = crossfade_core::context::AppContext::from_config(&config)?;

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    println!(
        "Watching {} every {:?} (Ctrl+C to stop)",
        config.server.url, config.polling.auth_interval
    );
    println!();

    let registry = ctx.registry().clone();
    ctx.watch_sessions(shutdown, |effects| {
        let stamp = Local::now().format("%H:%M:%S");
        for effect in effects {
            println!("  {stamp}  {}", describe(&registry, effect));
        }
    })
    .await;

    println!();
    println!("Stopped.");
    Ok(())
}

fn describe(registry: &ServiceRegistry, effect: &SessionEffect) -> String {
    let (service, verb) = match effect {
        SessionEffect::RefreshCatalog(service) => (service, "connected"),
        SessionEffect::ClearService(service) => (service, "disconnected"),
    };
    let name = registry
        .get(service)
        .map_or_else(|_| service.to_string(), |d| d.display_name.clone());
    format!("{name} {verb}")
}
