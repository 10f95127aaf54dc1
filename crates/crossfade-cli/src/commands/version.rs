//! Version command implementation.

use anyhow::Result;
use crossfade_core::context::AppContext;
use semver::Version;

use super::{GlobalArgs, VersionArgs};

/// Run the version command.
pub async fn run(args: VersionArgs, global: &GlobalArgs) -> Result<()> {
    let client = crossfade_core::VERSION;
    let config = super::load_config(global)?;
    let server = AppContext::from_config(&config)?.version().await;

    let mismatch = server
        .as_ref()
        .ok()
        .is_some_and(|server| major_mismatch(client, &server.tag));

    if args.json {
        let output = serde_json::json!({
            "client": client,
            "server": server.as_ref().ok(),
            "server_error": server.as_ref().err().map(ToString::to_string),
            "major_mismatch": mismatch,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("crossfade {client}");
    match &server {
        Ok(server) => println!("server    {} ({})", server.tag, server.hash),
        Err(e) => println!("server    unavailable: {e}"),
    }
    if mismatch {
        println!();
        println!("Warning: client and server major versions differ; some features may not work.");
    }
    Ok(())
}

/// Whether both versions parse as semver and differ in major version.
fn major_mismatch(client: &str, server_tag: &str) -> bool {
    let parse = |s: &str| Version::parse(s.trim().trim_start_matches('v')).ok();
    match (parse(client), parse(server_tag)) {
        (Some(client), Some(server)) => client.major != server.major,
        _ => false,
    }
}
