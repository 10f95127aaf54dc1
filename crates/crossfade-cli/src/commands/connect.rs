//! Connect command implementation.

use std::time::Duration;

use anyhow::{bail, Result};
use crossfade_core::api::{AuthStart, Credentials};
use crossfade_core::service::{AuthFlow, ServiceId};

use super::{ConnectArgs, GlobalArgs};
use crate::ui::Prompter;

/// Run the connect command.
pub async fn run(args: ConnectArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = super::connect_context(global).await?;
    let service = ServiceId::from(args.service.as_str());
    let descriptor = ctx.registry().enabled(&service)?.clone();

    if ctx.is_authenticated(&service).await {
        println!("{} is already connected.", descriptor.display_name);
        return Ok(());
    }

    let credentials = match descriptor.auth_flow {
        AuthFlow::OAuth => None,
        AuthFlow::Credential => Some(read_credentials(&args, &descriptor.display_name).await?),
    };

    match ctx.initiate_auth(&service, credentials).await? {
        AuthStart::Redirect(url) => {
            if args.no_browser || open::that(&url).is_err() {
                println!("Open this URL to authorize {}:", descriptor.display_name);
                println!();
                println!("  {url}");
                println!();
            } else {
                println!("Opened your browser to authorize {}.", descriptor.display_name);
            }
            println!("Waiting for authorization...");

            ctx.await_connection(&service, Duration::from_secs(args.timeout))
                .await?;
            println!("Connected to {}.", descriptor.display_name);
        }
        AuthStart::LoggedIn => {
            if ctx.is_authenticated(&service).await {
                println!("Connected to {}.", descriptor.display_name);
            } else {
                println!(
                    "Login accepted; {} will show as connected once the server reports it.",
                    descriptor.display_name
                );
            }
        }
    }
    Ok(())
}

async fn read_credentials(args: &ConnectArgs, display_name: &str) -> Result<Credentials> {
    let mut prompter = Prompter::new();
    let email = match &args.email {
        Some(email) => email.clone(),
        None => prompter
            .ask(&format!("{display_name} email: "))
            .await?
            .unwrap_or_default(),
    };
    let password = match &args.password {
        Some(password) => password.clone(),
        None => prompter
            .ask_secret(&format!("{display_name} password: "))
            .await?
            .unwrap_or_default(),
    };

    if email.is_empty() || password.is_empty() {
        bail!("{display_name} needs both an email and a password");
    }
    Ok(Credentials { email, password })
}
