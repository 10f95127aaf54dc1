//! Config command implementation.

use anyhow::{Context, Result};
use crossfade_core::config::Config;

use super::{ConfigAction, ConfigArgs, GlobalArgs};

/// Run the config command.
pub fn run(args: ConfigArgs, global: &GlobalArgs) -> Result<()> {
    let path = global.config.clone().unwrap_or_else(Config::config_path);

    match args.action {
        ConfigAction::Show => {
            let config = super::load_config(global)?;
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            println!("# {}", path.display());
            println!();
            print!("{rendered}");
        }

        ConfigAction::Path => {
            println!("{}", path.display());
        }

        ConfigAction::Reset => {
            Config::default().save_to(&path)?;
            println!("Configuration reset to defaults.");
        }
    }

    Ok(())
}
