//! Config command - inspect and initialize configuration.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the merged configuration (files, environment, flags)
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file
    Init {
        /// Create project-local config (./cop.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show the user configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local } => cmd_init(ctx, local),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

const REDACTED: &str = "********";

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let dim = Style::new().dim();

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("{}", dim.apply_to("# No config files loaded"));
    } else {
        for source in &sources {
            println!("{}", dim.apply_to(format!("# from {}", source.display())));
        }
    }

    let mut shown = loaded.config.clone();
    if shown.password.is_some() {
        shown.password = Some(REDACTED.to_string());
    }
    println!("{}", shown.to_toml()?.trim_end());

    if ctx.verbose {
        match loaded.config.resolve() {
            Ok(resolved) => println!(
                "{}",
                dim.apply_to(format!("# ready: {} login", resolved.auth_method))
            ),
            Err(e) => println!("{}", dim.apply_to(format!("# incomplete: {}", e))),
        }
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let green = Style::new().green();
    let dim = Style::new().dim();

    println!("Config file search order (later overrides earlier):\n");
    for source in &loaded.sources {
        let status = if source.loaded {
            green.apply_to("✓ loaded").to_string()
        } else {
            dim.apply_to("· not found").to_string()
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'cop config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

const TEMPLATE: &str = r#"# cop configuration

# Platform base URL and tenant id
# url = "https://acme.observe.example.com"
# tenant = "0eb4e853-34fb-4f77-b3fc-b9cd3b462366"

# oauth | service-principal | headless
auth_method = "oauth"

# Service-principal secrets file ({"Client ID": "...", "Secret": "..."})
# secret_file = "/path/to/secret.json"

[oauth]
# client_id = "default"
# redirect_uri = "http://127.0.0.1:3101/callback"
# scopes = ["openid", "offline_access"]
# callback_timeout_secs = 300

[http]
# timeout_secs = 30
"#;

fn cmd_init(ctx: &Context, local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("cop.toml")
    } else {
        let dir = user_config_dir(ctx)
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        std::fs::create_dir_all(&dir)?;
        dir.join("config.toml")
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    std::fs::write(&path, TEMPLATE)?;
    let green = Style::new().green();
    println!("{} Created {}", green.apply_to("✓"), path.display());
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    match user_config_dir(ctx) {
        Some(dir) => println!("{}", dir.join("config.toml").display()),
        None => eprintln!("Could not determine config directory"),
    }
    Ok(())
}

fn user_config_dir(ctx: &Context) -> Option<PathBuf> {
    ctx.config_dir.clone().or_else(cop_config::xdg_config_dir)
}
