//! cop - knowledge-store command-line client
//!
//! Main entry point for the cop CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, login, object, types};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// cop - knowledge-store objects and types from the command line
#[derive(Parser)]
#[command(name = "cop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding config.toml (default: ~/.config/cop)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: commands::Overrides,

    /// Print the authorization URL instead of opening a browser
    #[arg(long, global = true)]
    pub no_browser: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authenticate and report the result
    Login(login::LoginArgs),

    /// Read and write knowledge-store objects
    Object(object::ObjectArgs),

    /// Read knowledge-store type definitions
    Type(types::TypeArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_tracing(cli.verbose, cli.config_dir.as_deref());

    let ctx = commands::Context {
        config_dir: cli.config_dir,
        overrides: cli.overrides,
        no_browser: cli.no_browser,
        verbose: cli.verbose,
    };

    // Dropping the command future on Ctrl-C releases the callback listener.
    tokio::select! {
        result = dispatch(cli.command, &ctx) => result,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted"),
    }
}

async fn dispatch(command: Commands, ctx: &commands::Context) -> Result<()> {
    match command {
        Commands::Login(args) => login::run(args, ctx).await,
        Commands::Object(args) => object::run(args, ctx).await,
        Commands::Type(args) => types::run(args, ctx).await,
        Commands::Config(args) => config::run(args, ctx).await,
    }
}

/// Console (human-readable, stderr) + daily JSON file under the config dir.
///
/// Stdout carries command output only.
fn init_tracing(
    verbose: bool,
    config_dir: Option<&std::path::Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        "cop=debug,cop_auth=debug,cop_client=debug,cop_config=debug,info"
    } else {
        "cop=info,cop_auth=info,cop_client=warn,cop_config=warn,warn"
    };

    let log_dir = config_dir
        .map(std::path::Path::to_path_buf)
        .or_else(cop_config::xdg_config_dir)
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    // An unwritable log dir only loses the file layer.
    let (file_writer, guard) = match tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("cop")
        .filename_suffix("log")
        .build(&log_dir)
    {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        Err(_) => (None, None),
    };

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_filter(EnvFilter::new(
                "cop=trace,cop_auth=trace,cop_client=trace,cop_config=trace,info",
            ))
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr)
                .with_filter(
                    EnvFilter::try_from_env("COP_LOG").unwrap_or_else(|_| EnvFilter::new(filter)),
                ),
        )
        .with(file_layer)
        .init();

    guard
}
