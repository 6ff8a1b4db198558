//! Login command - authenticate with the configured method.

use anyhow::Result;
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Write the access token to stdout
    #[arg(long)]
    pub print_token: bool,
}

/// Run the login command.
pub async fn run(args: LoginArgs, ctx: &Context) -> Result<()> {
    let session = ctx.login().await?;

    if args.print_token {
        println!("{}", session.access_token());
        return Ok(());
    }

    let green = Style::new().green();
    let dim = Style::new().dim();
    println!(
        "{} Logged in to {} {}",
        green.apply_to("✓"),
        session.base_url(),
        dim.apply_to(format!("(tenant {}, {})", session.tenant(), session.method()))
    );

    if ctx.verbose {
        if let Some(expires_at) = session.tokens().expires_at() {
            println!("{}", dim.apply_to(format!("Token expires at {}", expires_at)));
        }
        if session.refresh_token().is_some() {
            println!("{}", dim.apply_to("Refresh token received"));
        }
    }

    Ok(())
}
