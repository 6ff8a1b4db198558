//! Type command - read knowledge-store type definitions.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;
use super::object::write_body;

/// Arguments for the type command.
#[derive(Args, Debug)]
pub struct TypeArgs {
    #[command(subcommand)]
    pub command: TypeCommand,
}

#[derive(Subcommand, Debug)]
pub enum TypeCommand {
    /// Fetch a type definition
    Get {
        /// Fully-qualified type name, e.g. extensibility:solution
        type_name: String,
    },
}

/// Run the type command.
pub async fn run(args: TypeArgs, ctx: &Context) -> Result<()> {
    let (client, _session) = ctx.client().await?;

    match args.command {
        TypeCommand::Get { type_name } => {
            let body = client.types().get(&type_name).await?;
            write_body(&body)?;
        }
    }

    Ok(())
}
