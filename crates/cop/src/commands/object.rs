//! Object command - knowledge-store object CRUD.

use std::io::Write;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use console::Style;

use cop_client::payload::merge_known_fields;
use cop_client::{Layer, LayerType, ObjectRef};

use super::Context;

/// Arguments for the object command.
#[derive(Args, Debug)]
pub struct ObjectArgs {
    #[command(subcommand)]
    pub command: ObjectCommand,
}

/// Layer selection shared by object subcommands.
#[derive(Args, Debug, Clone)]
pub struct LayerArgs {
    /// Layer id (default: the tenant id)
    #[arg(long)]
    pub layer_id: Option<String>,

    /// Layer type: TENANT, SOLUTION, ACCOUNT, USER, GLOBALUSER, LOCALUSER
    #[arg(long, default_value = "TENANT")]
    pub layer_type: LayerType,
}

impl LayerArgs {
    fn layer(&self, tenant: &str) -> Layer {
        Layer::new(
            self.layer_type,
            self.layer_id.clone().unwrap_or_else(|| tenant.to_string()),
        )
    }
}

#[derive(Subcommand, Debug)]
pub enum ObjectCommand {
    /// Fetch one object, or list a type's objects when no id is given
    Get {
        /// Fully-qualified type name
        #[arg(required_unless_present = "import_id")]
        type_name: Option<String>,

        /// Object id
        id: Option<String>,

        /// Object reference 'type|id|layerType|layerId'; replaces the positional arguments and layer flags
        #[arg(long, conflicts_with_all = ["type_name", "id", "layer_id"])]
        import_id: Option<ObjectRef>,

        /// Print this payload with its fields refreshed from the object's data (JSON or @file)
        #[arg(long)]
        merge_into: Option<String>,

        #[command(flatten)]
        layer: LayerArgs,
    },

    /// Create an object
    Create {
        /// Fully-qualified type name
        type_name: String,

        /// Payload as JSON or @file
        #[arg(long)]
        data: String,

        #[command(flatten)]
        layer: LayerArgs,
    },

    /// Replace an object's payload
    Update {
        /// Fully-qualified type name
        type_name: String,

        /// Object id
        id: String,

        /// Payload as JSON or @file
        #[arg(long)]
        data: String,

        #[command(flatten)]
        layer: LayerArgs,
    },

    /// Delete an object
    Delete {
        /// Fully-qualified type name
        type_name: String,

        /// Object id
        id: String,

        #[command(flatten)]
        layer: LayerArgs,
    },
}

/// Run the object command.
pub async fn run(args: ObjectArgs, ctx: &Context) -> Result<()> {
    let (client, session) = ctx.client().await?;
    let objects = client.objects();
    let tenant = session.tenant();

    match args.command {
        ObjectCommand::Get {
            type_name,
            id,
            import_id,
            merge_into,
            layer,
        } => {
            let body = match (import_id, type_name, id) {
                (Some(reference), _, _) => objects.get_ref(&reference).await?,
                (None, Some(type_name), Some(id)) => {
                    objects.get(&type_name, &id, &layer.layer(tenant)).await?
                }
                (None, Some(type_name), None) => {
                    objects.list(&type_name, &layer.layer(tenant)).await?
                }
                (None, None, _) => anyhow::bail!("a type name or --import-id is required"),
            };

            match merge_into {
                Some(local) => {
                    let local = read_payload(&local)?;
                    let local = String::from_utf8(local).context("payload is not UTF-8")?;
                    println!("{}", merge_known_fields(Some(&local), &body)?);
                }
                None => write_body(&body)?,
            }
        }
        ObjectCommand::Create {
            type_name,
            data,
            layer,
        } => {
            let payload = read_payload(&data)?;
            let body = objects
                .create(&type_name, &layer.layer(tenant), &payload)
                .await?;
            if body.is_empty() {
                report(&format!("Created object of type {}", type_name));
            } else {
                write_body(&body)?;
            }
        }
        ObjectCommand::Update {
            type_name,
            id,
            data,
            layer,
        } => {
            let payload = read_payload(&data)?;
            objects
                .update(&type_name, &id, &layer.layer(tenant), &payload)
                .await?;
            report(&format!("Updated {} {}", type_name, id));
        }
        ObjectCommand::Delete {
            type_name,
            id,
            layer,
        } => {
            objects.delete(&type_name, &id, &layer.layer(tenant)).await?;
            report(&format!("Deleted {} {}", type_name, id));
        }
    }

    Ok(())
}

/// `@path` reads a file, anything else is the payload itself.
pub(crate) fn read_payload(arg: &str) -> Result<Vec<u8>> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read(path).with_context(|| format!("failed to read {}", path)),
        None => Ok(arg.as_bytes().to_vec()),
    }
}

/// Write a raw response body to stdout, newline-terminated.
pub(crate) fn write_body(body: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(body)?;
    if !body.ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

/// Status lines go to stderr so stdout stays machine-readable.
fn report(message: &str) {
    let green = Style::new().green();
    eprintln!("{} {}", green.apply_to("✓"), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_payload_inline() {
        assert_eq!(read_payload(r#"{"a":1}"#).unwrap(), br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn test_read_payload_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.json");
        std::fs::write(&path, br#"{"b":2}"#).unwrap();
        let arg = format!("@{}", path.display());
        assert_eq!(read_payload(&arg).unwrap(), br#"{"b":2}"#.to_vec());
    }

    #[test]
    fn test_read_payload_missing_file() {
        assert!(read_payload("@/definitely/not/here.json").is_err());
    }

    #[test]
    fn test_layer_defaults_to_tenant() {
        let args = LayerArgs {
            layer_id: None,
            layer_type: LayerType::Tenant,
        };
        assert_eq!(args.layer("t-1"), Layer::tenant("t-1"));

        let args = LayerArgs {
            layer_id: Some("sol".to_string()),
            layer_type: LayerType::Solution,
        };
        assert_eq!(args.layer("t-1"), Layer::new(LayerType::Solution, "sol"));
    }
}
