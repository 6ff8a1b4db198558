//! HTTP client for the knowledge-store object and type APIs.
//!
//! Objects are addressed by fully-qualified type name, object id and
//! [`Layer`]. Payloads travel as raw JSON bytes so what was written is what
//! comes back.
//!
//! ```no_run
//! use cop_client::{CopClient, Layer, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = CopClient::builder()
//!     .base_url("https://acme.observe.example.com")
//!     .auth_token("access-token")
//!     .build()?;
//!
//! let layer = Layer::tenant("0eb4e853-34fb-4f77-b3fc-b9cd3b462366");
//! client
//!     .objects()
//!     .create("extensibility:solution", &layer, br#"{"name": "demo"}"#)
//!     .await?;
//! let all = client.objects().list("extensibility:solution", &layer).await?;
//! println!("{}", String::from_utf8_lossy(&all));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod payload;
pub mod types;

pub use api::{ObjectsApi, TypesApi};
pub use client::{ClientBuilder, CopClient};
pub use error::{Error, Result};
pub use types::{Layer, LayerType, ObjectRef};
