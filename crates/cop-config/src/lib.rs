//! Configuration system for the cop knowledge-store tooling.
//!
//! Provides TOML-based configuration with:
//! - Config file layering (XDG user config + project-local overrides)
//! - `COP_*` environment variable overrides
//! - Per-authentication-method validation into a [`ResolvedConfig`]
//!
//! ```toml
//! url = "https://acme.observe.example.com"
//! tenant = "0eb4e853-34fb-4f77-b3fc-b9cd3b462366"
//! auth_method = "service-principal"
//! secret_file = "~/.config/cop/sp.json"
//!
//! [oauth]
//! redirect_uri = "http://127.0.0.1:3101/callback"
//! callback_timeout_secs = 300
//! ```

pub mod discovery;
pub mod env;
pub mod error;
pub mod resolve;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, save_config,
    xdg_config_dir, xdg_config_path,
};
pub use env::apply_env_overrides;
pub use error::{ConfigError, Result};
pub use resolve::ResolvedConfig;
pub use types::*;
