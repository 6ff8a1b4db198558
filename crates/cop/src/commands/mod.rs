//! CLI command handlers.

pub mod config;
pub mod login;
pub mod object;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;

use cop_auth::{PrintUrl, Session, SessionBuilder};
use cop_client::CopClient;
use cop_config::{AuthMethod, CopConfig, LoadedConfig, ResolvedConfig};

/// Connection flags; they override files and `COP_*` variables.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Tenant base URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Tenant id
    #[arg(long, global = true)]
    pub tenant: Option<String>,

    /// Authentication method: oauth, service-principal, headless
    #[arg(long, global = true)]
    pub auth_method: Option<AuthMethod>,

    /// Service-principal secrets file
    #[arg(long, global = true)]
    pub secret_file: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, config: &mut CopConfig) {
        if let Some(url) = &self.url {
            config.url = Some(url.clone());
        }
        if let Some(tenant) = &self.tenant {
            config.tenant = Some(tenant.clone());
        }
        if let Some(method) = self.auth_method {
            config.auth_method = Some(method);
        }
        if let Some(path) = &self.secret_file {
            config.secret_file = Some(path.clone());
        }
    }
}

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Overrides the user config directory.
    pub config_dir: Option<PathBuf>,
    /// Flag-level overrides.
    pub overrides: Overrides,
    /// Print the authorization URL instead of launching a browser.
    pub no_browser: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Files, then environment, then flags.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let mut loaded = cop_config::load_config_with_options(None, self.config_dir.as_deref())
            .context("failed to load configuration")?;
        for warning in &loaded.warnings {
            tracing::warn!("{}", warning);
        }
        cop_config::apply_env_overrides(&mut loaded.config)?;
        self.overrides.apply(&mut loaded.config);
        Ok(loaded)
    }

    pub fn resolve_config(&self) -> Result<ResolvedConfig> {
        let loaded = self.load_config()?;
        Ok(loaded.config.resolve()?)
    }

    /// Log in with the configured method.
    pub async fn login(&self) -> Result<Session> {
        let resolved = self.resolve_config()?;
        let mut builder = SessionBuilder::from_config(&resolved)?;
        if self.no_browser {
            builder = builder.with_launcher(Arc::new(PrintUrl));
        }
        builder.login().await.context("login failed")
    }

    /// Log in and build an API client carrying the session's token.
    pub async fn client(&self) -> Result<(CopClient, Session)> {
        let session = self.login().await?;
        let client = CopClient::builder()
            .base_url(session.base_url().as_str())
            .auth_token(session.access_token())
            .build()?;
        Ok((client, session))
    }
}
