//! Login dispatch: a [`SessionBuilder`] goes in, an authenticated
//! [`Session`] comes out.

use std::path::PathBuf;
use std::sync::Arc;

use cop_config::{AuthMethod, ResolvedConfig};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::browser::{BrowserLauncher, SystemBrowser};
use crate::error::{AuthError, Result};
use crate::oauth::{Endpoints, OAuthClient, OAuthConfig};
use crate::service_principal::{self, ServicePrincipalCredentials};
use crate::token::TokenSet;

const USER_AGENT: &str = concat!("cop/", env!("CARGO_PKG_VERSION"));

/// Everything needed to attempt one login.
#[derive(Clone)]
pub struct SessionBuilder {
    base_url: Url,
    tenant: String,
    method: AuthMethod,
    username: Option<String>,
    password: Option<String>,
    secret_file: Option<PathBuf>,
    refresh_token: Option<String>,
    http: reqwest::Client,
    oauth: OAuthConfig,
    launcher: Arc<dyn BrowserLauncher>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("base_url", &self.base_url.as_str())
            .field("tenant", &self.tenant)
            .field("method", &self.method)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("secret_file", &self.secret_file)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("oauth", &self.oauth)
            .finish_non_exhaustive()
    }
}

impl SessionBuilder {
    /// Start a builder with default HTTP client, OAuth settings and the
    /// system browser.
    pub fn new(base_url: Url, tenant: impl Into<String>, method: AuthMethod) -> Self {
        Self {
            base_url,
            tenant: tenant.into(),
            method,
            username: None,
            password: None,
            secret_file: None,
            refresh_token: None,
            http: reqwest::Client::new(),
            oauth: OAuthConfig::default(),
            launcher: Arc::new(SystemBrowser),
            cancel: CancellationToken::new(),
        }
    }

    /// Build from a validated configuration.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let mut builder = Self::new(config.url.clone(), config.tenant.clone(), config.auth_method)
            .with_http_client(http)
            .with_oauth_config(OAuthConfig::from(&config.oauth));
        builder.username = config.username.clone();
        builder.password = config.password.clone();
        builder.secret_file = config.secret_file.clone();
        builder.refresh_token = config.refresh_token.clone();
        Ok(builder)
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_oauth_config(mut self, oauth: OAuthConfig) -> Self {
        self.oauth = oauth;
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_secret_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.secret_file = Some(path.into());
        self
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Cancels a pending browser callback wait when triggered.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn method(&self) -> AuthMethod {
        self.method
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Authenticate with the configured method.
    ///
    /// Exactly one strategy runs, with no retries. The returned session
    /// always carries an access token.
    pub async fn login(mut self) -> Result<Session> {
        tracing::info!(method = %self.method, tenant = %self.tenant, "logging in");

        let tokens = match self.method {
            AuthMethod::OAuth => {
                let client = OAuthClient::new(
                    self.http.clone(),
                    &self.base_url,
                    &self.tenant,
                    self.oauth.clone(),
                )?;
                client
                    .login(self.refresh_token.as_deref(), self.launcher.as_ref(), &self.cancel)
                    .await?
            }
            AuthMethod::ServicePrincipal => {
                let path = self.secret_file.as_deref().ok_or_else(|| {
                    AuthError::Config("service-principal login requires a secret file".to_string())
                })?;
                let credentials = ServicePrincipalCredentials::load(path)?;
                let endpoints = Endpoints::for_tenant(&self.base_url, &self.tenant)?;
                service_principal::login(&self.http, &endpoints.token, &credentials).await?
            }
            AuthMethod::Headless => {
                tracing::warn!(username = ?self.username, "headless login is not implemented");
                return Err(AuthError::Unsupported(self.method.to_string()));
            }
        };

        if let Some(refresh_token) = &tokens.refresh_token {
            self.refresh_token = Some(refresh_token.clone());
        }

        Ok(Session {
            builder: self,
            tokens,
        })
    }
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    builder: SessionBuilder,
    tokens: TokenSet,
}

impl Session {
    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.builder.refresh_token()
    }

    pub fn tokens(&self) -> &TokenSet {
        &self.tokens
    }

    pub fn tenant(&self) -> &str {
        &self.builder.tenant
    }

    pub fn base_url(&self) -> &Url {
        &self.builder.base_url
    }

    pub fn method(&self) -> AuthMethod {
        self.builder.method
    }

    /// HTTP client the session logged in with.
    pub fn http(&self) -> &reqwest::Client {
        &self.builder.http
    }

    /// Back to a builder, keeping the latest refresh token so the next
    /// login can skip the browser.
    pub fn into_builder(self) -> SessionBuilder {
        self.builder
    }
}
