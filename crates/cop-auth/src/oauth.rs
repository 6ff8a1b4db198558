//! OAuth 2.0 authorization-code flow with PKCE against a tenant's auth server.
//!
//! One [`OAuthClient::login`] call is one attempt:
//!
//! 1. With a refresh token on hand, exchange it and stop. A failed refresh
//!    is returned as is; there is no fallback to the interactive flow.
//! 2. Otherwise generate a verifier and an independent state nonce, start
//!    the [`CallbackServer`], send the browser to the authorization URL and
//!    wait (bounded) for the redirect.
//! 3. Reject a mismatched state before any token request is made, then
//!    exchange the code.
//!
//! The callback server is stopped on every exit path once it has started.

use std::time::Duration;

use cop_config::OAuthSection;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::browser::BrowserLauncher;
use crate::callback::{CallbackServer, PendingCallback};
use crate::error::{AuthError, Result};
use crate::pkce::{self, CHALLENGE_METHOD, PkceChallenge};
use crate::token::{StatusPolicy, TokenSet, read_token_response};

pub const DEFAULT_CLIENT_ID: &str = "default";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:3101/callback";
pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "introspect_tokens", "offline_access"];
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// OAuth client settings.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// Upper bound on the wait for the browser redirect.
    pub callback_timeout: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
        }
    }
}

impl From<&OAuthSection> for OAuthConfig {
    fn from(section: &OAuthSection) -> Self {
        let defaults = Self::default();
        Self {
            client_id: section.client_id.clone().unwrap_or(defaults.client_id),
            redirect_uri: section
                .redirect_uri
                .clone()
                .unwrap_or(defaults.redirect_uri),
            scopes: section.scopes.clone().unwrap_or(defaults.scopes),
            callback_timeout: section
                .callback_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.callback_timeout),
        }
    }
}

/// Tenant-scoped OAuth endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize: Url,
    pub token: Url,
}

impl Endpoints {
    /// `{base}/auth/{tenant}/default/oauth2/{authorize,token}`.
    pub fn for_tenant(base: &Url, tenant: &str) -> Result<Self> {
        Ok(Self {
            authorize: tenant_endpoint(base, tenant, "authorize")?,
            token: tenant_endpoint(base, tenant, "token")?,
        })
    }
}

fn tenant_endpoint(base: &Url, tenant: &str, leaf: &str) -> Result<Url> {
    if tenant.trim().is_empty() {
        return Err(AuthError::Config("tenant must not be empty".to_string()));
    }

    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| AuthError::Config(format!("base url '{}' cannot carry a path", base)))?
        .pop_if_empty()
        .extend(["auth", tenant, "default", "oauth2", leaf]);
    Ok(url)
}

/// Build the authorization URL the browser is sent to.
pub fn build_authorization_url(
    authorize: &Url,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
    challenge: &str,
) -> Url {
    let mut url = authorize.clone();
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", &scopes.join(" "))
        .append_pair("state", state)
        .append_pair("code_challenge_method", CHALLENGE_METHOD)
        .append_pair("code_challenge", challenge);
    url
}

/// Talks to one tenant's authorization and token endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(http: reqwest::Client, base: &Url, tenant: &str, config: OAuthConfig) -> Result<Self> {
        Ok(Self {
            http,
            endpoints: Endpoints::for_tenant(base, tenant)?,
            config,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Authorization URL for a given redirect, state and challenge.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str, challenge: &str) -> Url {
        build_authorization_url(
            &self.endpoints.authorize,
            &self.config.client_id,
            redirect_uri,
            &self.config.scopes,
            state,
            challenge,
        )
    }

    /// Run one login attempt.
    ///
    /// A returned refresh token is carried over from `refresh_token` when
    /// the server does not rotate it.
    pub async fn login(
        &self,
        refresh_token: Option<&str>,
        launcher: &dyn BrowserLauncher,
        cancel: &CancellationToken,
    ) -> Result<TokenSet> {
        match refresh_token.filter(|t| !t.is_empty()) {
            Some(refresh_token) => {
                tracing::info!("trying to get a new access token using the refresh token");
                let mut tokens = self.refresh(refresh_token).await?;
                if tokens.refresh_token.is_none() {
                    tokens.refresh_token = Some(refresh_token.to_string());
                }
                tracing::info!("access token refreshed successfully");
                Ok(tokens)
            }
            None => self.authorize(launcher, cancel).await,
        }
    }

    /// The interactive browser flow.
    pub async fn authorize(
        &self,
        launcher: &dyn BrowserLauncher,
        cancel: &CancellationToken,
    ) -> Result<TokenSet> {
        let pkce = PkceChallenge::generate()?;
        let state = pkce::generate_state()?;

        let (server, pending) = CallbackServer::start(&self.config.redirect_uri).await?;
        let outcome = self
            .complete_authorization(&server, pending, &pkce, &state, launcher, cancel)
            .await;

        // Stop failures are already logged by the server; they do not
        // invalidate tokens that were obtained.
        if let Err(e) = server.stop().await {
            tracing::warn!(error = %e, "auth http server did not stop cleanly");
        }

        outcome
    }

    async fn complete_authorization(
        &self,
        server: &CallbackServer,
        pending: PendingCallback,
        pkce: &PkceChallenge,
        state: &str,
        launcher: &dyn BrowserLauncher,
        cancel: &CancellationToken,
    ) -> Result<TokenSet> {
        let redirect_uri = server.redirect_uri().to_string();
        let auth_url = self.authorization_url(&redirect_uri, state, &pkce.challenge);

        if let Err(e) = launcher.open(auth_url.as_str()) {
            tracing::error!(
                error = %e,
                url = %auth_url,
                "failed to launch browser; navigate to the URL manually"
            );
        }

        let result = pending.wait(self.config.callback_timeout, cancel).await?;

        if let Some(error) = result.error {
            return Err(AuthError::Authorization {
                error,
                description: result.error_description,
            });
        }

        if !pkce::constant_time_eq(result.state.as_bytes(), state.as_bytes()) {
            tracing::error!("auth state mismatch; refusing to exchange the authorization code");
            return Err(AuthError::StateMismatch);
        }

        pkce.validate()?;
        let tokens = self
            .exchange_code(&redirect_uri, &result.code, &pkce.verifier)
            .await?;
        tracing::info!(scope = ?tokens.scope, "login returned a valid token");
        Ok(tokens)
    }

    /// `grant_type=authorization_code` exchange.
    pub async fn exchange_code(
        &self,
        redirect_uri: &str,
        code: &str,
        verifier: &str,
    ) -> Result<TokenSet> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        self.post_token(&form).await
    }

    /// `grant_type=refresh_token` exchange.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("refresh_token", refresh_token),
        ];
        self.post_token(&form).await
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenSet> {
        let response = self
            .http
            .post(self.endpoints.token.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await?;
        read_token_response(response, StatusPolicy::Strict).await
    }
}
