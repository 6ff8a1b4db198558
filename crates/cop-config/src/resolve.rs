//! Validation of a merged [`CopConfig`] into a [`ResolvedConfig`].
//!
//! Required fields depend on the authentication method:
//!
//! | method              | required                               |
//! |---------------------|----------------------------------------|
//! | `oauth`             | `url`, `tenant`                        |
//! | `service-principal` | `url`, `tenant`, `secret_file`         |
//! | `headless`          | `url`, `tenant`, `username`, `password`|

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::env::{
    AUTH_METHOD_ENV, PASSWORD_ENV, SECRET_FILE_ENV, TENANT_ENV, URL_ENV, USERNAME_ENV,
};
use crate::{AuthMethod, ConfigError, CopConfig, OAuthSection, Result};

/// Default per-request HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A validated configuration ready to build a login session from.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub url: Url,
    pub tenant: String,
    pub auth_method: AuthMethod,
    pub username: Option<String>,
    pub password: Option<String>,
    pub secret_file: Option<PathBuf>,
    pub refresh_token: Option<String>,
    pub oauth: OAuthSection,
    pub http_timeout: Duration,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("url", &self.url.as_str())
            .field("tenant", &self.tenant)
            .field("auth_method", &self.auth_method)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("secret_file", &self.secret_file)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("oauth", &self.oauth)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl CopConfig {
    /// Validate the merged config for its authentication method.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let auth_method = self.auth_method.ok_or_else(|| ConfigError::MissingField {
            field: "auth_method",
            method: "<unset>".to_string(),
            env_var: AUTH_METHOD_ENV,
        })?;

        let require = |value: &Option<String>, field: &'static str, env_var: &'static str| {
            value
                .as_ref()
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .ok_or_else(|| ConfigError::MissingField {
                    field,
                    method: auth_method.to_string(),
                    env_var,
                })
        };

        let raw_url = require(&self.url, "url", URL_ENV)?;
        let url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            url: raw_url.clone(),
            source,
        })?;
        let tenant = require(&self.tenant, "tenant", TENANT_ENV)?;

        let secret_file = self.secret_file.as_deref().map(expand_home);

        match auth_method {
            AuthMethod::OAuth => {}
            AuthMethod::ServicePrincipal => {
                if secret_file.is_none() {
                    return Err(ConfigError::MissingField {
                        field: "secret_file",
                        method: auth_method.to_string(),
                        env_var: SECRET_FILE_ENV,
                    });
                }
            }
            AuthMethod::Headless => {
                require(&self.username, "username", USERNAME_ENV)?;
                require(&self.password, "password", PASSWORD_ENV)?;
            }
        }

        Ok(ResolvedConfig {
            url,
            tenant,
            auth_method,
            username: self.username.clone(),
            password: self.password.clone(),
            secret_file,
            refresh_token: self.refresh_token.clone(),
            oauth: self.oauth.clone(),
            http_timeout: self
                .http
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT),
        })
    }
}

/// Expand a leading `~` against the user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
