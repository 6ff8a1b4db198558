//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! url = "..."              # knowledge-store base URL
//! tenant = "..."           # tenant identifier
//! auth_method = "oauth"    # oauth | service-principal | headless
//! secret_file = "..."      # service-principal credentials (JSON)
//! [oauth]                  # authorization-code flow overrides
//! [http]                   # transport settings
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All fields are optional so that partial configs (project-local overrides,
/// environment layers) can be loaded and merged before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CopConfig {
    /// Base URL of the platform, e.g. `https://acme.observe.example.com`.
    pub url: Option<String>,

    /// Tenant identifier used in the auth endpoint paths.
    pub tenant: Option<String>,

    /// Which authentication strategy to run.
    pub auth_method: Option<AuthMethod>,

    /// Username for headless login.
    pub username: Option<String>,

    /// Password for headless login.
    pub password: Option<String>,

    /// Path to the service-principal credentials file.
    pub secret_file: Option<PathBuf>,

    /// Refresh token supplied by the caller. Only ever read from the
    /// environment; config files can neither set nor store it.
    #[serde(skip)]
    pub refresh_token: Option<String>,

    /// Authorization-code flow settings.
    pub oauth: OAuthSection,

    /// HTTP transport settings.
    pub http: HttpSection,
}

impl CopConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: CopConfig) {
        if other.url.is_some() {
            self.url = other.url;
        }
        if other.tenant.is_some() {
            self.tenant = other.tenant;
        }
        if other.auth_method.is_some() {
            self.auth_method = other.auth_method;
        }
        if other.username.is_some() {
            self.username = other.username;
        }
        if other.password.is_some() {
            self.password = other.password;
        }
        if other.secret_file.is_some() {
            self.secret_file = other.secret_file;
        }
        if other.refresh_token.is_some() {
            self.refresh_token = other.refresh_token;
        }
        self.oauth.merge(other.oauth);
        self.http.merge(other.http);
    }

    /// Whether the config carries a plaintext password.
    pub fn has_plaintext_password(&self) -> bool {
        self.password.as_ref().is_some_and(|p| !p.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication method
// ─────────────────────────────────────────────────────────────────────────────

/// Supported authentication strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    /// Browser-driven authorization code flow with PKCE.
    #[serde(rename = "oauth")]
    OAuth,
    /// Client-credentials login with a secrets file.
    ServicePrincipal,
    /// Username/password login without a browser.
    Headless,
}

impl AuthMethod {
    /// All supported methods, in display order.
    pub const ALL: [AuthMethod; 3] = [
        AuthMethod::OAuth,
        AuthMethod::ServicePrincipal,
        AuthMethod::Headless,
    ];

    /// The identifier used in config files and `COP_AUTH_METHOD`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::OAuth => "oauth",
            AuthMethod::ServicePrincipal => "service-principal",
            AuthMethod::Headless => "headless",
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuthMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| ConfigError::UnknownAuthMethod(s.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[oauth]` section. Unset fields fall back to the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSection {
    /// OAuth client identifier.
    pub client_id: Option<String>,
    /// Local redirect URI served by the callback listener.
    pub redirect_uri: Option<String>,
    /// Requested scopes.
    pub scopes: Option<Vec<String>>,
    /// How long to wait for the browser redirect.
    pub callback_timeout_secs: Option<u64>,
}

impl OAuthSection {
    fn merge(&mut self, other: OAuthSection) {
        if other.client_id.is_some() {
            self.client_id = other.client_id;
        }
        if other.redirect_uri.is_some() {
            self.redirect_uri = other.redirect_uri;
        }
        if other.scopes.is_some() {
            self.scopes = other.scopes;
        }
        if other.callback_timeout_secs.is_some() {
            self.callback_timeout_secs = other.callback_timeout_secs;
        }
    }
}

/// `[http]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl HttpSection {
    fn merge(&mut self, other: HttpSection) {
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
    }
}
