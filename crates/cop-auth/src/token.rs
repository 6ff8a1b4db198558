//! Token endpoint responses.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Tokens returned by the token endpoint.
///
/// Every field is optional on the wire; an empty `access_token` is rejected
/// by [`read_token_response`].
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSet {
    pub access_token: String,
    pub expires_in: Option<u64>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
    /// When this response was received.
    #[serde(skip)]
    pub obtained_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("id_token", &redact(&self.id_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

impl TokenSet {
    /// Absolute expiry, when the server reported a lifetime.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let obtained = self.obtained_at?;
        let secs = i64::try_from(self.expires_in?).ok()?;
        obtained.checked_add_signed(ChronoDuration::try_seconds(secs)?)
    }
}

/// Structured OAuth error body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthErrorPayload {
    pub error: String,
    pub error_description: Option<String>,
    pub error_hint: Option<String>,
    pub status_code: Option<u16>,
}

impl std::fmt::Display for OAuthErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(description) = &self.error_description {
            write!(f, ": {}", description)?;
        }
        if let Some(hint) = &self.error_hint {
            write!(f, " (hint: {})", hint)?;
        }
        Ok(())
    }
}

impl OAuthErrorPayload {
    /// Parse a body as an error payload. Bodies without an `error` field
    /// are not payloads.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(|p| !p.error.is_empty())
    }
}

/// Build the protocol error for a failed token request, salvaging as much of
/// the body as possible.
pub(crate) fn endpoint_error(status: u16, body: &str) -> AuthError {
    let detail = match OAuthErrorPayload::parse(body) {
        Some(payload) => payload.to_string(),
        None if body.trim().is_empty() => "<empty body>".to_string(),
        None => body.trim().to_string(),
    };
    AuthError::TokenEndpoint { status, detail }
}

/// How to treat an unexpected token response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusPolicy {
    /// Fail immediately with the salvaged error body.
    Strict,
    /// Log the status and still try to read a token from the body.
    Lenient,
}

impl StatusPolicy {
    /// Strict flags any non-2xx status; lenient flags anything but 200.
    fn is_anomaly(self, status: u16, success: bool) -> bool {
        match self {
            StatusPolicy::Strict => !success,
            StatusPolicy::Lenient => status != 200,
        }
    }
}

/// Read and validate a token endpoint response.
pub(crate) async fn read_token_response(
    response: reqwest::Response,
    policy: StatusPolicy,
) -> Result<TokenSet> {
    let status = response.status();
    let body = response.text().await?;
    parse_token_body(status.as_u16(), status.is_success(), &body, policy)
}

fn parse_token_body(
    status: u16,
    success: bool,
    body: &str,
    policy: StatusPolicy,
) -> Result<TokenSet> {
    if policy.is_anomaly(status, success) {
        match policy {
            StatusPolicy::Strict => return Err(endpoint_error(status, body)),
            StatusPolicy::Lenient => {
                tracing::error!(status, "login failed; details to follow");
            }
        }
    }

    let mut tokens: TokenSet = match serde_json::from_str(body) {
        Ok(tokens) => tokens,
        Err(_) if !success => return Err(endpoint_error(status, body)),
        Err(e) => {
            tracing::error!(error = %e, "failed to parse token response");
            return Err(AuthError::TokenParse(e.to_string()));
        }
    };

    if tokens.access_token.is_empty() {
        return Err(match OAuthErrorPayload::parse(body) {
            Some(payload) => AuthError::TokenEndpoint {
                status,
                detail: payload.to_string(),
            },
            None => AuthError::MissingAccessToken,
        });
    }

    if tokens.refresh_token.as_deref() == Some("") {
        tokens.refresh_token = None;
    }
    tokens.obtained_at = Some(Utc::now());
    Ok(tokens)
}
