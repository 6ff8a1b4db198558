//! Error types for authentication.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while acquiring credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The OS entropy source could not produce random bytes.
    #[error("random source unavailable: {0}")]
    RandomSource(String),

    /// A PKCE verifier does not derive the expected challenge.
    #[error("invalid code verifier: challenge mismatch")]
    ChallengeMismatch,

    /// The local callback listener could not bind its address.
    #[error("could not start a local http server for auth on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The local callback listener did not shut down cleanly.
    #[error("error stopping the auth http server on {addr}: {reason}")]
    Shutdown { addr: SocketAddr, reason: String },

    /// No browser launch mechanism succeeded.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// The browser redirect never arrived.
    #[error("timed out after {0:?} waiting for the authorization callback")]
    CallbackTimeout(std::time::Duration),

    /// The wait for the browser redirect was cancelled.
    #[error("authorization callback wait was cancelled")]
    CallbackCancelled,

    /// The authorization server redirected back with an error.
    #[error("authorization denied: {error}{}", parenthesized(.description))]
    Authorization {
        error: String,
        description: Option<String>,
    },

    /// The state echoed by the callback does not match the one sent.
    #[error(
        "login failed: received auth state doesn't match (a session replay or similar attack is likely in progress; please log out of all sessions!)"
    )]
    StateMismatch,

    /// Transport failure (DNS, connect, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The token endpoint returned a non-success status.
    #[error("token endpoint returned {status}: {detail}")]
    TokenEndpoint { status: u16, detail: String },

    /// A success body could not be parsed as a token object.
    #[error("failed to JSON parse the response as a token object: {0}")]
    TokenParse(String),

    /// A parseable token response carried no access token.
    #[error("token response did not contain an access token")]
    MissingAccessToken,

    /// The service-principal credentials file could not be read.
    #[error("failed to read credentials file '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The service-principal credentials file is not valid JSON.
    #[error("failed to parse credentials file '{}': {source}", .path.display())]
    CredentialParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Configuration error (bad URL, missing field).
    #[error("config error: {0}")]
    Config(String),

    /// The authentication method exists but has no implementation.
    #[error("authentication method '{0}' is not supported yet")]
    Unsupported(String),
}

fn parenthesized(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}

impl AuthError {
    /// Security failures must never be retried or downgraded.
    pub fn is_security(&self) -> bool {
        matches!(self, AuthError::StateMismatch | AuthError::ChallengeMismatch)
    }

    /// Transport-level failure talking to the remote endpoints.
    pub fn is_transport(&self) -> bool {
        matches!(self, AuthError::Network(_))
    }

    /// The remote side answered, but not with a usable token.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            AuthError::TokenEndpoint { .. }
                | AuthError::TokenParse(_)
                | AuthError::MissingAccessToken
                | AuthError::Authorization { .. }
        )
    }

    /// A local resource (port, file) was unavailable.
    pub fn is_local_resource(&self) -> bool {
        matches!(
            self,
            AuthError::Bind { .. }
                | AuthError::FileRead { .. }
                | AuthError::CredentialParse { .. }
        )
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Network(e.to_string())
    }
}

impl From<url::ParseError> for AuthError {
    fn from(e: url::ParseError) -> Self {
        AuthError::Config(format!("invalid url: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mismatch_is_security() {
        let err = AuthError::StateMismatch;
        assert!(err.is_security());
        assert!(!err.is_protocol());
        assert!(err.to_string().contains("replay"));
    }

    #[test]
    fn test_token_endpoint_is_protocol() {
        let err = AuthError::TokenEndpoint {
            status: 502,
            detail: "<html>Bad Gateway</html>".to_string(),
        };
        assert!(err.is_protocol());
        assert!(!err.is_security());
        assert!(err.to_string().contains("<html>Bad Gateway</html>"));
    }

    #[test]
    fn test_authorization_display() {
        let err = AuthError::Authorization {
            error: "access_denied".to_string(),
            description: Some("user cancelled".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "authorization denied: access_denied (user cancelled)"
        );

        let bare = AuthError::Authorization {
            error: "access_denied".to_string(),
            description: None,
        };
        assert_eq!(bare.to_string(), "authorization denied: access_denied");
    }

    #[test]
    fn test_local_resource_classification() {
        let err = AuthError::FileRead {
            path: PathBuf::from("/nope.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.is_local_resource());
        assert!(err.to_string().contains("/nope.json"));
    }
}
