//! Client-credentials login for service principals.

use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{AuthError, Result};
use crate::token::{StatusPolicy, TokenSet, read_token_response};

/// Contents of a service-principal secrets file.
#[derive(Clone, Deserialize)]
pub struct ServicePrincipalCredentials {
    #[serde(rename = "Client ID")]
    pub client_id: String,
    #[serde(rename = "Secret")]
    pub secret: String,
}

impl std::fmt::Debug for ServicePrincipalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePrincipalCredentials")
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl ServicePrincipalCredentials {
    /// Read and parse a secrets file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| AuthError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| AuthError::CredentialParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Exchange service-principal credentials for a token.
///
/// A non-200 answer is logged and the body is still read as a token; an
/// error payload in it is surfaced as [`AuthError::TokenEndpoint`].
pub async fn login(
    http: &reqwest::Client,
    token_url: &Url,
    credentials: &ServicePrincipalCredentials,
) -> Result<TokenSet> {
    tracing::debug!(client_id = %credentials.client_id, url = %token_url, "service principal login");

    let response = http
        .post(token_url.clone())
        .header(reqwest::header::ACCEPT, "application/json")
        .basic_auth(&credentials.client_id, Some(&credentials.secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    let tokens = read_token_response(response, StatusPolicy::Lenient).await?;
    tracing::info!("login returned a valid token");
    Ok(tokens)
}
