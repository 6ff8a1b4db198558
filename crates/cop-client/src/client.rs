//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use url::Url;

use crate::api::{ObjectsApi, TypesApi};
use crate::error::{Error, ErrorResponse, Result};
use crate::types::Layer;

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path prefix of the knowledge-store API.
const API_PREFIX: [&str; 2] = ["knowledge-store", "v1"];

const LAYER_ID_HEADER: &str = "layer-id";
const LAYER_TYPE_HEADER: &str = "layer-type";

/// Knowledge-store API client.
///
/// # Example
///
/// ```no_run
/// use cop_client::{CopClient, Layer};
///
/// # async fn example() -> cop_client::Result<()> {
/// let client = CopClient::builder()
///     .base_url("https://acme.observe.example.com")
///     .auth_token("access-token")
///     .build()?;
///
/// let object = client
///     .objects()
///     .get("extensibility:solution", "my-solution", &Layer::tenant("t-1"))
///     .await?;
/// println!("{}", String::from_utf8_lossy(&object));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CopClient {
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
}

impl std::fmt::Debug for CopClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

impl CopClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the objects API.
    pub fn objects(&self) -> ObjectsApi {
        ObjectsApi::new(self.clone())
    }

    /// Access the types API.
    pub fn types(&self) -> TypesApi {
        TypesApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build an API URL from path segments; each segment is escaped.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::Config(format!(
                    "base url '{}' cannot carry a path",
                    self.inner.base_url
                ))
            })?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    /// Send a request and return the raw response body.
    pub(crate) async fn send(
        &self,
        method: Method,
        segments: &[&str],
        layer: Option<&Layer>,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let url = self.url(segments)?;
        tracing::debug!(method = %method, url = %url, "knowledge-store request");

        let mut request = self
            .inner
            .http
            .request(method, url)
            .timeout(self.inner.timeout);

        if let Some(layer) = layer {
            request = request
                .header(LAYER_ID_HEADER, layer.id.as_str())
                .header(LAYER_TYPE_HEADER, layer.layer_type.as_str());
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Handle a response, extracting the body or error.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract an error from a failed response.
    async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        let message = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => err.message,
            Err(_) if body.trim().is_empty() => format!("HTTP {}", status),
            Err(_) => body.trim().to_string(),
        };

        match status {
            404 => Error::NotFound(message),
            401 => Error::Auth(message),
            _ => Error::Api { status, message },
        }
    }
}

/// Builder for creating a CopClient.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    auth_token: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the base URL of the tenant.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the bearer token.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<CopClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.auth_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| Error::Config("Invalid auth token".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("cop-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(CopClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
