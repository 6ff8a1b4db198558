//! Single-use localhost listener for the OAuth authorization redirect.
//!
//! [`CallbackServer::start`] binds the redirect URI's host and port and
//! returns the server handle plus a [`PendingCallback`]. The first GET to
//! the exact redirect path resolves the pending callback; every other path
//! gets a 404, other methods get a 405 and later GETs get a 409. The handler
//! is the only writer of the result and can write it at most once.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{AuthError, Result};

/// Slow clients may not hold the listener open longer than this.
pub const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Body returned to the browser once the redirect has been captured.
pub const SUCCESS_MESSAGE: &str = "Login successful. You can close this browser window.";

const FAILURE_MESSAGE: &str =
    "Login failed: the authorization server returned an error. You can close this browser window.";

const ALREADY_COMPLETED_MESSAGE: &str =
    "This login request was already completed. You can close this browser window.";

/// Values carried by the authorization redirect.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthorizationResult {
    pub code: String,
    pub scope: String,
    pub state: String,
    /// OAuth `error` parameter when the server refused the request.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl std::fmt::Debug for AuthorizationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationResult")
            .field("code", &"<redacted>")
            .field("scope", &self.scope)
            .field("state", &"<redacted>")
            .field("error", &self.error)
            .field("error_description", &self.error_description)
            .finish()
    }
}

impl AuthorizationResult {
    /// Extract the result from a raw query string.
    ///
    /// Missing `code`/`scope`/`state` become empty strings; repeated
    /// parameters keep the first value. Both cases are logged by name and
    /// count only, since the values are secrets.
    pub fn from_query(query: &str) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            values
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        let error = optional_first_value(&values, "error");
        let required = |field: &str| {
            if error.is_some() {
                optional_first_value(&values, field).unwrap_or_default()
            } else {
                first_value(&values, field)
            }
        };

        Self {
            code: required("code"),
            scope: required("scope"),
            state: required("state"),
            error_description: optional_first_value(&values, "error_description"),
            error,
        }
    }
}

fn first_value(values: &HashMap<String, Vec<String>>, field: &str) -> String {
    match values.get(field).map(Vec::as_slice) {
        None | Some([]) => {
            tracing::warn!(field, "expected a value in the auth response, received none");
            String::new()
        }
        Some([first, rest @ ..]) => {
            if !rest.is_empty() {
                tracing::warn!(
                    field,
                    count = rest.len() + 1,
                    "expected a single value in the auth response, using the first"
                );
            }
            first.clone()
        }
    }
}

fn optional_first_value(values: &HashMap<String, Vec<String>>, field: &str) -> Option<String> {
    values.get(field).and_then(|v| v.first()).cloned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state for the callback handler.
struct CallbackState {
    /// Compared byte for byte against the request path; never parsed as a
    /// route pattern.
    path: String,
    slot: Mutex<Option<oneshot::Sender<AuthorizationResult>>>,
}

/// Build the router that serves the redirect path.
///
/// Every request lands in one handler that matches the path exactly, so
/// characters such as `{`, `:` or `*` in a configured redirect path are
/// literal rather than captures or wildcards.
fn callback_router(path: &str, sender: oneshot::Sender<AuthorizationResult>) -> Router {
    let state = Arc::new(CallbackState {
        path: path.to_string(),
        slot: Mutex::new(Some(sender)),
    });

    Router::new().fallback(handle_request).with_state(state)
}

/// Only a GET on the exact redirect path may resolve the pending callback.
async fn handle_request(
    State(state): State<Arc<CallbackState>>,
    method: Method,
    uri: Uri,
) -> Response {
    if uri.path() != state.path {
        tracing::info!(path = uri.path(), "failing unexpected request");
        return plain_text(StatusCode::NOT_FOUND, "Not Found");
    }

    if method != Method::GET {
        tracing::info!(method = %method, "ignoring non-GET request on the callback path");
        let mut response = plain_text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET"));
        return response;
    }

    // Take the sender before parsing so only one request can ever resolve.
    let Some(sender) = state.slot.lock().take() else {
        tracing::warn!("ignoring repeated authorization callback");
        return plain_text(StatusCode::CONFLICT, ALREADY_COMPLETED_MESSAGE);
    };

    let result = AuthorizationResult::from_query(uri.query().unwrap_or_default());
    let message = if result.error.is_some() {
        FAILURE_MESSAGE
    } else {
        SUCCESS_MESSAGE
    };

    if sender.send(result).is_err() {
        tracing::warn!("authorization callback arrived after the login flow stopped waiting");
    }

    plain_text(StatusCode::OK, message)
}

fn plain_text(status: StatusCode, body: &'static str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// The receiving half of the one-shot callback.
#[derive(Debug)]
pub struct PendingCallback {
    receiver: oneshot::Receiver<AuthorizationResult>,
}

impl PendingCallback {
    /// Wait for the redirect, bounded by `timeout` and `cancel`.
    pub async fn wait(
        self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<AuthorizationResult> {
        tokio::select! {
            _ = cancel.cancelled() => Err(AuthError::CallbackCancelled),
            received = tokio::time::timeout(timeout, self.receiver) => match received {
                Ok(Ok(result)) => Ok(result),
                // The sender only drops when the server is torn down.
                Ok(Err(_)) => Err(AuthError::CallbackCancelled),
                Err(_) => Err(AuthError::CallbackTimeout(timeout)),
            },
        }
    }
}

/// Handle to the running callback listener.
///
/// Dropping the handle signals the accept loop to stop; [`stop`](Self::stop)
/// additionally waits for it and reports failures.
#[derive(Debug)]
pub struct CallbackServer {
    addr: SocketAddr,
    redirect_uri: Url,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind the redirect URI's host:port and start serving in the background.
    ///
    /// Port 0 binds an ephemeral port; [`redirect_uri`](Self::redirect_uri)
    /// then reports the actual one.
    pub async fn start(redirect_uri: &str) -> Result<(Self, PendingCallback)> {
        let mut redirect_uri = Url::parse(redirect_uri)?;
        let host = redirect_uri
            .host_str()
            .ok_or_else(|| AuthError::Config(format!("redirect uri '{}' has no host", redirect_uri)))?
            .to_string();
        let port = redirect_uri.port_or_known_default().ok_or_else(|| {
            AuthError::Config(format!("redirect uri '{}' has no port", redirect_uri))
        })?;

        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| AuthError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| AuthError::Bind {
            addr: bind_addr.clone(),
            source,
        })?;

        if port == 0 {
            redirect_uri.set_port(Some(addr.port())).map_err(|_| {
                AuthError::Config(format!("cannot set port on redirect uri '{}'", redirect_uri))
            })?;
        }

        let path = match redirect_uri.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        let (sender, receiver) = oneshot::channel();
        let router = callback_router(&path, sender);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(serve(listener, router, shutdown.clone()));

        tracing::info!(addr = %addr, path = %path, "started the auth http server");

        Ok((
            Self {
                addr,
                redirect_uri,
                shutdown,
                task: Some(task),
            },
            PendingCallback { receiver },
        ))
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The redirect URI as served, including the bound port.
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Safe to call whether or not a callback was ever received.
    pub async fn stop(mut self) -> Result<()> {
        self.shutdown.cancel();

        if let Some(task) = self.task.take() {
            task.await.map_err(|e| {
                let err = AuthError::Shutdown {
                    addr: self.addr,
                    reason: e.to_string(),
                };
                tracing::error!("{}", err);
                err
            })?;
        }

        tracing::info!(addr = %self.addr, "stopped the auth http server");
        Ok(())
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Accept loop. Each connection enforces the header read timeout and is
/// shut down gracefully once `shutdown` fires.
async fn serve(listener: TcpListener, router: Router, shutdown: CancellationToken) {
    let mut builder = auto::Builder::new(TokioExecutor::new()).http1_only();
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(HEADER_READ_TIMEOUT);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(peer = %peer, "auth callback connection");
                    let builder = builder.clone();
                    let service = TowerToHyperService::new(router.clone());
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        let conn = builder.serve_connection(TokioIo::new(stream), service);
                        tokio::pin!(conn);
                        tokio::select! {
                            res = conn.as_mut() => {
                                if let Err(e) = res {
                                    tracing::debug!(peer = %peer, error = %e, "auth callback connection closed");
                                }
                            }
                            _ = shutdown.cancelled() => {
                                conn.as_mut().graceful_shutdown();
                                let _ = conn.as_mut().await;
                            }
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "auth http server accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
        }
    }
}
