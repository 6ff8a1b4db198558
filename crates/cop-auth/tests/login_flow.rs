//! End-to-end login scenarios against a mock auth server.
//!
//! The browser is replaced by a launcher that follows the authorization URL
//! the way the auth server would: it calls the local redirect URI with a
//! code and the state it was given (or a forged one).

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use cop_auth::pkce::derive_challenge;
use cop_auth::{
    AuthError, AuthMethod, BrowserLauncher, CancellationToken, OAuthConfig, SessionBuilder,
};
use parking_lot::Mutex;
use url::Url;
use wiremock::matchers::{body_string, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TENANT: &str = "t-1";
const TOKEN_PATH: &str = "/auth/t-1/default/oauth2/token";

/// What the fake authorization server sends back to the redirect URI.
#[derive(Clone)]
enum Redirect {
    /// Echo the state from the authorization URL.
    Honest,
    /// Replace the state.
    ForgedState(&'static str),
    /// Redirect with an OAuth error instead of a code.
    Denied,
    /// Never redirect.
    Silent,
}

struct FakeAuthServer {
    redirect: Redirect,
    opened: Mutex<Vec<Url>>,
}

impl FakeAuthServer {
    fn new(redirect: Redirect) -> Arc<Self> {
        Arc::new(Self {
            redirect,
            opened: Mutex::new(Vec::new()),
        })
    }

    fn opened(&self) -> Vec<Url> {
        self.opened.lock().clone()
    }
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

impl BrowserLauncher for FakeAuthServer {
    fn open(&self, url: &str) -> cop_auth::Result<()> {
        let auth_url = Url::parse(url).map_err(|e| AuthError::Launch(e.to_string()))?;
        self.opened.lock().push(auth_url.clone());

        let redirect_uri = query_value(&auth_url, "redirect_uri").unwrap_or_default();
        let state = query_value(&auth_url, "state").unwrap_or_default();

        let mut callback = Url::parse(&redirect_uri).map_err(|e| AuthError::Launch(e.to_string()))?;
        match &self.redirect {
            Redirect::Honest => {
                callback
                    .query_pairs_mut()
                    .append_pair("code", "the-code")
                    .append_pair("scope", "openid offline_access")
                    .append_pair("state", &state);
            }
            Redirect::ForgedState(forged) => {
                callback
                    .query_pairs_mut()
                    .append_pair("code", "the-code")
                    .append_pair("scope", "openid")
                    .append_pair("state", forged);
            }
            Redirect::Denied => {
                callback
                    .query_pairs_mut()
                    .append_pair("error", "access_denied")
                    .append_pair("error_description", "user declined")
                    .append_pair("state", &state);
            }
            Redirect::Silent => return Ok(()),
        }

        tokio::spawn(async move {
            let _ = reqwest::get(callback).await;
        });
        Ok(())
    }
}

fn oauth_config(timeout: Duration) -> OAuthConfig {
    OAuthConfig {
        redirect_uri: "http://127.0.0.1:0/callback".to_string(),
        callback_timeout: timeout,
        ..OAuthConfig::default()
    }
}

fn oauth_builder(server: &MockServer, launcher: Arc<FakeAuthServer>) -> SessionBuilder {
    SessionBuilder::new(Url::parse(&server.uri()).unwrap(), TENANT, AuthMethod::OAuth)
        .with_oauth_config(oauth_config(Duration::from_secs(10)))
        .with_launcher(launcher)
}

fn form_body(body: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[tokio::test]
async fn test_oauth_full_flow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let launcher = FakeAuthServer::new(Redirect::Honest);
    let session = oauth_builder(&server, launcher.clone()).login().await.unwrap();

    assert_eq!(session.access_token(), "access-1");
    assert_eq!(session.refresh_token(), Some("refresh-1"));
    assert_eq!(session.method(), AuthMethod::OAuth);
    assert_eq!(session.tenant(), TENANT);

    let opened = launcher.opened();
    assert_eq!(opened.len(), 1);
    let auth_url = &opened[0];
    assert_eq!(auth_url.path(), "/auth/t-1/default/oauth2/authorize");
    assert_eq!(query_value(auth_url, "code_challenge_method").as_deref(), Some("S256"));

    // The verifier sent to the token endpoint must derive the challenge the
    // browser was given, and the redirect URI must match the bound one.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let form = form_body(&requests[0].body);
    let verifier = form_value(&form, "code_verifier").unwrap();
    assert_eq!(
        Some(derive_challenge(verifier)),
        query_value(auth_url, "code_challenge")
    );
    assert_eq!(
        form_value(&form, "redirect_uri").map(str::to_string),
        query_value(auth_url, "redirect_uri")
    );
    assert_eq!(form_value(&form, "client_id"), Some("default"));
    assert_ne!(query_value(auth_url, "state").as_deref(), Some(verifier));
}

#[tokio::test]
async fn test_state_mismatch_never_exchanges_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "should-not-be-issued"
        })))
        .expect(0)
        .mount(&server)
        .await;

    let launcher = FakeAuthServer::new(Redirect::ForgedState("xyz"));
    let err = oauth_builder(&server, launcher).login().await.unwrap_err();

    assert!(matches!(err, AuthError::StateMismatch));
    assert!(err.is_security());
}

#[tokio::test]
async fn test_authorization_error_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let launcher = FakeAuthServer::new(Redirect::Denied);
    let err = oauth_builder(&server, launcher).login().await.unwrap_err();

    match err {
        AuthError::Authorization { error, description } => {
            assert_eq!(error, "access_denied");
            assert_eq!(description.as_deref(), Some("user declined"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_code_exchange_surfaces_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>upstream exploded</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let launcher = FakeAuthServer::new(Redirect::Honest);
    let err = oauth_builder(&server, launcher).login().await.unwrap_err();

    assert!(err.is_protocol());
    assert!(err.to_string().contains("<html>upstream exploded</html>"));
    assert!(!err.to_string().contains("parse"));
}

#[tokio::test]
async fn test_code_exchange_structured_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "authorization code expired",
            "status_code": 400
        })))
        .mount(&server)
        .await;

    let launcher = FakeAuthServer::new(Redirect::Honest);
    let err = oauth_builder(&server, launcher).login().await.unwrap_err();

    match err {
        AuthError::TokenEndpoint { status, detail } => {
            assert_eq!(status, 400);
            assert_eq!(detail, "invalid_grant: authorization code expired");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_callback_timeout() {
    let server = MockServer::start().await;
    let launcher = FakeAuthServer::new(Redirect::Silent);

    let err = oauth_builder(&server, launcher)
        .with_oauth_config(oauth_config(Duration::from_millis(100)))
        .login()
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::CallbackTimeout(_)));
}

#[tokio::test]
async fn test_callback_cancelled() {
    let server = MockServer::start().await;
    let launcher = FakeAuthServer::new(Redirect::Silent);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = oauth_builder(&server, launcher)
        .with_cancel_token(cancel)
        .login()
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::CallbackCancelled));
}

#[tokio::test]
async fn test_refresh_fast_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-2"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let launcher = FakeAuthServer::new(Redirect::Honest);
    let session = oauth_builder(&server, launcher.clone())
        .with_refresh_token("refresh-0")
        .login()
        .await
        .unwrap();

    assert_eq!(session.access_token(), "access-2");
    // The server did not rotate the refresh token, so the old one is kept.
    assert_eq!(session.refresh_token(), Some("refresh-0"));
    assert!(launcher.opened().is_empty());

    // A later login in the same process takes the fast path again.
    let again = session.into_builder().login().await.unwrap();
    assert_eq!(again.access_token(), "access-2");
    assert!(launcher.opened().is_empty());
}

#[tokio::test]
async fn test_refresh_rotation_is_stored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-3",
            "refresh_token": "refresh-3"
        })))
        .mount(&server)
        .await;

    let launcher = FakeAuthServer::new(Redirect::Honest);
    let session = oauth_builder(&server, launcher)
        .with_refresh_token("refresh-0")
        .login()
        .await
        .unwrap();

    assert_eq!(session.refresh_token(), Some("refresh-3"));
}

#[tokio::test]
async fn test_refresh_failure_does_not_open_browser() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let launcher = FakeAuthServer::new(Redirect::Honest);
    let err = oauth_builder(&server, launcher.clone())
        .with_refresh_token("stale")
        .login()
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::TokenEndpoint { status: 400, .. }));
    assert!(launcher.opened().is_empty());
}

fn secrets_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"Client ID": "sample_client_id", "Secret": "sample_secret"}}"#
    )
    .unwrap();
    file
}

fn service_principal_builder(server: &MockServer, secrets: &tempfile::NamedTempFile) -> SessionBuilder {
    SessionBuilder::new(
        Url::parse(&server.uri()).unwrap(),
        TENANT,
        AuthMethod::ServicePrincipal,
    )
    .with_secret_file(secrets.path())
}

#[tokio::test]
async fn test_service_principal_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header(
            "authorization",
            "Basic c2FtcGxlX2NsaWVudF9pZDpzYW1wbGVfc2VjcmV0",
        ))
        .and(body_string("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "sample_token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let secrets = secrets_file();
    let session = service_principal_builder(&server, &secrets)
        .login()
        .await
        .unwrap();

    assert_eq!(session.access_token(), "sample_token");
    assert_eq!(session.method(), AuthMethod::ServicePrincipal);
}

#[tokio::test]
async fn test_service_principal_tolerates_non_200_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(203).set_body_json(serde_json::json!({
            "access_token": "odd_but_valid"
        })))
        .mount(&server)
        .await;

    let secrets = secrets_file();
    let session = service_principal_builder(&server, &secrets)
        .login()
        .await
        .unwrap();
    assert_eq!(session.access_token(), "odd_but_valid");
}

#[tokio::test]
async fn test_service_principal_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client",
            "error_description": "unknown client"
        })))
        .mount(&server)
        .await;

    let secrets = secrets_file();
    let err = service_principal_builder(&server, &secrets)
        .login()
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::TokenEndpoint { status: 401, .. }));
    assert!(err.to_string().contains("invalid_client: unknown client"));
}

#[tokio::test]
async fn test_service_principal_unparseable_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("definitely not json"))
        .mount(&server)
        .await;

    let secrets = secrets_file();
    let err = service_principal_builder(&server, &secrets)
        .login()
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenParse(_)));
}

#[tokio::test]
async fn test_transport_error() {
    // Bind and drop to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let secrets = secrets_file();
    let err = SessionBuilder::new(
        Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap(),
        TENANT,
        AuthMethod::ServicePrincipal,
    )
    .with_secret_file(secrets.path())
    .login()
    .await
    .unwrap_err();

    assert!(err.is_transport());
}
