//! Credential acquisition for the cop knowledge-store tooling.
//!
//! Turns a configured authentication method into a bearer token:
//!
//! - [`pkce`]: verifier/challenge generation and the state nonce
//! - [`callback`]: single-use localhost listener for the browser redirect
//! - [`browser`]: injectable browser launcher
//! - [`oauth`]: authorization-code flow with PKCE, plus refresh
//! - [`service_principal`]: client-credentials login from a secrets file
//! - [`session`]: method dispatch from [`SessionBuilder`] to [`Session`]

pub mod browser;
pub mod callback;
pub mod error;
pub mod oauth;
pub mod pkce;
pub mod service_principal;
pub mod session;
pub mod token;

pub use browser::{BrowserLauncher, PrintUrl, SystemBrowser};
pub use callback::{AuthorizationResult, CallbackServer, PendingCallback};
pub use error::{AuthError, Result};
pub use oauth::{Endpoints, OAuthClient, OAuthConfig};
pub use pkce::PkceChallenge;
pub use service_principal::ServicePrincipalCredentials;
pub use session::{Session, SessionBuilder};
pub use token::{OAuthErrorPayload, TokenSet};

pub use cop_config::AuthMethod;
pub use tokio_util::sync::CancellationToken;
