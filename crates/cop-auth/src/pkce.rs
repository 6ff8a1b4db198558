//! PKCE (RFC 7636) verifier and challenge generation.
//!
//! Verifiers are 32 bytes from the OS entropy source, base64url-encoded
//! without padding (43 characters). Challenges are always recomputed from
//! the verifier; nothing stores a second copy to compare against.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::{AuthError, Result};

/// Challenge method sent with the authorization request. Plain is not supported.
pub const CHALLENGE_METHOD: &str = "S256";

const VERIFIER_BYTES: usize = 32;

/// PKCE code verifier and challenge pair.
#[derive(Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

impl PkceChallenge {
    /// Generate a new PKCE challenge pair.
    pub fn generate() -> Result<Self> {
        let verifier = generate_verifier()?;
        let challenge = derive_challenge(&verifier);
        Ok(Self {
            verifier,
            challenge,
        })
    }

    /// Check that this pair is still consistent.
    pub fn validate(&self) -> Result<()> {
        validate_verifier(&self.verifier, &self.challenge)
    }
}

/// Generate a random code verifier.
pub fn generate_verifier() -> Result<String> {
    let mut bytes = [0u8; VERIFIER_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::RandomSource(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Generate a random state nonce. Same shape as a verifier, never bound to one.
pub fn generate_state() -> Result<String> {
    generate_verifier()
}

/// Derive the S256 challenge for a verifier.
pub fn derive_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Check a verifier against a previously issued challenge.
pub fn validate_verifier(verifier: &str, challenge: &str) -> Result<()> {
    if constant_time_eq(derive_challenge(verifier).as_bytes(), challenge.as_bytes()) {
        Ok(())
    } else {
        Err(AuthError::ChallengeMismatch)
    }
}

/// Compare two byte strings without short-circuiting on the first difference.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
