//! Bearer credential

use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Claims the console reads from a JWT credential
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject (usually the username)
    #[serde(default)]
    pub sub: Option<String>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: Option<i64>,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,
}

/// An opaque bearer token.
///
/// The token is treated as opaque for authorization purposes. When it happens
/// to be a JWT its claims are decoded (without signature verification) so the
/// expiry can be displayed.
pub struct Credential {
    raw: SecretString,
    claims: Option<CredentialClaims>,
}

impl Credential {
    /// Wrap a raw token string
    pub fn from_raw(raw: String) -> Self {
        let claims = decode_claims(&raw);
        Self {
            raw: SecretString::from(raw),
            claims,
        }
    }

    /// The raw token, for building the `Authorization` header
    pub fn expose(&self) -> &str {
        self.raw.expose_secret()
    }

    /// Decoded claims, if the token is a JWT
    pub fn claims(&self) -> Option<&CredentialClaims> {
        self.claims.as_ref()
    }

    /// Get expiration time
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims
            .as_ref()
            .and_then(|c| c.exp)
            .and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Check if the token is known to be expired.
    ///
    /// Opaque tokens are never reported as expired; the platform's 401 is
    /// the authority.
    pub fn is_expired(&self) -> bool {
        self.expires_at().map(|at| at < Utc::now()).unwrap_or(false)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("raw", &"[redacted]")
            .field("claims", &self.claims)
            .finish()
    }
}

fn decode_claims(raw: &str) -> Option<CredentialClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<CredentialClaims>(raw, &DecodingKey::from_secret(b""), &validation)
        .ok()
        .map(|data| data.claims)
}
