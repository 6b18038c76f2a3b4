//! Session tokens: HS256 JWTs carrying `sub`, `iat`, and `exp`.
//!
//! The algorithm is pinned. Tokens whose header names anything other than
//! HS256, `none` included, are rejected before the signature is looked at.
//! Expiry is checked against the injected clock with zero leeway.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::clock::Clock;

pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

pub struct CredentialAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl CredentialAuthority {
    #[must_use]
    pub fn new(secret: &SecretString, lifetime: Duration, clock: Arc<dyn Clock>) -> Self {
        let secret = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime,
            clock,
        }
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign a token for `subject`.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if the claims cannot be encoded or signed.
    pub fn issue_token(&self, subject: &str) -> Result<String, TokenError> {
        let iat = self.clock.now().timestamp();
        let lifetime =
            i64::try_from(self.lifetime.as_secs()).map_err(|e| TokenError::Signing(e.to_string()))?;
        let exp = iat
            .checked_add(lifetime)
            .ok_or_else(|| TokenError::Signing("expiry overflow".to_string()))?;

        let claims = SessionClaims {
            sub: subject.to_string(),
            iat,
            exp,
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    /// - `UnsupportedAlgorithm` if the header is not HS256,
    /// - `InvalidSignature` if the signature does not match the secret,
    /// - `Expired` if `exp` is not after the current time,
    /// - `Malformed` for anything that does not parse as a JWT with our claims.
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // exp is checked below against our own clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(
            |err| match err.kind() {
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    TokenError::UnsupportedAlgorithm
                }
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            },
        )?;

        if data.claims.exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}
