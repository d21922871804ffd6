//! JWT issuing and verification.
//!
//! Tokens are signed with HS256 using the configured secret and carry the
//! username in the `sub` claim plus issue and expiry times.
//!
//! # Pre-conditions
//! - The secret must be non-empty.
//!
//! # Post-conditions
//! - A token issued by `issue_token` verifies with the same config until it expires.
//! - On failure, verification returns a descriptive error indicating what went wrong.
//!
//! # Invariants
//! - Verification is stateless and does not modify any external state.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Signing configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    secret: Vec<u8>,
    ttl: Duration,
}

impl JwtConfig {
    /// How long an issued token stays valid unless overridden: 7 days.
    pub const DEFAULT_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

    /// Create an HS256 configuration.
    ///
    /// # Errors
    /// Returns `JwtError::InvalidKey` if the secret is empty.
    pub fn new_hs256(secret: impl Into<Vec<u8>>) -> Result<Self, JwtError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(JwtError::InvalidKey("secret must be non-empty".to_string()));
        }
        Ok(Self {
            secret,
            ttl: Duration::seconds(Self::DEFAULT_TTL_SECONDS),
        })
    }

    /// Use a different token lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Lifetime of issued tokens.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the session's owner.
    pub sub: String,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expires at, seconds since the epoch.
    pub exp: i64,
}

/// Error returned when issuing or verifying a JWT fails.
#[derive(Debug)]
pub enum JwtError {
    /// The JWT signature is invalid.
    InvalidSignature,
    /// The JWT has expired.
    TokenExpired,
    /// The JWT is malformed or cannot be parsed.
    MalformedToken,
    /// The 'sub' claim is missing from the JWT.
    MissingSubClaim,
    /// The key could not be used.
    InvalidKey(String),
    /// The token could not be signed.
    Signing(String),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid JWT signature"),
            Self::TokenExpired => write!(f, "JWT has expired"),
            Self::MalformedToken => write!(f, "malformed JWT"),
            Self::MissingSubClaim => write!(f, "missing 'sub' claim in JWT"),
            Self::InvalidKey(reason) => write!(f, "invalid key: {reason}"),
            Self::Signing(reason) => write!(f, "failed to sign JWT: {reason}"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Issue a token for `username`.
///
/// # Errors
/// Returns `JwtError` if the username is empty or signing fails.
pub fn issue_token(username: &str, config: &JwtConfig) -> Result<String, JwtError> {
    if username.is_empty() {
        return Err(JwtError::MissingSubClaim);
    }

    let now = Utc::now();
    let claims = Claims {
        sub: username.to_string(),
        iat: now.timestamp(),
        exp: (now + config.ttl).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&config.secret),
    )
    .map_err(|e| JwtError::Signing(e.to_string()))
}

/// Verify a token and return the username from its 'sub' claim.
///
/// # Errors
/// Returns `JwtError` if verification fails for any reason.
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<String, JwtError> {
    let key = DecodingKey::from_secret(&config.secret);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &key, &validation).map_err(map_jwt_error)?;

    let username = token_data.claims.sub;
    if username.is_empty() {
        return Err(JwtError::MissingSubClaim);
    }

    Ok(username)
}

/// Maps jsonwebtoken errors to our `JwtError` type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        ErrorKind::MissingRequiredClaim(_) => JwtError::MissingSubClaim,
        _ => JwtError::MalformedToken,
    }
}
