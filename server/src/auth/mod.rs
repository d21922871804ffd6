//! Authentication.
//!
//! Sessions are stateless: a successful login issues a signed JWT that the
//! client returns in the `authToken` cookie. Each request resolves that
//! cookie into an [`AuthContext`].
//!
//! # Pre-conditions
//! - A non-empty signing secret is configured.
//!
//! # Post-conditions
//! - A request without a valid token is treated as anonymous, never rejected
//!   outright; handlers decide what anonymous callers may do.
//!
//! # Invariants
//! - Only the user named [`ADMIN_USERNAME`] holds admin rights.

pub mod jwt;

pub use jwt::{Claims, JwtConfig, JwtError, issue_token, verify_token};

use crate::models::{ModelError, UserData, UserRepository};

/// Cookie carrying the session token.
pub const AUTH_COOKIE: &str = "authToken";

/// Username of the built-in administrator.
pub const ADMIN_USERNAME: &str = "admin";

/// Who is making the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub authorized: bool,
    pub username: Option<String>,
}

impl AuthContext {
    /// Context for a caller without a valid session.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            authorized: false,
            username: None,
        }
    }

    /// Context for a signed-in user.
    #[must_use]
    pub fn user(username: impl Into<String>) -> Self {
        Self {
            authorized: true,
            username: Some(username.into()),
        }
    }

    /// Resolve the `Cookie` header value into a context.
    ///
    /// Missing, malformed or expired tokens yield an anonymous context.
    #[must_use]
    pub fn from_cookie_header(header: Option<&str>, config: &JwtConfig) -> Self {
        let Some(token) = header.and_then(|header| cookie_value(header, AUTH_COOKIE)) else {
            return Self::anonymous();
        };

        match verify_token(token, config) {
            Ok(username) => Self::user(username),
            Err(e) => {
                tracing::debug!("ignoring session token: {e}");
                Self::anonymous()
            }
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.authorized && self.username.as_deref() == Some(ADMIN_USERNAME)
    }
}

/// Find the value of cookie `name` in a `Cookie` header.
#[must_use]
pub fn cookie_value<'h>(header: &'h str, name: &str) -> Option<&'h str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value storing `token` as the session cookie.
#[must_use]
pub fn session_cookie(token: &str, config: &JwtConfig) -> String {
    format!(
        "{AUTH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        config.ttl().num_seconds()
    )
}

/// Make sure the admin user exists and signs in with `password`.
///
/// Creates the user on first start and resets its password otherwise.
pub async fn ensure_admin_user(users: &UserRepository, password: &str) -> Result<(), ModelError> {
    let data = UserData {
        username: Some(ADMIN_USERNAME.to_string()),
        password: Some(password.to_string()),
    };

    match users.get_by_username(ADMIN_USERNAME).await? {
        Some(existing) => {
            users.update(&existing.id, &data).await?;
            tracing::info!("reset admin password");
        }
        None => {
            users.insert(&data).await?;
            tracing::info!("created admin user");
        }
    }
    Ok(())
}
