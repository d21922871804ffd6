//! Startup wiring.
//!
//! Turns a [`ServerConfig`] into ready-to-serve [`AppState`]: connects the
//! configured driver, prepares token signing and seeds the admin user.
//!
//! # Post-conditions
//!
//! - When `auth_password` is set, a user named `admin` exists and signs in
//!   with that password.

use std::sync::Arc;

use crate::api::AppState;
use crate::auth::{JwtConfig, JwtError, ensure_admin_user};
use crate::config::{DatabaseConfig, ServerConfig};
use crate::database::{Driver, DriverError, LocalDriver, MongoDriver};
use crate::models::ModelError;

/// Error returned when the server cannot start.
#[derive(Debug)]
pub enum StartupError {
    /// The backing store could not be opened.
    Database(DriverError),
    /// The signing secret is unusable.
    Signing(JwtError),
    /// The admin user could not be created.
    AdminSeed(ModelError),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database(e) => write!(f, "failed to open database: {e}"),
            Self::Signing(e) => write!(f, "failed to configure session tokens: {e}"),
            Self::AdminSeed(e) => write!(f, "failed to create admin user: {e}"),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
            Self::Signing(e) => Some(e),
            Self::AdminSeed(e) => Some(e),
        }
    }
}

impl From<DriverError> for StartupError {
    fn from(e: DriverError) -> Self {
        Self::Database(e)
    }
}

impl From<JwtError> for StartupError {
    fn from(e: JwtError) -> Self {
        Self::Signing(e)
    }
}

impl From<ModelError> for StartupError {
    fn from(e: ModelError) -> Self {
        Self::AdminSeed(e)
    }
}

/// Open the driver selected by `config`.
pub async fn connect_driver(config: &DatabaseConfig) -> Result<Arc<dyn Driver>, DriverError> {
    match config {
        DatabaseConfig::Local { path } => {
            tracing::info!("Using local database at {}", path.display());
            Ok(Arc::new(LocalDriver::open(path)?))
        }
        DatabaseConfig::MongoDb { uri, database } => {
            Ok(Arc::new(MongoDriver::connect(uri, database).await?))
        }
    }
}

/// Build the application state described by `config`.
pub async fn build_state(config: &ServerConfig) -> Result<AppState, StartupError> {
    let driver = connect_driver(&config.database).await?;
    let jwt = JwtConfig::new_hs256(config.auth_secret.as_bytes())?;
    let state = AppState::new(driver, jwt, config.menu_max_depth);

    match &config.auth_password {
        Some(password) => ensure_admin_user(&state.users, password).await?,
        None => tracing::warn!("WIKI_AUTH_PASSWORD is not set; no admin user was seeded"),
    }

    Ok(state)
}
