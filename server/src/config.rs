//! Server configuration module.
//!
//! This module provides configuration loading for the wiki server from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `WIKI_DATABASE_DRIVER`: `local` (alias `embedded`) or `mongodb` (alias `networked`) (default: `local`)
//! - `WIKI_DATABASE_LOCAL_PATH`: Directory of the embedded store (default: `./db`)
//! - `WIKI_DATABASE_MONGODB_URI`: MongoDB connection string (required for `mongodb`)
//! - `WIKI_DATABASE_MONGODB_NAME`: MongoDB database name (default: `docs`)
//! - `WIKI_AUTH_PASSWORD`: Password of the `admin` user, seeded at startup (optional)
//! - `WIKI_AUTH_SECRET`: Secret used to sign session tokens (required)
//! - `WIKI_LISTEN_PORT`: Port to listen on (default: `3000`)
//! - `WIKI_MENU_MAX_DEPTH`: Depth bound of the navigation tree (default: `2`)
//!
//! # Invariants
//!
//! - `auth_secret` is never empty
//! - `listen_port` is always a valid port number (1-65535)
//! - A `MongoDb` database config always carries a non-empty URI

use std::path::PathBuf;

use crate::menu::DEFAULT_MAX_DEPTH;

/// Which backing store to use, with its connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// Embedded log-file store under `path`.
    Local { path: PathBuf },
    /// MongoDB server.
    MongoDb { uri: String, database: String },
}

/// Server configuration.
///
/// # Pre-conditions
///
/// When constructed via `from_env()`:
/// - All required environment variables must be set
/// - All values must be valid for their respective types
///
/// # Post-conditions
///
/// - `listen_port` is always in the valid range (1-65535)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database: DatabaseConfig,
    /// Password of the `admin` user. No admin is seeded when unset.
    pub auth_password: Option<String>,
    /// HS256 signing secret for session tokens.
    pub auth_secret: String,
    pub listen_port: u16,
    pub menu_max_depth: usize,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

const DRIVER_VAR: &str = "WIKI_DATABASE_DRIVER";
const LOCAL_PATH_VAR: &str = "WIKI_DATABASE_LOCAL_PATH";
const MONGODB_URI_VAR: &str = "WIKI_DATABASE_MONGODB_URI";
const MONGODB_NAME_VAR: &str = "WIKI_DATABASE_MONGODB_NAME";
const AUTH_PASSWORD_VAR: &str = "WIKI_AUTH_PASSWORD";
const AUTH_SECRET_VAR: &str = "WIKI_AUTH_SECRET";
const LISTEN_PORT_VAR: &str = "WIKI_LISTEN_PORT";
const MENU_MAX_DEPTH_VAR: &str = "WIKI_MENU_MAX_DEPTH";

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 3000;
    /// Default directory of the embedded store.
    pub const DEFAULT_LOCAL_PATH: &'static str = "./db";
    /// Default MongoDB database name.
    pub const DEFAULT_MONGODB_NAME: &'static str = "docs";
    /// Default depth bound of the navigation tree.
    pub const DEFAULT_MENU_MAX_DEPTH: usize = DEFAULT_MAX_DEPTH;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `WIKI_AUTH_SECRET` is not set or is empty
    /// - `WIKI_DATABASE_DRIVER` names an unknown driver
    /// - `WIKI_DATABASE_MONGODB_URI` is missing while the MongoDB driver is selected
    /// - `WIKI_LISTEN_PORT` or `WIKI_MENU_MAX_DEPTH` is set but not a valid number
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source.
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Self {
            database: Self::load_database(&get)?,
            auth_password: get(AUTH_PASSWORD_VAR),
            auth_secret: get(AUTH_SECRET_VAR)
                .ok_or_else(|| ConfigError::MissingEnvVar(AUTH_SECRET_VAR.to_string()))?,
            listen_port: Self::load_listen_port(&get)?,
            menu_max_depth: Self::load_menu_max_depth(&get)?,
        })
    }

    /// Load the database driver and its settings.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown driver name or a missing MongoDB URI.
    fn load_database(get: &impl Fn(&str) -> Option<String>) -> Result<DatabaseConfig, ConfigError> {
        let driver = get(DRIVER_VAR).unwrap_or_else(|| "local".to_string());

        match driver.trim().to_ascii_lowercase().as_str() {
            "local" | "embedded" => Ok(DatabaseConfig::Local {
                path: get(LOCAL_PATH_VAR)
                    .map_or_else(|| PathBuf::from(Self::DEFAULT_LOCAL_PATH), PathBuf::from),
            }),
            "mongodb" | "networked" => Ok(DatabaseConfig::MongoDb {
                uri: get(MONGODB_URI_VAR)
                    .ok_or_else(|| ConfigError::MissingEnvVar(MONGODB_URI_VAR.to_string()))?,
                database: get(MONGODB_NAME_VAR)
                    .unwrap_or_else(|| Self::DEFAULT_MONGODB_NAME.to_string()),
            }),
            other => Err(ConfigError::InvalidValue {
                name: DRIVER_VAR.to_string(),
                message: format!("'{other}' is not a known driver (expected 'local' or 'mongodb')"),
            }),
        }
    }

    /// Load the listen port.
    ///
    /// Returns the default if not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is set but not a valid port number.
    fn load_listen_port(get: &impl Fn(&str) -> Option<String>) -> Result<u16, ConfigError> {
        match get(LISTEN_PORT_VAR) {
            Some(value) => match value.parse::<u16>() {
                Ok(port) if port > 0 => Ok(port),
                _ => Err(ConfigError::InvalidValue {
                    name: LISTEN_PORT_VAR.to_string(),
                    message: format!("'{value}' is not a valid port number (must be 1-65535)"),
                }),
            },
            None => Ok(Self::DEFAULT_PORT),
        }
    }

    fn load_menu_max_depth(get: &impl Fn(&str) -> Option<String>) -> Result<usize, ConfigError> {
        match get(MENU_MAX_DEPTH_VAR) {
            Some(value) => value.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                name: MENU_MAX_DEPTH_VAR.to_string(),
                message: format!("'{value}' is not a non-negative integer"),
            }),
            None => Ok(Self::DEFAULT_MENU_MAX_DEPTH),
        }
    }
}
