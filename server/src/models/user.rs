//! Users and their password hashes.
//!
//! Plain-text passwords are hashed with bcrypt on insert and whenever a
//! password is changed; only the hash is stored. Hashing runs on the
//! blocking thread pool.
//!
//! # Invariants
//!
//! - A username is held by at most one user, so at most one `admin` exists.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    ModelError, find_by_id, is_present, reject_blank, remove_by_id, require_fields, update_by_id,
};
use crate::database::{Collection, Driver, Query};

/// Collection holding users.
pub const USERS_COLLECTION: &str = "users";

/// A stored user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub password_hash: String,
}

/// User fields supplied by a caller. `password` is plain text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize)]
struct StoredUser<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password_hash: Option<String>,
}

/// Repository for [`User`]s.
#[derive(Clone)]
pub struct UserRepository {
    collection: Collection<User>,
    hash_cost: u32,
}

impl UserRepository {
    /// bcrypt cost used unless overridden.
    pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            collection: Collection::new(driver, USERS_COLLECTION),
            hash_cost: Self::DEFAULT_HASH_COST,
        }
    }

    /// Use a different bcrypt cost.
    #[must_use]
    pub const fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Insert a user. `username` and `password` are required and the username must be unused.
    pub async fn insert(&self, data: &UserData) -> Result<User, ModelError> {
        require_fields(
            "user",
            &[
                ("username", is_present(data.username.as_deref())),
                ("password", is_present(data.password.as_deref())),
            ],
        )?;
        let (Some(username), Some(password)) = (data.username.as_deref(), data.password.as_deref())
        else {
            return Err(ModelError::Validation {
                entity: "user",
                missing: vec!["username", "password"],
            });
        };

        if self.get_by_username(username).await?.is_some() {
            return Err(username_taken(username));
        }

        let draft = StoredUser {
            username: Some(username),
            password_hash: Some(self.hash(password).await?),
        };
        let user = self.collection.insert(&draft).await?;
        tracing::info!(username = %user.username, "created user");
        Ok(user)
    }

    /// Change the username and/or password of an existing user.
    pub async fn update(&self, id: &str, data: &UserData) -> Result<User, ModelError> {
        reject_blank(
            "user",
            &[
                ("username", data.username.as_deref()),
                ("password", data.password.as_deref()),
            ],
        )?;
        if let Some(username) = data.username.as_deref()
            && let Some(holder) = self.get_by_username(username).await?
            && holder.id != id
        {
            return Err(username_taken(username));
        }

        let password_hash = match data.password.as_deref() {
            Some(password) => Some(self.hash(password).await?),
            None => None,
        };
        let changes = StoredUser {
            username: data.username.as_deref(),
            password_hash,
        };
        update_by_id(&self.collection, "user", id, &changes).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>, ModelError> {
        find_by_id(&self.collection, id).await
    }

    pub async fn get_all(&self) -> Result<Vec<User>, ModelError> {
        Ok(self.collection.find(&Query::all(), None).await?)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, ModelError> {
        Ok(self
            .collection
            .find_one(&Query::all().eq("username", username), None)
            .await?)
    }

    /// Remove a user. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> Result<bool, ModelError> {
        remove_by_id(&self.collection, id).await
    }

    /// The user called `username`, if `password` matches their hash.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, ModelError> {
        let Some(user) = self.get_by_username(username).await? else {
            return Ok(None);
        };
        if verify_password(&user, password).await? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    async fn hash(&self, password: &str) -> Result<String, ModelError> {
        let password = password.to_string();
        let cost = self.hash_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| ModelError::Hashing(e.to_string()))?
            .map_err(|e| ModelError::Hashing(e.to_string()))
    }
}

/// Whether `password` matches the user's stored hash.
pub async fn verify_password(user: &User, password: &str) -> Result<bool, ModelError> {
    let password = password.to_string();
    let hash = user.password_hash.clone();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ModelError::Hashing(e.to_string()))?
        .map_err(|e| ModelError::Hashing(e.to_string()))
}

fn username_taken(username: &str) -> ModelError {
    ModelError::Conflict {
        entity: "user",
        message: format!("username '{username}' is already taken"),
    }
}
