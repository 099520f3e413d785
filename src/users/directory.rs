//! User directory and credential check.

use crate::error::{AuthError, Result, StoreError};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use super::color::{assign_color, UserColor};

/// A chat user.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: String,
    pub color: UserColor,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        let color = assign_color(&username);
        Self {
            username,
            password: password.into(),
            color,
        }
    }

    /// Username painted in the user's color.
    pub fn colored_name(&self) -> String {
        self.color.paint(&self.username)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("color", &self.color)
            .finish()
    }
}

/// On-disk shape of a user entry.
#[derive(Deserialize)]
struct UserRecord {
    username: String,
    password: String,
}

/// Users keyed by lowercased username.
#[derive(Clone, Debug, Default)]
pub struct UserDirectory {
    users: HashMap<String, User>,
}

impl UserDirectory {
    /// Load a JSON array of `{"username", "password"}` objects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| StoreError::UserDirectory {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        let records: Vec<UserRecord> =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::UserDirectory {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?;

        let directory = Self::from_users(
            records
                .into_iter()
                .map(|record| User::new(record.username, record.password)),
        );
        tracing::info!(path = %path.display(), users = directory.len(), "loaded user directory");
        Ok(directory)
    }

    /// Build from users. Usernames differing only in case collapse to the
    /// last one given.
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.username.to_lowercase(), user))
            .collect();
        Self { users }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, username: &str) -> Option<&User> {
        self.users.get(&username.to_lowercase())
    }

    /// Check credentials. Usernames match case-insensitively, passwords
    /// exactly. Unknown user and wrong password give the same error.
    pub fn authenticate(&self, username: &str, password: &str) -> std::result::Result<User, AuthError> {
        match self.get(username) {
            Some(user) if user.password == password => Ok(user.clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
