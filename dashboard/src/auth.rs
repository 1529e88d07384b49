//! Local username/password gate.
//!
//! Accounts live in the key-value store under [`USERS_KEY`], and the
//! logged-in username under [`CURRENT_USER_KEY`]. Passwords are kept as a
//! per-user random salt plus `HMAC-SHA256(salt, password)`, both hex encoded.
//! The feed API key has to be sent in clear to the data provider, so it is
//! stored as given and only handed out wrapped in a [`SecretString`].

use hmac::{Hmac, Mac};
use rand::Rng;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::info;

use crate::storage::{CURRENT_USER_KEY, KeyValueStore, StorageError, USERS_KEY, load_json, save_json};

type HmacSha256 = Hmac<Sha256>;

const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("This username is already taken")]
    UsernameTaken,

    #[error("You entered an incorrect username or password")]
    InvalidCredentials,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("stored credentials for '{username}' are unreadable")]
    CorruptRecord { username: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Published after every successful login or logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginEvent {
    Login,
    Logout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    salt: String,
    password_hash: String,
    api_key: String,
}

impl UserRecord {
    fn new(username: &str, password: &str, api_key: &str) -> Result<Self, AuthError> {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill(&mut salt[..]);
        let mac = keyed_mac(&salt, password).ok_or_else(|| AuthError::CorruptRecord {
            username: username.to_string(),
        })?;

        Ok(Self {
            username: username.to_string(),
            salt: hex::encode(salt),
            password_hash: hex::encode(mac.finalize().into_bytes()),
            api_key: api_key.to_string(),
        })
    }

    fn verify(&self, password: &str) -> Result<bool, AuthError> {
        let corrupt = || AuthError::CorruptRecord {
            username: self.username.clone(),
        };
        let salt = hex::decode(&self.salt).map_err(|_| corrupt())?;
        let expected = hex::decode(&self.password_hash).map_err(|_| corrupt())?;
        let mac = keyed_mac(&salt, password).ok_or_else(corrupt)?;
        Ok(mac.verify_slice(&expected).is_ok())
    }
}

fn keyed_mac(salt: &[u8], password: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(salt).ok()?;
    mac.update(password.as_bytes());
    Some(mac)
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(trimmed)
}

/// Account registry plus the current session, persisted through `S`.
pub struct AuthService<S: KeyValueStore> {
    store: S,
    users: Vec<UserRecord>,
    current: Option<String>,
}

impl<S: KeyValueStore> AuthService<S> {
    /// Loads accounts and the current user from `store`.
    ///
    /// A saved current user that no longer has an account is dropped.
    pub fn new(store: S) -> Result<Self, AuthError> {
        let users: Vec<UserRecord> = load_json(&store, USERS_KEY)?.unwrap_or_default();
        let current = load_json::<Option<String>, _>(&store, CURRENT_USER_KEY)?
            .flatten()
            .filter(|name| users.iter().any(|u| &u.username == name));

        Ok(Self {
            store,
            users,
            current,
        })
    }

    pub fn sign_up(&mut self, username: &str, password: &str, api_key: &str) -> Result<LoginEvent, AuthError> {
        let username = required("username", username)?;
        required("password", password)?;
        let api_key = required("API key", api_key)?;

        if self.find(username).is_some() {
            return Err(AuthError::UsernameTaken);
        }

        self.users.push(UserRecord::new(username, password, api_key)?);
        if let Err(e) = self.login(username, password) {
            self.users.pop();
            return Err(e);
        }
        info!(username, "registered user");
        Ok(LoginEvent::Login)
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<LoginEvent, AuthError> {
        let username = username.trim();
        let user = self.find(username).ok_or(AuthError::InvalidCredentials)?;
        if !user.verify(password)? {
            return Err(AuthError::InvalidCredentials);
        }

        let name = user.username.clone();
        let previous = self.current.replace(name);
        if let Err(e) = self.persist() {
            self.current = previous;
            return Err(e);
        }
        info!(username, "logged in");
        Ok(LoginEvent::Login)
    }

    pub fn logout(&mut self) -> Result<LoginEvent, AuthError> {
        if let Some(username) = self.current.take() {
            info!(%username, "logged out");
        }
        self.persist()?;
        Ok(LoginEvent::Logout)
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn api_key(&self) -> Option<SecretString> {
        let name = self.current.as_deref()?;
        self.find(name)
            .map(|u| SecretString::from(u.api_key.clone()))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn find(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username == username)
    }

    fn persist(&mut self) -> Result<(), AuthError> {
        save_json(&mut self.store, USERS_KEY, &self.users)?;
        save_json(&mut self.store, CURRENT_USER_KEY, &self.current)?;
        Ok(())
    }
}
