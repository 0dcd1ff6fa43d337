//! Credentials: the persistence seam for logins.
//!
//! Homestead doesn't ship a database. The server talks to a
//! [`CredentialStore`], and you plug in whatever backs it. The bundled
//! [`InMemoryCredentials`] is enough for development and tests.
//!
//! Passwords are hashed on the client. The server only ever stores and
//! compares the salted hash string produced by [`hash_password`]: the
//! client asks for the stored hash, verifies its password against it
//! locally with [`verify_password`], then logs in by sending the hash back.

use std::collections::HashMap;
use std::sync::Mutex;

use homestead_protocol::PlayerId;
use rand::Rng;

use crate::SessionError;

/// Stores players' hashed passwords and last known worlds.
///
/// `Send + Sync` because the store lives as long as the server and may be
/// shared with other services.
pub trait CredentialStore: Send + Sync + 'static {
    /// The stored hash for `username`, or `None` for unknown users.
    fn hashed_password(&self, username: &str) -> Option<String>;

    /// Logs a user in, registering them on first sight.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the user exists and the hash
    /// doesn't match, or the username is empty.
    fn login(&self, username: &str, hashed_password: &str) -> Result<PlayerId, SessionError>;

    /// The world the player was last in, if any.
    fn current_world(&self, player_id: PlayerId) -> Option<String>;

    /// Remembers the world the player is now in.
    fn set_current_world(&self, player_id: PlayerId, world: &str);
}

// ---------------------------------------------------------------------------
// InMemoryCredentials
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Account {
    player_id: PlayerId,
    hashed_password: String,
    current_world: Option<String>,
}

#[derive(Debug, Default)]
struct Accounts {
    by_name: HashMap<String, Account>,
    names: HashMap<PlayerId, String>,
    next_id: u32,
}

/// A [`CredentialStore`] that forgets everything on restart.
#[derive(Debug, Default)]
pub struct InMemoryCredentials {
    accounts: Mutex<Accounts>,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(&self) -> std::sync::MutexGuard<'_, Accounts> {
        self.accounts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.accounts().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for InMemoryCredentials {
    fn hashed_password(&self, username: &str) -> Option<String> {
        self.accounts()
            .by_name
            .get(username)
            .map(|a| a.hashed_password.clone())
    }

    fn login(&self, username: &str, hashed_password: &str) -> Result<PlayerId, SessionError> {
        if username.is_empty() {
            return Err(SessionError::AuthFailed("empty username".into()));
        }

        let mut accounts = self.accounts();
        if let Some(account) = accounts.by_name.get(username) {
            if account.hashed_password != hashed_password {
                return Err(SessionError::AuthFailed(format!(
                    "password mismatch for {username}"
                )));
            }
            tracing::info!(username, player_id = %account.player_id, "player logged in");
            return Ok(account.player_id);
        }

        accounts.next_id += 1;
        let player_id = PlayerId(accounts.next_id);
        accounts.by_name.insert(
            username.to_owned(),
            Account {
                player_id,
                hashed_password: hashed_password.to_owned(),
                current_world: None,
            },
        );
        accounts.names.insert(player_id, username.to_owned());
        tracing::info!(username, %player_id, "registered new player");
        Ok(player_id)
    }

    fn current_world(&self, player_id: PlayerId) -> Option<String> {
        let accounts = self.accounts();
        let name = accounts.names.get(&player_id)?;
        accounts.by_name.get(name)?.current_world.clone()
    }

    fn set_current_world(&self, player_id: PlayerId, world: &str) {
        let mut accounts = self.accounts();
        let Some(name) = accounts.names.get(&player_id).cloned() else {
            return;
        };
        if let Some(account) = accounts.by_name.get_mut(&name) {
            account.current_world = Some(world.to_owned());
        }
    }
}

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

const SALT_LEN: usize = 16;

/// Hashes a password with a fresh random salt.
///
/// The result is `"<salt hex>$<hash hex>"`. An empty password hashes to an
/// empty string.
pub fn hash_password(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let salt: [u8; SALT_LEN] = rand::rng().random();
    let salt_hex: String = salt.iter().map(|b| format!("{b:02x}")).collect();
    let hash = salted_hash(&salt_hex, secret);
    format!("{salt_hex}${hash}")
}

/// Checks a password against a string produced by [`hash_password`].
///
/// Empty inputs never match.
pub fn verify_password(secret: &str, stored: &str) -> bool {
    if secret.is_empty() || stored.is_empty() {
        return false;
    }
    let Some((salt_hex, hash)) = stored.split_once('$') else {
        return false;
    };
    salted_hash(salt_hex, secret) == hash
}

fn salted_hash(salt_hex: &str, secret: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.finalize().to_hex().to_string()
}
