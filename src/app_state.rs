//! Implements a struct that holds the state of the web server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{
    AccessPolicy, Error, LocalTimezone, StaffPolicy, auth::DEFAULT_COOKIE_DURATION,
    db::initialize,
};

/// The state of the web server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,

    /// The server's local timezone.
    pub local_timezone: LocalTimezone,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// Decides which identities may see every account.
    pub access_policy: Arc<dyn AccessPolicy>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection and the
    /// default [StaffPolicy].
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: LocalTimezone,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone,
            db_connection: Arc::new(Mutex::new(db_connection)),
            access_policy: Arc::new(StaffPolicy),
        })
    }

    /// Replace the access policy consulted by every scope and privilege check.
    pub fn with_access_policy(mut self, access_policy: impl AccessPolicy + 'static) -> Self {
        self.access_policy = Arc::new(access_policy);
        self
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
