//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user, i.e. the identity behind a session.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The unique name the user logs in with.
    pub username: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// Whether the user is staff, i.e. may see every account.
    pub is_staff: bool,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                is_staff INTEGER NOT NULL DEFAULT 0
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// Leading and trailing whitespace is trimmed from `username`.
///
/// # Errors
///
/// Returns:
/// - [Error::EmptyUsername] if `username` is blank,
/// - [Error::DuplicateUsername] if `username` is taken,
/// - [Error::SqlError] if an SQL related error occurred.
pub fn create_user(
    username: &str,
    password_hash: PasswordHash,
    is_staff: bool,
    connection: &Connection,
) -> Result<User, Error> {
    let username = username.trim();

    if username.is_empty() {
        return Err(Error::EmptyUsername);
    }

    connection.execute(
        "INSERT INTO user (username, password, is_staff) VALUES (?1, ?2, ?3)",
        (username, password_hash.as_ref(), is_staff),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: username.to_owned(),
        password_hash,
        is_staff,
    })
}

fn map_row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(2)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        username: row.get(1)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        is_staff: row.get(3)?,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username, password, is_staff FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_row_to_user)
        .map_err(|error| error.into())
}

/// Get the user that logs in with `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that name.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username, password, is_staff FROM user WHERE username = :username")?
        .query_row(&[(":username", &username.trim())], map_row_to_user)
        .map_err(|error| error.into())
}

/// Get every user, ordered by username.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_all_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare("SELECT id, username, password, is_staff FROM user ORDER BY username ASC")?
        .query_map([], map_row_to_user)?
        .map(|user_result| user_result.map_err(Error::from))
        .collect()
}
