//! Ledgerly is a web app for keeping track of the balances of financial accounts.
//!
//! Users log in to see their own accounts and totals. Staff can see every
//! account, the totals for each user and the total across the whole system.
//!
//! This library provides a router that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod access;
mod account;
mod alert;
mod app_state;
mod auth;
mod db;
mod endpoints;
mod error_page;
mod flash;
mod html;
mod log_in;
mod log_out;
mod logging;
mod navigation;
mod password;
mod permission_denied;
mod routing;
mod timezone;
mod user;

#[cfg(test)]
mod test_utils;

pub use access::{AccessPolicy, Privilege, Scope, StaffPolicy, authorize, visible_accounts};
pub use account::{
    AccountId, FinancialAccount, Magnitude, NewAccount, Totals, UserTotal, actual_balance,
    create_account, display_balance, totals_absolute, totals_signed,
};
pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use timezone::LocalTimezone;
pub use user::{User, UserID, create_user, get_user_by_username};

use crate::{alert::Alert, error_page::ErrorPage};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The username and password combination did not match a registered user.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The auth token cookie is missing, could not be decoded or has expired.
    #[error("no valid auth token in the cookie jar")]
    CookieMissing,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An empty string was given as a username.
    #[error("username cannot be empty")]
    EmptyUsername,

    /// The username is already taken by another user.
    #[error("the username already exists in the database")]
    DuplicateUsername,

    /// The balance could not be parsed as a decimal number.
    #[error("\"{0}\" is not a valid amount")]
    InvalidBalance(String),

    /// A balance magnitude below zero was given.
    ///
    /// Balances are stored as non-negative magnitudes; overdrawn accounts
    /// set the `is_negative` flag instead.
    #[error("the balance must be zero or more, tick \"is negative\" for overdrawn accounts")]
    NegativeBalance,

    /// The balance has more digits than the database column allows.
    #[error("the balance {0} is too large")]
    BalanceTooLarge(String),

    /// An empty string was given as an account type.
    #[error("account type cannot be empty")]
    EmptyAccountType,

    /// A text field exceeded its maximum length.
    #[error("{field} must be at most {max_length} characters long")]
    FieldTooLong {
        /// The human readable name of the field.
        field: &'static str,
        /// The maximum number of characters allowed.
        max_length: usize,
    },

    /// The owner of an account does not refer to a registered user.
    #[error("the account owner does not refer to a registered user")]
    InvalidOwner,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// A canonical timezone string did not match a known timezone.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update an account that does not exist
    #[error("tried to update an account that is not in the database")]
    UpdateMissingAccount,

    /// Tried to delete an account that does not exist
    #[error("tried to delete an account that is not in the database")]
    DeleteMissingAccount,
}

/// SQLite extended result code for a failed UNIQUE constraint.
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;
/// SQLite extended result code for a failed FOREIGN KEY constraint.
const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Error::InvalidOwner
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => ErrorPage::not_found().into_response(),
            Error::InvalidTimezoneError(timezone) => ErrorPage::internal(
                "Invalid Timezone Settings",
                &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            )
            .into_response(),
            Error::DatabaseLockError => ErrorPage::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                ErrorPage::default().into_response()
            }
        }
    }
}

impl Error {
    /// Render the error as an alert fragment for HTMX form submissions.
    fn into_alert_response(self) -> Response {
        let description = self.to_string();
        let (status, alert) = match self {
            Error::InvalidBalance(_)
            | Error::NegativeBalance
            | Error::BalanceTooLarge(_)
            | Error::EmptyAccountType
            | Error::FieldTooLong { .. } => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid account details".to_owned(),
                    details: description,
                },
            ),
            Error::InvalidOwner => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid account owner".to_owned(),
                    details: "The selected owner is not a registered user. \
                        Refresh the page and pick an owner from the list."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingAccount => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update account".to_owned(),
                    details: "The account could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingAccount => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete account".to_owned(),
                    details: "The account could not be found. \
                        Try refreshing the page to see if the account has already been deleted."
                        .to_owned(),
                },
            ),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details: "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                    },
                )
            }
        };

        (status, alert).into_response()
    }
}
