//! Defines the endpoint for creating a new account.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{create_account, form::AccountForm},
    endpoints,
    flash::{Flash, push_flash},
};

/// The state needed to create, update or delete an account.
#[derive(Debug, Clone)]
pub struct AccountEndpointState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AccountEndpointState> for Key {
    fn from_ref(state: &AccountEndpointState) -> Self {
        state.cookie_key.clone()
    }
}

/// A route handler for creating a new account, redirects to the admin page on success.
///
/// Invalid input is rejected before anything is written and reported with an alert.
pub async fn create_account_endpoint(
    State(state): State<AccountEndpointState>,
    jar: PrivateCookieJar,
    Form(form): Form<AccountForm>,
) -> Response {
    let new_account = match form.validate() {
        Ok(new_account) => new_account,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let account = match create_account(&new_account, &connection) {
        Ok(account) => account,
        Err(Error::InvalidOwner) => return Error::InvalidOwner.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not create account with {new_account:?}: {error}");
            return error.into_alert_response();
        }
    };

    tracing::info!("Created account {} for {}", account.id, account.owner_username);
    let jar = push_flash(
        jar,
        Flash::success(format!("Created account {}", account.display_name())),
    );

    (
        StatusCode::SEE_OTHER,
        HxRedirect(endpoints::ADMIN_VIEW.to_owned()),
        jar,
    )
        .into_response()
}
