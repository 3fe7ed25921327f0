//! Defines the endpoint for deleting an account.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    account::{AccountId, create_endpoint::AccountEndpointState, delete_account},
    alert::Alert,
};

/// A route handler for deleting an account, responds with an alert.
pub async fn delete_account_endpoint(
    State(state): State<AccountEndpointState>,
    Path(account_id): Path<AccountId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_account(account_id, &connection) {
        // The status code has to be 200 OK or HTMX will not delete the table row.
        Ok(()) => Alert::SuccessSimple {
            message: "Account deleted successfully".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingAccount) => Error::DeleteMissingAccount.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not delete account {account_id}: {error}");
            error.into_alert_response()
        }
    }
}
