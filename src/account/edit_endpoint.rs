//! Defines the endpoint for updating an account.

use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;

use crate::{
    Error,
    account::{
        AccountId, create_endpoint::AccountEndpointState, form::AccountForm, update_account,
    },
    endpoints,
    flash::{Flash, push_flash},
};

/// A route handler for updating an account, redirects to the admin page on success.
pub async fn edit_account_endpoint(
    State(state): State<AccountEndpointState>,
    Path(account_id): Path<AccountId>,
    jar: PrivateCookieJar,
    Form(form): Form<AccountForm>,
) -> Response {
    let new_values = match form.validate() {
        Ok(new_values) => new_values,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let account = match update_account(account_id, &new_values, &connection) {
        Ok(account) => account,
        Err(error @ (Error::UpdateMissingAccount | Error::InvalidOwner)) => {
            return error.into_alert_response();
        }
        Err(error) => {
            tracing::error!("Could not update account {account_id}: {error}");
            return error.into_alert_response();
        }
    };

    let jar = push_flash(
        jar,
        Flash::success(format!("Updated account {}", account.display_name())),
    );

    (
        StatusCode::SEE_OTHER,
        HxRedirect(endpoints::ADMIN_VIEW.to_owned()),
        jar,
    )
        .into_response()
}
