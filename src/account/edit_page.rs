//! Defines the route handler for the page for editing an account.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    account::{
        AccountId,
        create_page::AccountFormPageState,
        form::{AccountFormValues, account_form_page, account_form_view},
        get_account,
    },
    endpoints::{self, format_endpoint},
    user::get_all_users,
};

/// Renders the page for editing an account, or the 404 page if there is no such account.
pub async fn get_edit_account_page(
    State(state): State<AccountFormPageState>,
    Path(account_id): Path<AccountId>,
) -> Result<Response, Error> {
    let (account, users) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let account = get_account(account_id, &connection).inspect_err(|error| {
            if *error != Error::NotFound {
                tracing::error!("could not get account {account_id}: {error}");
            }
        })?;
        let users = get_all_users(&connection)
            .inspect_err(|error| tracing::error!("could not get users: {error}"))?;

        (account, users)
    };

    let edit_endpoint = format_endpoint(endpoints::EDIT_ACCOUNT_VIEW, account_id);
    let update_endpoint = format_endpoint(endpoints::ACCOUNT_API, account_id);
    let form = account_form_view(
        &update_endpoint,
        "Update Account",
        &users,
        &AccountFormValues::from(&account),
    );

    Ok(account_form_page("Edit Account", &edit_endpoint, &form).into_response())
}
