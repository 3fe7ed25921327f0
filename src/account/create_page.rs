//! Defines the route handler for the page for creating an account.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::form::{AccountFormValues, account_form_page, account_form_view},
    endpoints,
    user::get_all_users,
};

/// The state needed for the create and edit account pages.
#[derive(Debug, Clone)]
pub struct AccountFormPageState {
    /// The database connection, used to list the users an account may belong to.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountFormPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Renders the page for creating an account.
pub async fn get_create_account_page(
    State(state): State<AccountFormPageState>,
) -> Result<Response, Error> {
    let users = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_all_users(&connection)
            .inspect_err(|error| tracing::error!("could not get users: {error}"))?
    };

    let form = account_form_view(
        endpoints::ACCOUNTS_API,
        "Create Account",
        &users,
        &AccountFormValues::default(),
    );

    Ok(account_form_page("New Account", endpoints::NEW_ACCOUNT_VIEW, &form).into_response())
}

#[cfg(test)]
mod create_page_tests {
    use axum::{extract::State, http::StatusCode};
    use scraper::Selector;

    use crate::{
        account::{create_page::AccountFormPageState, get_create_account_page},
        endpoints,
        test_utils::{
            assert_content_type, assert_form_input, assert_form_submit_button, assert_hx_endpoint,
            assert_valid_html, create_test_user, get_test_app_state, must_get_form,
            parse_html_document,
        },
    };

    #[tokio::test]
    async fn render_page() {
        let state = get_test_app_state();
        create_test_user(&state, "bob", false);
        create_test_user(&state, "alice", false);
        let page_state = AccountFormPageState {
            db_connection: state.db_connection.clone(),
        };

        let response = get_create_account_page(State(page_state)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::ACCOUNTS_API, "hx-post");
        assert_form_input(&form, "account_type", "text");
        assert_form_input(&form, "balance", "number");
        assert_form_submit_button(&form);
        let owners: Vec<String> = form
            .select(&Selector::parse("select[name=owner] option").unwrap())
            .map(|option| option.text().collect())
            .collect();
        assert_eq!(owners, vec!["alice", "bob"]);
    }
}
