use axum_test::{TestResponse, TestServer};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    AppState, LocalTimezone, PasswordHash, User, ValidatedPassword,
    account::{FinancialAccount, Magnitude, NewAccount, create_account},
    endpoints,
    user::create_user,
};

/// The password of every user made by [create_test_user].
pub(crate) const TEST_PASSWORD: &str = "test";

/// The cheapest cost bcrypt accepts, keeps hashing fast in tests.
const TEST_HASH_COST: u32 = 4;

pub(crate) fn get_test_app_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    let local_timezone = LocalTimezone::parse("Etc/UTC").expect("Etc/UTC should be valid");

    AppState::new(connection, "foobar", local_timezone).expect("Could not create app state")
}

#[track_caller]
pub(crate) fn create_test_user(state: &AppState, username: &str, is_staff: bool) -> User {
    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked(TEST_PASSWORD),
        TEST_HASH_COST,
    )
    .expect("Could not hash test password");
    let connection = state.db_connection.lock().unwrap();

    create_user(username, password_hash, is_staff, &connection).expect("Could not create user")
}

#[track_caller]
pub(crate) fn create_test_account(
    state: &AppState,
    owner: &User,
    account_type: &str,
    balance: Decimal,
    is_negative: bool,
) -> FinancialAccount {
    let account = NewAccount::new(
        owner.id,
        account_type,
        None,
        Magnitude::new(balance).expect("Invalid test balance"),
        is_negative,
    )
    .expect("Invalid test account");
    let connection = state.db_connection.lock().unwrap();

    create_account(&account, &connection).expect("Could not create account")
}

/// Log in through the log-in form, the session and flash cookies are in the
/// returned response's `cookies()`.
pub(crate) async fn log_in_as(server: &TestServer, user: &User) -> TestResponse {
    let response = server
        .post(endpoints::LOG_IN_VIEW)
        .form(&[
            ("username", user.username.as_str()),
            ("password", TEST_PASSWORD),
        ])
        .await;
    response.assert_status_see_other();

    response
}
