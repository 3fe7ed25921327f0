//! The endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/the_boss/accounts/{account_id}', use [format_endpoint].

/// The log-in page, and the route the log-in form posts to.
pub const LOG_IN_VIEW: &str = "/";
/// The route for logging out the current user.
pub const LOG_OUT: &str = "/logout";
/// The landing page for regular users: their own accounts and totals.
pub const MY_ACCOUNT_VIEW: &str = "/my-account/";
/// The account list, limited to what the user may see.
pub const ACCOUNTS_VIEW: &str = "/accounts/";
/// The landing page for staff: every account and the system totals.
pub const ADMIN_VIEW: &str = "/the_boss/";
/// The page for creating a new account.
pub const NEW_ACCOUNT_VIEW: &str = "/the_boss/accounts/new";
/// The page for editing an existing account.
pub const EDIT_ACCOUNT_VIEW: &str = "/the_boss/accounts/{account_id}/edit";
/// The route to create an account.
pub const ACCOUNTS_API: &str = "/the_boss/accounts";
/// The route to update or delete an account.
pub const ACCOUNT_API: &str = "/the_boss/accounts/{account_id}";
/// A page no one may view.
pub const PROTECTED_VIEW: &str = "/protected/";
/// Sends the client back to where it came from with an explanation.
pub const PERMISSION_DENIED: &str = "/permission-denied/";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
