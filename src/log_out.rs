//! Log-out route handler that invalidates the auth cookie and redirects users.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    auth::invalidate_auth_cookie,
    endpoints,
    flash::{Flash, push_flash},
};

/// Invalidate the auth cookie and redirect the client to the log-in page.
pub async fn get_log_out(jar: PrivateCookieJar) -> Response {
    let jar = invalidate_auth_cookie(jar);
    let jar = push_flash(jar, Flash::success("You have been successfully logged out!"));

    (jar, Redirect::to(endpoints::LOG_IN_VIEW)).into_response()
}
