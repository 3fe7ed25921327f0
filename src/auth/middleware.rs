//! Authentication middleware that validates cookies, loads the user, extends
//! sessions, and handles redirects.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error, LocalTimezone, User,
    auth::{
        cookie::{COOKIE_TOKEN, extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        invalidate_auth_cookie,
        redirect::{build_log_in_redirect_url, build_log_in_redirect_url_from_target},
    },
    endpoints,
    user::get_user_by_id,
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The server's local timezone.
    pub local_timezone: LocalTimezone,
    /// The database connection, used to load the logged in user.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

fn load_user(state: &AuthState, jar: &PrivateCookieJar) -> Result<User, Error> {
    let token = get_token_from_cookies(jar)?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_user_by_id(token.user_id, &connection)
}

/// Checks for a valid auth cookie and loads the user it belongs to.
///
/// The [User] is placed into the request extensions and the request executed
/// normally if the cookie is valid, otherwise the response from `get_redirect`
/// is returned.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request).unwrap_or_else(|| {
        tracing::warn!("Invalid redirect URL from request. Falling back to my account page.");

        build_log_in_redirect_url_from_target(endpoints::MY_ACCOUNT_VIEW)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    });

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(&log_in_redirect_url);
        }
    };

    let user = match load_user(&state, &jar) {
        Ok(user) => user,
        Err(Error::CookieMissing) => return get_redirect(&log_in_redirect_url),
        Err(Error::NotFound) => {
            tracing::warn!("Auth cookie refers to a user that no longer exists.");
            let (mut parts, body) = get_redirect(&log_in_redirect_url).into_parts();
            append_set_cookie_headers(&mut parts, invalidate_auth_cookie(jar));
            return Response::from_parts(parts, body);
        }
        Err(error) => return error.into_response(),
    };

    parts.extensions.insert(user);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();

    // The handler replaced or removed the auth cookie itself, e.g. on log out.
    if sets_auth_cookie(&parts) {
        return Response::from_parts(parts, body);
    }

    let jar = match extend_auth_cookie_duration_if_needed(
        jar.clone(),
        state.cookie_duration,
        state.local_timezone.offset_now(),
    ) {
        Ok(updated_jar) => updated_jar,
        Err(err) => {
            tracing::error!("Error extending cookie duration: {err:?}. Rolling back cookie jar.");
            jar
        }
    };
    append_set_cookie_headers(&mut parts, jar);

    Response::from_parts(parts, body)
}

fn sets_auth_cookie(parts: &axum::http::response::Parts) -> bool {
    let prefix = format!("{COOKIE_TOKEN}=");

    parts
        .headers
        .get_all(SET_COOKIE)
        .iter()
        .any(|value| value.to_str().is_ok_and(|value| value.starts_with(&prefix)))
}

fn append_set_cookie_headers(parts: &mut axum::http::response::Parts, jar: PrivateCookieJar) {
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }
}

/// Middleware function that checks for a valid authorization cookie.
/// The user is placed into request and then the request executed normally if the cookie is valid, otherwise a redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user): Extension<User>` to receive the user.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware function that checks for a valid authorization cookie.
/// The user is placed into request and then the request executed normally if the cookie is valid, otherwise a HTMX redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user): Extension<User>` to receive the user.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}
