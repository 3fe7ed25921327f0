//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The auth module handles the lower level authentication and cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::{HxRedirect, HxRequest};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AccessPolicy, AppState, Error, LocalTimezone, User,
    auth::{normalize_redirect_url, set_auth_cookie},
    endpoints,
    flash::{Flash, push_flash, take_flashes},
    html::{
        BUTTON_PRIMARY_STYLE, auth_card, base_with_flashes, loading_spinner, password_input,
        text_input,
    },
    user::get_user_by_username,
};

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid username or password.";
const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

fn log_in_form(username: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            method="post"
            action=(endpoints::LOG_IN_VIEW)
            hx-post=(endpoints::LOG_IN_VIEW)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (text_input("username", "Username", username, true, None))

            (password_input("", error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }
        }
    }
}

fn log_in_page(form: &Markup, flashes: &[Flash]) -> Markup {
    let content = auth_card("Log in to your account", form);

    base_with_flashes("Log In", flashes, &content)
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(redirect_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {redirect_url}");
            }
            None
        }
    }
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// Display the log-in page along with any pending flash messages.
pub async fn get_log_in_page(
    Query(query): Query<RedirectQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let (jar, flashes) = take_flashes(jar);
    let form = log_in_form("", None, redirect_url.as_deref());

    (jar, log_in_page(&form, &flashes)).into_response()
}

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The server's local timezone.
    pub local_timezone: LocalTimezone,
    pub db_connection: Arc<Mutex<Connection>>,
    /// Decides where a user lands after logging in.
    pub access_policy: Arc<dyn AccessPolicy>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
            access_policy: state.access_policy.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password in the database, which has been verified.
#[derive(Clone, Deserialize)]
pub struct LogInData {
    /// The name the user registered with.
    pub username: String,

    /// Password entered during log-in.
    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    pub redirect_url: Option<String>,
}

fn check_credentials(state: &LoginState, user_data: &LogInData) -> Result<User, Error> {
    let user = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        match get_user_by_username(&user_data.username, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        }
    };

    if user.password_hash.verify(&user_data.password)? {
        Ok(user)
    } else {
        Err(Error::InvalidCredentials)
    }
}

/// Handler for log-in requests via the POST method.
///
/// On success the auth cookie is set and the client is redirected to the
/// requested page, or to the landing page for their role. Otherwise the form
/// is returned with an error message and no cookie is set.
///
/// HTMX requests receive the form as a fragment and an `HX-Redirect`, plain
/// form posts receive the full page and a normal redirect.
pub async fn post_log_in(
    State(state): State<LoginState>,
    HxRequest(is_htmx): HxRequest,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let render_error = |message: &str| {
        let form = log_in_form(&user_data.username, Some(message), redirect_url.as_deref());

        if is_htmx {
            form.into_response()
        } else {
            log_in_page(&form, &[]).into_response()
        }
    };

    let user = match check_credentials(&state, &user_data) {
        Ok(user) => user,
        Err(Error::InvalidCredentials) => {
            tracing::info!("Failed log-in attempt for {:?}", user_data.username);
            return render_error(INVALID_CREDENTIALS_ERROR_MSG);
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return render_error(INTERNAL_ERROR_MSG);
        }
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let jar = match set_auth_cookie(
        jar,
        user.id,
        cookie_duration,
        state.local_timezone.offset_now(),
    ) {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Error setting auth cookie: {error}");
            return render_error(INTERNAL_ERROR_MSG);
        }
    };
    let jar = push_flash(jar, Flash::success("You have successfully logged in!"));

    let landing_page = if state.access_policy.can_view_all(&user) {
        endpoints::ADMIN_VIEW
    } else {
        endpoints::MY_ACCOUNT_VIEW
    };
    let redirect_url = redirect_url.unwrap_or_else(|| landing_page.to_owned());

    if is_htmx {
        (StatusCode::SEE_OTHER, HxRedirect(redirect_url), jar).into_response()
    } else {
        (jar, Redirect::to(&redirect_url)).into_response()
    }
}

#[cfg(test)]
mod log_in_page_tests {
    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use scraper::{Html, Selector};

    use crate::{
        endpoints,
        log_in::get_log_in_page,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_valid_html,
            get_test_app_state, must_get_form,
        },
    };

    fn get_server() -> TestServer {
        let app = Router::new()
            .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
            .with_state(get_test_app_state());

        TestServer::new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let response = server_get(endpoints::LOG_IN_VIEW).await;

        let document = Html::parse_document(&response);
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::LOG_IN_VIEW, "hx-post");
        assert_eq!(form.value().attr("action"), Some(endpoints::LOG_IN_VIEW));
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "password", "password");
        assert_form_submit_button(&form);
    }

    #[tokio::test]
    async fn log_in_page_preserves_redirect_url() {
        let response = server_get("/?redirect_url=%2Faccounts%2F").await;

        let document = Html::parse_document(&response);
        let input = document
            .select(&Selector::parse("input[name=redirect_url]").unwrap())
            .next()
            .expect("redirect_url input missing");
        assert_eq!(input.value().attr("value"), Some("/accounts/"));
    }

    #[tokio::test]
    async fn log_in_page_drops_external_redirect_url() {
        let response = server_get("/?redirect_url=https%3A%2F%2Fexample.com").await;

        let document = Html::parse_document(&response);
        assert!(
            document
                .select(&Selector::parse("input[name=redirect_url]").unwrap())
                .next()
                .is_none()
        );
    }

    async fn server_get(path: &str) -> String {
        let response = get_server().get(path).await;
        response.assert_status_ok();

        response.text()
    }
}
