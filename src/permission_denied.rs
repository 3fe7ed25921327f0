//! Turns away authenticated users from content they may not see.
//!
//! A denied page request is sent back to the page it came from with an error
//! flash. Asynchronous callers get a JSON payload they can show themselves.

use std::{convert::Infallible, sync::Arc};

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::REFERER, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use serde::Serialize;

use crate::{
    AccessPolicy, AppState, User,
    access::{Privilege, authorize},
    auth::normalize_absolute_url,
    endpoints,
    error_page::ErrorPage,
    flash::{Flash, push_flash},
};

/// Shown when a page is denied outright.
pub const PERMISSION_DENIED_MESSAGE: &str = "You are not allowed to view this content, contact your account officer to get the problem solved";
/// Shown when a non-staff user requests a staff page.
pub const STAFF_ONLY_MESSAGE: &str = "You are not allowed to view this content";
/// Flashed by the page that no one may view.
pub const RESTRICTED_PAGE_MESSAGE: &str = "This page is completely restricted";

/// What the gate needs to know about a request to turn it away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// The local page the request came from, if it is safe to send the client back there.
    pub referer: Option<String>,
    /// Whether the request was made by script rather than page navigation.
    pub is_async: bool,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

impl RequestContext {
    fn from_parts(parts: &Parts) -> Self {
        let headers = &parts.headers;
        let is_async = header_str(headers, "x-requested-with")
            .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
            || header_str(headers, "hx-request")
                .is_some_and(|value| value.eq_ignore_ascii_case("true"));

        let current_path = parts.uri.path();
        let referer = header_str(headers, REFERER.as_str())
            .and_then(normalize_absolute_url)
            .filter(|url| {
                let path = url.split_once('?').map_or(url.as_str(), |(path, _)| path);

                path != current_path
                    && path != endpoints::PROTECTED_VIEW
                    && path != endpoints::PERMISSION_DENIED
            });

        Self { referer, is_async }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// The JSON body sent to asynchronous callers that are denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenialPayload {
    pub status: &'static str,
    pub title: &'static str,
    pub message: String,
    /// Where the caller came from, `null` if unknown.
    pub redirect: Option<String>,
}

/// How a denied request is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Flash `flash` and send the client to `location` with a 303 See Other.
    Redirect { flash: Flash, location: String },
    /// Reply with a JSON payload.
    Payload(DenialPayload),
}

/// Decide how to answer a denied request.
///
/// Page requests are redirected back to their referrer, or `default_location`
/// if there is none, with `message` as an error flash.
pub fn on_denied(context: &RequestContext, message: &str, default_location: &str) -> Denial {
    if context.is_async {
        return Denial::Payload(DenialPayload {
            status: "error",
            title: "Oops!",
            message: message.to_owned(),
            redirect: context.referer.clone(),
        });
    }

    Denial::Redirect {
        flash: Flash::error(message),
        location: context
            .referer
            .clone()
            .unwrap_or_else(|| default_location.to_owned()),
    }
}

impl Denial {
    /// Build the response, queueing the flash message in `jar` if there is one.
    pub fn respond(self, jar: PrivateCookieJar) -> Response {
        match self {
            Denial::Redirect { flash, location } => {
                (push_flash(jar, flash), Redirect::to(&location)).into_response()
            }
            Denial::Payload(payload) => Json(payload).into_response(),
        }
    }
}

/// The state needed by [staff_guard].
#[derive(Debug, Clone)]
pub struct GateState {
    pub cookie_key: Key,
    pub access_policy: Arc<dyn AccessPolicy>,
}

impl FromRef<AppState> for GateState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            access_policy: state.access_policy.clone(),
        }
    }
}

impl FromRef<GateState> for Key {
    fn from_ref(state: &GateState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware that only lets staff through.
///
/// Must run inside [auth_guard](crate::auth::auth_guard) so that the [User]
/// is in the request extensions.
pub async fn staff_guard(
    State(state): State<GateState>,
    context: RequestContext,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<User>().cloned() else {
        tracing::error!("staff_guard ran without an authenticated user in the request");
        return ErrorPage::default().into_response();
    };

    if authorize(state.access_policy.as_ref(), &user, Privilege::Staff) {
        return next.run(request).await;
    }

    tracing::info!(
        "Denied {} access to staff route {}",
        user.username,
        request.uri().path()
    );

    on_denied(&context, STAFF_ONLY_MESSAGE, endpoints::MY_ACCOUNT_VIEW).respond(jar)
}

/// A page no one may view: always forwards to the permission denied handler.
pub async fn get_protected_page(jar: PrivateCookieJar) -> Response {
    let jar = push_flash(jar, Flash::error(RESTRICTED_PAGE_MESSAGE));

    (jar, Redirect::to(endpoints::PERMISSION_DENIED)).into_response()
}

/// Send the client back where it came from with an explanation.
pub async fn get_permission_denied(context: RequestContext, jar: PrivateCookieJar) -> Response {
    on_denied(
        &context,
        PERMISSION_DENIED_MESSAGE,
        endpoints::MY_ACCOUNT_VIEW,
    )
    .respond(jar)
}

#[cfg(test)]
mod on_denied_tests {
    use axum::http::Request;

    use crate::{
        endpoints,
        flash::Flash,
        permission_denied::{Denial, DenialPayload, RequestContext, on_denied},
    };

    fn context_for(path: &str, headers: &[(&str, &str)]) -> RequestContext {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();

        RequestContext::from_parts(&parts)
    }

    #[test]
    fn page_request_redirects_to_referer() {
        let context = context_for(
            endpoints::PERMISSION_DENIED,
            &[("referer", "http://localhost:3000/accounts/?page=2")],
        );

        let denial = on_denied(&context, "nope", endpoints::MY_ACCOUNT_VIEW);

        assert_eq!(
            denial,
            Denial::Redirect {
                flash: Flash::error("nope"),
                location: "/accounts/?page=2".to_owned(),
            }
        );
    }

    #[test]
    fn page_request_without_referer_uses_default() {
        let context = context_for(endpoints::PERMISSION_DENIED, &[]);

        let denial = on_denied(&context, "nope", endpoints::MY_ACCOUNT_VIEW);

        assert_eq!(
            denial,
            Denial::Redirect {
                flash: Flash::error("nope"),
                location: endpoints::MY_ACCOUNT_VIEW.to_owned(),
            }
        );
    }

    #[test]
    fn referer_pointing_at_denied_page_is_ignored() {
        for referer in [
            "http://localhost/the_boss/",
            "http://localhost/protected/",
            "http://localhost/permission-denied/",
            "https://example.com/",
        ] {
            let context = context_for(endpoints::ADMIN_VIEW, &[("referer", referer)]);

            assert_eq!(context.referer, None, "referer {referer} should be ignored");
        }
    }

    #[test]
    fn xml_http_request_gets_payload() {
        let context = context_for(
            endpoints::PERMISSION_DENIED,
            &[
                ("x-requested-with", "XMLHttpRequest"),
                ("referer", "http://localhost/accounts/"),
            ],
        );

        let denial = on_denied(&context, "nope", endpoints::MY_ACCOUNT_VIEW);

        assert_eq!(
            denial,
            Denial::Payload(DenialPayload {
                status: "error",
                title: "Oops!",
                message: "nope".to_owned(),
                redirect: Some(endpoints::ACCOUNTS_VIEW.to_owned()),
            })
        );
    }

    #[test]
    fn htmx_request_without_referer_gets_null_redirect() {
        let context = context_for(endpoints::PERMISSION_DENIED, &[("hx-request", "true")]);

        let denial = on_denied(&context, "nope", endpoints::MY_ACCOUNT_VIEW);

        match denial {
            Denial::Payload(payload) => assert_eq!(payload.redirect, None),
            Denial::Redirect { .. } => panic!("expected a JSON payload, got a redirect"),
        }
    }
}

#[cfg(test)]
mod gate_tests {
    use axum::{Router, http::StatusCode, middleware, routing::get};
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        AppState,
        auth::auth_guard,
        endpoints,
        log_in::{get_log_in_page, post_log_in},
        permission_denied::{
            PERMISSION_DENIED_MESSAGE, RESTRICTED_PAGE_MESSAGE, STAFF_ONLY_MESSAGE,
            get_permission_denied, get_protected_page, staff_guard,
        },
        test_utils::{create_test_user, get_test_app_state, log_in_as},
    };

    async fn staff_only() -> &'static str {
        "staff content"
    }

    fn get_server(state: AppState) -> TestServer {
        let app = Router::new()
            .route(endpoints::ADMIN_VIEW, get(staff_only))
            .layer(middleware::from_fn_with_state(state.clone(), staff_guard))
            .route(endpoints::PROTECTED_VIEW, get(get_protected_page))
            .route(endpoints::PERMISSION_DENIED, get(get_permission_denied))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .route(endpoints::LOG_IN_VIEW, get(get_log_in_page).post(post_log_in))
            .with_state(state);

        TestServer::new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn staff_can_view_staff_page() {
        let state = get_test_app_state();
        let admin = create_test_user(&state, "admin", true);
        let server = get_server(state);
        let cookies = log_in_as(&server, &admin).await.cookies();

        let response = server.get(endpoints::ADMIN_VIEW).add_cookies(cookies).await;

        response.assert_status_ok();
        response.assert_text("staff content");
    }

    #[tokio::test]
    async fn regular_user_is_sent_back_with_flash() {
        let state = get_test_app_state();
        let alice = create_test_user(&state, "alice", false);
        let server = get_server(state);
        let cookies = log_in_as(&server, &alice).await.cookies();

        let response = server
            .get(endpoints::ADMIN_VIEW)
            .add_cookies(cookies.clone())
            .add_header("referer", "http://localhost/accounts/")
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::ACCOUNTS_VIEW);

        let page = server
            .get(endpoints::LOG_IN_VIEW)
            .add_cookies(response.cookies())
            .await
            .text();
        assert!(page.contains(STAFF_ONLY_MESSAGE));
        assert!(!page.contains("staff content"));
    }

    #[tokio::test]
    async fn regular_user_async_request_gets_json() {
        let state = get_test_app_state();
        let alice = create_test_user(&state, "alice", false);
        let server = get_server(state);
        let cookies = log_in_as(&server, &alice).await.cookies();

        let response = server
            .get(endpoints::ADMIN_VIEW)
            .add_cookies(cookies)
            .add_header("x-requested-with", "XMLHttpRequest")
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>(),
            json!({
                "status": "error",
                "title": "Oops!",
                "message": STAFF_ONLY_MESSAGE,
                "redirect": null,
            })
        );
    }

    #[tokio::test]
    async fn protected_page_forwards_to_permission_denied() {
        let state = get_test_app_state();
        let admin = create_test_user(&state, "admin", true);
        let server = get_server(state);
        let cookies = log_in_as(&server, &admin).await.cookies();

        let response = server
            .get(endpoints::PROTECTED_VIEW)
            .add_cookies(cookies)
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::PERMISSION_DENIED);

        let page = server
            .get(endpoints::LOG_IN_VIEW)
            .add_cookies(response.cookies())
            .await
            .text();
        assert!(page.contains(RESTRICTED_PAGE_MESSAGE));
    }

    #[tokio::test]
    async fn permission_denied_defaults_to_my_account() {
        let state = get_test_app_state();
        let alice = create_test_user(&state, "alice", false);
        let server = get_server(state);
        let cookies = log_in_as(&server, &alice).await.cookies();

        let response = server
            .get(endpoints::PERMISSION_DENIED)
            .add_cookies(cookies)
            .await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), endpoints::MY_ACCOUNT_VIEW);

        let page = server
            .get(endpoints::LOG_IN_VIEW)
            .add_cookies(response.cookies())
            .await
            .text();
        assert!(page.contains(PERMISSION_DENIED_MESSAGE));
    }

    #[tokio::test]
    async fn unauthenticated_request_goes_to_log_in() {
        let server = get_server(get_test_app_state());

        let response = server.get(endpoints::ADMIN_VIEW).await;

        response.assert_status_see_other();
        assert_eq!(
            response.header("location"),
            "/?redirect_url=%2Fthe_boss%2F"
        );
    }
}
