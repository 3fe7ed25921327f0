//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    account::{
        create_account_endpoint, delete_account_endpoint, edit_account_endpoint,
        get_accounts_page, get_admin_page, get_create_account_page, get_edit_account_page,
        get_my_account_page,
    },
    auth::{auth_guard, auth_guard_hx},
    endpoints,
    error_page::{get_404_not_found, get_internal_server_error_page},
    log_in::{get_log_in_page, post_log_in},
    log_out::get_log_out,
    permission_denied::{get_permission_denied, get_protected_page, staff_guard},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(
            endpoints::LOG_IN_VIEW,
            get(get_log_in_page).post(post_log_in),
        )
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::MY_ACCOUNT_VIEW, get(get_my_account_page))
        .route(endpoints::ACCOUNTS_VIEW, get(get_accounts_page))
        .route(endpoints::PROTECTED_VIEW, get(get_protected_page))
        .route(endpoints::PERMISSION_DENIED, get(get_permission_denied))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // Layers run outside in, so the auth guard has placed the user in the request by the time
    // the staff guard sees it.
    let staff_pages = Router::new()
        .route(endpoints::ADMIN_VIEW, get(get_admin_page))
        .route(endpoints::NEW_ACCOUNT_VIEW, get(get_create_account_page))
        .route(endpoints::EDIT_ACCOUNT_VIEW, get(get_edit_account_page))
        .layer(middleware::from_fn_with_state(state.clone(), staff_guard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes need to use the HX-REDIRECT header for auth redirects to work properly for
    // HTMX requests.
    let staff_api = Router::new()
        .route(endpoints::ACCOUNTS_API, post(create_account_endpoint))
        .route(
            endpoints::ACCOUNT_API,
            post(edit_account_endpoint).delete(delete_account_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), staff_guard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    protected_routes
        .merge(staff_pages)
        .merge(staff_api)
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}
