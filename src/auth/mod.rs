//! Cookie based sessions: setting and reading the auth cookie, the middleware
//! that guards protected routes, and redirect URL handling.

mod cookie;
mod middleware;
mod redirect;

pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use middleware::{auth_guard, auth_guard_hx};
pub use redirect::{normalize_absolute_url, normalize_redirect_url};

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
