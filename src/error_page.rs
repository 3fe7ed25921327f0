//! The pages shown for missing resources and internal server errors.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::html::error_view;

/// A full page error view with a status code.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorPage {
    status: StatusCode,
    title: &'static str,
    description: String,
    fix: String,
}

impl ErrorPage {
    /// The 404 page.
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            title: "Not Found",
            description: "Something's missing.".to_owned(),
            fix: "Sorry, we can't find that page. You'll find lots to explore on the home page."
                .to_owned(),
        }
    }

    /// A 500 page that explains what went wrong and how it might be fixed.
    pub fn internal(description: &str, fix: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            title: "Internal Server Error",
            description: description.to_owned(),
            fix: fix.to_owned(),
        }
    }
}

impl Default for ErrorPage {
    fn default() -> Self {
        Self::internal(
            "Sorry, something went wrong.",
            "Try again later or check the server logs",
        )
    }
}

impl IntoResponse for ErrorPage {
    fn into_response(self) -> Response {
        let header = self.status.as_u16().to_string();
        let page = error_view(self.title, &header, &self.description, &self.fix);

        (self.status, Html(page.into_string())).into_response()
    }
}

/// Fallback handler for routes that do not exist.
pub async fn get_404_not_found() -> Response {
    ErrorPage::not_found().into_response()
}

/// The page HTMX handlers redirect to when they hit an unexpected error.
pub async fn get_internal_server_error_page() -> Response {
    ErrorPage::default().into_response()
}
