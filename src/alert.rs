//! Alert system for displaying success and error messages to users.
//!
//! Alerts are swapped out-of-band into the `#alert-container` element that
//! [base](crate::html::base) renders on every page, so any HTMX response can
//! carry one regardless of its target.

use axum::response::{Html, IntoResponse, Response};
use maud::{Markup, html};

/// A dismissable message shown after an HTMX request.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    SuccessSimple { message: String },
    Error { message: String, details: String },
}

impl Alert {
    pub fn into_html(self) -> Markup {
        let (is_error, message, details) = match self {
            Alert::SuccessSimple { message } => (false, message, None),
            Alert::Error { message, details } => (true, message, Some(details)),
        };

        let style = if is_error {
            "flex items-start gap-3 p-4 mb-4 text-sm text-red-800 border border-red-300 \
            rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
        } else {
            "flex items-start gap-3 p-4 mb-4 text-sm text-green-800 border border-green-300 \
            rounded-lg bg-green-50 dark:bg-gray-800 dark:text-green-400 dark:border-green-800"
        };

        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div
                    class=(style)
                    role="alert"
                    data-alert-kind=(if is_error { "error" } else { "success" })
                {
                    div class="flex-1"
                    {
                        p class="font-medium" { (message) }

                        @if let Some(details) = details.filter(|details| !details.is_empty()) {
                            p class="mt-1" { (details) }
                        }
                    }

                    button
                        type="button"
                        class="ms-auto text-lg leading-none"
                        aria-label="Close"
                        onclick="this.closest('#alert-container').classList.add('hidden')"
                    {
                        "×"
                    }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        Html(self.into_html().into_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use scraper::Selector;

    use crate::{
        alert::Alert,
        test_utils::{assert_valid_html, parse_html_fragment},
    };

    #[tokio::test]
    async fn error_alert_shows_message_and_details() {
        let response = Alert::Error {
            message: "Invalid account details".to_owned(),
            details: "account type cannot be empty".to_owned(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let alert = html
            .select(&Selector::parse("[role=alert]").unwrap())
            .next()
            .expect("alert missing");
        assert_eq!(alert.value().attr("data-alert-kind"), Some("error"));
        let paragraphs: Vec<String> = alert
            .select(&Selector::parse("p").unwrap())
            .map(|p| p.text().collect::<String>())
            .collect();
        assert_eq!(
            paragraphs,
            vec!["Invalid account details", "account type cannot be empty"]
        );
    }

    #[tokio::test]
    async fn simple_alert_has_no_details() {
        let response = Alert::SuccessSimple {
            message: "Account deleted successfully".to_owned(),
        }
        .into_response();

        let html = parse_html_fragment(response).await;
        let alert = html
            .select(&Selector::parse("[role=alert]").unwrap())
            .next()
            .expect("alert missing");
        assert_eq!(alert.value().attr("data-alert-kind"), Some("success"));
        assert_eq!(alert.select(&Selector::parse("p").unwrap()).count(), 1);
    }

    #[test]
    fn alert_swaps_out_of_band() {
        let html = Alert::Error {
            message: "nope".to_owned(),
            details: "not allowed".to_owned(),
        }
        .into_html()
        .into_string();

        assert!(html.contains(r#"id="alert-container""#));
        assert!(html.contains(r#"hx-swap-oob="true""#));
    }
}
