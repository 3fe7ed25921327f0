//! One-shot messages that survive a redirect.
//!
//! Messages are queued in an encrypted cookie and removed from it the next
//! time a page renders them.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

pub(crate) const COOKIE_FLASH: &str = "flash";

/// How a flash message should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// A message to show on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

fn read_flashes(jar: &PrivateCookieJar) -> Vec<Flash> {
    let Some(cookie) = jar.get(COOKIE_FLASH) else {
        return Vec::new();
    };

    serde_json::from_str(cookie.value_trimmed()).unwrap_or_else(|error| {
        tracing::warn!("Discarding malformed flash cookie: {error}");
        Vec::new()
    })
}

/// Queue `flash` behind any messages already waiting in `jar`.
pub fn push_flash(jar: PrivateCookieJar, flash: Flash) -> PrivateCookieJar {
    let mut flashes = read_flashes(&jar);
    flashes.push(flash);

    match serde_json::to_string(&flashes) {
        Ok(value) => jar.add(
            Cookie::build((COOKIE_FLASH, value))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Strict)
                .secure(true),
        ),
        Err(error) => {
            tracing::error!("Could not serialize flash messages: {error}");
            jar
        }
    }
}

/// Remove and return every queued message, oldest first.
pub fn take_flashes(jar: PrivateCookieJar) -> (PrivateCookieJar, Vec<Flash>) {
    let flashes = read_flashes(&jar);

    if jar.get(COOKIE_FLASH).is_none() {
        return (jar, flashes);
    }

    (jar.remove(Cookie::build(COOKIE_FLASH).path("/")), flashes)
}

pub fn flash_view(flashes: &[Flash]) -> Markup {
    let style = |kind: FlashKind| match kind {
        FlashKind::Success => {
            "p-4 text-sm text-green-800 rounded-lg bg-green-50 dark:bg-gray-800 dark:text-green-400"
        }
        FlashKind::Error => {
            "p-4 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400"
        }
    };

    html! {
        ul id="flash-messages" class="max-w-md mx-auto mt-4 space-y-2"
        {
            @for flash in flashes {
                li class=(style(flash.kind)) role="alert" data-flash-kind=(
                    match flash.kind {
                        FlashKind::Success => "success",
                        FlashKind::Error => "error",
                    }
                )
                {
                    (flash.message)
                }
            }
        }
    }
}
