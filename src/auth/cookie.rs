//! Defines functions for handling user authentication with cookies.
//!
//! The auth cookie holds a JSON encoded [Token] inside a private (encrypted
//! and signed) cookie, so clients can neither read nor forge it.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{Error, UserID};

pub(crate) const COOKIE_TOKEN: &str = "auth_token";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);

mod datetime_format {
    //! Serializes a [time::OffsetDateTime] with zero padded hours.
    //!
    //! The default serializer writes midnight as "0:00:00.0", which the
    //! matching deserializer then rejects.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// Date time format for the token expiry, e.g. "2021-01-01 00:00:00.0 +00:00:00".
    const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(date_time: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = date_time
            .format(DATE_TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&raw, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// The session stored in the auth cookie.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub(crate) struct Token {
    pub user_id: UserID,

    #[serde(with = "datetime_format")]
    pub expires_at: OffsetDateTime,
}

fn build_token_cookie(token: &Token) -> Result<Cookie<'static>, Error> {
    let value = serde_json::to_string(token)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    Ok(Cookie::build((COOKIE_TOKEN, value))
        .path("/")
        .expires(token.expires_at)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build())
}

/// Add an auth cookie to the cookie jar, indicating that `user_id` is logged in.
///
/// The cookie expires `duration` from now. The expiry is expressed in
/// `local_offset` so that it reads naturally in the server's timezone.
///
/// # Errors
///
/// Returns [Error::JSONSerializationError] if the token cannot be serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let token = Token {
        user_id,
        expires_at: OffsetDateTime::now_utc().to_offset(local_offset) + duration,
    };

    Ok(jar.add(build_token_cookie(&token)?))
}

/// Set the auth cookie to an invalid value and set its max age to zero, which
/// should delete the cookie on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Get the session token from `jar`.
///
/// # Errors
///
/// Returns [Error::CookieMissing] if there is no auth cookie, it cannot be
/// decoded or the token has expired.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::CookieMissing)?;
    let token: Token =
        serde_json::from_str(cookie.value_trimmed()).map_err(|_| Error::CookieMissing)?;

    if token.expires_at <= OffsetDateTime::now_utc() {
        return Err(Error::CookieMissing);
    }

    Ok(token)
}

/// Push the expiry of the auth cookie in `jar` out to `duration` from now,
/// unless it already expires later than that.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
///
/// Returns [Error::CookieMissing] if there is no valid token in `jar`.
pub(crate) fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let token = get_token_from_cookies(&jar)?;
    let new_expiry = OffsetDateTime::now_utc().to_offset(local_offset) + duration;

    if new_expiry <= token.expires_at {
        return Ok(jar);
    }

    let token = Token {
        user_id: token.user_id,
        expires_at: new_expiry,
    };

    Ok(jar.add(build_token_cookie(&token)?))
}
