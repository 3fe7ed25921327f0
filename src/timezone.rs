//! The server's local timezone, used to stamp auth cookie expiry times.

use std::fmt::{Debug, Display};

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone, Tz};

use crate::Error;

/// A canonical timezone name, e.g. "Pacific/Auckland", that has been checked
/// against the timezone database.
#[derive(Clone)]
pub struct LocalTimezone {
    name: String,
    timezone: &'static Tz,
}

impl LocalTimezone {
    /// Look up `canonical_timezone` in the timezone database.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezoneError] if the name is not a known canonical timezone.
    pub fn parse(canonical_timezone: &str) -> Result<Self, Error> {
        time_tz::timezones::get_by_name(canonical_timezone)
            .map(|timezone| Self {
                name: canonical_timezone.to_owned(),
                timezone,
            })
            .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))
    }

    /// The offset from UTC right now, accounting for daylight saving.
    pub fn offset_now(&self) -> UtcOffset {
        self.timezone
            .get_offset_utc(&OffsetDateTime::now_utc())
            .to_utc()
    }
}

impl Debug for LocalTimezone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LocalTimezone").field(&self.name).finish()
    }
}

impl Display for LocalTimezone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
