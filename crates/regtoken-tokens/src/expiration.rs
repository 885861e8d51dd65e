//! Expiration expressions.
//!
//! Administrators describe when a token stops working with a short
//! expression instead of a timestamp:
//!
//! | Expression   | Expires at                              |
//! |--------------|-----------------------------------------|
//! | `never`      | never                                   |
//! | `day`        | now + 24h                               |
//! | `week`       | now + 7 × 24h                           |
//! | `month`      | now + 30 × 24h (not a calendar month)   |
//! | `YYYY-MM-DD` | midnight of that date, in now's timezone |
//!
//! Keywords are matched ignoring ASCII case and surrounding whitespace.
//! Anything else is [`Expiration::Invalid`], which is kept apart from
//! [`Expiration::Never`] so bad input is never mistaken for "no expiry".

use crate::error::ExpirationError;
use chrono::{DateTime, Duration, NaiveDate, TimeZone};

/// Recognized expiration keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationKeyword {
    Never,
    Day,
    Week,
    Month,
}

impl ExpirationKeyword {
    /// All keywords, in increasing order of lifetime.
    pub const ALL: [ExpirationKeyword; 4] = [
        ExpirationKeyword::Day,
        ExpirationKeyword::Week,
        ExpirationKeyword::Month,
        ExpirationKeyword::Never,
    ];

    /// Match a keyword, ignoring ASCII case.
    pub fn from_keyword(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|keyword| keyword.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpirationKeyword::Never => "never",
            ExpirationKeyword::Day => "day",
            ExpirationKeyword::Week => "week",
            ExpirationKeyword::Month => "month",
        }
    }

    /// Lifetime granted by the keyword. `None` for [`ExpirationKeyword::Never`].
    ///
    /// A month is a fixed 30 days.
    pub fn offset(&self) -> Option<Duration> {
        match self {
            ExpirationKeyword::Never => None,
            ExpirationKeyword::Day => Some(Duration::days(1)),
            ExpirationKeyword::Week => Some(Duration::days(7)),
            ExpirationKeyword::Month => Some(Duration::days(30)),
        }
    }
}

/// Result of parsing an expiration expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiration<Tz: TimeZone> {
    /// The token never expires.
    Never,
    /// The token expires at this instant.
    At(DateTime<Tz>),
    /// The expression is not a keyword or a valid date.
    Invalid,
}

impl<Tz: TimeZone> Expiration<Tz> {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Expiration::Invalid)
    }

    /// Convert into the optional expiry instant, failing on `Invalid`.
    pub fn into_result(self, expression: &str) -> Result<Option<DateTime<Tz>>, ExpirationError> {
        match self {
            Expiration::Never => Ok(None),
            Expiration::At(at) => Ok(Some(at)),
            Expiration::Invalid => Err(ExpirationError::Invalid(expression.to_string())),
        }
    }
}

/// Parse an expiration expression relative to `now`.
pub fn parse<Tz: TimeZone>(expression: &str, now: DateTime<Tz>) -> Expiration<Tz> {
    let expression = expression.trim();

    if let Some(keyword) = ExpirationKeyword::from_keyword(expression) {
        return match keyword.offset() {
            None => Expiration::Never,
            Some(offset) => now
                .checked_add_signed(offset)
                .map_or(Expiration::Invalid, Expiration::At),
        };
    }

    parse_iso_date(expression)
        .and_then(|date| local_midnight(&now.timezone(), date))
        .map_or(Expiration::Invalid, Expiration::At)
}

/// Parse exactly `YYYY-MM-DD`. chrono alone would also take unpadded fields.
fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { *b == b'-' } else { b.is_ascii_digit() });
    if !well_formed {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight).earliest()
}
