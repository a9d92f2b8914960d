use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InvalidCity;

/// Layout of the observation time reported by the forecast upstream.
/// Minute precision, no zone suffix; read as UTC.
pub const OBSERVED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Longest accepted city key, in characters.
pub const MAX_CITY_LENGTH: usize = 100;

/// Canonical city key shared by the ingest and lookup paths.
///
/// Trimmed, inner whitespace collapsed to single spaces, lowercased. Both the
/// configured ingest city and the HTTP path segment go through `parse`, so
/// `"Moscow"` and `" moscow "` address the same rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CityName(String);

impl CityName {
    /// Canonicalize a raw city name.
    ///
    /// # Errors
    /// Returns `InvalidCity` if the name is blank or longer than
    /// `MAX_CITY_LENGTH` characters.
    pub fn parse(raw: &str) -> Result<Self, InvalidCity> {
        let canonical = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if canonical.is_empty() {
            return Err(InvalidCity::Blank);
        }

        let length = canonical.chars().count();
        if length > MAX_CITY_LENGTH {
            return Err(InvalidCity::TooLong(length));
        }

        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CityName {
    type Error = InvalidCity;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CityName> for String {
    fn from(city: CityName) -> Self {
        city.0
    }
}

/// One temperature observation for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub name: CityName,
    pub timestamp: DateTime<Utc>,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Set when the upstream observation time could not be parsed and the
    /// ingest clock was used instead.
    #[serde(default, skip_serializing_if = "is_false")]
    pub estimated: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Parse an upstream observation time (`YYYY-MM-DDTHH:MM`) as UTC.
///
/// Only the exact zero-padded layout is accepted. chrono alone would also
/// take one-digit fields and a signed year.
pub fn parse_observed_at(text: &str) -> Option<DateTime<Utc>> {
    if !has_observed_at_shape(text) {
        return None;
    }

    NaiveDateTime::parse_from_str(text, OBSERVED_AT_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn has_observed_at_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 16
        && bytes.iter().enumerate().all(|(i, &b)| match i {
            4 | 7 => b == b'-',
            10 => b == b'T',
            13 => b == b':',
            _ => b.is_ascii_digit(),
        })
}
