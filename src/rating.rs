//! Score strings such as `"7.5/10"` and `"80/100"`.

use std::fmt;

use crate::error::RatingError;

/// A score as it appears in the source plus its parsed numerator.
///
/// Only the numerator is kept; scaling onto a common range is left to the
/// query that needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    pub raw: String,
    pub value: Result<f64, RatingError>,
}

impl Rating {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let value = parse_numerator(&raw);
        Rating { raw, value }
    }

    /// The parsed numerator, or `None` when the raw value was malformed.
    pub fn value(&self) -> Option<f64> {
        self.value.as_ref().ok().copied()
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_ok()
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_numerator(raw: &str) -> Result<f64, RatingError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RatingError::Empty);
    }
    let (numerator, denominator) = trimmed
        .split_once('/')
        .ok_or_else(|| RatingError::MissingDelimiter(raw.to_string()))?;
    if denominator.trim().is_empty() {
        return Err(RatingError::MissingDelimiter(raw.to_string()));
    }
    numerator
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| RatingError::InvalidNumber(raw.to_string()))
}
