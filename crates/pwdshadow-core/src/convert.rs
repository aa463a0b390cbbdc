//! Typed conversion of raw attribute values into integers.
//!
//! All time-like values end up as a day count (days since 1970-01-01 UTC).
//! Conversion checks the attribute's declared syntax before parsing, so a
//! schema mismatch is reported as [`ConvertError::Syntax`] even when the
//! text itself would parse.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeType, Syntax};
use crate::errors::ConvertError;

/// Seconds in one day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// How a raw attribute value is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Presence test: 1 for a non-empty value, 0 otherwise.
    Exists,
    /// `TRUE` (any case) is 1, anything else 0.
    Boolean,
    /// Generalized time, reduced to a day count.
    Time,
    /// Integer seconds, reduced to whole days.
    Seconds,
    /// Integer day count, used as-is.
    Days,
    /// Opaque integer, used as-is.
    Integer,
}

impl ValueKind {
    /// Lowercase name used in logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::Boolean => "boolean",
            Self::Time => "time",
            Self::Seconds => "seconds",
            Self::Days => "days",
            Self::Integer => "integer",
        }
    }

    /// Whether an attribute of `syntax` can hold values of this kind.
    pub fn accepts(self, syntax: Syntax) -> bool {
        match self {
            Self::Exists => true,
            Self::Boolean => syntax == Syntax::Boolean,
            Self::Time => syntax == Syntax::GeneralizedTime,
            Self::Seconds | Self::Days | Self::Integer => syntax == Syntax::Integer,
        }
    }

    fn expected_syntax(self) -> &'static str {
        match self {
            Self::Exists => "any syntax",
            Self::Boolean => Syntax::Boolean.description(),
            Self::Time => Syntax::GeneralizedTime.description(),
            Self::Seconds | Self::Days | Self::Integer => Syntax::Integer.description(),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a raw value of `attribute` according to `kind`.
pub fn convert(attribute: &AttributeType, kind: ValueKind, raw: &str) -> Result<i64, ConvertError> {
    if !kind.accepts(attribute.syntax) {
        return Err(ConvertError::Syntax {
            attribute: attribute.name.clone(),
            kind,
            expected: kind.expected_syntax(),
            actual: attribute.syntax,
        });
    }

    let parse_error = || ConvertError::Parse {
        attribute: attribute.name.clone(),
        kind,
        value: raw.to_owned(),
    };

    match kind {
        ValueKind::Exists => Ok(i64::from(!raw.is_empty())),
        ValueKind::Boolean => Ok(i64::from(raw.eq_ignore_ascii_case("TRUE"))),
        ValueKind::Time => parse_generalized_time(raw)
            .map(|secs| secs / SECONDS_PER_DAY)
            .ok_or_else(parse_error),
        ValueKind::Seconds => parse_integer(raw)
            .map(|secs| secs / SECONDS_PER_DAY)
            .ok_or_else(parse_error),
        ValueKind::Days | ValueKind::Integer => parse_integer(raw).ok_or_else(parse_error),
    }
}

/// Parse decimal integer text with an optional sign.
pub fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

/// Parse generalized time into epoch seconds (UTC).
///
/// Grammar: `YYYYMMDDHH[MM[SS]][(.|,)fraction](Z|(+|-)HH[MM])`. Fractions
/// are discarded.
pub fn parse_generalized_time(raw: &str) -> Option<i64> {
    let digits_end = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let digits = &raw[..digits_end];
    if !matches!(digits.len(), 10 | 12 | 14) {
        return None;
    }

    let field = |range: std::ops::Range<usize>| digits.get(range)?.parse::<u32>().ok();
    let year = i32::try_from(field(0..4)?).ok()?;
    let month = field(4..6)?;
    let day = field(6..8)?;
    let hour = field(8..10)?;
    let minute = if digits.len() >= 12 { field(10..12)? } else { 0 };
    let second = if digits.len() == 14 { field(12..14)? } else { 0 };

    let mut rest = &raw[digits_end..];
    if let Some(frac) = rest.strip_prefix(['.', ',']) {
        let len = frac.find(|c: char| !c.is_ascii_digit()).unwrap_or(frac.len());
        if len == 0 {
            return None;
        }
        rest = &frac[len..];
    }

    let offset = parse_offset(rest)?;
    let local = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    Some(local.and_utc().timestamp() - offset)
}

/// Parse the zone suffix into an offset east of UTC, in seconds.
fn parse_offset(zone: &str) -> Option<i64> {
    if zone == "Z" {
        return Some(0);
    }
    let (sign, hhmm) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    if !matches!(hhmm.len(), 2 | 4) || !hhmm.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i64 = hhmm[..2].parse().ok()?;
    let minutes: i64 = if hhmm.len() == 4 { hhmm[2..].parse().ok()? } else { 0 };
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
