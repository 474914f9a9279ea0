//! Datetime canonicalization.
//!
//! Raw datetime strings coming from forms and stored rows may or may not carry a
//! zone designator. [`normalize`] makes every string explicit by appending the
//! configured default offset when none is present, and [`parse_instant`] turns
//! the result into an absolute [`Instant`]. Nothing else in the crate builds an
//! instant from an unqualified string.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::model::Instant;

pub const DEFAULT_OFFSET: &str = "+09:00";

/// Formats tried after RFC 3339. Covers `datetime-local` style input without seconds.
const FALLBACK_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
];

/// A signed `±HH:MM` UTC offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Offset(String);

impl Offset {
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let b = raw.as_bytes();
        if !is_signed_offset(b) {
            return Err(EngineError::InvalidOffset(raw.to_string()));
        }
        let hours = two_digits(b[1], b[2]);
        let minutes = two_digits(b[4], b[5]);
        if hours > 23 || minutes > 59 {
            return Err(EngineError::InvalidOffset(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Offset {
    fn default() -> Self {
        Self(DEFAULT_OFFSET.to_string())
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Offset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Offset {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Offset> for String {
    fn from(offset: Offset) -> Self {
        offset.0
    }
}

fn two_digits(tens: u8, ones: u8) -> u8 {
    (tens - b'0') * 10 + (ones - b'0')
}

/// Shape check only: `[+-]DD:DD`.
fn is_signed_offset(b: &[u8]) -> bool {
    b.len() == 6
        && matches!(b[0], b'+' | b'-')
        && b[1].is_ascii_digit()
        && b[2].is_ascii_digit()
        && b[3] == b':'
        && b[4].is_ascii_digit()
        && b[5].is_ascii_digit()
}

/// True if `raw` ends with `Z`/`z` or with a `±HH:MM` offset.
pub fn has_zone_designator(raw: &str) -> bool {
    let b = raw.as_bytes();
    if matches!(b.last(), Some(b'Z' | b'z')) {
        return true;
    }
    b.len() >= 6 && is_signed_offset(&b[b.len() - 6..])
}

/// Append `default_offset` to `raw` unless it is empty or already zone-qualified.
///
/// No calendar validation happens here; a malformed date only fails later in
/// [`parse_instant`]. Re-normalizing an output is a no-op.
pub fn normalize<'a>(raw: &'a str, default_offset: &Offset) -> Cow<'a, str> {
    if raw.is_empty() || has_zone_designator(raw) {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(format!("{raw}{default_offset}"))
    }
}

/// Parse a normalized datetime string into an absolute instant.
pub fn parse_instant(normalized: &str) -> Result<Instant, EngineError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(normalized) {
        return Ok(dt.with_timezone(&Utc));
    }

    // The fallback formats only understand numeric offsets.
    let zoned = match normalized.as_bytes().last() {
        Some(b'Z' | b'z') => Cow::Owned(format!("{}+00:00", &normalized[..normalized.len() - 1])),
        _ => Cow::Borrowed(normalized),
    };

    FALLBACK_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&zoned, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| EngineError::InvalidRange(format!("unparseable datetime: {normalized:?}")))
}

/// [`normalize`] then [`parse_instant`].
pub fn to_instant(raw: &str, default_offset: &Offset) -> Result<Instant, EngineError> {
    parse_instant(&normalize(raw, default_offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kst() -> Offset {
        Offset::default()
    }

    #[test]
    fn normalize_passes_through_utc_marker() {
        assert_eq!(normalize("2025-09-24T10:00:00Z", &kst()), "2025-09-24T10:00:00Z");
        assert_eq!(normalize("2025-09-24T10:00:00z", &kst()), "2025-09-24T10:00:00z");
    }

    #[test]
    fn normalize_passes_through_explicit_offset() {
        let raw = "2025-09-24T10:00:00+02:00";
        assert!(matches!(normalize(raw, &kst()), Cow::Borrowed(_)));
        assert_eq!(normalize(raw, &kst()), raw);
        assert_eq!(normalize("2025-09-24T10:00:00-05:30", &kst()), "2025-09-24T10:00:00-05:30");
    }

    #[test]
    fn normalize_appends_default_offset() {
        assert_eq!(
            normalize("2025-09-24T10:00:00", &kst()),
            "2025-09-24T10:00:00+09:00"
        );
        let utc = Offset::parse("+00:00").unwrap();
        assert_eq!(normalize("2025-09-24T10:00", &utc), "2025-09-24T10:00+00:00");
    }

    #[test]
    fn normalize_empty_is_unchanged() {
        assert_eq!(normalize("", &kst()), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "2025-09-24T10:00:00",
            "2025-09-24T10:00:00Z",
            "2025-09-24T10:00:00+02:00",
            "2025-09-24",
            "not a date",
            "x",
            "10:00",
        ];
        for offset in ["+09:00", "-03:30", "+00:00"] {
            let o = Offset::parse(offset).unwrap();
            for s in inputs {
                let once = normalize(s, &o).into_owned();
                let twice = normalize(&once, &o).into_owned();
                assert_eq!(once, twice, "input {s:?} offset {offset}");
            }
        }
    }

    #[test]
    fn date_suffix_is_not_mistaken_for_offset() {
        // "-09-24" has the right length but no colon.
        assert!(!has_zone_designator("2025-09-24"));
        assert!(!has_zone_designator("2025-09-24T10:00:00"));
        assert!(has_zone_designator("2025-09-24T10:00:00+09:00"));
    }

    #[test]
    fn offset_parse_rejects_malformed() {
        for bad in ["", "09:00", "+9:00", "+0900", "+24:00", "+09:60", "+09:00 ", "UTC"] {
            assert!(
                matches!(Offset::parse(bad), Err(EngineError::InvalidOffset(_))),
                "{bad:?} should be rejected"
            );
        }
        assert_eq!(Offset::parse("-12:00").unwrap().as_str(), "-12:00");
        assert_eq!(Offset::default().as_str(), DEFAULT_OFFSET);
    }

    #[test]
    fn parse_instant_converts_to_utc() {
        let t = parse_instant("2025-09-24T10:00:00+09:00").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2025, 9, 24, 1, 0, 0).unwrap());

        let z = parse_instant("2025-09-24T01:00:00Z").unwrap();
        assert_eq!(t, z);
    }

    #[test]
    fn parse_instant_accepts_minutes_only_and_space_separator() {
        let expected = Utc.with_ymd_and_hms(2025, 9, 24, 1, 0, 0).unwrap();
        assert_eq!(parse_instant("2025-09-24T10:00+09:00").unwrap(), expected);
        assert_eq!(parse_instant("2025-09-24 10:00:00+09:00").unwrap(), expected);
        assert_eq!(parse_instant("2025-09-24 10:00+09:00").unwrap(), expected);
        assert_eq!(parse_instant("2025-09-24T01:00z").unwrap(), expected);
    }

    #[test]
    fn parse_instant_keeps_fractional_seconds() {
        let t = parse_instant("2025-09-24T10:00:00.250+09:00").unwrap();
        assert_eq!(t.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn parse_instant_rejects_garbage() {
        for bad in ["", "2025-09-24+09:00", "tomorrow+09:00", "2025-13-01T00:00:00+09:00"] {
            assert!(
                matches!(parse_instant(bad), Err(EngineError::InvalidRange(_))),
                "{bad:?} should fail"
            );
        }
    }

    #[test]
    fn to_instant_applies_default_offset() {
        let o = Offset::parse("+02:00").unwrap();
        let t = to_instant("2025-09-24T10:00:00", &o).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2025, 9, 24, 8, 0, 0).unwrap());
    }

    #[test]
    fn offset_serde_validates() {
        let o: Offset = serde_json::from_str("\"-04:00\"").unwrap();
        assert_eq!(o.as_str(), "-04:00");
        assert!(serde_json::from_str::<Offset>("\"bogus\"").is_err());
        assert_eq!(serde_json::to_string(&o).unwrap(), "\"-04:00\"");
    }
}
