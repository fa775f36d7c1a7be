//! Academic year parsing and normalisation.
//!
//! Accepts `YYYY-YYYY` with an optional single space on either side of the dash and
//! either a hyphen or an en dash. The normalised form is always `YYYY-YYYY` with an
//! ASCII hyphen, so `"2025 – 2026"` and `"2025-2026"` compare equal.

use crate::errors::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::LazyLock};

#[allow(clippy::expect_used)]
static YEAR_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4})\s?[-\u{2013}]\s?([0-9]{4})$").expect("invalid academic year pattern")
});

/// A validated, normalised academic year such as `2025-2026`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AcademicYear(String);

impl AcademicYear {
    /// Parses and normalises user input.
    ///
    /// The second year must follow the first directly; `2025-2030` is rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let captures = YEAR_SHAPE
            .captures(trimmed)
            .ok_or_else(|| Error::InvalidAcademicYear {
                input: input.to_string(),
                message: "expected the form YYYY-YYYY".to_string(),
            })?;

        let start: u32 = captures[1].parse().map_err(|_| Error::InvalidAcademicYear {
            input: input.to_string(),
            message: "start year is not a number".to_string(),
        })?;
        let end: u32 = captures[2].parse().map_err(|_| Error::InvalidAcademicYear {
            input: input.to_string(),
            message: "end year is not a number".to_string(),
        })?;

        if end != start + 1 {
            return Err(Error::InvalidAcademicYear {
                input: input.to_string(),
                message: format!("{end} does not directly follow {start}"),
            });
        }

        Ok(Self(format!("{start:04}-{end:04}")))
    }

    /// Normalised text form
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether stored year `year` comes strictly before `other`.
///
/// Values that do not parse are never considered earlier.
#[must_use]
pub fn is_earlier(year: &str, other: &str) -> bool {
    match (AcademicYear::parse(year), AcademicYear::parse(other)) {
        (Ok(year), Ok(other)) => year < other,
        _ => false,
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AcademicYear {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<AcademicYear> for String {
    fn from(value: AcademicYear) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_plain() {
        let year = AcademicYear::parse("2025-2026").unwrap();
        assert_eq!(year.as_str(), "2025-2026");
    }

    #[test]
    fn test_parse_normalises_spacing_and_dash() {
        assert_eq!(AcademicYear::parse("2025 - 2026").unwrap().as_str(), "2025-2026");
        assert_eq!(AcademicYear::parse("  2025-2026 ").unwrap().as_str(), "2025-2026");
        assert_eq!(AcademicYear::parse("2025\u{2013}2026").unwrap().as_str(), "2025-2026");
        assert_eq!(AcademicYear::parse("2025 \u{2013} 2026").unwrap().as_str(), "2025-2026");
        assert_eq!(
            AcademicYear::parse("2025 - 2026").unwrap(),
            AcademicYear::parse("2025-2026").unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for input in [
            "",
            "2025",
            "2025/2026",
            "25-26",
            "2025  -  2026",
            "2025-2026-2027",
            "abcd-efgh",
            "２０２５-２０２６",
        ] {
            assert!(
                matches!(
                    AcademicYear::parse(input),
                    Err(Error::InvalidAcademicYear { .. })
                ),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_is_earlier() {
        assert!(is_earlier("2024-2025", "2025-2026"));
        assert!(is_earlier("1999-2000", "2000-2001"));
        assert!(!is_earlier("2025-2026", "2025-2026"));
        assert!(!is_earlier("2026-2027", "2025-2026"));
        assert!(!is_earlier("garbage", "2025-2026"));
    }

    #[test]
    fn test_parse_rejects_non_consecutive_years() {
        assert!(matches!(
            AcademicYear::parse("2025-2030"),
            Err(Error::InvalidAcademicYear { .. })
        ));
        assert!(matches!(
            AcademicYear::parse("2026-2025"),
            Err(Error::InvalidAcademicYear { .. })
        ));
    }

    #[test]
    fn test_serde_validates() {
        let year: AcademicYear = serde_json::from_str("\"2024 - 2025\"").unwrap();
        assert_eq!(year.as_str(), "2024-2025");
        assert!(serde_json::from_str::<AcademicYear>("\"2024\"").is_err());
    }
}
