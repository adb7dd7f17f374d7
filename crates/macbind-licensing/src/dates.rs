//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Expiry date specifications and calendar arithmetic."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{LicenseError, Result};
use crate::timestamp::{format_timestamp, parse_timestamp};

/// Calendar unit of a relative expiry offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateUnit {
    /// Exact multiples of 24 hours.
    Days,
    /// Exact multiples of 7 days.
    Weeks,
    /// Calendar months, clamped to the last day of the target month.
    Months,
    /// Twelve calendar months.
    Years,
}

impl DateUnit {
    /// Stable lower-case identifier used on the wire and the CLI.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DateUnit::Days => "days",
            DateUnit::Weeks => "weeks",
            DateUnit::Months => "months",
            DateUnit::Years => "years",
        }
    }

    /// Shift `now` by `value` units.
    ///
    /// Month and year steps keep the day of month when it exists in the
    /// target month and otherwise clamp to that month's last day, so
    /// `2024-01-31 + 1 month` is `2024-02-29`.
    pub fn offset(self, now: NaiveDateTime, value: i64) -> Result<NaiveDateTime> {
        let shifted = match self {
            DateUnit::Days => Duration::try_days(value).and_then(|d| now.checked_add_signed(d)),
            DateUnit::Weeks => Duration::try_weeks(value).and_then(|d| now.checked_add_signed(d)),
            DateUnit::Months => add_months(now, value),
            DateUnit::Years => value.checked_mul(12).and_then(|m| add_months(now, m)),
        };
        shifted.ok_or_else(|| {
            LicenseError::InvalidDateSpec(format!(
                "{} {} from {} is out of range",
                value,
                self.as_str(),
                format_timestamp(now)
            ))
        })
    }
}

fn add_months(now: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        now.checked_add_months(Months::new(magnitude))
    } else {
        now.checked_sub_months(Months::new(magnitude))
    }
}

impl fmt::Display for DateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateUnit {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "days" => Ok(DateUnit::Days),
            "weeks" => Ok(DateUnit::Weeks),
            "months" => Ok(DateUnit::Months),
            "years" => Ok(DateUnit::Years),
            other => Err(LicenseError::InvalidDateSpec(format!(
                "unit must be one of days, weeks, months, years; got '{}'",
                other
            ))),
        }
    }
}

/// Expiry specification supplied by an issuer.
///
/// On the wire this is either a bare timestamp string or an object
/// `{"value": <integer>, "unit": "days" | "weeks" | "months" | "years"}`.
/// Anything else fails to deserialize with [`LicenseError::InvalidDateSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateSpec", into = "RawDateSpec")]
pub enum DateSpec {
    /// Expiry timestamp copied verbatim into the payload.
    Absolute(String),
    /// Offset from the signing time.
    Relative {
        /// Number of units, may be negative.
        value: i64,
        /// Calendar unit of `value`.
        unit: DateUnit,
    },
}

impl DateSpec {
    /// Absolute expiry, kept exactly as written.
    pub fn absolute(expiry: impl Into<String>) -> Self {
        DateSpec::Absolute(expiry.into())
    }

    /// Relative expiry of `value` units after signing.
    #[must_use]
    pub fn relative(value: i64, unit: DateUnit) -> Self {
        DateSpec::Relative { value, unit }
    }

    /// Resolve the payload `expiryAt` string for a license signed at `now`.
    ///
    /// Absolute values are only checked for parseability and returned
    /// unchanged; relative values are added to `now` and formatted.
    pub fn resolve(&self, now: NaiveDateTime) -> Result<String> {
        match self {
            DateSpec::Absolute(raw) => {
                if parse_timestamp(raw).is_none() {
                    return Err(LicenseError::InvalidDateSpec(format!(
                        "'{}' is not a YYYY-MM-DD HH:mm:ss timestamp",
                        raw
                    )));
                }
                Ok(raw.clone())
            }
            DateSpec::Relative { value, unit } => {
                unit.offset(now, *value).map(format_timestamp)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDateSpec {
    Absolute(String),
    Relative {
        value: serde_json::Value,
        unit: serde_json::Value,
    },
}

impl TryFrom<RawDateSpec> for DateSpec {
    type Error = LicenseError;

    fn try_from(raw: RawDateSpec) -> Result<Self> {
        match raw {
            RawDateSpec::Absolute(value) => Ok(DateSpec::Absolute(value)),
            RawDateSpec::Relative { value, unit } => {
                let value = value.as_i64().ok_or_else(|| {
                    LicenseError::InvalidDateSpec(format!(
                        "value must be an integer; got {}",
                        value
                    ))
                })?;
                let unit = unit.as_str().ok_or_else(|| {
                    LicenseError::InvalidDateSpec(format!("unit must be a string; got {}", unit))
                })?;
                Ok(DateSpec::Relative {
                    value,
                    unit: unit.parse()?,
                })
            }
        }
    }
}

impl From<DateSpec> for RawDateSpec {
    fn from(spec: DateSpec) -> Self {
        match spec {
            DateSpec::Absolute(value) => RawDateSpec::Absolute(value),
            DateSpec::Relative { value, unit } => RawDateSpec::Relative {
                value: value.into(),
                unit: unit.as_str().into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn one_year_keeps_day_and_month() {
        let spec = DateSpec::relative(1, DateUnit::Years);
        assert_eq!(
            spec.resolve(midnight(2024, 1, 15)).unwrap(),
            "2025-01-15 00:00:00"
        );
    }

    #[test]
    fn months_clamp_to_end_of_month() {
        let spec = DateSpec::relative(3, DateUnit::Months);
        assert_eq!(
            spec.resolve(midnight(2024, 1, 31)).unwrap(),
            "2024-04-30 00:00:00"
        );
        let leap = DateSpec::relative(1, DateUnit::Months);
        assert_eq!(
            leap.resolve(midnight(2024, 1, 31)).unwrap(),
            "2024-02-29 00:00:00"
        );
    }

    #[test]
    fn leap_day_plus_one_year_clamps() {
        let spec = DateSpec::relative(1, DateUnit::Years);
        assert_eq!(
            spec.resolve(midnight(2024, 2, 29)).unwrap(),
            "2025-02-28 00:00:00"
        );
    }

    #[test]
    fn days_and_weeks_are_exact() {
        let now = NaiveDate::from_ymd_opt(2024, 12, 30)
            .unwrap()
            .and_hms_opt(13, 45, 10)
            .unwrap();
        assert_eq!(
            DateSpec::relative(3, DateUnit::Days).resolve(now).unwrap(),
            "2025-01-02 13:45:10"
        );
        assert_eq!(
            DateSpec::relative(2, DateUnit::Weeks).resolve(now).unwrap(),
            "2025-01-13 13:45:10"
        );
    }

    #[test]
    fn negative_values_move_backwards() {
        let spec = DateSpec::relative(-1, DateUnit::Months);
        assert_eq!(
            spec.resolve(midnight(2024, 3, 31)).unwrap(),
            "2024-02-29 00:00:00"
        );
    }

    #[test]
    fn absolute_is_returned_verbatim() {
        let spec = DateSpec::absolute("2030-06-01 12:00:00");
        assert_eq!(
            spec.resolve(midnight(2024, 1, 1)).unwrap(),
            "2030-06-01 12:00:00"
        );
        let date_only = DateSpec::absolute("2030-06-01");
        assert_eq!(date_only.resolve(midnight(2024, 1, 1)).unwrap(), "2030-06-01");
    }

    #[test]
    fn unparseable_absolute_is_rejected() {
        let err = DateSpec::absolute("next tuesday")
            .resolve(midnight(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, LicenseError::InvalidDateSpec(_)));
    }

    #[test]
    fn overflowing_offset_is_rejected() {
        let err = DateSpec::relative(i64::MAX, DateUnit::Years)
            .resolve(midnight(2024, 1, 1))
            .unwrap_err();
        assert!(matches!(err, LicenseError::InvalidDateSpec(_)));
    }

    #[test]
    fn deserializes_both_shapes() {
        let rel: DateSpec = serde_json::from_str(r#"{"value":3,"unit":"months"}"#).unwrap();
        assert_eq!(rel, DateSpec::relative(3, DateUnit::Months));
        let abs: DateSpec = serde_json::from_str(r#""2030-01-01 00:00:00""#).unwrap();
        assert_eq!(abs, DateSpec::absolute("2030-01-01 00:00:00"));
    }

    #[test]
    fn rejects_unknown_units_and_fractional_values() {
        assert!(serde_json::from_str::<DateSpec>(r#"{"value":1,"unit":"fortnights"}"#).is_err());
        assert!(serde_json::from_str::<DateSpec>(r#"{"value":1.5,"unit":"days"}"#).is_err());
        assert!(serde_json::from_str::<DateSpec>(r#"{"value":"months","unit":"3"}"#).is_err());
        assert!("Days".parse::<DateUnit>().is_err());
    }

    #[test]
    fn serializes_relative_as_value_and_unit() {
        let json = serde_json::to_value(DateSpec::relative(2, DateUnit::Weeks)).unwrap();
        assert_eq!(json, serde_json::json!({"value": 2, "unit": "weeks"}));
    }
}
