//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Final accept/reject decision for a verified license."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{LicenseError, Result};
use crate::fingerprint::{FingerprintSet, HardwareFingerprintMatcher};
use crate::logging::{record_invalid_license, record_license_accepted};
use crate::payload::LicenseData;
use crate::timestamp::parse_timestamp;

/// Outcome of evaluating a verified license on a particular host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidityResult {
    /// Hardware matches and at least one whole day remains before expiry.
    Valid {
        /// Whole days until expiry, always at least 1.
        days_remaining: u64,
    },
    /// Hardware matches but less than one whole day remains.
    Expired {
        /// Whole days since expiry; 0 during the final day and at the boundary.
        days_overdue: u64,
    },
    /// None of the authorized MAC addresses is present on this host.
    HardwareMismatch,
}

impl ValidityResult {
    /// True only for [`ValidityResult::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidityResult::Valid { .. })
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ValidityResult::Valid { .. } => "valid",
            ValidityResult::Expired { .. } => "expired",
            ValidityResult::HardwareMismatch => "hardware_mismatch",
        }
    }
}

impl fmt::Display for ValidityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidityResult::Valid { days_remaining } => {
                write!(f, "license valid, {} day(s) remaining", days_remaining)
            }
            ValidityResult::Expired { days_overdue: 0 } => {
                write!(f, "license expires within a day; contact the issuer to renew")
            }
            ValidityResult::Expired { days_overdue } => write!(
                f,
                "license expired {} day(s) ago; contact the issuer to renew",
                days_overdue
            ),
            ValidityResult::HardwareMismatch => {
                write!(f, "this machine's MAC addresses are not covered by the license")
            }
        }
    }
}

/// Combines hardware matching and expiry into a [`ValidityResult`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LicenseValidityEvaluator {
    matcher: HardwareFingerprintMatcher,
}

impl LicenseValidityEvaluator {
    /// Evaluator with the default matcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `data` is currently valid on a host exposing `observed`.
    ///
    /// Hardware is checked first and gates everything else. The whole-day
    /// difference to `expiryAt` is truncated and only a positive difference
    /// is valid, so the final day and the boundary itself are expired. Fails with
    /// [`LicenseError::MalformedPayload`] only when the hardware matches and
    /// `expiryAt` cannot be parsed.
    pub fn evaluate(
        &self,
        data: &LicenseData,
        observed: &FingerprintSet,
        now: NaiveDateTime,
    ) -> Result<ValidityResult> {
        let authorized = data.license_check_model.authorized();
        if !self.matcher.matches(&authorized, observed) {
            let result = ValidityResult::HardwareMismatch;
            record_invalid_license(result.reason());
            return Ok(result);
        }

        let expiry = parse_timestamp(&data.expiry_at).ok_or_else(|| {
            LicenseError::MalformedPayload(format!(
                "expiryAt '{}' is not a YYYY-MM-DD HH:mm:ss timestamp",
                data.expiry_at
            ))
        })?;

        let diff = (expiry - now).num_days();
        if diff > 0 {
            let days_remaining = diff.unsigned_abs();
            record_license_accepted(data, days_remaining);
            Ok(ValidityResult::Valid { days_remaining })
        } else {
            let result = ValidityResult::Expired {
                days_overdue: diff.unsigned_abs(),
            };
            record_invalid_license(result.reason());
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::LicenseCheckModel;
    use chrono::{Duration, NaiveDate};

    fn license(expiry_at: &str) -> LicenseData {
        LicenseData {
            subject: "waveview".into(),
            issued_at: "2024-01-15 10:00:00".into(),
            expiry_at: expiry_at.into(),
            description: String::new(),
            license_check_model: LicenseCheckModel::new(["80:18:44:e6:28:f4", "80:18:44:e6:d1:74"]),
        }
    }

    fn host(macs: &[&str]) -> FingerprintSet {
        macs.iter().collect()
    }

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn reports_whole_days_remaining() {
        let result = LicenseValidityEvaluator::new()
            .evaluate(
                &license("2025-01-15 10:00:00"),
                &host(&["80:18:44:e6:d1:74"]),
                ts("2025-01-05 09:00:00"),
            )
            .unwrap();
        assert_eq!(result, ValidityResult::Valid { days_remaining: 10 });
        assert!(result.is_valid());
    }

    #[test]
    fn final_partial_day_is_expired() {
        let evaluator = LicenseValidityEvaluator::new();
        let data = license("2025-01-15 10:00:00");
        let macs = host(&["80:18:44:e6:28:f4"]);
        for now in ["2025-01-15 09:00:00", "2025-01-15 09:59:59", "2025-01-14 10:00:01"] {
            assert_eq!(
                evaluator.evaluate(&data, &macs, ts(now)).unwrap(),
                ValidityResult::Expired { days_overdue: 0 },
                "at {now}"
            );
        }
    }

    #[test]
    fn exactly_one_day_left_is_valid() {
        let result = LicenseValidityEvaluator::new()
            .evaluate(
                &license("2025-01-15 10:00:00"),
                &host(&["80:18:44:e6:28:f4"]),
                ts("2025-01-14 10:00:00"),
            )
            .unwrap();
        assert_eq!(result, ValidityResult::Valid { days_remaining: 1 });
    }

    #[test]
    fn exact_boundary_is_expired() {
        let result = LicenseValidityEvaluator::new()
            .evaluate(
                &license("2025-01-15 10:00:00"),
                &host(&["80:18:44:e6:28:f4"]),
                ts("2025-01-15 10:00:00"),
            )
            .unwrap();
        assert_eq!(result, ValidityResult::Expired { days_overdue: 0 });
        assert!(!result.is_valid());
    }

    #[test]
    fn reports_days_overdue() {
        let expiry = ts("2025-01-15 10:00:00");
        let result = LicenseValidityEvaluator::new()
            .evaluate(
                &license("2025-01-15 10:00:00"),
                &host(&["80:18:44:e6:28:f4"]),
                expiry + Duration::days(3) + Duration::hours(5),
            )
            .unwrap();
        assert_eq!(result, ValidityResult::Expired { days_overdue: 3 });
    }

    #[test]
    fn hardware_mismatch_wins_over_remaining_time() {
        let result = LicenseValidityEvaluator::new()
            .evaluate(
                &license("2099-01-01 00:00:00"),
                &host(&["02:42:ac:11:00:02"]),
                ts("2025-01-01 00:00:00"),
            )
            .unwrap();
        assert_eq!(result, ValidityResult::HardwareMismatch);
    }

    #[test]
    fn hardware_mismatch_wins_over_unparseable_expiry() {
        let result = LicenseValidityEvaluator::new()
            .evaluate(&license("whenever"), &host(&[]), ts("2025-01-01 00:00:00"))
            .unwrap();
        assert_eq!(result, ValidityResult::HardwareMismatch);
    }

    #[test]
    fn unparseable_expiry_is_malformed() {
        let err = LicenseValidityEvaluator::new()
            .evaluate(
                &license("whenever"),
                &host(&["80:18:44:e6:28:f4"]),
                ts("2025-01-01 00:00:00"),
            )
            .unwrap_err();
        assert!(matches!(err, LicenseError::MalformedPayload(_)));
    }

    #[test]
    fn date_only_expiry_means_midnight() {
        let evaluator = LicenseValidityEvaluator::new();
        let data = license("2025-01-15");
        let macs = host(&["80-18-44-E6-28-F4"]);
        let day_before = NaiveDate::from_ymd_opt(2025, 1, 13)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        assert_eq!(
            evaluator.evaluate(&data, &macs, day_before).unwrap(),
            ValidityResult::Valid { days_remaining: 1 }
        );
        assert_eq!(
            evaluator
                .evaluate(&data, &macs, day_before + Duration::days(1))
                .unwrap(),
            ValidityResult::Expired { days_overdue: 0 }
        );
    }

    #[test]
    fn messages_distinguish_outcomes() {
        let valid = ValidityResult::Valid { days_remaining: 4 }.to_string();
        let expired = ValidityResult::Expired { days_overdue: 2 }.to_string();
        let mismatch = ValidityResult::HardwareMismatch.to_string();
        assert!(valid.contains("4 day"));
        assert!(expired.contains("expired 2 day"));
        assert!(mismatch.contains("MAC"));
    }

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_value(ValidityResult::Valid { days_remaining: 7 }).unwrap();
        assert_eq!(json, serde_json::json!({"status": "valid", "days_remaining": 7}));
        let json = serde_json::to_value(ValidityResult::HardwareMismatch).unwrap();
        assert_eq!(json, serde_json::json!({"status": "hardware_mismatch"}));
    }
}
