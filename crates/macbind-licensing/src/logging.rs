//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "License issuance and validation telemetry."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use tracing::{info, warn};

use crate::payload::LicenseData;

static LICENSE_ISSUED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("license_issued_total", "Total number of licenses signed")
        .expect("metric registration to succeed")
});

static LICENSE_ACCEPTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "license_accepted_total",
        "Total number of licenses evaluated as valid on this host"
    )
    .expect("metric registration to succeed")
});

static LICENSE_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "license_rejected_total",
        "Total number of licenses rejected, by reason",
        &["reason"]
    )
    .expect("metric registration to succeed")
});

/// Record a successful signing.
pub fn record_license_issued(data: &LicenseData) {
    LICENSE_ISSUED_TOTAL.inc();
    info!(
        subject = %data.subject,
        issued_at = %data.issued_at,
        expiry_at = %data.expiry_at,
        "license signed"
    );
}

/// Record a license accepted on this host.
pub fn record_license_accepted(data: &LicenseData, days_remaining: u64) {
    LICENSE_ACCEPTED_TOTAL.inc();
    info!(
        subject = %data.subject,
        expiry_at = %data.expiry_at,
        days_remaining,
        "license accepted"
    );
}

/// Record a rejected license.
pub fn record_invalid_license(reason: &str) {
    LICENSE_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    warn!(reason = reason, "license rejected");
}

/// Current count of rejections for `reason`.
#[must_use]
pub fn rejected_count(reason: &str) -> u64 {
    LICENSE_REJECTED_TOTAL.with_label_values(&[reason]).get()
}
