//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Locale-independent license timestamp formatting."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
//! License timestamps are naive wall-clock values rendered as
//! `YYYY-MM-DD HH:mm:ss`. The core never reads the clock itself; callers
//! obtain "now" from a [`Clock`] and pass it in.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Canonical `chrono` format string for payload timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";

/// Render a timestamp in the canonical payload format.
#[must_use]
pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a payload timestamp.
///
/// Accepts `YYYY-MM-DD HH:mm:ss` and a bare `YYYY-MM-DD`, which is read as
/// midnight. Returns `None` for anything else.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_ONLY_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Source of the wall-clock "now" handed to the core.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Clock {
    /// Host local time, matching how issuers historically stamped payloads.
    #[default]
    Local,
    /// Coordinated universal time.
    Utc,
}

impl Clock {
    /// Current naive time according to this clock.
    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        match self {
            Clock::Local => chrono::Local::now().naive_local(),
            Clock::Utc => chrono::Utc::now().naive_utc(),
        }
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clock::Local => write!(f, "local"),
            Clock::Utc => write!(f, "utc"),
        }
    }
}

impl FromStr for Clock {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Clock::Local),
            "utc" => Ok(Clock::Utc),
            other => Err(format!("unknown clock: {}", other)),
        }
    }
}
