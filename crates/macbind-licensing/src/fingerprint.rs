//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "MAC address normalization and hardware fingerprint matching."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// All-zero hardware address reported by virtual or unconfigured interfaces.
pub const ZERO_MAC: &str = "00:00:00:00:00:00";

/// Normalize a MAC address for comparison.
///
/// Trims whitespace, lower-cases, and maps `-` and `.` separators to `:`.
/// A value carrying exactly twelve hex digits is re-rendered as
/// `aa:bb:cc:dd:ee:ff` regardless of its original grouping, so
/// `F0-18-98-32-4E-E5`, `f018.9832.4ee5` and `f0:18:98:32:4e:e5` compare equal.
#[must_use]
pub fn normalize_mac(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    let digits: String = lowered
        .chars()
        .filter(|ch| !matches!(ch, ':' | '-' | '.'))
        .collect();
    if digits.len() == 12 && digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        let octets: Vec<&str> = (0..6).map(|i| &digits[i * 2..i * 2 + 2]).collect();
        return octets.join(":");
    }
    lowered.replace(['-', '.'], ":")
}

/// Deduplicated, order-irrelevant set of normalized MAC addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FingerprintSet {
    inner: BTreeSet<String>,
}

impl FingerprintSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address after normalization. Blank values are ignored.
    pub fn insert(&mut self, mac: &str) -> bool {
        let normalized = normalize_mac(mac);
        if normalized.is_empty() {
            return false;
        }
        self.inner.insert(normalized)
    }

    /// True when the normalized form of `mac` is present.
    #[must_use]
    pub fn contains(&self, mac: &str) -> bool {
        self.inner.contains(&normalize_mac(mac))
    }

    /// Number of distinct addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no address is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(String::as_str)
    }

    /// True when at least one address appears in both sets.
    #[must_use]
    pub fn intersects(&self, other: &FingerprintSet) -> bool {
        self.inner.intersection(&other.inner).next().is_some()
    }
}

impl<S: AsRef<str>> FromIterator<S> for FingerprintSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = FingerprintSet::new();
        for mac in iter {
            set.insert(mac.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for FingerprintSet {
    fn from(value: Vec<String>) -> Self {
        value.into_iter().collect()
    }
}

impl From<FingerprintSet> for Vec<String> {
    fn from(value: FingerprintSet) -> Self {
        value.inner.into_iter().collect()
    }
}

impl fmt::Display for FingerprintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.iter().collect::<Vec<_>>().join(", ");
        write!(f, "[{}]", joined)
    }
}

/// Decides whether a license's authorized hardware is present on this host.
///
/// The match is an OR: one authorized address among the observed ones is
/// enough. Both sides are normalized before comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareFingerprintMatcher;

impl HardwareFingerprintMatcher {
    /// True iff `authorized` and `observed` share at least one address.
    #[must_use]
    pub fn matches(&self, authorized: &FingerprintSet, observed: &FingerprintSet) -> bool {
        authorized.intersects(observed)
    }
}
