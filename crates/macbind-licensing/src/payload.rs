//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "License payload model and its canonical byte encoding."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
//! The signed payload is compact UTF-8 JSON with a fixed field order:
//! `subject`, `issuedAt`, `expiryAt`, `description`, `licenseCheckModel`.
//! Timestamps travel as pre-formatted strings so the encoding never depends
//! on a date library's native representation.

use serde::{Deserialize, Serialize};

use crate::dates::DateSpec;
use crate::error::{LicenseError, Result};
use crate::fingerprint::FingerprintSet;

/// Hardware constraints a license is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseCheckModel {
    /// Authorized MAC addresses, kept in issuer order and spelling.
    pub mac_address: Vec<String>,
}

impl LicenseCheckModel {
    /// Bind to the given MAC addresses.
    pub fn new<I, S>(macs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mac_address: macs.into_iter().map(Into::into).collect(),
        }
    }

    /// Normalized set of authorized addresses.
    #[must_use]
    pub fn authorized(&self) -> FingerprintSet {
        self.mac_address.iter().collect()
    }
}

/// Issuer input for a new license.
///
/// Mirrors the JSON options document accepted by the CLI; `date` and
/// `licenseCheckModel` are optional here only so that their absence can be
/// reported as [`LicenseError::MissingField`] by [`LicenseOptions::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseOptions {
    /// Subject of the license; the issuer default applies when absent.
    #[serde(default)]
    pub subject: Option<String>,
    /// Expiry specification.
    #[serde(default)]
    pub date: Option<DateSpec>,
    /// Free-form description; empty when absent.
    #[serde(default)]
    pub description: Option<String>,
    /// Hardware binding.
    #[serde(default)]
    pub license_check_model: Option<LicenseCheckModel>,
}

impl LicenseOptions {
    /// Options carrying the two mandatory fields.
    #[must_use]
    pub fn new(date: DateSpec, license_check_model: LicenseCheckModel) -> Self {
        Self {
            subject: None,
            date: Some(date),
            description: None,
            license_check_model: Some(license_check_model),
        }
    }

    /// Set the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check that every mandatory field is present and usable.
    pub fn validate(&self) -> Result<(&DateSpec, &LicenseCheckModel)> {
        let date = self.date.as_ref().ok_or(LicenseError::MissingField("date"))?;
        let model = self
            .license_check_model
            .as_ref()
            .ok_or(LicenseError::MissingField("licenseCheckModel"))?;
        if model.mac_address.iter().all(|mac| mac.trim().is_empty()) {
            return Err(LicenseError::MissingField("licenseCheckModel.macAddress"));
        }
        Ok((date, model))
    }
}

/// Canonical signed payload.
///
/// Built once by the signer and never mutated afterwards; `expiry_at` is
/// frozen at signing time and never recomputed by verifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseData {
    /// License subject.
    pub subject: String,
    /// Signing time, `YYYY-MM-DD HH:mm:ss`.
    pub issued_at: String,
    /// Expiry time, `YYYY-MM-DD HH:mm:ss` (or a verbatim absolute value).
    pub expiry_at: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Hardware binding.
    pub license_check_model: LicenseCheckModel,
}

/// Encode a payload into its canonical bytes.
pub fn encode(data: &LicenseData) -> Result<Vec<u8>> {
    serde_json::to_vec(data).map_err(|err| {
        LicenseError::MalformedPayload(format!("failed to serialise license payload: {err}"))
    })
}

/// Decode canonical bytes back into a payload.
///
/// Fails with [`LicenseError::MalformedPayload`] on invalid UTF-8, invalid
/// JSON, or a missing required field.
pub fn decode(bytes: &[u8]) -> Result<LicenseData> {
    serde_json::from_slice(bytes).map_err(|err| {
        LicenseError::MalformedPayload(format!("license payload is not valid JSON: {err}"))
    })
}
