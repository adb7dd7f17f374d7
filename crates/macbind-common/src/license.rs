//! ---
//! macbind_section: "03-runtime-glue"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Client-side license loading and host evaluation."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use std::fmt;
use std::fs;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use macbind_licensing::{
    public_key_fingerprint, FingerprintSet, LicenseData, LicenseError, LicenseValidityEvaluator,
    LicenseVerifier, MacAddressSource, SignedLicense, StaticMacAddresses, SystemInterfaces,
    ValidityResult,
};
use macbind_logging::{lic_debug, log_system_event, LogContext, SystemEventOutcome};
use serde::Serialize;

use crate::config::ClientConfig;

/// Outcome of checking the installed license on this host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseCheck {
    /// Recovered payload.
    pub license: LicenseData,
    /// Decision for this host at the evaluation time.
    pub result: ValidityResult,
    /// SHA-256 fingerprint of the issuer public key.
    pub key_fingerprint: String,
}

/// Decides whether the installed license admits this host.
pub trait LicenseAuthority {
    /// Load and evaluate the installed license at `now`.
    fn check_at(&self, now: NaiveDateTime) -> Result<LicenseCheck>;
}

/// Loads the installed license and evaluates it against the live host.
pub struct LicenseGate {
    config: ClientConfig,
    verifier: LicenseVerifier,
    evaluator: LicenseValidityEvaluator,
    macs: Box<dyn MacAddressSource>,
}

impl fmt::Debug for LicenseGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LicenseGate {
    /// Gate using `mac_override` when configured, live interfaces otherwise.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let macs: Box<dyn MacAddressSource> = match &config.mac_override {
            Some(macs) => Box::new(StaticMacAddresses::new(macs)),
            None => Box::new(SystemInterfaces::new()),
        };
        Self {
            config: config.clone(),
            verifier: LicenseVerifier,
            evaluator: LicenseValidityEvaluator::new(),
            macs,
        }
    }

    /// Replace the MAC address source.
    #[must_use]
    pub fn with_mac_source(mut self, source: impl MacAddressSource + 'static) -> Self {
        self.macs = Box::new(source);
        self
    }

    /// Unwrap, verify, and evaluate an opaque license string.
    pub fn check_license_string(&self, raw: &str, now: NaiveDateTime) -> Result<LicenseCheck> {
        let outcome = self.evaluate(raw, now);
        match &outcome {
            Ok(check) => {
                let ctx = LogContext::new()
                    .with_subject(&check.license.subject)
                    .with_operation("check")
                    .with_key_fingerprint(&check.key_fingerprint);
                let result = if check.result.is_valid() {
                    SystemEventOutcome::Success
                } else {
                    SystemEventOutcome::Fault
                };
                log_system_event(Some(&ctx), "license.check", &check.result.to_string(), result);
            }
            Err(err) => {
                let ctx = LogContext::new().with_operation("check");
                log_system_event(
                    Some(&ctx),
                    "license.check",
                    &format!("{err:#}"),
                    SystemEventOutcome::Fault,
                );
            }
        }
        outcome
    }

    fn evaluate(&self, raw: &str, now: NaiveDateTime) -> Result<LicenseCheck> {
        let signed = SignedLicense::from_license_string(raw)
            .context("installed license could not be unwrapped")?;
        let license = signed
            .verify(&self.verifier)
            .context("installed license failed verification")?;
        let key_fingerprint = public_key_fingerprint(&signed.public_key)?;
        let observed: FingerprintSet = self
            .macs
            .active_mac_addresses()
            .context("unable to enumerate host MAC addresses")?;
        let ctx = LogContext::new()
            .with_subject(&license.subject)
            .with_operation("check")
            .with_key_fingerprint(&key_fingerprint);
        lic_debug!(context = ctx, "evaluating license against host [{}]", observed);
        let result = self.evaluator.evaluate(&license, &observed, now)?;
        Ok(LicenseCheck {
            license,
            result,
            key_fingerprint,
        })
    }

    /// Read the license string from `license_path`, then from `env_var`.
    pub fn load_material(&self) -> Result<String> {
        if let Some(path) = &self.config.license_path {
            if path.exists() {
                lic_debug!("loading license file {}", path.display());
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("unable to read license file {}", path.display()))?;
                return Ok(raw.trim().to_owned());
            }
        }

        match std::env::var(&self.config.env_var) {
            Ok(value) if !value.trim().is_empty() => {
                lic_debug!("loaded license material from ${}", self.config.env_var);
                Ok(value.trim().to_owned())
            }
            _ => Err(anyhow::Error::new(LicenseError::MissingField("license")).context(format!(
                "no license found in {} or ${}",
                self.config
                    .license_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<no license_path>".to_owned()),
                self.config.env_var
            ))),
        }
    }
}

impl LicenseAuthority for LicenseGate {
    fn check_at(&self, now: NaiveDateTime) -> Result<LicenseCheck> {
        let material = self.load_material()?;
        self.check_license_string(&material, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macbind_licensing::timestamp::parse_timestamp;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const ISSUER_PUBLIC: &str =
        include_str!("../../macbind-licensing/testdata/issuer_public.pem");
    const OPENSSL_SIGNATURE: &str =
        include_str!("../../macbind-licensing/testdata/openssl_signature.b64");

    fn license_string() -> String {
        SignedLicense::new(ISSUER_PUBLIC, OPENSSL_SIGNATURE.trim())
            .to_license_string()
            .unwrap()
    }

    fn client(env_var: &str) -> ClientConfig {
        ClientConfig {
            env_var: env_var.to_owned(),
            mac_override: Some(vec!["80-18-44-E6-D1-74".to_owned()]),
            ..ClientConfig::default()
        }
    }

    fn at(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn mac_override_accepts_matching_host() {
        let gate = LicenseGate::new(&client("MACBIND_TEST_UNUSED_A"));
        let check = gate
            .check_license_string(&license_string(), at("2024-04-05 10:00:00"))
            .unwrap();
        assert_eq!(check.result, ValidityResult::Valid { days_remaining: 10 });
        assert_eq!(check.license.subject, "ht");
        assert_eq!(check.key_fingerprint.len(), 64);
    }

    #[test]
    fn foreign_host_is_a_mismatch() {
        let gate = LicenseGate::new(&client("MACBIND_TEST_UNUSED_B"))
            .with_mac_source(StaticMacAddresses::new(["02:42:ac:11:00:02"]));
        let check = gate
            .check_license_string(&license_string(), at("2024-02-01 00:00:00"))
            .unwrap();
        assert_eq!(check.result, ValidityResult::HardwareMismatch);
    }

    #[test]
    fn reads_license_file_before_environment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("license.txt");
        fs::write(&path, format!("{}\n", license_string())).unwrap();
        let config = ClientConfig {
            license_path: Some(path),
            ..client("MACBIND_TEST_FILE_FIRST")
        };
        std::env::set_var("MACBIND_TEST_FILE_FIRST", "not-a-license");
        let check = LicenseGate::new(&config)
            .check_at(at("2024-04-16 10:00:00"))
            .unwrap();
        assert_eq!(check.result, ValidityResult::Expired { days_overdue: 1 });
    }

    #[test]
    fn falls_back_to_environment() {
        std::env::set_var("MACBIND_TEST_ENV_FALLBACK", license_string());
        let config = ClientConfig {
            license_path: Some(PathBuf::from("/nonexistent/macbind/license")),
            ..client("MACBIND_TEST_ENV_FALLBACK")
        };
        let check = LicenseGate::new(&config)
            .check_at(at("2024-01-20 00:00:00"))
            .unwrap();
        assert!(check.result.is_valid());
    }

    #[test]
    fn missing_material_keeps_core_error() {
        let gate = LicenseGate::new(&client("MACBIND_TEST_NEVER_SET"));
        let err = gate.check_at(at("2024-01-20 00:00:00")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LicenseError>(),
            Some(LicenseError::MissingField("license"))
        ));
    }

    #[test]
    fn garbage_license_string_is_reported() {
        let gate = LicenseGate::new(&client("MACBIND_TEST_UNUSED_C"));
        let err = gate
            .check_license_string("@@@", at("2024-01-20 00:00:00"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LicenseError>(),
            Some(LicenseError::InvalidLicenseString(_))
        ));
    }

    #[test]
    fn gate_is_usable_as_authority() {
        std::env::set_var("MACBIND_TEST_AUTHORITY", license_string());
        let gate = LicenseGate::new(&client("MACBIND_TEST_AUTHORITY"));
        let authority: &dyn LicenseAuthority = &gate;
        let check = authority.check_at(at("2024-04-15 09:00:00")).unwrap();
        assert_eq!(check.result, ValidityResult::Expired { days_overdue: 0 });
    }
}
