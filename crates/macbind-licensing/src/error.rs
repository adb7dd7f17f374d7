//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Error kinds surfaced by the license core."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use thiserror::Error;

/// Result alias for license core operations.
pub type Result<T> = std::result::Result<T, LicenseError>;

/// Failure kinds for issuing, verifying, and evaluating licenses.
///
/// Every variant is terminal for the operation that produced it; none of
/// them are transient.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Relative or absolute expiry specification could not be resolved.
    #[error("invalid date spec: {0}")]
    InvalidDateSpec(String),
    /// A mandatory input was absent or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// Serialized payload does not fit in one RSA block.
    #[error("license payload is {size} bytes but the key allows at most {limit}")]
    PayloadTooLarge {
        /// Encoded payload length in bytes.
        size: usize,
        /// Largest payload the key can carry.
        limit: usize,
    },
    /// Private key could not be loaded or the RSA operation failed.
    #[error("license signing failed: {0}")]
    SigningFailed(String),
    /// Signature was not produced by the supplied public key's private half.
    #[error("license verification failed: {0}")]
    VerificationFailed(String),
    /// Signature recovered cleanly but the payload is not a license.
    #[error("malformed license payload: {0}")]
    MalformedPayload(String),
    /// Opaque license string could not be unwrapped into its transport fields.
    #[error("invalid license string: {0}")]
    InvalidLicenseString(String),
    /// RSA keypair generation or encoding failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    /// Filesystem or process failure in a collaborator (key files, interfaces).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LicenseError {
    /// Short stable label used for telemetry and log fields.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            LicenseError::InvalidDateSpec(_) => "invalid_date_spec",
            LicenseError::MissingField(_) => "missing",
            LicenseError::PayloadTooLarge { .. } => "payload_too_large",
            LicenseError::SigningFailed(_) => "signing_failed",
            LicenseError::VerificationFailed(_) => "invalid_signature",
            LicenseError::MalformedPayload(_) => "malformed",
            LicenseError::InvalidLicenseString(_) => "malformed",
            LicenseError::KeyGeneration(_) => "key_generation",
            LicenseError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_the_field() {
        let err = LicenseError::MissingField("licenseCheckModel");
        assert_eq!(
            err.to_string(),
            "missing required field: licenseCheckModel"
        );
    }

    #[test]
    fn payload_too_large_reports_both_sizes() {
        let err = LicenseError::PayloadTooLarge {
            size: 300,
            limit: 245,
        };
        let msg = err.to_string();
        assert!(msg.contains("300"));
        assert!(msg.contains("245"));
    }

    #[test]
    fn verification_and_payload_failures_have_distinct_reasons() {
        let verify = LicenseError::VerificationFailed("padding".into());
        let payload = LicenseError::MalformedPayload("json".into());
        assert_ne!(verify.reason(), payload.reason());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LicenseError = io.into();
        assert!(err.to_string().contains("I/O error"));
    }
}
