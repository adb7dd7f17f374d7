//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Opaque license string shipped from issuer to client."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{LicenseError, Result};
use crate::payload::LicenseData;
use crate::verifier::LicenseVerifier;

/// Public key and signature travelling together to the client.
///
/// Serialized as `{"publicKey": "<PEM>", "signature": "<base64>"}`; the
/// older `"sign"` field name is accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedLicense {
    /// Issuer public key, SPKI PEM.
    pub public_key: String,
    /// Base64 signature produced by the signer.
    #[serde(alias = "sign")]
    pub signature: String,
}

impl SignedLicense {
    /// Pair a public key with a signature.
    pub fn new(public_key: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            signature: signature.into(),
        }
    }

    /// Wrap as base64(JSON) for distribution as a single string.
    pub fn to_license_string(&self) -> Result<String> {
        let json = serde_json::to_vec(self).map_err(|err| {
            LicenseError::InvalidLicenseString(format!("failed to serialise license: {err}"))
        })?;
        Ok(general_purpose::STANDARD.encode(json))
    }

    /// Unwrap a string produced by [`SignedLicense::to_license_string`].
    pub fn from_license_string(raw: &str) -> Result<Self> {
        let compact: String = raw.split_whitespace().collect();
        if compact.is_empty() {
            return Err(LicenseError::MissingField("license"));
        }
        let bytes = general_purpose::STANDARD.decode(compact).map_err(|err| {
            LicenseError::InvalidLicenseString(format!("license must be base64 encoded: {err}"))
        })?;
        serde_json::from_slice(&bytes).map_err(|err| {
            LicenseError::InvalidLicenseString(format!(
                "license must decode into a publicKey/signature document: {err}"
            ))
        })
    }

    /// Raw signature bytes.
    pub fn signature_bytes(&self) -> Result<Vec<u8>> {
        general_purpose::STANDARD
            .decode(self.signature.trim())
            .map_err(|err| {
                LicenseError::VerificationFailed(format!("signature must be base64 encoded: {err}"))
            })
    }

    /// Verify with the embedded public key and return the payload.
    pub fn verify(&self, verifier: &LicenseVerifier) -> Result<LicenseData> {
        verifier.verify(&self.public_key, &self.signature_bytes()?)
    }
}
