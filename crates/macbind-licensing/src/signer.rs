//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Issuer-side payload construction and RSA signing."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
//! Signing applies the RSA private-key operation to the payload itself with
//! PKCS#1 v1.5 type 1 padding and no digest prefix (the primitive OpenSSL
//! exposes as `RSA_private_encrypt`). Whoever holds the public key recovers
//! the payload from the signature; nothing else travels with it, so the
//! payload must fit in one RSA block.

use base64::{engine::general_purpose, Engine as _};
use chrono::NaiveDateTime;
use pkcs8::DecodePrivateKey;
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use tracing::debug;

use crate::error::{LicenseError, Result};
use crate::logging::record_license_issued;
use crate::payload::{encode, LicenseData, LicenseOptions};
use crate::timestamp::format_timestamp;

/// Subject written into payloads whose options leave it unset.
pub const DEFAULT_SUBJECT: &str = "license-node";

/// Bytes of PKCS#1 v1.5 padding overhead in every RSA block.
pub const PKCS1_V15_OVERHEAD: usize = 11;

/// Issuer-wide values applied when license options omit them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerDefaults {
    /// Subject used when the options carry none.
    pub subject: String,
}

impl Default for IssuerDefaults {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_owned(),
        }
    }
}

/// Largest payload a key of `modulus_bytes` can sign.
#[must_use]
pub fn max_payload_len(modulus_bytes: usize) -> usize {
    modulus_bytes.saturating_sub(PKCS1_V15_OVERHEAD)
}

/// Builds license payloads and signs them with an issuer's private key.
#[derive(Debug, Clone, Default)]
pub struct LicenseSigner {
    defaults: IssuerDefaults,
}

impl LicenseSigner {
    /// Signer applying the given issuer defaults.
    #[must_use]
    pub fn new(defaults: IssuerDefaults) -> Self {
        Self { defaults }
    }

    /// Issuer defaults in effect.
    #[must_use]
    pub fn defaults(&self) -> &IssuerDefaults {
        &self.defaults
    }

    /// Build the payload that [`LicenseSigner::sign`] would sign at `now`.
    pub fn build_payload(&self, options: &LicenseOptions, now: NaiveDateTime) -> Result<LicenseData> {
        let (date, model) = options.validate()?;
        let subject = options
            .subject
            .as_deref()
            .filter(|subject| !subject.is_empty())
            .unwrap_or(&self.defaults.subject)
            .to_owned();
        Ok(LicenseData {
            subject,
            issued_at: format_timestamp(now),
            expiry_at: date.resolve(now)?,
            description: options.description.clone().unwrap_or_default(),
            license_check_model: model.clone(),
        })
    }

    /// Build, encode, and sign a license; returns the base64 signature.
    ///
    /// `passphrase` decrypts the PKCS#8 encrypted private key.
    pub fn sign(
        &self,
        options: &LicenseOptions,
        private_key_pem: &str,
        passphrase: &str,
        now: NaiveDateTime,
    ) -> Result<String> {
        options.validate()?;
        if private_key_pem.trim().is_empty() {
            return Err(LicenseError::MissingField("privateKey"));
        }
        if passphrase.is_empty() {
            return Err(LicenseError::MissingField("passphrase"));
        }

        let data = self.build_payload(options, now)?;
        let key = load_private_key(private_key_pem, passphrase)?;
        let signature = sign_payload(&data, &key)?;

        record_license_issued(&data);
        Ok(general_purpose::STANDARD.encode(signature))
    }
}

/// Decrypt an encrypted PKCS#8 PEM private key.
pub fn load_private_key(private_key_pem: &str, passphrase: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_encrypted_pem(private_key_pem.trim(), passphrase.as_bytes())
        .map_err(|err| LicenseError::SigningFailed(format!("unable to decrypt private key: {err}")))
}

/// Encode `data` and apply the private-key operation to it.
pub fn sign_payload(data: &LicenseData, key: &RsaPrivateKey) -> Result<Vec<u8>> {
    let bytes = encode(data)?;
    let limit = max_payload_len(key.size());
    debug!(
        payload_bytes = bytes.len(),
        limit,
        modulus_bits = key.size() * 8,
        "signing license payload"
    );
    if bytes.len() > limit {
        return Err(LicenseError::PayloadTooLarge {
            size: bytes.len(),
            limit,
        });
    }
    key.sign_with_rng(&mut OsRng, Pkcs1v15Sign::new_unprefixed(), &bytes)
        .map_err(|err| LicenseError::SigningFailed(err.to_string()))
}
