//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Client-side payload recovery from RSA signatures."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use pkcs8::DecodePublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use tracing::debug;

use crate::error::{LicenseError, Result};
use crate::logging::record_invalid_license;
use crate::payload::{decode, LicenseData};
use crate::signer::PKCS1_V15_OVERHEAD;

/// Minimum run of `0xff` padding bytes in a type 1 block.
const MIN_PADDING_LEN: usize = 8;

/// Recovers license payloads with an issuer's public key.
///
/// A recovery failure (wrong key, corrupted signature, bad padding) is
/// [`LicenseError::VerificationFailed`]; a clean recovery that does not
/// decode as a license is [`LicenseError::MalformedPayload`]. No semantic
/// checks happen here; dates and hardware are judged by the evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LicenseVerifier;

impl LicenseVerifier {
    /// Recover and decode the payload carried by `signature`.
    pub fn verify(&self, public_key_pem: &str, signature: &[u8]) -> Result<LicenseData> {
        let plaintext = match self.recover(public_key_pem, signature) {
            Ok(bytes) => bytes,
            Err(err) => {
                record_invalid_license(err.reason());
                return Err(err);
            }
        };
        decode(&plaintext).map_err(|err| {
            record_invalid_license(err.reason());
            err
        })
    }

    /// Apply the public-key operation and strip PKCS#1 v1.5 type 1 padding.
    pub fn recover(&self, public_key_pem: &str, signature: &[u8]) -> Result<Vec<u8>> {
        if public_key_pem.trim().is_empty() {
            return Err(LicenseError::MissingField("publicKey"));
        }
        if signature.is_empty() {
            return Err(LicenseError::MissingField("signature"));
        }

        let key = load_public_key(public_key_pem)?;
        let size = key.size();
        if signature.len() != size {
            return Err(LicenseError::VerificationFailed(format!(
                "signature is {} bytes but the key modulus is {} bytes",
                signature.len(),
                size
            )));
        }

        let s = BigUint::from_bytes_be(signature);
        if &s >= key.n() {
            return Err(LicenseError::VerificationFailed(
                "signature is out of range for the key modulus".to_owned(),
            ));
        }
        let m = s.modpow(key.e(), key.n()).to_bytes_be();
        let mut block = vec![0u8; size];
        block[size - m.len()..].copy_from_slice(&m);

        let payload = strip_type1_padding(&block).ok_or_else(|| {
            LicenseError::VerificationFailed(
                "signature was not produced by this key's private half".to_owned(),
            )
        })?;
        debug!(payload_bytes = payload.len(), modulus_bits = size * 8, "recovered license payload");
        Ok(payload.to_vec())
    }
}

/// Parse an SPKI (`PUBLIC KEY`) or PKCS#1 (`RSA PUBLIC KEY`) PEM document.
pub fn load_public_key(public_key_pem: &str) -> Result<RsaPublicKey> {
    let pem = public_key_pem.trim();
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|err| LicenseError::VerificationFailed(format!("unusable public key: {err}")))
}

// 0x00 0x01 0xff.. 0x00 payload
fn strip_type1_padding(block: &[u8]) -> Option<&[u8]> {
    if block.len() < PKCS1_V15_OVERHEAD || block[0] != 0x00 || block[1] != 0x01 {
        return None;
    }
    let body = &block[2..];
    let separator = body.iter().position(|&byte| byte != 0xff)?;
    if separator < MIN_PADDING_LEN || body[separator] != 0x00 {
        return None;
    }
    Some(&body[separator + 1..])
}
