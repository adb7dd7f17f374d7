//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "License issuing, verification, and MAC-bound validity checks."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Macbind licensing core: RSA-signed license payloads bound to a host's
//! MAC addresses, with issuer keypair management, payload recovery, and
//! expiry evaluation.

pub mod dates;
pub mod error;
pub mod evaluator;
pub mod fingerprint;
pub mod host;
pub mod keys;
pub mod logging;
pub mod payload;
pub mod signer;
pub mod timestamp;
pub mod transport;
pub mod verifier;

pub use dates::{DateSpec, DateUnit};
pub use error::{LicenseError, Result};
pub use evaluator::{LicenseValidityEvaluator, ValidityResult};
pub use fingerprint::{normalize_mac, FingerprintSet, HardwareFingerprintMatcher};
pub use host::{MacAddressSource, StaticMacAddresses, SystemInterfaces};
pub use keys::{public_key_fingerprint, KeyPair, KeyPairService, DEFAULT_MODULUS_BITS};
pub use payload::{LicenseCheckModel, LicenseData, LicenseOptions};
pub use signer::{IssuerDefaults, LicenseSigner, DEFAULT_SUBJECT};
pub use timestamp::Clock;
pub use transport::SignedLicense;
pub use verifier::LicenseVerifier;
