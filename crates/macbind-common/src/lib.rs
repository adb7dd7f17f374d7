//! ---
//! macbind_section: "03-runtime-glue"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Shared runtime glue for issuer and client tooling."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
//! Configuration loading, tracing setup, and the client-side license gate
//! shared by the macbind binaries.

pub mod config;
pub mod license;
pub mod logging;

pub use config::{AppConfig, ClientConfig, IssuerConfig, LoadedAppConfig, LoggingConfig};
pub use license::{LicenseAuthority, LicenseCheck, LicenseGate};
pub use logging::{init_tracing, LogFormat};
