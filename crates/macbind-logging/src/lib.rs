//! ---
//! macbind_section: "01-observability"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Structured logging context and lifecycle events."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Logging helpers shared by the issuer and client tooling.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing;

/// Initialize a baseline stderr subscriber for tests and small tools.
///
/// Later calls are no-ops once any global subscriber is installed.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Context attached to license log events by the `lic_*` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogContext<'a> {
    /// License subject.
    pub subject: Option<&'a str>,
    /// Operation being performed (`issue`, `check`, `keygen`, ...).
    pub operation: Option<&'a str>,
    /// Fingerprint of the issuer public key involved.
    pub key_fingerprint: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a license subject.
    pub fn with_subject(mut self, subject: &'a str) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Attach the operation name.
    pub fn with_operation(mut self, operation: &'a str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Attach an issuer key fingerprint.
    pub fn with_key_fingerprint(mut self, fingerprint: &'a str) -> Self {
        self.key_fingerprint = Some(fingerprint);
        self
    }
}

/// Outcome of a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed.
    Success,
    /// The operation failed or the license was refused.
    Fault,
}

impl SystemEventOutcome {
    /// Label written to the `outcome` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a lifecycle event (`license.issue`, `license.check`, ...).
///
/// Successes log at INFO and faults at WARN.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.copied().unwrap_or_default();
    match outcome {
        SystemEventOutcome::Success => tracing::info!(
            event,
            outcome = outcome.as_str(),
            subject = ctx.subject.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            key_fingerprint = ctx.key_fingerprint.unwrap_or(""),
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::warn!(
            event,
            outcome = outcome.as_str(),
            subject = ctx.subject.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            key_fingerprint = ctx.key_fingerprint.unwrap_or(""),
            message = %message
        ),
    }
}
