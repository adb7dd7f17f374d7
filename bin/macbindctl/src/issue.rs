//! ---
//! macbind_section: "04-cli"
//! macbind_subsection: "binary"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "License issuance command."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{ArgGroup, Args};
use macbind_common::AppConfig;
use macbind_licensing::timestamp::parse_timestamp;
use macbind_licensing::{
    public_key_fingerprint, DateSpec, DateUnit, LicenseCheckModel, LicenseOptions, LicenseSigner,
    LicenseVerifier, SignedLicense,
};
use macbind_logging::{log_system_event, LogContext, SystemEventOutcome};

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("expiry").args(["expires", "valid_for"]).multiple(false)))]
pub struct IssueCommand {
    /// Encrypted PKCS#8 private key (defaults to issuer.key_dir/private.pem).
    #[arg(long = "private-key", value_name = "FILE")]
    private_key: Option<PathBuf>,

    /// Public key shipped with the license (defaults to issuer.key_dir/public.pem).
    #[arg(long = "public-key", value_name = "FILE")]
    public_key: Option<PathBuf>,

    /// Passphrase of the private key.
    #[arg(long, env = "MACBIND_KEY_PASSPHRASE", hide_env_values = true)]
    passphrase: String,

    /// Absolute expiry, "YYYY-MM-DD HH:mm:ss".
    #[arg(long, value_name = "TIMESTAMP")]
    expires: Option<String>,

    /// Relative expiry amount; combine with --unit.
    #[arg(long = "valid-for", value_name = "N", requires = "unit", allow_negative_numbers = true)]
    valid_for: Option<i64>,

    /// Unit for --valid-for: days, weeks, months, or years.
    #[arg(long, value_name = "UNIT", requires = "valid_for")]
    unit: Option<DateUnit>,

    /// Authorized MAC address; repeat for several.
    #[arg(long = "mac", value_name = "MAC")]
    macs: Vec<String>,

    /// License subject (defaults to issuer.default_subject).
    #[arg(long)]
    subject: Option<String>,

    /// Free-form description.
    #[arg(long)]
    description: Option<String>,

    /// JSON options document; command-line flags override its fields.
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Issue time instead of the current clock, "YYYY-MM-DD HH:mm:ss".
    #[arg(long = "issued-at", value_name = "TIMESTAMP")]
    issued_at: Option<String>,

    /// Print the publicKey/signature JSON document instead of the license string.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

impl IssueCommand {
    pub fn execute(self, config: &AppConfig) -> Result<ExitCode> {
        let private_path = self
            .private_key
            .clone()
            .unwrap_or_else(|| config.issuer.private_key_path());
        let public_path = self
            .public_key
            .clone()
            .unwrap_or_else(|| config.issuer.public_key_path());
        let private_pem = fs::read_to_string(&private_path)
            .with_context(|| format!("unable to read private key {}", private_path.display()))?;
        let public_pem = fs::read_to_string(&public_path)
            .with_context(|| format!("unable to read public key {}", public_path.display()))?;

        let now = match &self.issued_at {
            Some(raw) => parse_timestamp(raw)
                .ok_or_else(|| anyhow!("--issued-at must be \"YYYY-MM-DD HH:mm:ss\", got '{raw}'"))?,
            None => config.issuer.clock.now(),
        };
        let json = self.json;
        let passphrase = self.passphrase.clone();
        let options = self.into_options()?;

        let signer = LicenseSigner::new(config.issuer.signer_defaults());
        let signature = signer
            .sign(&options, &private_pem, &passphrase, now)
            .context("license signing failed")?;
        let license = SignedLicense::new(public_pem, signature);
        let data = license
            .verify(&LicenseVerifier)
            .context("public key does not belong to the signing key")?;

        let fingerprint = public_key_fingerprint(&license.public_key)?;
        let ctx = LogContext::new()
            .with_subject(&data.subject)
            .with_operation("issue")
            .with_key_fingerprint(&fingerprint);
        log_system_event(
            Some(&ctx),
            "license.issue",
            &format!("license issued, expires {}", data.expiry_at),
            SystemEventOutcome::Success,
        );

        if json {
            println!("{}", serde_json::to_string_pretty(&license)?);
        } else {
            println!("{}", license.to_license_string()?);
        }
        Ok(ExitCode::SUCCESS)
    }

    fn into_options(self) -> Result<LicenseOptions> {
        let mut options = match &self.options {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("unable to read options file {}", path.display()))?;
                serde_json::from_str::<LicenseOptions>(&raw)
                    .with_context(|| format!("invalid options file {}", path.display()))?
            }
            None => LicenseOptions::default(),
        };

        if let Some(expires) = self.expires {
            options.date = Some(DateSpec::absolute(expires));
        } else if let (Some(value), Some(unit)) = (self.valid_for, self.unit) {
            options.date = Some(DateSpec::relative(value, unit));
        }
        if !self.macs.is_empty() {
            options.license_check_model = Some(LicenseCheckModel::new(self.macs));
        }
        if let Some(subject) = self.subject {
            options.subject = Some(subject);
        }
        if let Some(description) = self.description {
            options.description = Some(description);
        }
        Ok(options)
    }
}
