//! ---
//! macbind_section: "04-cli"
//! macbind_subsection: "binary"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Issuer key pair generation command."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use macbind_common::AppConfig;
use macbind_licensing::keys::{PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
use macbind_licensing::KeyPairService;
use macbind_logging::{lic_error, log_system_event, LogContext, SystemEventOutcome};

#[derive(Debug, Args)]
pub struct KeygenCommand {
    /// Passphrase protecting the private key.
    #[arg(long, env = "MACBIND_KEY_PASSPHRASE", hide_env_values = true)]
    passphrase: String,

    /// Accepted for compatibility; public keys are always written unencrypted.
    #[arg(long = "public-passphrase", value_name = "PASSPHRASE")]
    public_passphrase: Option<String>,

    /// RSA modulus length (defaults to issuer.modulus_bits).
    #[arg(long, value_name = "N")]
    bits: Option<usize>,

    /// Output directory (defaults to issuer.key_dir).
    #[arg(long, value_name = "DIR", conflicts_with = "print")]
    out: Option<PathBuf>,

    /// Print both PEM documents to stdout instead of writing files.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    print: bool,
}

impl KeygenCommand {
    pub fn execute(self, config: &AppConfig) -> Result<ExitCode> {
        let bits = self.bits.unwrap_or(config.issuer.modulus_bits);
        let dir = self.out.unwrap_or_else(|| config.issuer.key_dir.clone());
        let target = (!self.print).then_some(dir.as_path());

        let unsaved = KeyPairService
            .create_key_pair_files(
                &self.passphrase,
                self.public_passphrase.as_deref(),
                target,
                bits,
            )
            .context("key pair generation failed")?;

        match unsaved {
            None => {
                let public_pem = std::fs::read_to_string(dir.join(PUBLIC_KEY_FILE))
                    .with_context(|| format!("unable to re-read {}", dir.display()))?;
                let fingerprint = macbind_licensing::public_key_fingerprint(&public_pem)?;
                let ctx = LogContext::new()
                    .with_operation("keygen")
                    .with_key_fingerprint(&fingerprint);
                log_system_event(
                    Some(&ctx),
                    "license.keygen",
                    "issuer key pair written",
                    SystemEventOutcome::Success,
                );
                println!("private key: {}", dir.join(PRIVATE_KEY_FILE).display());
                println!("public key:  {}", dir.join(PUBLIC_KEY_FILE).display());
                println!("fingerprint: {fingerprint}");
                Ok(ExitCode::SUCCESS)
            }
            Some(pair) => {
                print!("{}", pair.private_key);
                print!("{}", pair.public_key);
                if self.print {
                    Ok(ExitCode::SUCCESS)
                } else {
                    let ctx = LogContext::new().with_operation("keygen");
                    lic_error!(
                        context = ctx,
                        "could not write keys to {}; PEM documents printed above",
                        dir.display()
                    );
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
