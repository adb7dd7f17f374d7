//! ---
//! macbind_section: "04-cli"
//! macbind_subsection: "binary"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Client-side commands: inspect, check, and MAC enumeration."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use clap::{ArgGroup, Args};
use macbind_common::{AppConfig, LicenseAuthority, LicenseGate};
use macbind_licensing::timestamp::parse_timestamp;
use macbind_licensing::{
    public_key_fingerprint, LicenseVerifier, MacAddressSource, SignedLicense,
    StaticMacAddresses, SystemInterfaces,
};
use macbind_logging::{lic_info, LogContext};

/// Exit status of `check` when the license loads but is not valid here.
const EXIT_LICENSE_REFUSED: u8 = 2;

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").args(["license", "file"]).required(true)))]
pub struct InspectCommand {
    /// License string.
    #[arg(long, value_name = "LICENSE")]
    license: Option<String>,

    /// File holding the license string; "-" reads stdin.
    #[arg(long, value_name = "FILE")]
    file: Option<PathBuf>,
}

impl InspectCommand {
    pub fn execute(self) -> Result<ExitCode> {
        let raw = match (self.license, self.file) {
            (Some(raw), _) => raw,
            (None, Some(path)) => read_source(&path)?,
            (None, None) => return Err(anyhow!("either --license or --file is required")),
        };
        let signed = SignedLicense::from_license_string(&raw)?;
        let data = signed
            .verify(&LicenseVerifier)
            .context("license failed verification")?;
        let fingerprint = public_key_fingerprint(&signed.public_key)?;
        let ctx = LogContext::new()
            .with_subject(&data.subject)
            .with_operation("inspect")
            .with_key_fingerprint(&fingerprint);
        lic_info!(context = ctx, "license verified, expires {}", data.expiry_at);
        println!("{}", serde_json::to_string_pretty(&data)?);
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Debug, Args)]
pub struct CheckCommand {
    /// License file (overrides client.license_path).
    #[arg(long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Treat these MAC addresses as the host's (overrides client.mac_override).
    #[arg(long = "mac", value_name = "MAC")]
    macs: Vec<String>,

    /// Evaluate at this time instead of now, "YYYY-MM-DD HH:mm:ss".
    #[arg(long, value_name = "TIMESTAMP")]
    at: Option<String>,

    /// Print the full check result as JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

impl CheckCommand {
    pub fn execute(self, config: &AppConfig) -> Result<ExitCode> {
        let mut client = config.client.clone();
        if let Some(file) = self.file {
            client.license_path = Some(file);
        }
        if !self.macs.is_empty() {
            client.mac_override = Some(self.macs);
        }
        let now = match &self.at {
            Some(raw) => parse_timestamp(raw)
                .ok_or_else(|| anyhow!("--at must be \"YYYY-MM-DD HH:mm:ss\", got '{raw}'"))?,
            None => client.clock.now(),
        };

        if report(&LicenseGate::new(&client), now, self.json)? {
            Ok(ExitCode::SUCCESS)
        } else {
            Ok(ExitCode::from(EXIT_LICENSE_REFUSED))
        }
    }
}

/// Print the authority's decision; `true` when the license admits this host.
fn report(authority: &dyn LicenseAuthority, now: NaiveDateTime, json: bool) -> Result<bool> {
    let check = authority.check_at(now)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&check)?);
    } else {
        println!("{}: {}", check.license.subject, check.result);
    }
    Ok(check.result.is_valid())
}

#[derive(Debug, Args)]
pub struct MacsCommand {
    /// Read interfaces from this sysfs-style directory.
    #[arg(long = "sysfs-root", value_name = "DIR", hide = true)]
    sysfs_root: Option<PathBuf>,

    /// Normalize the given addresses instead of enumerating interfaces.
    #[arg(long = "mac", value_name = "MAC", hide = true)]
    macs: Vec<String>,
}

impl MacsCommand {
    pub fn execute(self) -> Result<ExitCode> {
        let source: Box<dyn MacAddressSource> = match (self.sysfs_root, self.macs.is_empty()) {
            (Some(root), _) => Box::new(SystemInterfaces::with_sysfs_root(root)),
            (None, false) => Box::new(StaticMacAddresses::new(&self.macs)),
            (None, true) => Box::new(SystemInterfaces::new()),
        };
        let macs = source
            .active_mac_addresses()
            .context("unable to enumerate MAC addresses")?;
        for mac in macs.iter() {
            println!("{mac}");
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("unable to read license from stdin")?;
        return Ok(raw);
    }
    fs::read_to_string(path).with_context(|| format!("unable to read {}", path.display()))
}
