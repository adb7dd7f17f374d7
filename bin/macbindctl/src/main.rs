//! ---
//! macbind_section: "04-cli"
//! macbind_subsection: "binary"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Control CLI for license issuers and installers."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use macbind_common::{init_tracing, AppConfig};

mod client;
mod issue;
mod keygen;

const SERVICE_NAME: &str = "macbindctl";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Issue, inspect, and check MAC-bound RSA licenses",
    long_about = None
)]
struct Cli {
    /// Configuration file (takes precedence over MACBIND_CONFIG and default locations).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate an issuer RSA key pair.
    Keygen(keygen::KeygenCommand),
    /// Sign a license for a set of MAC addresses.
    Issue(issue::IssueCommand),
    /// Verify a license string and print its payload.
    Inspect(client::InspectCommand),
    /// Evaluate the installed license on this host.
    Check(client::CheckCommand),
    /// List this host's active MAC addresses.
    Macs(client::MacsCommand),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Keygen(cmd) => cmd.execute(&config),
        Commands::Issue(cmd) => cmd.execute(&config),
        Commands::Inspect(cmd) => cmd.execute(),
        Commands::Check(cmd) => cmd.execute(&config),
        Commands::Macs(cmd) => cmd.execute(),
    }
}

/// Resolve configuration and install tracing.
///
/// File logging is only enabled when a configuration file was found.
fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let loaded = match explicit {
        Some(path) => Some(AppConfig::from_path(path)?),
        None => AppConfig::discover(&AppConfig::DEFAULT_CANDIDATES)?.map(|loaded| loaded.config),
    };
    match loaded {
        Some(config) => {
            init_tracing(SERVICE_NAME, &config.logging)?;
            Ok(config)
        }
        None => {
            macbind_logging::init();
            Ok(AppConfig::default())
        }
    }
}
