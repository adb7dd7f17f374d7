//! ---
//! macbind_section: "03-runtime-glue"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "TOML configuration for issuer and client tooling."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use macbind_licensing::keys::MIN_MODULUS_BITS;
use macbind_licensing::{Clock, IssuerDefaults, DEFAULT_MODULUS_BITS, DEFAULT_SUBJECT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_owned()
}

fn default_modulus_bits() -> usize {
    DEFAULT_MODULUS_BITS
}

fn default_key_dir() -> PathBuf {
    PathBuf::from("keys")
}

fn default_env_license_var() -> String {
    "MACBIND_LICENSE".to_owned()
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for macbind tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub issuer: IssuerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "MACBIND_CONFIG";
    pub const DEFAULT_CANDIDATES: [&'static str; 2] = ["macbind.toml", "configs/macbind.toml"];

    /// Find the configuration file, respecting the `MACBIND_CONFIG` override.
    ///
    /// Returns `Ok(None)` when no candidate exists. A path named by
    /// `MACBIND_CONFIG` must exist.
    pub fn discover<P: AsRef<Path>>(candidates: &[P]) -> Result<Option<LoadedAppConfig>> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(Some(LoadedAppConfig {
                    config,
                    source: path,
                }));
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(Some(LoadedAppConfig {
                    config,
                    source: path.to_path_buf(),
                }));
            }
        }
        Ok(None)
    }

    /// Read and validate a single TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.issuer.validate()?;
        self.client.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Issuer-side defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    #[serde(default = "default_subject")]
    pub default_subject: String,
    #[serde(default = "default_modulus_bits")]
    pub modulus_bits: usize,
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,
    /// Clock stamping `issuedAt` and resolving relative expiry dates.
    #[serde(default)]
    pub clock: Clock,
}

impl IssuerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_subject.trim().is_empty() {
            return Err(anyhow!("issuer.default_subject must not be empty"));
        }
        if self.modulus_bits < MIN_MODULUS_BITS || self.modulus_bits % 8 != 0 {
            return Err(anyhow!(
                "issuer.modulus_bits must be a multiple of 8 and at least {}; got {}",
                MIN_MODULUS_BITS,
                self.modulus_bits
            ));
        }
        Ok(())
    }

    /// Defaults handed to the license signer.
    #[must_use]
    pub fn signer_defaults(&self) -> IssuerDefaults {
        IssuerDefaults {
            subject: self.default_subject.clone(),
        }
    }

    /// Location of `private.pem` under `key_dir`.
    #[must_use]
    pub fn private_key_path(&self) -> PathBuf {
        self.key_dir.join(macbind_licensing::keys::PRIVATE_KEY_FILE)
    }

    /// Location of `public.pem` under `key_dir`.
    #[must_use]
    pub fn public_key_path(&self) -> PathBuf {
        self.key_dir.join(macbind_licensing::keys::PUBLIC_KEY_FILE)
    }
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            default_subject: default_subject(),
            modulus_bits: default_modulus_bits(),
            key_dir: default_key_dir(),
            clock: Clock::default(),
        }
    }
}

/// Client-side license lookup and evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub license_path: Option<PathBuf>,
    #[serde(default = "default_env_license_var")]
    pub env_var: String,
    /// Replaces live interface enumeration when set.
    #[serde(default)]
    pub mac_override: Option<Vec<String>>,
    #[serde(default)]
    pub clock: Clock,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.env_var.trim().is_empty() {
            return Err(anyhow!("client.env_var must not be empty"));
        }
        if let Some(macs) = &self.mac_override {
            if macs.iter().all(|mac| mac.trim().is_empty()) {
                return Err(anyhow!(
                    "client.mac_override must list at least one address when present"
                ));
            }
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            license_path: None,
            env_var: default_env_license_var(),
            mac_override: None,
            clock: Clock::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
