//! Configuration management for stationinspect.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "stationinspect";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "inspections.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "STATIONINSPECT_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `STATIONINSPECT_`, sections
///    separated by `__`, e.g. `STATIONINSPECT_SERVER__PORT=9000`)
/// 2. TOML config file at `~/.config/stationinspect/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Compliance rule configuration.
    pub compliance: ComplianceConfig,
    /// Image upload limits.
    pub uploads: UploadConfig,
    /// Report letterhead configuration.
    pub report: ReportConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/stationinspect/inspections.db`
    pub database_path: Option<PathBuf>,
    /// Directory holding uploaded report images.
    /// Defaults to `~/.local/share/stationinspect/media`
    pub media_dir: Option<PathBuf>,
    /// Directory receiving generated documents.
    /// Defaults to `~/.local/share/stationinspect/reports`
    pub output_dir: Option<PathBuf>,
}

/// Limits and rule parameters used by the compliance checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Maximum authorized ERP in kilowatts.
    pub authorized_erp_kw: f64,
    /// System losses in dB when none were recorded.
    pub default_losses_db: f64,
    /// Antenna gain in dBd when none was recorded.
    pub default_antenna_gain_dbd: f64,
    /// Towers taller than this (metres) need an aviation warning light.
    pub aviation_light_height_m: f64,
    /// Equipment descriptions that are not type approved.
    pub non_approved_equipment: Vec<String>,
}

/// Image upload configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted image, in bytes.
    pub max_file_bytes: u64,
    /// Accepted `Content-Type` values.
    pub allowed_content_types: Vec<String>,
}

/// Fixed text printed on every generated report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Addressee on the `TO:` line.
    pub addressee: String,
    /// Routing on the `THRO':` line.
    pub through: String,
    /// Name of the inspecting authority used in the opening paragraph.
    pub authority: String,
    /// Title printed under the inspector's name.
    pub signatory_title: String,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_address: String,
    /// Port to listen on.
    pub port: u16,
    /// Number of worker threads; 0 uses the number of CPUs.
    pub workers: usize,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            authorized_erp_kw: 10.0,
            default_losses_db: 1.5,
            default_antenna_gain_dbd: 11.0,
            aviation_light_height_m: 60.0,
            non_approved_equipment: default_non_approved_equipment(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
            ],
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            addressee: "D/MIRC".to_string(),
            through: "PO/NR/MIRC".to_string(),
            authority: "MIRC".to_string(),
            signatory_title: "AO/MIRC/NR".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            workers: 0,
        }
    }
}

/// Transmitter models known to lack type approval.
fn default_non_approved_equipment() -> Vec<String> {
    vec!["MAXIVA GATEAIR XTE".to_string(), "NEC HPB-1210".to_string()]
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let compliance = &self.compliance;
        if !(compliance.authorized_erp_kw.is_finite() && compliance.authorized_erp_kw > 0.0) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "authorized_erp_kw must be a positive number, got {}",
                    compliance.authorized_erp_kw
                ),
            });
        }

        for (name, value) in [
            ("default_losses_db", compliance.default_losses_db),
            ("default_antenna_gain_dbd", compliance.default_antenna_gain_dbd),
        ] {
            if !value.is_finite() {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must be a finite number"),
                });
            }
        }

        if !(compliance.aviation_light_height_m.is_finite()
            && compliance.aviation_light_height_m >= 0.0)
        {
            return Err(Error::ConfigValidation {
                message: "aviation_light_height_m cannot be negative".to_string(),
            });
        }

        if compliance
            .non_approved_equipment
            .iter()
            .any(|entry| entry.trim().is_empty())
        {
            return Err(Error::ConfigValidation {
                message: "non_approved_equipment entries cannot be blank".to_string(),
            });
        }

        if self.uploads.max_file_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "max_file_bytes must be greater than 0".to_string(),
            });
        }

        if self.uploads.allowed_content_types.is_empty() {
            return Err(Error::ConfigValidation {
                message: "allowed_content_types cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the media directory, resolving defaults if not set.
    #[must_use]
    pub fn media_dir(&self) -> PathBuf {
        self.storage
            .media_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("media"))
    }

    /// Get the generated document directory, resolving defaults if not set.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.storage
            .output_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("reports"))
    }
}
