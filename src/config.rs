//! Configuration system for Warden.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `warden.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `WARDEN_PRODUCT_ID` - Product identifier (0-255)
//! - `WARDEN_MAJOR_VERSION` - Major version accepted by this build (0-255)
//! - `WARDEN_PUBLIC_KEY` - Vendor Ed25519 public key, hex encoded
//! - `WARDEN_INTERNAL_KEY` - Secret for license file integrity tags
//! - `WARDEN_STORAGE_KEY` - Secret for encrypting the stored serial
//! - `WARDEN_LICENSE_PATH` - License file location
//! - `WARDEN_LOGGING_ENABLED` - Enable logging
//! - `WARDEN_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
//!
//! Secrets may be written as `env:VAR_NAME` to read them from another
//! environment variable when they are used.

use config::Config;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::activation::PUBLIC_KEY_LEN;
use crate::errors::{LicenseError, LicenseResult};
use crate::storage::default_license_path;

/// Global configuration singleton.
static CONFIG: OnceLock<WardenConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Product, key and storage configuration
    pub license: LicenseSettings,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Everything needed to validate activation keys and license files.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LicenseSettings {
    /// Product identifier embedded in activation keys
    pub product_id: u8,
    /// Major version embedded in activation keys
    pub major_version: u8,
    /// Vendor Ed25519 public key (64 hex characters)
    pub public_key: String,
    /// Secret for the local integrity tag (use `env:VAR_NAME` to read from environment)
    pub internal_key: String,
    /// Secret for the serial cipher (use `env:VAR_NAME` to read from environment)
    pub storage_key: String,
    /// License file path; empty means the app data directory
    pub path: String,
}

impl Default for LicenseSettings {
    fn default() -> Self {
        Self {
            product_id: 1,
            major_version: 1,
            public_key: String::new(),
            internal_key: String::new(),
            storage_key: String::new(),
            path: String::new(),
        }
    }
}

impl std::fmt::Debug for LicenseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseSettings")
            .field("product_id", &self.product_id)
            .field("major_version", &self.major_version)
            .field("public_key", &self.public_key)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
        }
    }
}

/// Resolve a secret value, following the `env:VAR_NAME` indirection.
pub fn resolve_secret(value: &str) -> LicenseResult<String> {
    match value.strip_prefix("env:") {
        Some(var) => env::var(var).map_err(|_| {
            LicenseError::ConfigError(format!("environment variable '{var}' is not set"))
        }),
        None => Ok(value.to_string()),
    }
}

/// Read a typed environment override. Unset is `None`; a value that does not
/// parse is an error rather than a silent fallback to the default.
fn parse_env_var<T: std::str::FromStr>(var: &str) -> LicenseResult<Option<T>> {
    match env::var(var) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            LicenseError::ConfigError(format!("{var} has an invalid value: '{raw}'"))
        }),
        Err(_) => Ok(None),
    }
}

impl LicenseSettings {
    /// Decode the hex public key.
    pub fn public_key_bytes(&self) -> LicenseResult<[u8; PUBLIC_KEY_LEN]> {
        let bytes = hex::decode(self.public_key.trim())
            .map_err(|e| LicenseError::ConfigError(format!("license.public_key: {e}")))?;

        bytes.try_into().map_err(|b: Vec<u8>| {
            LicenseError::ConfigError(format!(
                "license.public_key must be {PUBLIC_KEY_LEN} bytes, got {}",
                b.len()
            ))
        })
    }

    pub fn internal_key(&self) -> LicenseResult<String> {
        let key = resolve_secret(&self.internal_key)?;
        if key.is_empty() {
            return Err(LicenseError::ConfigError(
                "license.internal_key cannot be empty".to_string(),
            ));
        }
        Ok(key)
    }

    pub fn storage_key(&self) -> LicenseResult<String> {
        let key = resolve_secret(&self.storage_key)?;
        if key.is_empty() {
            return Err(LicenseError::ConfigError(
                "license.storage_key cannot be empty".to_string(),
            ));
        }
        Ok(key)
    }

    /// Configured license path, or the default in the app data directory.
    pub fn license_path(&self) -> LicenseResult<PathBuf> {
        if self.path.is_empty() {
            default_license_path()
        } else {
            Ok(PathBuf::from(&self.path))
        }
    }
}

impl WardenConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `warden.toml` file (optional)
    /// 3. Environment variables
    fn load() -> LicenseResult<Self> {
        Self::load_from("warden")
    }

    fn load_from(file_name: &str) -> LicenseResult<Self> {
        let builder = Config::builder()
            // Start with defaults
            .set_default("license.product_id", 1)
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("license.major_version", 1)
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("license.public_key", "")
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("license.internal_key", "")
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("license.storage_key", "")
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("license.path", "")
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("logging.enabled", false)
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_default("logging.level", "info")
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            // Load from warden.toml (optional)
            .add_source(config::File::with_name(file_name).required(false))
            // Override with environment variables
            .set_override_option(
                "license.product_id",
                parse_env_var::<i64>("WARDEN_PRODUCT_ID")?,
            )
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option(
                "license.major_version",
                parse_env_var::<i64>("WARDEN_MAJOR_VERSION")?,
            )
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option("license.public_key", env::var("WARDEN_PUBLIC_KEY").ok())
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option("license.internal_key", env::var("WARDEN_INTERNAL_KEY").ok())
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option("license.storage_key", env::var("WARDEN_STORAGE_KEY").ok())
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option("license.path", env::var("WARDEN_LICENSE_PATH").ok())
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option(
                "logging.enabled",
                parse_env_var::<bool>("WARDEN_LOGGING_ENABLED")?,
            )
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?
            .set_override_option("logging.level", env::var("WARDEN_LOG_LEVEL").ok())
            .map_err(|e| LicenseError::ConfigError(e.to_string()))?;

        let settings = builder
            .build()
            .map_err(|e| LicenseError::ConfigError(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| LicenseError::ConfigError(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> LicenseResult<()> {
        self.license.public_key_bytes()?;
        self.license.internal_key()?;
        self.license.storage_key()?;

        // Validate log level
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(LicenseError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> LicenseResult<&'static WardenConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = WardenConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is equivalent.
    Ok(CONFIG.get_or_init(|| config))
}

/// Initialize configuration explicitly.
///
/// Call this early in your application to catch configuration errors.
pub fn init_config() -> LicenseResult<&'static WardenConfig> {
    get_config()
}
