//! Ledger settings loading from config.toml
//!
//! The file names the administrator seeded at bootstrap, the issuance limits, and
//! optional directory entries created on first start. Every section is optional;
//! a missing file yields the defaults.

use crate::entities::{Role, Shop, User};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_VAR: &str = "CARD_LEDGER_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Administrator created at bootstrap
    pub admin: AdminConfig,
    /// Issuance limits
    pub issuance: IssuanceConfig,
    /// Users created at bootstrap when absent
    pub users: Vec<User>,
    /// Shops created at bootstrap when absent
    pub shops: Vec<Shop>,
}

/// Administrator identity
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Caller identity of the administrator
    pub identity: String,
    /// Display name
    pub name: String,
    /// Enrollment certificate reference
    pub ecert: String,
    /// External authentication id
    pub authid: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            identity: "admin".to_string(),
            name: "KaKa Blockchain Administrator".to_string(),
            ecert: "admin".to_string(),
            authid: "kakacenter".to_string(),
        }
    }
}

impl AdminConfig {
    /// Directory record for the administrator, always with the Authority role.
    #[must_use]
    pub fn to_user(&self) -> User {
        User {
            identity: self.identity.clone(),
            name: self.name.clone(),
            ecert: self.ecert.clone(),
            affiliation: Role::Authority.affiliation(),
            auth_id: self.authid.clone(),
        }
    }
}

/// Limits applied to card issuance
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IssuanceConfig {
    /// Largest accepted batch size
    pub max_batch_size: u32,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10_000,
        }
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    debug!("Loading configuration from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_config(&contents)
}

/// Parses settings from TOML text.
pub fn parse_config(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    if settings.admin.identity.is_empty() {
        return Err(Error::Config {
            message: "admin.identity must not be empty".to_string(),
        });
    }
    if settings.issuance.max_batch_size == 0 {
        return Err(Error::Config {
            message: "issuance.max_batch_size must be at least 1".to_string(),
        });
    }
    Ok(settings)
}

/// Loads settings from `$CARD_LEDGER_CONFIG`, or ./config.toml.
///
/// A missing file at the default location is not an error; defaults apply.
pub fn load_default_config() -> Result<Settings> {
    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        return load_config(path);
    }
    let path = Path::new("config.toml");
    if path.exists() {
        load_config(path)
    } else {
        info!("No config.toml found, using default settings");
        Ok(Settings::default())
    }
}
