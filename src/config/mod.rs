/// Database configuration and connection management
pub mod database;

/// Ledger settings loading from config.toml
pub mod settings;

pub use settings::{AdminConfig, IssuanceConfig, Settings, load_config, load_default_config};
