/// Database connection and table creation
pub mod database;

/// Application settings: `config.toml` plus environment overrides
pub mod settings;

/// Vendor catalog seed entries from config.toml
pub mod vendors;
