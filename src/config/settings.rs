//! Application settings.
//!
//! Settings come from a TOML file (`config.toml` by default, or the path in
//! `EVENTEASE_CONFIG`). Backend credentials and the database URL can be
//! overridden from the environment, which is where production deployments
//! should keep them:
//!
//! | Variable               | Field                 |
//! |------------------------|-----------------------|
//! | `EVENTEASE_PROJECT_ID` | `backend.project_id`  |
//! | `EVENTEASE_API_KEY`    | `backend.api_key`     |
//! | `DATABASE_URL`         | `database.url`        |

use super::{database::DEFAULT_DATABASE_URL, vendors::VendorConfig};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{fmt, path::Path};
use tracing::{debug, info, warn};

/// Default settings file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// The whole settings file.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Hosted backend credentials
    #[serde(default)]
    pub backend: BackendConfig,
    /// Local database settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Vendor catalog entries seeded on startup
    #[serde(default)]
    pub vendors: Vec<VendorConfig>,
}

/// Credentials for the hosted backend project.
#[derive(Default, Deserialize)]
pub struct BackendConfig {
    /// Backend project id
    pub project_id: Option<String>,
    /// API key. Prefer `EVENTEASE_API_KEY` over writing it in the file.
    pub api_key: Option<String>,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Local database settings.
#[derive(Debug, Default, Deserialize)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL
    pub url: Option<String>,
}

impl AppConfig {
    /// Applies environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(project_id) = lookup("EVENTEASE_PROJECT_ID") {
            self.backend.project_id = Some(project_id);
        }
        if let Some(api_key) = lookup("EVENTEASE_API_KEY") {
            self.backend.api_key = Some(api_key);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
    }

    /// Connection URL to use, falling back to the local default.
    #[must_use]
    pub fn database_url(&self) -> &str {
        self.database.url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse TOML from config file {path_ref:?}: {e}"),
    })
}

/// Loads the application configuration: file (if present) then environment.
///
/// A missing file is not an error; defaults are used and a warning is logged.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path =
        std::env::var("EVENTEASE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        warn!("No configuration file at {path}; using defaults");
        AppConfig::default()
    };
    config.apply_overrides(|key| std::env::var(key).ok());

    if config.backend.api_key.is_none() {
        warn!("No backend API key configured (set EVENTEASE_API_KEY)");
    }
    info!(
        vendors = config.vendors.len(),
        "Loaded application configuration"
    );
    Ok(config)
}
