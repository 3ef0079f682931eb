//! Vendor catalog configuration from config.toml
//!
//! Vendors listed under `[[vendors]]` are added to the global catalog on
//! startup when no vendor with the same name exists yet.

use serde::Deserialize;

/// Configuration for a single catalog vendor
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VendorConfig {
    /// Display name, also used to detect already-seeded vendors
    pub name: String,
    /// Vendor type (e.g. "Catering", "Florist")
    #[serde(rename = "type")]
    pub vendor_type: String,
    /// City or area served
    pub location: String,
    /// Free-text price band (e.g. "$$")
    #[serde(default)]
    pub budget_range: String,
    /// Optional rating
    #[serde(default)]
    pub rating: Option<f64>,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Event types this vendor serves
    #[serde(default)]
    pub event_types: Vec<String>,
}
