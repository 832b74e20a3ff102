//! Disk configuration for the Backtory driver.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::client::ClientSettings;

pub const AUTHENTICATION_ID_KEY: &str = "X-Backtory-Authentication-Id";
pub const AUTHENTICATION_KEY_KEY: &str = "X-Backtory-Authentication-Key";
pub const STORAGE_ID_KEY: &str = "X-Backtory-Storage-Id";

/// Configuration of a single Backtory disk, as found in the host's disk map.
///
/// # Example
///
/// ```ignore
/// let config: DiskConfig = serde_json::from_value(serde_json::json!({
///     "driver": "backtory",
///     "X-Backtory-Authentication-Id": "5a1b...",
///     "X-Backtory-Authentication-Key": "8c2d...",
///     "X-Backtory-Storage-Id": "5a1b...",
///     "pathPrefix": "uploads",
/// }))?;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskConfig {
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(rename = "X-Backtory-Authentication-Id", default)]
    pub authentication_id: Option<String>,
    #[serde(rename = "X-Backtory-Authentication-Key", default)]
    pub authentication_key: Option<String>,
    #[serde(rename = "X-Backtory-Storage-Id", default)]
    pub storage_id: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(rename = "pathPrefix", default)]
    pub path_prefix: Option<String>,
}

impl DiskConfig {
    /// Check that every required key is present and non-empty.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            (AUTHENTICATION_ID_KEY, &self.authentication_id),
            (AUTHENTICATION_KEY_KEY, &self.authentication_key),
            (STORAGE_ID_KEY, &self.storage_id),
        ];

        for (key, value) in required {
            if value.as_deref().is_none_or(str::is_empty) {
                return Err(format!("Backtory disk is missing required key '{}'", key));
            }
        }
        Ok(())
    }

    /// Client settings for this disk. Call [`validate`](Self::validate) first.
    pub fn to_settings(&self) -> ClientSettings {
        let mut settings = ClientSettings::new(
            self.authentication_id.clone().unwrap_or_default(),
            self.authentication_key.clone().unwrap_or_default(),
            self.storage_id.clone().unwrap_or_default(),
        )
        .with_headers(self.headers.clone())
        .with_parameters(self.parameters.clone());

        if let Some(domain) = &self.domain {
            settings = settings.with_domain(domain.clone());
        }
        settings
    }

    pub fn prefix(&self) -> &str {
        self.path_prefix.as_deref().unwrap_or("")
    }
}
