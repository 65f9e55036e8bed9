//! Generator configuration.
//!
//! One explicit value, passed by reference into the document builder and the
//! generator. There is no process-wide state.

use crate::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings applied to every generated document
///
/// # Example
///
/// ```no_run
/// use openapi_scribe::config::GeneratorConfig;
/// use std::path::Path;
///
/// let mut config = GeneratorConfig::from_file(Path::new("openapi-scribe.yaml")).unwrap();
/// config.title = "Billing API".to_string();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Value of the top-level `openapi` key
    pub openapi_version: String,
    pub title: String,
    /// Version of the documented API, not of OpenAPI
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            openapi_version: "3.0.0".to_string(),
            title: "API Documentation".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            servers: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    /// Load from a `.json`, `.yaml` or `.yml` file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// `IoError` when the file cannot be read, `SerializationError` when it does not
    /// hold a valid configuration.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;

        let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
        let config = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(config)
    }

    /// Check the values a document cannot do without
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("openapi_version", &self.openapi_version),
            ("title", &self.title),
            ("version", &self.version),
        ] {
            if value.trim().is_empty() {
                return Err(Error::StructuralError(format!(
                    "configuration value `{}` must not be empty",
                    field
                )));
            }
        }
        if !self.openapi_version.starts_with("3.") {
            return Err(Error::StructuralError(format!(
                "unsupported OpenAPI version `{}`, expected 3.x",
                self.openapi_version
            )));
        }
        Ok(())
    }
}
