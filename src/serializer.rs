//! Serialization module for converting OpenAPI documents to YAML or JSON format.
//!
//! Documents are `serde_json::Value` trees built on insertion-ordered maps, so key
//! order survives every encoding and a YAML round trip.

use crate::error::Result;
use log::debug;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Serializes a document to YAML format.
///
/// # Errors
///
/// Returns `SerializationError` if serialization fails.
///
/// # Example
///
/// ```
/// use openapi_scribe::serializer::serialize_yaml;
/// use serde_json::json;
///
/// let yaml = serialize_yaml(&json!({"openapi": "3.0.0", "paths": {}})).unwrap();
/// assert!(yaml.starts_with("openapi: 3.0.0"));
/// ```
pub fn serialize_yaml(doc: &Value) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    Ok(serde_yaml::to_string(doc)?)
}

/// Serializes a document to JSON, indented when `pretty` is set
pub fn serialize_json(doc: &Value, pretty: bool) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON (pretty: {})", pretty);
    let json = if pretty {
        serde_json::to_string_pretty(doc)?
    } else {
        serde_json::to_string(doc)?
    };
    Ok(json)
}

/// Parses a YAML document, keeping mapping keys in their source order
pub fn deserialize_yaml(yaml: &str) -> Result<Value> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does. Missing
/// parent directories are created.
///
/// # Errors
///
/// Returns `IoError` if a directory or the file cannot be written.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
