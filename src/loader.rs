//! Loading a hand-written base document.

use crate::document::OpenApi;
use crate::error::{Error, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Parse a JSON document
pub fn parse_json(content: &str) -> Result<OpenApi> {
    Ok(serde_json::from_str(content)?)
}

/// Parse a YAML document
pub fn parse_yaml(content: &str) -> Result<OpenApi> {
    Ok(serde_yaml::from_str(content)?)
}

/// Load a base document from disk.
///
/// `.json` files are parsed as JSON and `.yaml`/`.yml` files as YAML. Any
/// other extension is tried as JSON first, then as YAML.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read and
/// [`Error::Serialization`] if it does not hold a document.
pub fn load_document(path: &Path) -> Result<OpenApi> {
    debug!("Loading base document {}", path.display());
    let content = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let document = match extension.as_deref() {
        Some("json") => parse_json(&content),
        Some("yaml") | Some("yml") => parse_yaml(&content),
        _ => parse_json(&content).or_else(|_| parse_yaml(&content)),
    };
    document.map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e)))
}

/// Load `path` when given, else start from an empty document
pub fn load_or_default(path: Option<&Path>) -> Result<OpenApi> {
    match path {
        Some(path) => load_document(path),
        None => Ok(OpenApi::new()),
    }
}
