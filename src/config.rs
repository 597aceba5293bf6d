//! Configuration lookup.
//!
//! The compiler reads a handful of flat, dotted keys (`openapi.servers`,
//! `openapi.tags.operation.<operationId>`, ...) through the [`ConfigSource`]
//! trait. [`Config`] is the layered implementation used by the CLI:
//!
//! 1. defaults
//! 2. a YAML or JSON file (nested maps are flattened into dotted keys)
//! 3. environment variables
//! 4. explicit overrides (command-line flags)
//!
//! Later layers replace earlier ones key by key.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use serde_yaml::Value;
use std::env;
use std::fs;
use std::path::Path;

pub const SERVERS: &str = "openapi.servers";
pub const PATH_SERVERS_PREFIX: &str = "openapi.servers.path.";
pub const OPERATION_SERVERS_PREFIX: &str = "openapi.servers.operation.";
pub const OPERATION_TAGS_PREFIX: &str = "openapi.tags.operation.";
pub const OPERATION_SECURITY_PREFIX: &str = "openapi.security.operation.";
pub const OPERATION_ID_STRATEGY: &str = "openapi.operation-id-strategy";
pub const FILTER: &str = "openapi.filter";
pub const BASE_DOCUMENT: &str = "openapi.base-document";
pub const INFO_TITLE: &str = "openapi.info.title";
pub const INFO_VERSION: &str = "openapi.info.version";

/// Default environment prefix
pub const ENV_PREFIX: &str = "OPENAPI";

/// Key/value lookup used by the compiler
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Comma-separated list; `None` when the key is absent or blank
    fn get_list(&self, key: &str) -> Option<Vec<String>> {
        let items: Vec<String> = self
            .get(key)?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if items.is_empty() {
            None
        } else {
            Some(items)
        }
    }
}

/// Layered configuration over flat dotted keys
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: IndexMap<String, String>,
}

impl Config {
    /// Empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(mut self) -> Self {
        self.values
            .insert(OPERATION_ID_STRATEGY.to_string(), "method".to_string());
        self
    }

    /// Layer a YAML or JSON file on top.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and [`Error::Config`]
    /// if it is not a mapping.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        self.with_string(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Layer a file if it exists
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Layer YAML (or JSON, which YAML accepts) content on top
    pub fn with_string(mut self, content: &str) -> Result<Self> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        match value {
            Value::Mapping(_) => flatten("", &value, &mut self.values),
            Value::Null => {}
            _ => return Err(Error::Config("configuration must be a mapping".to_string())),
        }
        Ok(self)
    }

    /// Layer environment variables with the given prefix.
    ///
    /// `OPENAPI__OPERATION_ID_STRATEGY=verb-path` sets
    /// `openapi.operation-id-strategy`. `__` separates segments and a single
    /// `_` becomes `-`. Write `___` for a literal `_`, so
    /// `OPENAPI__SERVERS__OPERATION__GET___ITEM` sets
    /// `openapi.servers.operation.get_item`. Names are lowercased, so keys
    /// with upper-case letters can only come from a file or [`Config::set`].
    pub fn with_env_prefix(self, prefix: &str) -> Self {
        self.with_vars(prefix, env::vars())
    }

    /// Layer `(name, value)` pairs as if they were environment variables
    pub fn with_vars<I>(mut self, prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = prefix.to_uppercase();
        for (name, value) in vars {
            let Some(rest) = name
                .strip_prefix(prefix.as_str())
                .and_then(|r| r.strip_prefix("__"))
            else {
                continue;
            };
            let rest = rest.replace("___", "\0");
            let key = std::iter::once(prefix.to_lowercase())
                .chain(rest.split("__").map(|s| {
                    s.to_lowercase().replace('_', "-").replace('\0', "_")
                }))
                .collect::<Vec<_>>()
                .join(".");
            debug!("Environment override {} -> {}", name, key);
            self.values.insert(key, value);
        }
        self
    }

    /// Set one key, replacing any earlier layer
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigSource for Config {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut IndexMap<String, String>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                if let Some(key) = scalar_text(key) {
                    flatten(&join(&key), child, out);
                }
            }
        }
        Value::Sequence(items) => {
            let joined: Vec<String> = items.iter().filter_map(scalar_text).collect();
            out.insert(prefix.to_string(), joined.join(","));
        }
        other => {
            if let Some(text) = scalar_text(other) {
                out.insert(prefix.to_string(), text);
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::new().with_defaults();
        assert_eq!(config.get(OPERATION_ID_STRATEGY).as_deref(), Some("method"));
        assert_eq!(config.get(FILTER), None);
        assert_eq!(config.get_or(FILTER, "none"), "none");
    }

    #[test]
    fn test_nested_yaml_is_flattened() {
        let config = Config::new()
            .with_string(
                r#"
openapi:
  servers: ["https://a.example.com", "https://b.example.com"]
  info:
    title: Inventory
    version: "1.0"
  tags.operation.getItem: items,admin
"#,
            )
            .unwrap();

        assert_eq!(
            config.get_list(SERVERS),
            Some(vec![
                "https://a.example.com".to_string(),
                "https://b.example.com".to_string()
            ])
        );
        assert_eq!(config.get(INFO_TITLE).as_deref(), Some("Inventory"));
        assert_eq!(config.get(INFO_VERSION).as_deref(), Some("1.0"));
        assert_eq!(
            config.get_list("openapi.tags.operation.getItem"),
            Some(vec!["items".to_string(), "admin".to_string()])
        );
    }

    #[test]
    fn test_json_file_layer_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"openapi.operation-id-strategy": "verb-path"}}"#).unwrap();

        let config = Config::new().with_defaults().with_file(file.path()).unwrap();
        assert_eq!(config.get(OPERATION_ID_STRATEGY).as_deref(), Some("verb-path"));
    }

    #[test]
    fn test_env_layer() {
        let vars = vec![
            ("OPENAPI__OPERATION_ID_STRATEGY".to_string(), "type-method".to_string()),
            ("OPENAPI__INFO__TITLE".to_string(), "From Env".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ];
        let config = Config::new().with_defaults().with_vars(ENV_PREFIX, vars);

        assert_eq!(config.get(OPERATION_ID_STRATEGY).as_deref(), Some("type-method"));
        assert_eq!(config.get(INFO_TITLE).as_deref(), Some("From Env"));
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn test_env_escaped_underscore() {
        let vars = vec![(
            "OPENAPI__SERVERS__OPERATION__GET___ITEM".to_string(),
            "https://items.example.com".to_string(),
        )];
        let config = Config::new().with_vars(ENV_PREFIX, vars);

        assert_eq!(
            config.get("openapi.servers.operation.get_item").as_deref(),
            Some("https://items.example.com")
        );
    }

    #[test]
    fn test_non_mapping_is_rejected() {
        let err = Config::new().with_string("- a\n- b\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_blank_list_is_absent() {
        let mut config = Config::new();
        config.set(SERVERS, " , ");
        assert_eq!(config.get_list(SERVERS), None);
    }
}
