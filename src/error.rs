use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    #[error("invalid metadata in {}: {message}", file.display())]
    Metadata { file: PathBuf, message: String },

    #[error("malformed numeric value '{value}' for '{field}'")]
    MalformedNumber { field: String, value: String },

    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("reference '{0}' does not point at a schema")]
    UnsupportedNode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Attach a file to a syn error raised while reading attribute metadata
    pub fn metadata(file: impl Into<PathBuf>, err: syn::Error) -> Self {
        Error::Metadata {
            file: file.into(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}

impl From<syn::Error> for Error {
    fn from(err: syn::Error) -> Self {
        Error::Parse {
            file: PathBuf::from("<unknown>"),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_number_message() {
        let err = Error::MalformedNumber {
            field: "minimum".to_string(),
            value: "1.2.3".to_string(),
        };
        assert_eq!(err.to_string(), "malformed numeric value '1.2.3' for 'minimum'");
    }

    #[test]
    fn test_metadata_error_names_file() {
        let syn_err = syn::parse_str::<syn::Ident>("1abc").unwrap_err();
        let err = Error::metadata("src/api.rs", syn_err);
        let msg = err.to_string();
        assert!(msg.starts_with("invalid metadata in src/api.rs:"));
    }
}
