//! Operation identifiers.

use crate::document::HttpMethod;
use crate::error::{Error, Result};
use std::collections::HashSet;

/// Configuration name of [`MethodName`]
pub const METHOD_NAME: &str = "method";
/// Configuration name of [`TypeMethod`]
pub const TYPE_METHOD: &str = "type-method";
/// Configuration name of [`VerbPath`]
pub const VERB_PATH: &str = "verb-path";

/// Derives an operation id when none is declared.
///
/// `path` is the full, normalized path of the operation. The result is only a
/// candidate: collisions are resolved afterwards by [`OperationIds`].
pub trait OperationIdStrategy {
    fn derive(&self, type_name: &str, method_name: &str, verb: HttpMethod, path: &str) -> String;
}

impl<F> OperationIdStrategy for F
where
    F: Fn(&str, &str, HttpMethod, &str) -> String,
{
    fn derive(&self, type_name: &str, method_name: &str, verb: HttpMethod, path: &str) -> String {
        self(type_name, method_name, verb, path)
    }
}

/// `get_item`
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodName;

impl OperationIdStrategy for MethodName {
    fn derive(&self, _type_name: &str, method_name: &str, _verb: HttpMethod, _path: &str) -> String {
        method_name.to_string()
    }
}

/// `ItemResource_get_item`
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeMethod;

impl OperationIdStrategy for TypeMethod {
    fn derive(&self, type_name: &str, method_name: &str, _verb: HttpMethod, _path: &str) -> String {
        format!("{}_{}", type_name, method_name)
    }
}

/// `get_items_id` for `GET /items/{id}`
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbPath;

impl OperationIdStrategy for VerbPath {
    fn derive(&self, _type_name: &str, _method_name: &str, verb: HttpMethod, path: &str) -> String {
        let clean_path = path.replace(['{', '}'], "").replace(['/', '-', '.'], "_");
        let clean_path = clean_path.trim_matches('_');
        if clean_path.is_empty() {
            verb.as_str().to_string()
        } else {
            format!("{}_{}", verb.as_str(), clean_path)
        }
    }
}

/// Resolve a built-in strategy by its configuration name.
///
/// # Errors
///
/// Returns [`Error::Config`] for an unknown name.
pub fn by_name(name: &str) -> Result<Box<dyn OperationIdStrategy>> {
    match name.trim() {
        METHOD_NAME | "method-name" => Ok(Box::new(MethodName)),
        TYPE_METHOD => Ok(Box::new(TypeMethod)),
        VERB_PATH => Ok(Box::new(VerbPath)),
        other => Err(Error::Config(format!(
            "unknown operation id strategy '{}'",
            other
        ))),
    }
}

/// Operation ids handed out within one document
#[derive(Debug, Default)]
pub struct OperationIds {
    used: HashSet<String>,
}

impl OperationIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `candidate`, appending `_1`, `_2`, ... until it is unused
    pub fn claim(&mut self, candidate: &str) -> String {
        let mut id = candidate.to_string();
        let mut n = 0;
        while self.used.contains(&id) {
            n += 1;
            id = format!("{}_{}", candidate, n);
        }
        self.used.insert(id.clone());
        id
    }

    /// Mark ids already present in a base document as taken
    pub fn reserve(&mut self, id: &str) {
        self.used.insert(id.to_string());
    }
}
