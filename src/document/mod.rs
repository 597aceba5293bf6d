//! OpenAPI 3.0 document tree.
//!
//! Every node is a plain serde struct. Optional fields are `Option`, lists are
//! `Vec` and keyed mappings are [`IndexMap`] so insertion order survives a
//! serialization round trip. Absent or empty fields are omitted on output.
//! Vendor extensions (`x-...`) are flattened into the node that owns them.

mod path;
mod schema;

pub use path::{
    Callback, Content, Encoding, Example, Header, HttpMethod, Link, MediaType, Operation,
    Parameter, ParameterIn, ParameterStyle, PathItem, Paths, RequestBody, Response, Responses,
};
pub use schema::{AdditionalProperties, Discriminator, Schema, SchemaType};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// OpenAPI version written into freshly created documents
pub const OPENAPI_VERSION: &str = "3.0.3";

/// Vendor extension bag
pub type Extensions = IndexMap<String, serde_json::Value>;

/// Security requirement: scheme name -> required scopes
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenApi {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,
    /// Servers hosting the API
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// API paths
    #[serde(skip_serializing_if = "Paths::is_empty")]
    pub paths: Paths,
    /// Reusable components
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    /// Document-wide security requirements
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
    /// Tag definitions
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Default for OpenApi {
    fn default() -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: None,
            servers: Vec::new(),
            paths: Paths::default(),
            components: None,
            security: Vec::new(),
            tags: Vec::new(),
            external_docs: None,
            extensions: Extensions::new(),
        }
    }
}

impl OpenApi {
    /// Create an empty document carrying only the protocol version
    pub fn new() -> Self {
        Self::default()
    }

    /// Components section, created on first write
    pub fn components_mut(&mut self) -> &mut Components {
        self.components.get_or_insert_with(Components::default)
    }

    /// Look up a registered tag by name
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Register a tag definition unless one with the same name already exists
    pub fn add_tag(&mut self, tag: Tag) {
        if self.tag(&tag.name).is_none() {
            self.tags.push(tag);
        }
    }

    /// Iterate over every operation in path order
    pub fn operations(&self) -> impl Iterator<Item = (&str, HttpMethod, &Operation)> {
        self.paths.iter().flat_map(|(path, item)| {
            item.operations()
                .map(move |(method, op)| (path.as_str(), method, op))
        })
    }
}

/// OpenAPI Info object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct License {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Server hosting the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, ServerVariable>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerVariable {
    pub default: String,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enumeration: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Tag used to group operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalDocs {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Reusable components, keyed by kind and then by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Components {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Schema>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, Response>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub examples: IndexMap<String, Example>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub request_bodies: IndexMap<String, RequestBody>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Header>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub links: IndexMap<String, Link>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub callbacks: IndexMap<String, Callback>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.responses.is_empty()
            && self.parameters.is_empty()
            && self.examples.is_empty()
            && self.request_bodies.is_empty()
            && self.headers.is_empty()
            && self.security_schemes.is_empty()
            && self.links.is_empty()
            && self.callbacks.is_empty()
            && self.extensions.is_empty()
    }
}

/// Security scheme definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityScheme {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub scheme_type: Option<SecuritySchemeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Header, query or cookie name for `apiKey` schemes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<ApiKeyLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<OAuthFlows>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_id_connect_url: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecuritySchemeType {
    ApiKey,
    Http,
    Oauth2,
    OpenIdConnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Query,
    Header,
    Cookie,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OAuthFlows {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<OAuthFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<OAuthFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_credentials: Option<OAuthFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<OAuthFlow>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OAuthFlow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
    pub scopes: IndexMap<String, String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Component section a reference points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Schemas,
    Responses,
    Parameters,
    Examples,
    RequestBodies,
    Headers,
    SecuritySchemes,
    Links,
    Callbacks,
}

impl ComponentKind {
    /// Key of this kind under `#/components/`
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Schemas => "schemas",
            ComponentKind::Responses => "responses",
            ComponentKind::Parameters => "parameters",
            ComponentKind::Examples => "examples",
            ComponentKind::RequestBodies => "requestBodies",
            ComponentKind::Headers => "headers",
            ComponentKind::SecuritySchemes => "securitySchemes",
            ComponentKind::Links => "links",
            ComponentKind::Callbacks => "callbacks",
        }
    }
}

/// Expand a bare component name into `#/components/<kind>/<name>`.
///
/// Values that already look like a pointer (leading `#`) are kept as is.
pub fn component_ref(kind: ComponentKind, name: &str) -> String {
    if name.starts_with('#') {
        name.to_string()
    } else {
        format!("#/components/{}/{}", kind.as_str(), name)
    }
}

/// A node that may stand in for a component via `$ref`
pub trait Referenceable {
    const KIND: ComponentKind;

    fn reference(&self) -> Option<&str>;

    fn reference_mut(&mut self) -> &mut Option<String>;

    /// Point this node at a component, canonicalizing bare names
    fn set_reference(&mut self, reference: &str) {
        *self.reference_mut() = Some(component_ref(Self::KIND, reference));
    }

    /// Build a pure reference node
    fn from_reference(reference: &str) -> Self
    where
        Self: Default,
    {
        let mut node = Self::default();
        node.set_reference(reference);
        node
    }
}

macro_rules! referenceable {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Referenceable for $ty {
                const KIND: ComponentKind = ComponentKind::$kind;

                fn reference(&self) -> Option<&str> {
                    self.reference.as_deref()
                }

                fn reference_mut(&mut self) -> &mut Option<String> {
                    &mut self.reference
                }
            }
        )*
    };
}

referenceable! {
    Schema => Schemas,
    Response => Responses,
    Parameter => Parameters,
    Example => Examples,
    RequestBody => RequestBodies,
    Header => Headers,
    SecurityScheme => SecuritySchemes,
    Link => Links,
    Callback => Callbacks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_only_has_version() {
        let doc = OpenApi::new();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json, serde_json::json!({ "openapi": "3.0.3" }));
    }

    #[test]
    fn test_component_ref_expands_bare_names() {
        assert_eq!(
            component_ref(ComponentKind::Schemas, "User"),
            "#/components/schemas/User"
        );
        assert_eq!(
            component_ref(ComponentKind::RequestBodies, "NewUser"),
            "#/components/requestBodies/NewUser"
        );
    }

    #[test]
    fn test_component_ref_keeps_pointers() {
        assert_eq!(
            component_ref(ComponentKind::Schemas, "#/components/schemas/Other"),
            "#/components/schemas/Other"
        );
    }

    #[test]
    fn test_set_reference_uses_node_kind() {
        let mut param = Parameter::default();
        param.set_reference("limit");
        assert_eq!(param.reference(), Some("#/components/parameters/limit"));

        let response = Response::from_reference("NotFound");
        assert_eq!(response.reference(), Some("#/components/responses/NotFound"));
    }

    #[test]
    fn test_add_tag_deduplicates_by_name() {
        let mut doc = OpenApi::new();
        doc.add_tag(Tag::new("users"));
        doc.add_tag(Tag {
            name: "users".to_string(),
            description: Some("ignored".to_string()),
            ..Default::default()
        });
        assert_eq!(doc.tags.len(), 1);
        assert!(doc.tags[0].description.is_none());
    }

    #[test]
    fn test_components_created_lazily() {
        let mut doc = OpenApi::new();
        assert!(doc.components.is_none());
        doc.components_mut()
            .schemas
            .insert("Item".to_string(), Schema::default());
        assert!(doc.components.is_some());
    }

    #[test]
    fn test_extensions_are_flattened() {
        let mut tag = Tag::new("admin");
        tag.extensions
            .insert("x-internal".to_string(), serde_json::Value::Bool(true));
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "admin", "x-internal": true }));

        let back: Tag = serde_json::from_value(json).unwrap();
        assert_eq!(back, tag);
    }

    #[test]
    fn test_security_scheme_type_serializes_declared_form() {
        let scheme = SecurityScheme {
            scheme_type: Some(SecuritySchemeType::ApiKey),
            name: Some("X-Api-Key".to_string()),
            location: Some(ApiKeyLocation::Header),
            ..Default::default()
        };
        let json = serde_json::to_value(&scheme).unwrap();
        assert_eq!(json["type"], "apiKey");
        assert_eq!(json["in"], "header");
    }
}
