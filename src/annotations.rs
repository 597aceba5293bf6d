//! Declarative metadata attached to endpoint declarations.
//!
//! These structs are a faithful, untyped-as-written capture of the attributes
//! found in source (`#[schema(..)]`, `#[api_response(..)]`, ...). Nothing here
//! is validated: numeric bounds stay as text and example values stay as
//! written until the [`mapper`](crate::mapper) and the
//! [`schema_generator`](crate::schema_generator) turn them into document
//! nodes.

use crate::document::{ApiKeyLocation, HttpMethod, ParameterIn, ParameterStyle, SecuritySchemeType};
use crate::model::TypeRef;

/// `#[schema(..)]` on a type, a field, or nested inside other metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMeta {
    /// Component name override (type level) or property name override (field level)
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Explicit `type`, as written
    pub schema_type: Option<String>,
    pub format: Option<String>,
    /// Infer from this type instead of the declared one
    pub implementation: Option<TypeRef>,
    /// Explicit reference; short-circuits inference
    pub reference: Option<String>,
    pub minimum: Option<String>,
    pub maximum: Option<String>,
    pub multiple_of: Option<String>,
    pub exclusive_minimum: Option<bool>,
    pub exclusive_maximum: Option<bool>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: Option<bool>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    pub enumeration: Vec<String>,
    pub nullable: Option<bool>,
    pub read_only: Option<bool>,
    pub write_only: Option<bool>,
    pub deprecated: Option<bool>,
    pub default_value: Option<String>,
    pub example: Option<String>,
    pub required: Option<bool>,
    pub hidden: bool,
    pub one_of: Vec<TypeRef>,
    pub any_of: Vec<TypeRef>,
    pub all_of: Vec<TypeRef>,
    pub not: Option<TypeRef>,
    pub discriminator_property: Option<String>,
    pub discriminator_mapping: Vec<DiscriminatorMappingMeta>,
    pub external_docs: Option<ExternalDocsMeta>,
    pub extensions: Vec<ExtensionMeta>,
}

impl SchemaMeta {
    /// Whether the metadata fully determines the schema without looking at the declared type
    pub fn overrides_structure(&self) -> bool {
        self.reference.is_some() || self.schema_type.is_some() || self.implementation.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminatorMappingMeta {
    pub value: String,
    pub schema: TypeRef,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalDocsMeta {
    pub url: String,
    pub description: Option<String>,
}

/// `#[extension(name = "x-..", value = "..")]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionMeta {
    pub name: String,
    pub value: String,
    /// Parse `value` as JSON instead of keeping it as a string
    pub parse_value: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoMeta {
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub terms_of_service: Option<String>,
    pub contact: Option<ContactMeta>,
    pub license: Option<LicenseMeta>,
    pub extensions: Vec<ExtensionMeta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactMeta {
    pub name: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LicenseMeta {
    pub name: String,
    pub url: Option<String>,
}

/// `#[tag(name = "..")]` defines a tag, `#[tag(ref = "..")]` refers to one by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagMeta {
    pub name: Option<String>,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub external_docs: Option<ExternalDocsMeta>,
    pub extensions: Vec<ExtensionMeta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerMeta {
    pub url: String,
    pub description: Option<String>,
    pub variables: Vec<ServerVariableMeta>,
    pub extensions: Vec<ExtensionMeta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerVariableMeta {
    pub name: String,
    pub default: String,
    pub enumeration: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecuritySchemeMeta {
    /// Component key the scheme is registered under
    pub name: String,
    pub scheme_type: Option<SecuritySchemeType>,
    pub description: Option<String>,
    /// Header, query or cookie name for API keys
    pub api_key_name: Option<String>,
    pub location: Option<ApiKeyLocation>,
    pub scheme: Option<String>,
    pub bearer_format: Option<String>,
    pub flows: Option<OAuthFlowsMeta>,
    pub open_id_connect_url: Option<String>,
    pub reference: Option<String>,
    pub extensions: Vec<ExtensionMeta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OAuthFlowsMeta {
    pub implicit: Option<OAuthFlowMeta>,
    pub password: Option<OAuthFlowMeta>,
    pub client_credentials: Option<OAuthFlowMeta>,
    pub authorization_code: Option<OAuthFlowMeta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OAuthFlowMeta {
    pub authorization_url: Option<String>,
    pub token_url: Option<String>,
    pub refresh_url: Option<String>,
    /// (scope, description)
    pub scopes: Vec<(String, String)>,
}

/// One scheme inside a security requirement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityRequirementMeta {
    pub name: String,
    pub scopes: Vec<String>,
}

/// Schemes that must all be satisfied together; alternatives are separate sets
pub type SecurityRequirementSet = Vec<SecurityRequirementMeta>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExampleMeta {
    pub name: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub value: Option<String>,
    pub external_value: Option<String>,
    pub parse_value: bool,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentMeta {
    pub media_type: Option<String>,
    pub schema: Option<SchemaMeta>,
    pub example: Option<String>,
    pub examples: Vec<ExampleMeta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMeta {
    pub name: String,
    pub description: Option<String>,
    pub required: Option<bool>,
    pub deprecated: Option<bool>,
    pub schema: Option<SchemaMeta>,
    pub reference: Option<String>,
    pub extensions: Vec<ExtensionMeta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkMeta {
    pub name: String,
    pub operation_id: Option<String>,
    pub operation_ref: Option<String>,
    pub description: Option<String>,
    /// (parameter name, runtime expression)
    pub parameters: Vec<(String, String)>,
    pub request_body: Option<String>,
    pub server: Option<ServerMeta>,
    pub reference: Option<String>,
    pub extensions: Vec<ExtensionMeta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMeta {
    pub name: Option<String>,
    pub location: Option<ParameterIn>,
    pub description: Option<String>,
    pub required: Option<bool>,
    pub deprecated: Option<bool>,
    pub allow_empty_value: Option<bool>,
    pub style: Option<ParameterStyle>,
    pub explode: Option<bool>,
    pub allow_reserved: Option<bool>,
    pub schema: Option<SchemaMeta>,
    pub example: Option<String>,
    pub examples: Vec<ExampleMeta>,
    pub content: Vec<ContentMeta>,
    pub reference: Option<String>,
    pub hidden: bool,
    pub extensions: Vec<ExtensionMeta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBodyMeta {
    pub description: Option<String>,
    pub required: Option<bool>,
    pub content: Vec<ContentMeta>,
    pub reference: Option<String>,
    pub extensions: Vec<ExtensionMeta>,
}

/// `#[api_response(status = 200, ..)]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponseMeta {
    /// Status code or `default`
    pub status: String,
    pub description: Option<String>,
    pub content: Vec<ContentMeta>,
    pub headers: Vec<HeaderMeta>,
    pub links: Vec<LinkMeta>,
    pub reference: Option<String>,
    pub extensions: Vec<ExtensionMeta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationMeta {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub operation_id: Option<String>,
    pub deprecated: Option<bool>,
    pub hidden: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackMeta {
    pub name: String,
    /// Runtime expression the callback path is keyed by
    pub expression: String,
    pub operations: Vec<CallbackOperationMeta>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallbackOperationMeta {
    pub method: HttpMethod,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<ParameterMeta>,
    pub request_body: Option<RequestBodyMeta>,
    pub responses: Vec<ApiResponseMeta>,
}

/// `#[openapi_definition(..)]`: document-level metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionMeta {
    pub info: Option<InfoMeta>,
    pub servers: Vec<ServerMeta>,
    pub tags: Vec<TagMeta>,
    pub security: Vec<SecurityRequirementSet>,
    pub external_docs: Option<ExternalDocsMeta>,
    pub extensions: Vec<ExtensionMeta>,
}

impl DefinitionMeta {
    /// Fold another definition into this one; first writer wins for singular fields
    pub fn merge(&mut self, other: DefinitionMeta) {
        if self.info.is_none() {
            self.info = other.info;
        }
        if self.external_docs.is_none() {
            self.external_docs = other.external_docs;
        }
        self.servers.extend(other.servers);
        self.tags.extend(other.tags);
        self.security.extend(other.security);
        self.extensions.extend(other.extensions);
    }
}
