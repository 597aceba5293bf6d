//! Attribute vocabulary.
//!
//! Attributes are matched by their last path segment, so `#[get]` and
//! `#[oas::get]` are the same attribute. Keys inside an attribute follow the
//! OpenAPI field names in snake_case (`operation_id`, `read_only`, ...);
//! `type`, `in` and `ref` are accepted as keys even though they are keywords.

use crate::annotations::{
    ApiResponseMeta, CallbackMeta, CallbackOperationMeta, ContactMeta, ContentMeta,
    DefinitionMeta, DiscriminatorMappingMeta, ExampleMeta, ExtensionMeta, ExternalDocsMeta,
    HeaderMeta, InfoMeta, LicenseMeta, LinkMeta, OAuthFlowMeta, OAuthFlowsMeta, OperationMeta,
    ParameterMeta, RequestBodyMeta, SchemaMeta, SecurityRequirementMeta, SecurityRequirementSet,
    SecuritySchemeMeta, ServerMeta, ServerVariableMeta, TagMeta,
};
use crate::document::{ApiKeyLocation, HttpMethod, ParameterIn, ParameterStyle, SecuritySchemeType};
use crate::model::{Binding, TypeRef};
use crate::reader::types::type_ref;
use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Lit, LitStr, Meta, Token, UnOp};

type KeyFn<T> = fn(&mut T, &ParseNestedMeta) -> syn::Result<()>;

/// Last path segment of an attribute
pub fn attr_name(attr: &Attribute) -> Option<String> {
    attr.path().segments.last().map(|s| s.ident.to_string())
}

fn key(meta: &ParseNestedMeta) -> String {
    meta.path
        .segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_default()
}

fn unsupported(meta: &ParseNestedMeta, context: &str) -> syn::Error {
    meta.error(format!("unsupported {} key '{}'", context, key(meta)))
}

pub fn lit_str(meta: &ParseNestedMeta) -> syn::Result<String> {
    let lit: LitStr = meta.value()?.parse()?;
    Ok(lit.value())
}

/// Bare key means `true`; `key = false` is also accepted
fn flag(meta: &ParseNestedMeta) -> syn::Result<bool> {
    if meta.input.peek(Token![=]) {
        let lit: syn::LitBool = meta.value()?.parse()?;
        Ok(lit.value)
    } else {
        Ok(true)
    }
}

fn literal_text(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Ok(s.value()),
            Lit::Int(i) => Ok(i.base10_digits().to_string()),
            Lit::Float(f) => Ok(f.base10_digits().to_string()),
            Lit::Bool(b) => Ok(b.value.to_string()),
            other => Err(syn::Error::new(other.span(), "unsupported literal")),
        },
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => {
            Ok(format!("-{}", literal_text(&unary.expr)?))
        }
        Expr::Group(group) => literal_text(&group.expr),
        other => Err(syn::Error::new_spanned(other, "expected a literal")),
    }
}

/// Any literal, kept as written (numbers keep their digits)
fn text(meta: &ParseNestedMeta) -> syn::Result<String> {
    let expr: Expr = meta.value()?.parse()?;
    literal_text(&expr)
}

fn int(meta: &ParseNestedMeta) -> syn::Result<u64> {
    let lit: syn::LitInt = meta.value()?.parse()?;
    lit.base10_parse()
}

/// `key = "a"` or `key = ["a", "b"]`
fn text_list(meta: &ParseNestedMeta) -> syn::Result<Vec<String>> {
    let expr: Expr = meta.value()?.parse()?;
    match &expr {
        Expr::Array(array) => array.elems.iter().map(literal_text).collect(),
        other => Ok(vec![literal_text(other)?]),
    }
}

/// `key = "Vec<Item>"` or `key = Item`
fn type_value(meta: &ParseNestedMeta) -> syn::Result<TypeRef> {
    let input = meta.value()?;
    let ty: syn::Type = if input.peek(LitStr) {
        input.parse::<LitStr>()?.parse()?
    } else {
        input.parse()?
    };
    Ok(type_ref(&ty))
}

/// `key(A, B<C>)` or `key = ["A", "B<C>"]`
fn type_list(meta: &ParseNestedMeta) -> syn::Result<Vec<TypeRef>> {
    if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let types = Punctuated::<syn::Type, Token![,]>::parse_terminated(&content)?;
        return Ok(types.iter().map(type_ref).collect());
    }
    let mut types = Vec::new();
    for name in text_list(meta)? {
        let ty: syn::Type = syn::parse_str(&name)?;
        types.push(type_ref(&ty));
    }
    Ok(types)
}

fn nested<T: Default>(meta: &ParseNestedMeta, apply: KeyFn<T>) -> syn::Result<T> {
    let mut value = T::default();
    meta.parse_nested_meta(|inner| apply(&mut value, &inner))?;
    Ok(value)
}

fn from_attr<T: Default>(attr: &Attribute, apply: KeyFn<T>) -> syn::Result<T> {
    let mut value = T::default();
    if let Meta::List(_) = attr.meta {
        attr.parse_nested_meta(|inner| apply(&mut value, &inner))?;
    }
    Ok(value)
}

pub fn is_deprecated(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|a| a.path().is_ident("deprecated"))
}

/// `#[schema(..)]`; several attributes are folded into one
pub fn schema_attr(attrs: &[Attribute]) -> syn::Result<Option<SchemaMeta>> {
    let mut found = None;
    for attr in attrs {
        if attr_name(attr).as_deref() == Some("schema") {
            let schema = found.get_or_insert_with(SchemaMeta::default);
            if let Meta::List(_) = attr.meta {
                attr.parse_nested_meta(|meta| schema_key(schema, &meta))?;
            }
        }
    }
    Ok(found)
}

fn schema_key(schema: &mut SchemaMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "name" => schema.name = Some(lit_str(meta)?),
        "title" => schema.title = Some(lit_str(meta)?),
        "description" => schema.description = Some(lit_str(meta)?),
        "type" => schema.schema_type = Some(lit_str(meta)?),
        "format" => schema.format = Some(lit_str(meta)?),
        "implementation" => schema.implementation = Some(type_value(meta)?),
        "ref" => schema.reference = Some(lit_str(meta)?),
        "minimum" => schema.minimum = Some(text(meta)?),
        "maximum" => schema.maximum = Some(text(meta)?),
        "multiple_of" => schema.multiple_of = Some(text(meta)?),
        "exclusive_minimum" => schema.exclusive_minimum = Some(flag(meta)?),
        "exclusive_maximum" => schema.exclusive_maximum = Some(flag(meta)?),
        "min_length" => schema.min_length = Some(int(meta)?),
        "max_length" => schema.max_length = Some(int(meta)?),
        "pattern" => schema.pattern = Some(lit_str(meta)?),
        "min_items" => schema.min_items = Some(int(meta)?),
        "max_items" => schema.max_items = Some(int(meta)?),
        "unique_items" => schema.unique_items = Some(flag(meta)?),
        "min_properties" => schema.min_properties = Some(int(meta)?),
        "max_properties" => schema.max_properties = Some(int(meta)?),
        "enumeration" | "allowable_values" => schema.enumeration = text_list(meta)?,
        "nullable" => schema.nullable = Some(flag(meta)?),
        "read_only" => schema.read_only = Some(flag(meta)?),
        "write_only" => schema.write_only = Some(flag(meta)?),
        "deprecated" => schema.deprecated = Some(flag(meta)?),
        "default" => schema.default_value = Some(text(meta)?),
        "example" => schema.example = Some(text(meta)?),
        "required" => schema.required = Some(flag(meta)?),
        "hidden" => schema.hidden = flag(meta)?,
        "one_of" => schema.one_of = type_list(meta)?,
        "any_of" => schema.any_of = type_list(meta)?,
        "all_of" => schema.all_of = type_list(meta)?,
        "not" => schema.not = Some(type_value(meta)?),
        "discriminator_property" => schema.discriminator_property = Some(lit_str(meta)?),
        "discriminator_mapping" => schema.discriminator_mapping.push(discriminator_mapping(meta)?),
        "external_docs" => schema.external_docs = Some(nested(meta, external_docs_key)?),
        "extension" => schema.extensions.push(nested(meta, extension_key)?),
        _ => return Err(unsupported(meta, "schema")),
    }
    Ok(())
}

fn discriminator_mapping(meta: &ParseNestedMeta) -> syn::Result<DiscriminatorMappingMeta> {
    let mut value = None;
    let mut schema = None;
    meta.parse_nested_meta(|inner| {
        match key(&inner).as_str() {
            "value" => value = Some(lit_str(&inner)?),
            "schema" => schema = Some(type_value(&inner)?),
            _ => return Err(unsupported(&inner, "discriminator_mapping")),
        }
        Ok(())
    })?;
    match (value, schema) {
        (Some(value), Some(schema)) => Ok(DiscriminatorMappingMeta { value, schema }),
        _ => Err(meta.error("discriminator_mapping needs `value` and `schema`")),
    }
}

fn external_docs_key(docs: &mut ExternalDocsMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "url" => docs.url = lit_str(meta)?,
        "description" => docs.description = Some(lit_str(meta)?),
        _ => return Err(unsupported(meta, "external_docs")),
    }
    Ok(())
}

fn extension_key(ext: &mut ExtensionMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "name" => ext.name = lit_str(meta)?,
        "value" => ext.value = text(meta)?,
        "parse_value" => ext.parse_value = flag(meta)?,
        _ => return Err(unsupported(meta, "extension")),
    }
    Ok(())
}

fn example_key(example: &mut ExampleMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "name" => example.name = lit_str(meta)?,
        "summary" => example.summary = Some(lit_str(meta)?),
        "description" => example.description = Some(lit_str(meta)?),
        "value" => example.value = Some(text(meta)?),
        "external_value" => example.external_value = Some(lit_str(meta)?),
        "parse_value" => example.parse_value = flag(meta)?,
        "ref" => example.reference = Some(lit_str(meta)?),
        _ => return Err(unsupported(meta, "example")),
    }
    Ok(())
}

fn content_key(content: &mut ContentMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "media_type" => content.media_type = Some(lit_str(meta)?),
        "schema" => content.schema = Some(nested(meta, schema_key)?),
        "example" if meta.input.peek(syn::token::Paren) => {
            content.examples.push(nested(meta, example_key)?)
        }
        "example" => content.example = Some(text(meta)?),
        _ => return Err(unsupported(meta, "content")),
    }
    Ok(())
}

fn header_key(header: &mut HeaderMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "name" => header.name = lit_str(meta)?,
        "description" => header.description = Some(lit_str(meta)?),
        "required" => header.required = Some(flag(meta)?),
        "deprecated" => header.deprecated = Some(flag(meta)?),
        "schema" => header.schema = Some(nested(meta, schema_key)?),
        "ref" => header.reference = Some(lit_str(meta)?),
        "extension" => header.extensions.push(nested(meta, extension_key)?),
        _ => return Err(unsupported(meta, "header")),
    }
    Ok(())
}

fn server_variable_key(
    variable: &mut ServerVariableMeta,
    meta: &ParseNestedMeta,
) -> syn::Result<()> {
    match key(meta).as_str() {
        "name" => variable.name = lit_str(meta)?,
        "default" => variable.default = text(meta)?,
        "enumeration" | "allowable_values" => variable.enumeration = text_list(meta)?,
        "description" => variable.description = Some(lit_str(meta)?),
        _ => return Err(unsupported(meta, "server variable")),
    }
    Ok(())
}

fn server_key(server: &mut ServerMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "url" => server.url = lit_str(meta)?,
        "description" => server.description = Some(lit_str(meta)?),
        "variable" => server.variables.push(nested(meta, server_variable_key)?),
        "extension" => server.extensions.push(nested(meta, extension_key)?),
        _ => return Err(unsupported(meta, "server")),
    }
    Ok(())
}

fn link_key(link: &mut LinkMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "name" => link.name = lit_str(meta)?,
        "operation_id" => link.operation_id = Some(lit_str(meta)?),
        "operation_ref" => link.operation_ref = Some(lit_str(meta)?),
        "description" => link.description = Some(lit_str(meta)?),
        "parameter" => {
            let mut name = String::new();
            let mut expression = String::new();
            meta.parse_nested_meta(|inner| {
                match key(&inner).as_str() {
                    "name" => name = lit_str(&inner)?,
                    "expression" => expression = lit_str(&inner)?,
                    _ => return Err(unsupported(&inner, "link parameter")),
                }
                Ok(())
            })?;
            link.parameters.push((name, expression));
        }
        "request_body" => link.request_body = Some(lit_str(meta)?),
        "server" => link.server = Some(nested(meta, server_key)?),
        "ref" => link.reference = Some(lit_str(meta)?),
        "extension" => link.extensions.push(nested(meta, extension_key)?),
        _ => return Err(unsupported(meta, "link")),
    }
    Ok(())
}

fn api_response_key(response: &mut ApiResponseMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "status" | "response_code" => response.status = text(meta)?,
        "description" => response.description = Some(lit_str(meta)?),
        "content" => response.content.push(nested(meta, content_key)?),
        "header" => response.headers.push(nested(meta, header_key)?),
        "link" => response.links.push(nested(meta, link_key)?),
        "ref" => response.reference = Some(lit_str(meta)?),
        "extension" => response.extensions.push(nested(meta, extension_key)?),
        _ => return Err(unsupported(meta, "api_response")),
    }
    Ok(())
}

fn request_body_key(body: &mut RequestBodyMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "description" => body.description = Some(lit_str(meta)?),
        "required" => body.required = Some(flag(meta)?),
        "content" => body.content.push(nested(meta, content_key)?),
        "ref" => body.reference = Some(lit_str(meta)?),
        "extension" => body.extensions.push(nested(meta, extension_key)?),
        _ => return Err(unsupported(meta, "request_body")),
    }
    Ok(())
}

fn parameter_key(param: &mut ParameterMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "name" => param.name = Some(lit_str(meta)?),
        "in" => {
            let location = lit_str(meta)?;
            param.location = Some(
                ParameterIn::parse(&location)
                    .ok_or_else(|| meta.error(format!("unknown parameter location '{}'", location)))?,
            );
        }
        "description" => param.description = Some(lit_str(meta)?),
        "required" => param.required = Some(flag(meta)?),
        "deprecated" => param.deprecated = Some(flag(meta)?),
        "allow_empty_value" => param.allow_empty_value = Some(flag(meta)?),
        "style" => {
            let style = lit_str(meta)?;
            param.style = Some(
                ParameterStyle::parse(&style)
                    .ok_or_else(|| meta.error(format!("unknown parameter style '{}'", style)))?,
            );
        }
        "explode" => param.explode = Some(flag(meta)?),
        "allow_reserved" => param.allow_reserved = Some(flag(meta)?),
        "schema" => param.schema = Some(nested(meta, schema_key)?),
        "example" if meta.input.peek(syn::token::Paren) => {
            param.examples.push(nested(meta, example_key)?)
        }
        "example" => param.example = Some(text(meta)?),
        "content" => param.content.push(nested(meta, content_key)?),
        "ref" => param.reference = Some(lit_str(meta)?),
        "hidden" => param.hidden = flag(meta)?,
        "extension" => param.extensions.push(nested(meta, extension_key)?),
        _ => return Err(unsupported(meta, "parameter")),
    }
    Ok(())
}

fn operation_key(op: &mut OperationMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "summary" => op.summary = Some(lit_str(meta)?),
        "description" => op.description = Some(lit_str(meta)?),
        "operation_id" => op.operation_id = Some(lit_str(meta)?),
        "deprecated" => op.deprecated = Some(flag(meta)?),
        "hidden" => op.hidden = flag(meta)?,
        _ => return Err(unsupported(meta, "operation")),
    }
    Ok(())
}

fn tag_key(tag: &mut TagMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "name" => tag.name = Some(lit_str(meta)?),
        "ref" => tag.reference = Some(lit_str(meta)?),
        "description" => tag.description = Some(lit_str(meta)?),
        "external_docs" => tag.external_docs = Some(nested(meta, external_docs_key)?),
        "extension" => tag.extensions.push(nested(meta, extension_key)?),
        _ => return Err(unsupported(meta, "tag")),
    }
    Ok(())
}

fn requirement_key(req: &mut SecurityRequirementMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "name" => req.name = lit_str(meta)?,
        "scopes" => req.scopes = text_list(meta)?,
        _ => return Err(unsupported(meta, "security_requirement")),
    }
    Ok(())
}

fn requirements_set_key(
    set: &mut SecurityRequirementSet,
    meta: &ParseNestedMeta,
) -> syn::Result<()> {
    match key(meta).as_str() {
        "requirement" | "security_requirement" => set.push(nested(meta, requirement_key)?),
        _ => return Err(unsupported(meta, "security_requirements_set")),
    }
    Ok(())
}

fn oauth_flow_key(flow: &mut OAuthFlowMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "authorization_url" => flow.authorization_url = Some(lit_str(meta)?),
        "token_url" => flow.token_url = Some(lit_str(meta)?),
        "refresh_url" => flow.refresh_url = Some(lit_str(meta)?),
        "scope" => {
            let mut name = String::new();
            let mut description = String::new();
            meta.parse_nested_meta(|inner| {
                match key(&inner).as_str() {
                    "name" => name = lit_str(&inner)?,
                    "description" => description = lit_str(&inner)?,
                    _ => return Err(unsupported(&inner, "scope")),
                }
                Ok(())
            })?;
            flow.scopes.push((name, description));
        }
        _ => return Err(unsupported(meta, "oauth flow")),
    }
    Ok(())
}

fn oauth_flows_key(flows: &mut OAuthFlowsMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "implicit" => flows.implicit = Some(nested(meta, oauth_flow_key)?),
        "password" => flows.password = Some(nested(meta, oauth_flow_key)?),
        "client_credentials" => flows.client_credentials = Some(nested(meta, oauth_flow_key)?),
        "authorization_code" => flows.authorization_code = Some(nested(meta, oauth_flow_key)?),
        _ => return Err(unsupported(meta, "flows")),
    }
    Ok(())
}

fn security_scheme_key(scheme: &mut SecuritySchemeMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "name" => scheme.name = lit_str(meta)?,
        "type" => {
            let value = lit_str(meta)?;
            scheme.scheme_type = Some(match value.as_str() {
                "apiKey" | "api_key" => SecuritySchemeType::ApiKey,
                "http" => SecuritySchemeType::Http,
                "oauth2" => SecuritySchemeType::Oauth2,
                "openIdConnect" | "open_id_connect" => SecuritySchemeType::OpenIdConnect,
                other => {
                    return Err(meta.error(format!("unknown security scheme type '{}'", other)))
                }
            });
        }
        "description" => scheme.description = Some(lit_str(meta)?),
        "param_name" => scheme.api_key_name = Some(lit_str(meta)?),
        "in" => {
            let value = lit_str(meta)?;
            scheme.location = Some(match value.as_str() {
                "query" => ApiKeyLocation::Query,
                "header" => ApiKeyLocation::Header,
                "cookie" => ApiKeyLocation::Cookie,
                other => return Err(meta.error(format!("unknown api key location '{}'", other))),
            });
        }
        "scheme" => scheme.scheme = Some(lit_str(meta)?),
        "bearer_format" => scheme.bearer_format = Some(lit_str(meta)?),
        "flows" => scheme.flows = Some(nested(meta, oauth_flows_key)?),
        "open_id_connect_url" => scheme.open_id_connect_url = Some(lit_str(meta)?),
        "ref" => scheme.reference = Some(lit_str(meta)?),
        "extension" => scheme.extensions.push(nested(meta, extension_key)?),
        _ => return Err(unsupported(meta, "security_scheme")),
    }
    Ok(())
}

fn callback_operation(meta: &ParseNestedMeta) -> syn::Result<CallbackOperationMeta> {
    let mut method = None;
    let mut operation = CallbackOperationMeta {
        method: HttpMethod::Post,
        summary: None,
        description: None,
        parameters: Vec::new(),
        request_body: None,
        responses: Vec::new(),
    };
    meta.parse_nested_meta(|inner| {
        match key(&inner).as_str() {
            "method" => {
                let value = lit_str(&inner)?;
                method = Some(
                    HttpMethod::parse(&value)
                        .ok_or_else(|| inner.error(format!("unknown method '{}'", value)))?,
                );
            }
            "summary" => operation.summary = Some(lit_str(&inner)?),
            "description" => operation.description = Some(lit_str(&inner)?),
            "parameter" => operation.parameters.push(nested(&inner, parameter_key)?),
            "request_body" => operation.request_body = Some(nested(&inner, request_body_key)?),
            "api_response" => operation.responses.push(nested(&inner, api_response_key)?),
            _ => return Err(unsupported(&inner, "callback operation")),
        }
        Ok(())
    })?;
    operation.method = method.ok_or_else(|| meta.error("callback operation needs `method`"))?;
    Ok(operation)
}

fn callback_key(callback: &mut CallbackMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "name" => callback.name = lit_str(meta)?,
        "expression" | "callback_url_expression" => callback.expression = lit_str(meta)?,
        "operation" => callback.operations.push(callback_operation(meta)?),
        "ref" => callback.reference = Some(lit_str(meta)?),
        _ => return Err(unsupported(meta, "callback")),
    }
    Ok(())
}

fn info_key(info: &mut InfoMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "title" => info.title = Some(lit_str(meta)?),
        "version" => info.version = Some(lit_str(meta)?),
        "description" => info.description = Some(lit_str(meta)?),
        "terms_of_service" => info.terms_of_service = Some(lit_str(meta)?),
        "contact" => {
            let mut contact = ContactMeta::default();
            meta.parse_nested_meta(|inner| {
                match key(&inner).as_str() {
                    "name" => contact.name = Some(lit_str(&inner)?),
                    "url" => contact.url = Some(lit_str(&inner)?),
                    "email" => contact.email = Some(lit_str(&inner)?),
                    _ => return Err(unsupported(&inner, "contact")),
                }
                Ok(())
            })?;
            info.contact = Some(contact);
        }
        "license" => {
            let mut license = LicenseMeta::default();
            meta.parse_nested_meta(|inner| {
                match key(&inner).as_str() {
                    "name" => license.name = lit_str(&inner)?,
                    "url" => license.url = Some(lit_str(&inner)?),
                    _ => return Err(unsupported(&inner, "license")),
                }
                Ok(())
            })?;
            info.license = Some(license);
        }
        "extension" => info.extensions.push(nested(meta, extension_key)?),
        _ => return Err(unsupported(meta, "info")),
    }
    Ok(())
}

fn definition_key(definition: &mut DefinitionMeta, meta: &ParseNestedMeta) -> syn::Result<()> {
    match key(meta).as_str() {
        "info" => definition.info = Some(nested(meta, info_key)?),
        "server" => definition.servers.push(nested(meta, server_key)?),
        "tag" => definition.tags.push(nested(meta, tag_key)?),
        "security_requirement" => definition
            .security
            .push(vec![nested(meta, requirement_key)?]),
        "security_requirements_set" => definition
            .security
            .push(nested(meta, requirements_set_key)?),
        "external_docs" => definition.external_docs = Some(nested(meta, external_docs_key)?),
        "extension" => definition.extensions.push(nested(meta, extension_key)?),
        _ => return Err(unsupported(meta, "openapi_definition")),
    }
    Ok(())
}

/// `#[get]` or `#[get("/fragment")]`
pub fn verb(attr: &Attribute) -> syn::Result<Option<(HttpMethod, Option<String>)>> {
    let Some(name) = attr_name(attr) else {
        return Ok(None);
    };
    let Some(method) = HttpMethod::ALL.into_iter().find(|m| m.as_str() == name) else {
        return Ok(None);
    };
    let path = match &attr.meta {
        Meta::Path(_) => None,
        Meta::List(_) => Some(attr.parse_args::<LitStr>()?.value()),
        Meta::NameValue(_) => Some(path_value(attr)?),
    };
    Ok(Some((method, path)))
}

/// `#[path("/x")]` or `#[path = "/x"]`
pub fn path_value(attr: &Attribute) -> syn::Result<String> {
    match &attr.meta {
        Meta::NameValue(name_value) => literal_text(&name_value.value),
        Meta::List(_) => Ok(attr.parse_args::<LitStr>()?.value()),
        Meta::Path(path) => Err(syn::Error::new_spanned(path, "expected a path string")),
    }
}

/// `#[produces("application/json", "text/plain")]`
pub fn media_types(attr: &Attribute) -> syn::Result<Vec<String>> {
    let list = attr.parse_args_with(Punctuated::<LitStr, Token![,]>::parse_terminated)?;
    Ok(list.iter().map(LitStr::value).collect())
}

/// `#[path_param]`, `#[query_param("q")]`, ...
pub fn binding(attr: &Attribute, default_name: &str) -> syn::Result<Option<Binding>> {
    let location = match attr_name(attr).as_deref() {
        Some("path_param") => ParameterIn::Path,
        Some("query_param") => ParameterIn::Query,
        Some("header_param") => ParameterIn::Header,
        Some("cookie_param") => ParameterIn::Cookie,
        _ => return Ok(None),
    };
    let name = match &attr.meta {
        Meta::Path(_) => default_name.to_string(),
        _ => path_value(attr)?,
    };
    Ok(Some(Binding { location, name }))
}

pub fn operation(attr: &Attribute) -> syn::Result<OperationMeta> {
    from_attr(attr, operation_key)
}

pub fn parameter(attr: &Attribute) -> syn::Result<ParameterMeta> {
    from_attr(attr, parameter_key)
}

pub fn request_body(attr: &Attribute) -> syn::Result<RequestBodyMeta> {
    from_attr(attr, request_body_key)
}

pub fn api_response(attr: &Attribute) -> syn::Result<ApiResponseMeta> {
    let response: ApiResponseMeta = from_attr(attr, api_response_key)?;
    if response.status.is_empty() && response.reference.is_none() {
        return Err(syn::Error::new_spanned(attr, "api_response needs `status`"));
    }
    Ok(response)
}

pub fn tag(attr: &Attribute) -> syn::Result<TagMeta> {
    from_attr(attr, tag_key)
}

pub fn server(attr: &Attribute) -> syn::Result<ServerMeta> {
    from_attr(attr, server_key)
}

pub fn security_requirement(attr: &Attribute) -> syn::Result<SecurityRequirementSet> {
    Ok(vec![from_attr(attr, requirement_key)?])
}

pub fn security_requirements_set(attr: &Attribute) -> syn::Result<SecurityRequirementSet> {
    from_attr(attr, requirements_set_key)
}

pub fn security_scheme(attr: &Attribute) -> syn::Result<SecuritySchemeMeta> {
    from_attr(attr, security_scheme_key)
}

pub fn callback(attr: &Attribute) -> syn::Result<CallbackMeta> {
    from_attr(attr, callback_key)
}

pub fn external_docs(attr: &Attribute) -> syn::Result<ExternalDocsMeta> {
    from_attr(attr, external_docs_key)
}

pub fn extension(attr: &Attribute) -> syn::Result<ExtensionMeta> {
    from_attr(attr, extension_key)
}

pub fn definition(attr: &Attribute) -> syn::Result<DefinitionMeta> {
    from_attr(attr, definition_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attr(code: &str) -> Attribute {
        let item: syn::ItemStruct = syn::parse_str(&format!("{} struct Target;", code)).unwrap();
        item.attrs.into_iter().next().unwrap()
    }

    #[test]
    fn test_schema_keys_accept_keywords_and_literals() {
        let item: syn::ItemStruct = syn::parse_str(
            r#"
            #[schema(type = "integer", minimum = -5, maximum = 10.5, example = 3, required)]
            #[schema(ref = "Money", enumeration = [1, 2, 3], read_only = false)]
            struct Target;
            "#,
        )
        .unwrap();

        let schema = schema_attr(&item.attrs).unwrap().unwrap();
        assert_eq!(schema.schema_type.as_deref(), Some("integer"));
        assert_eq!(schema.minimum.as_deref(), Some("-5"));
        assert_eq!(schema.maximum.as_deref(), Some("10.5"));
        assert_eq!(schema.example.as_deref(), Some("3"));
        assert_eq!(schema.required, Some(true));
        assert_eq!(schema.reference.as_deref(), Some("Money"));
        assert_eq!(schema.enumeration, vec!["1", "2", "3"]);
        assert_eq!(schema.read_only, Some(false));
    }

    #[test]
    fn test_schema_type_lists() {
        let schema = schema_attr(&[attr(
            r#"#[schema(one_of(Cat, Dog<Bone>), all_of = ["Base"], implementation = "Vec<Item>")]"#,
        )])
        .unwrap()
        .unwrap();

        let names: Vec<_> = schema.one_of.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["Cat", "Dog<Bone>"]);
        assert_eq!(schema.all_of, vec![TypeRef::named("Base")]);
        assert_eq!(
            schema.implementation.map(|t| t.to_string()).as_deref(),
            Some("Vec<Item>")
        );
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let err = schema_attr(&[attr(r#"#[schema(colour = "red")]"#)]).unwrap_err();
        assert!(err.to_string().contains("unsupported schema key 'colour'"));
    }

    #[test]
    fn test_api_response_with_content() {
        let response = api_response(&attr(
            r#"#[api_response(
                status = 404,
                description = "Missing",
                content(media_type = "application/json", schema(implementation = "ApiError")),
                header(name = "X-Trace", schema(type = "string"))
            )]"#,
        ))
        .unwrap();

        assert_eq!(response.status, "404");
        assert_eq!(response.content.len(), 1);
        assert_eq!(
            response.content[0].media_type.as_deref(),
            Some("application/json")
        );
        assert_eq!(response.headers[0].name, "X-Trace");
    }

    #[test]
    fn test_api_response_requires_status() {
        assert!(api_response(&attr(r#"#[api_response(description = "x")]"#)).is_err());
    }

    #[test]
    fn test_verbs_and_paths() {
        assert_eq!(verb(&attr("#[get]")).unwrap(), Some((HttpMethod::Get, None)));
        assert_eq!(
            verb(&attr(r#"#[actix_web::post("/items")]"#)).unwrap(),
            Some((HttpMethod::Post, Some("/items".to_string())))
        );
        assert_eq!(verb(&attr("#[derive(Debug)]")).unwrap(), None);
        assert_eq!(path_value(&attr(r#"#[path("/users")]"#)).unwrap(), "/users");
    }

    #[test]
    fn test_parameter_location_and_style() {
        let param = parameter(&attr(
            r#"#[parameter(name = "filter", in = "query", style = "deepObject", explode)]"#,
        ))
        .unwrap();
        assert_eq!(param.location, Some(ParameterIn::Query));
        assert_eq!(param.style, Some(ParameterStyle::DeepObject));
        assert_eq!(param.explode, Some(true));

        assert!(parameter(&attr(r#"#[parameter(in = "body")]"#)).is_err());
    }

    #[test]
    fn test_binding_defaults_to_argument_name() {
        let bound = binding(&attr("#[path_param]"), "id").unwrap().unwrap();
        assert_eq!(bound.location, ParameterIn::Path);
        assert_eq!(bound.name, "id");

        let named = binding(&attr(r#"#[header_param("X-Request-Id")]"#), "request_id")
            .unwrap()
            .unwrap();
        assert_eq!(named.name, "X-Request-Id");
    }

    #[test]
    fn test_security_scheme_with_flows() {
        let scheme = security_scheme(&attr(
            r#"#[security_scheme(
                name = "oauth",
                type = "oauth2",
                flows(authorization_code(
                    authorization_url = "https://auth.example.com/authorize",
                    token_url = "https://auth.example.com/token",
                    scope(name = "items:read", description = "Read items")
                ))
            )]"#,
        ))
        .unwrap();

        assert_eq!(scheme.scheme_type, Some(SecuritySchemeType::Oauth2));
        let flow = scheme.flows.unwrap().authorization_code.unwrap();
        assert_eq!(
            flow.scopes,
            vec![("items:read".to_string(), "Read items".to_string())]
        );
    }

    #[test]
    fn test_definition() {
        let definition = definition(&attr(
            r#"#[openapi_definition(
                info(title = "Inventory", version = "1.2.0", license(name = "MIT")),
                server(url = "https://{env}.example.com", variable(name = "env", default = "api")),
                tag(name = "items", description = "Stock items"),
                security_requirement(name = "api_key")
            )]"#,
        ))
        .unwrap();

        let info = definition.info.unwrap();
        assert_eq!(info.title.as_deref(), Some("Inventory"));
        assert_eq!(info.license.unwrap().name, "MIT");
        assert_eq!(definition.servers[0].variables[0].default, "api");
        assert_eq!(definition.security.len(), 1);
    }

    #[test]
    fn test_callback_operation_needs_method() {
        assert!(callback(&attr(
            r#"#[callback(name = "hook", expression = "{$url}", operation(summary = "x"))]"#
        ))
        .is_err());
    }
}
