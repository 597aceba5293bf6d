//! Metadata -> document node conversion.
//!
//! Each function takes one metadata struct and returns the node it describes.
//! Nodes that carry schemas borrow the [`SchemaGenerator`] so inferred
//! component schemas land in the same arena as everything else.

use crate::annotations::{
    ApiResponseMeta, CallbackMeta, ContentMeta, ExampleMeta, ExtensionMeta, ExternalDocsMeta,
    HeaderMeta, InfoMeta, LinkMeta, ParameterMeta, RequestBodyMeta, SchemaMeta,
    SecurityRequirementSet, SecuritySchemeMeta, ServerMeta, TagMeta,
};
use crate::document::{
    Callback, Contact, Content, Example, Extensions, ExternalDocs, Header, Info, License, Link,
    MediaType, OAuthFlow, OAuthFlows, Operation, Parameter, PathItem, Referenceable, RequestBody,
    Response, Responses, Schema, SchemaType, SecurityRequirement, SecurityScheme, Server,
    ServerVariable, Tag,
};
use crate::error::{Error, Result};
use crate::model::TypeRef;
use crate::schema_generator::SchemaGenerator;
use log::{debug, warn};
use serde_json::Value;

/// Media type used when neither metadata nor signature names one
pub const WILDCARD_MEDIA_TYPE: &str = "*/*";

/// Interpret a literal written in metadata.
///
/// String-typed schemas keep the text as is; otherwise JSON is tried first
/// and the raw text is the fallback.
pub fn literal(text: &str, hint: Option<SchemaType>) -> Value {
    if hint == Some(SchemaType::String) {
        return Value::String(text.to_string());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Parse a value that was declared to be JSON
pub fn parse_json(field: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| Error::InvalidValue {
        field: field.to_string(),
        message: format!("expected JSON: {}", e),
    })
}

pub fn extensions(metas: &[ExtensionMeta]) -> Result<Extensions> {
    let mut bag = Extensions::new();
    for meta in metas {
        let key = if meta.name.starts_with("x-") {
            meta.name.clone()
        } else {
            format!("x-{}", meta.name)
        };
        let value = if meta.parse_value {
            parse_json(&key, &meta.value)?
        } else {
            Value::String(meta.value.clone())
        };
        bag.insert(key, value);
    }
    Ok(bag)
}

pub fn external_docs(meta: &ExternalDocsMeta) -> ExternalDocs {
    ExternalDocs {
        url: meta.url.clone(),
        description: meta.description.clone(),
        ..Default::default()
    }
}

pub fn info(meta: &InfoMeta) -> Result<Info> {
    Ok(Info {
        title: meta.title.clone().unwrap_or_default(),
        version: meta.version.clone().unwrap_or_default(),
        description: meta.description.clone(),
        terms_of_service: meta.terms_of_service.clone(),
        contact: meta.contact.as_ref().map(|c| Contact {
            name: c.name.clone(),
            url: c.url.clone(),
            email: c.email.clone(),
            ..Default::default()
        }),
        license: meta.license.as_ref().map(|l| License {
            name: l.name.clone(),
            url: l.url.clone(),
            ..Default::default()
        }),
        extensions: extensions(&meta.extensions)?,
    })
}

/// Tag definition; `None` for a reference-only tag
pub fn tag(meta: &TagMeta) -> Result<Option<Tag>> {
    let Some(name) = &meta.name else {
        return Ok(None);
    };
    Ok(Some(Tag {
        name: name.clone(),
        description: meta.description.clone(),
        external_docs: meta.external_docs.as_ref().map(external_docs),
        extensions: extensions(&meta.extensions)?,
    }))
}

pub fn server(meta: &ServerMeta) -> Result<Server> {
    let mut server = Server::new(meta.url.clone());
    server.description = meta.description.clone();
    for variable in &meta.variables {
        server.variables.insert(
            variable.name.clone(),
            ServerVariable {
                default: variable.default.clone(),
                enumeration: variable.enumeration.clone(),
                description: variable.description.clone(),
                ..Default::default()
            },
        );
    }
    server.extensions = extensions(&meta.extensions)?;
    Ok(server)
}

pub fn security_scheme(meta: &SecuritySchemeMeta) -> Result<SecurityScheme> {
    if let Some(reference) = &meta.reference {
        return Ok(SecurityScheme::from_reference(reference));
    }
    let flows = meta.flows.as_ref().map(|flows| {
        let flow = |f: &Option<crate::annotations::OAuthFlowMeta>| {
            f.as_ref().map(|f| OAuthFlow {
                authorization_url: f.authorization_url.clone(),
                token_url: f.token_url.clone(),
                refresh_url: f.refresh_url.clone(),
                scopes: f.scopes.iter().cloned().collect(),
                ..Default::default()
            })
        };
        OAuthFlows {
            implicit: flow(&flows.implicit),
            password: flow(&flows.password),
            client_credentials: flow(&flows.client_credentials),
            authorization_code: flow(&flows.authorization_code),
            ..Default::default()
        }
    });

    Ok(SecurityScheme {
        reference: None,
        scheme_type: meta.scheme_type,
        description: meta.description.clone(),
        name: meta.api_key_name.clone(),
        location: meta.location,
        scheme: meta.scheme.clone(),
        bearer_format: meta.bearer_format.clone(),
        flows,
        open_id_connect_url: meta.open_id_connect_url.clone(),
        extensions: extensions(&meta.extensions)?,
    })
}

pub fn security_requirement(set: &SecurityRequirementSet) -> SecurityRequirement {
    set.iter()
        .map(|r| (r.name.clone(), r.scopes.clone()))
        .collect()
}

pub fn example(meta: &ExampleMeta) -> Result<Example> {
    if let Some(reference) = &meta.reference {
        return Ok(Example::from_reference(reference));
    }
    let value = match &meta.value {
        Some(text) if meta.parse_value => Some(parse_json(&meta.name, text)?),
        Some(text) => Some(Value::String(text.clone())),
        None => None,
    };
    Ok(Example {
        reference: None,
        summary: meta.summary.clone(),
        description: meta.description.clone(),
        value,
        external_value: meta.external_value.clone(),
        extensions: Extensions::new(),
    })
}

pub fn link(meta: &LinkMeta) -> Result<Link> {
    if let Some(reference) = &meta.reference {
        return Ok(Link::from_reference(reference));
    }
    Ok(Link {
        reference: None,
        operation_ref: meta.operation_ref.clone(),
        operation_id: meta.operation_id.clone(),
        parameters: meta
            .parameters
            .iter()
            .map(|(name, expression)| (name.clone(), Value::String(expression.clone())))
            .collect(),
        request_body: meta.request_body.clone().map(Value::String),
        description: meta.description.clone(),
        server: meta.server.as_ref().map(server).transpose()?,
        extensions: extensions(&meta.extensions)?,
    })
}

/// Schema for a node that may declare one and may have a type to infer from
fn node_schema(
    generator: &mut SchemaGenerator<'_>,
    meta: Option<&SchemaMeta>,
    fallback: Option<&TypeRef>,
) -> Result<Option<Schema>> {
    match (meta, fallback) {
        (Some(meta), _) if meta.overrides_structure() => {
            generator.explicit_schema(meta).map(Some)
        }
        (meta, Some(ty)) => generator.member_schema(ty, meta).map(Some),
        (Some(meta), None) => {
            let schema = generator.explicit_schema(meta)?;
            Ok((schema != Schema::default()).then_some(schema))
        }
        (None, None) => Ok(None),
    }
}

pub fn header(generator: &mut SchemaGenerator<'_>, meta: &HeaderMeta) -> Result<Header> {
    if let Some(reference) = &meta.reference {
        return Ok(Header::from_reference(reference));
    }
    let schema = node_schema(generator, meta.schema.as_ref(), None)?
        .or_else(|| Some(Schema::of_type(SchemaType::String)));
    Ok(Header {
        description: meta.description.clone(),
        required: meta.required,
        deprecated: meta.deprecated,
        schema,
        extensions: extensions(&meta.extensions)?,
        ..Default::default()
    })
}

/// Content map from declared entries.
///
/// Entries without a media type fan out over `media_types` (or `*/*`).
/// Entries without a structural schema are inferred from `fallback`.
pub fn content(
    generator: &mut SchemaGenerator<'_>,
    metas: &[ContentMeta],
    media_types: &[String],
    fallback: Option<&TypeRef>,
) -> Result<Content> {
    let mut content = Content::new();
    for meta in metas {
        let mut media = MediaType {
            schema: node_schema(generator, meta.schema.as_ref(), fallback)?,
            example: meta.example.as_deref().map(|e| literal(e, None)),
            ..Default::default()
        };
        for example_meta in &meta.examples {
            media
                .examples
                .insert(example_meta.name.clone(), example(example_meta)?);
        }

        for media_type in media_type_keys(meta.media_type.as_deref(), media_types) {
            content.insert(media_type, media.clone());
        }
    }
    Ok(content)
}

/// Content for a type without any declared entries
pub fn inferred_content(
    generator: &mut SchemaGenerator<'_>,
    media_types: &[String],
    ty: &TypeRef,
) -> Result<Content> {
    let schema = generator.schema_for(ty)?;
    Ok(media_type_keys(None, media_types)
        .into_iter()
        .map(|media_type| (media_type, MediaType::with_schema(schema.clone())))
        .collect())
}

fn media_type_keys(explicit: Option<&str>, media_types: &[String]) -> Vec<String> {
    match explicit {
        Some(media_type) => vec![media_type.to_string()],
        None if media_types.is_empty() => vec![WILDCARD_MEDIA_TYPE.to_string()],
        None => media_types.to_vec(),
    }
}

pub fn default_description(status: &str) -> String {
    let text = match status {
        "200" => "OK",
        "201" => "Created",
        "202" => "Accepted",
        "204" => "No Content",
        "400" => "Bad Request",
        "401" => "Unauthorized",
        "403" => "Forbidden",
        "404" => "Not Found",
        "409" => "Conflict",
        "422" => "Unprocessable Entity",
        "500" => "Internal Server Error",
        "default" => "default response",
        other => return format!("Response {}", other),
    };
    text.to_string()
}

pub fn response(
    generator: &mut SchemaGenerator<'_>,
    meta: &ApiResponseMeta,
    produces: &[String],
    fallback: Option<&TypeRef>,
) -> Result<Response> {
    if let Some(reference) = &meta.reference {
        return Ok(Response::from_reference(reference));
    }
    let mut response = Response {
        description: Some(
            meta.description
                .clone()
                .unwrap_or_else(|| default_description(&meta.status)),
        ),
        content: content(generator, &meta.content, produces, fallback)?,
        extensions: extensions(&meta.extensions)?,
        ..Default::default()
    };
    for header_meta in &meta.headers {
        response
            .headers
            .insert(header_meta.name.clone(), header(generator, header_meta)?);
    }
    for link_meta in &meta.links {
        response.links.insert(link_meta.name.clone(), link(link_meta)?);
    }
    Ok(response)
}

pub fn request_body(
    generator: &mut SchemaGenerator<'_>,
    meta: &RequestBodyMeta,
    consumes: &[String],
    fallback: Option<&TypeRef>,
) -> Result<RequestBody> {
    if let Some(reference) = &meta.reference {
        return Ok(RequestBody::from_reference(reference));
    }
    let content = if meta.content.is_empty() {
        match fallback {
            Some(ty) => inferred_content(generator, consumes, ty)?,
            None => Content::new(),
        }
    } else {
        content(generator, &meta.content, consumes, fallback)?
    };
    Ok(RequestBody {
        reference: None,
        description: meta.description.clone(),
        content,
        required: meta.required,
        extensions: extensions(&meta.extensions)?,
    })
}

/// Parameter node; the schema falls back to inference from `fallback`
pub fn parameter(
    generator: &mut SchemaGenerator<'_>,
    meta: &ParameterMeta,
    fallback: Option<&TypeRef>,
) -> Result<Parameter> {
    if let Some(reference) = &meta.reference {
        return Ok(Parameter::from_reference(reference));
    }
    let mut parameter = Parameter {
        name: meta.name.clone(),
        location: meta.location,
        description: meta.description.clone(),
        required: meta.required,
        deprecated: meta.deprecated,
        allow_empty_value: meta.allow_empty_value,
        style: meta.style,
        explode: meta.explode,
        allow_reserved: meta.allow_reserved,
        example: meta.example.as_deref().map(|e| literal(e, None)),
        extensions: extensions(&meta.extensions)?,
        ..Default::default()
    };
    for example_meta in &meta.examples {
        parameter
            .examples
            .insert(example_meta.name.clone(), example(example_meta)?);
    }

    // `content` and `schema` are mutually exclusive on a parameter
    if meta.content.is_empty() {
        parameter.schema = node_schema(generator, meta.schema.as_ref(), fallback)?;
    } else {
        parameter.content = content(generator, &meta.content, &[], fallback)?;
    }
    Ok(parameter)
}

pub fn callback(generator: &mut SchemaGenerator<'_>, meta: &CallbackMeta) -> Result<Callback> {
    if let Some(reference) = &meta.reference {
        return Ok(Callback::from_reference(reference));
    }
    let mut item = PathItem::default();
    for op_meta in &meta.operations {
        debug!("Mapping callback {} {}", meta.name, op_meta.method.as_str());
        let mut operation = Operation {
            summary: op_meta.summary.clone(),
            description: op_meta.description.clone(),
            ..Default::default()
        };
        for param_meta in &op_meta.parameters {
            operation
                .parameters
                .push(parameter(generator, param_meta, None)?);
        }
        if let Some(body_meta) = &op_meta.request_body {
            operation.request_body = Some(request_body(generator, body_meta, &[], None)?);
        }
        let mut responses = Responses::default();
        for response_meta in &op_meta.responses {
            responses.insert(
                response_meta.status.clone(),
                response(generator, response_meta, &[], None)?,
            );
        }
        operation.responses = Some(responses);
        *item.slot_mut(op_meta.method) = Some(operation);
    }

    let mut callback = Callback::default();
    if meta.expression.is_empty() {
        warn!("Callback '{}' has no expression; its operations are dropped", meta.name);
    } else {
        callback.insert(meta.expression.clone(), item);
    }
    Ok(callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{CallbackOperationMeta, SecurityRequirementMeta};
    use crate::document::{HttpMethod, ParameterIn};
    use crate::model::TypeIndex;
    use serde_json::json;

    #[test]
    fn test_literal_respects_string_hint() {
        assert_eq!(literal("42", Some(SchemaType::String)), json!("42"));
        assert_eq!(literal("42", Some(SchemaType::Integer)), json!(42));
        assert_eq!(literal("{\"a\":1}", None), json!({ "a": 1 }));
        assert_eq!(literal("plain text", None), json!("plain text"));
    }

    #[test]
    fn test_extensions_prefix_and_parse() {
        let bag = extensions(&[
            ExtensionMeta {
                name: "x-rate-limit".to_string(),
                value: "100".to_string(),
                parse_value: true,
            },
            ExtensionMeta {
                name: "owner".to_string(),
                value: "billing".to_string(),
                parse_value: false,
            },
        ])
        .unwrap();

        assert_eq!(bag["x-rate-limit"], json!(100));
        assert_eq!(bag["x-owner"], json!("billing"));
    }

    #[test]
    fn test_malformed_parsed_extension_fails() {
        let result = extensions(&[ExtensionMeta {
            name: "x-bad".to_string(),
            value: "{not json".to_string(),
            parse_value: true,
        }]);
        assert!(matches!(result, Err(Error::InvalidValue { .. })));
    }

    #[test]
    fn test_reference_only_tag_maps_to_none() {
        let meta = TagMeta {
            reference: Some("users".to_string()),
            ..Default::default()
        };
        assert!(tag(&meta).unwrap().is_none());
    }

    #[test]
    fn test_security_requirement_set() {
        let requirement = security_requirement(&vec![
            SecurityRequirementMeta {
                name: "oauth".to_string(),
                scopes: vec!["read".to_string()],
            },
            SecurityRequirementMeta {
                name: "api_key".to_string(),
                scopes: Vec::new(),
            },
        ]);
        assert_eq!(
            serde_json::to_value(&requirement).unwrap(),
            json!({ "oauth": ["read"], "api_key": [] })
        );
    }

    #[test]
    fn test_content_fans_out_over_media_types() {
        let index = TypeIndex::new();
        let mut generator = SchemaGenerator::new(&index);
        let produces = vec!["application/json".to_string(), "application/xml".to_string()];

        let content = content(
            &mut generator,
            &[ContentMeta::default()],
            &produces,
            Some(&TypeRef::named("String")),
        )
        .unwrap();

        let keys: Vec<_> = content.keys().cloned().collect();
        assert_eq!(keys, produces);
        assert_eq!(
            content["application/xml"].schema,
            Some(Schema::of_type(SchemaType::String))
        );
    }

    #[test]
    fn test_void_content_has_no_schema() {
        let index = TypeIndex::new();
        let mut generator = SchemaGenerator::new(&index);
        let meta = ApiResponseMeta {
            status: "202".to_string(),
            content: vec![ContentMeta {
                media_type: Some("application/json".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let response = response(&mut generator, &meta, &[], None).unwrap();
        assert_eq!(response.description.as_deref(), Some("Accepted"));
        assert_eq!(response.content["application/json"], MediaType::default());
    }

    #[test]
    fn test_parameter_reference() {
        let index = TypeIndex::new();
        let mut generator = SchemaGenerator::new(&index);
        let meta = ParameterMeta {
            reference: Some("PageSize".to_string()),
            ..Default::default()
        };
        let param = parameter(&mut generator, &meta, None).unwrap();
        assert_eq!(
            param.reference.as_deref(),
            Some("#/components/parameters/PageSize")
        );
        assert!(param.name.is_none());
    }

    #[test]
    fn test_parameter_schema_from_fallback_type() {
        let index = TypeIndex::new();
        let mut generator = SchemaGenerator::new(&index);
        let meta = ParameterMeta {
            name: Some("limit".to_string()),
            location: Some(ParameterIn::Query),
            schema: Some(SchemaMeta {
                maximum: Some("100".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let param = parameter(&mut generator, &meta, Some(&TypeRef::named("u32"))).unwrap();
        assert_eq!(
            serde_json::to_value(&param).unwrap(),
            json!({
                "name": "limit",
                "in": "query",
                "schema": { "type": "integer", "format": "int32", "maximum": 100 }
            })
        );
    }

    #[test]
    fn test_parsed_example_value() {
        let meta = ExampleMeta {
            name: "sample".to_string(),
            value: Some("{\"id\": 7}".to_string()),
            parse_value: true,
            ..Default::default()
        };
        assert_eq!(example(&meta).unwrap().value, Some(json!({ "id": 7 })));
    }

    #[test]
    fn test_callback_keyed_by_expression() {
        let index = TypeIndex::new();
        let mut generator = SchemaGenerator::new(&index);
        let meta = CallbackMeta {
            name: "onShipped".to_string(),
            expression: "{$request.body#/callbackUrl}".to_string(),
            operations: vec![CallbackOperationMeta {
                method: HttpMethod::Post,
                summary: Some("Shipment notice".to_string()),
                description: None,
                parameters: Vec::new(),
                request_body: None,
                responses: vec![ApiResponseMeta {
                    status: "204".to_string(),
                    ..Default::default()
                }],
            }],
            reference: None,
        };

        let callback = callback(&mut generator, &meta).unwrap();
        let item = &callback["{$request.body#/callbackUrl}"];
        let operation = item.post.as_ref().unwrap();
        assert_eq!(operation.summary.as_deref(), Some("Shipment notice"));
        assert!(operation.responses.as_ref().unwrap().contains_key("204"));
    }

    #[test]
    fn test_callback_reference_sits_on_callback() {
        let index = TypeIndex::new();
        let mut generator = SchemaGenerator::new(&index);
        let meta = CallbackMeta {
            name: "onEvent".to_string(),
            expression: String::new(),
            operations: Vec::new(),
            reference: Some("OnEvent".to_string()),
        };

        let callback = callback(&mut generator, &meta).unwrap();
        assert_eq!(callback.reference(), Some("#/components/callbacks/OnEvent"));
        assert!(callback.is_empty());

        let json = serde_json::to_value(&callback).unwrap();
        assert_eq!(json, json!({ "$ref": "#/components/callbacks/OnEvent" }));
    }
}
