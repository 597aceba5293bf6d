//! Post-build filtering of a generated document.
//!
//! An [`OpenApiFilter`] sees every node of the document once and either hands
//! it back (possibly modified) or returns `None` to remove it. [`apply`] walks
//! components first, then paths, then the document-level lists, and finally
//! passes the root to [`OpenApiFilter::filter_open_api`].
//!
//! The walk is a single pass: a node is visited before its children, removed
//! nodes are not descended into, and entries a policy adds while the pass
//! runs are not revisited.

use crate::document::{
    AdditionalProperties, Callback, Components, Content, Example, Header, HttpMethod, Link,
    MediaType, OpenApi, Operation, Parameter, PathItem, RequestBody, Response, Schema,
    SecurityRequirement, SecurityScheme, Server, Tag,
};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashSet;

/// Name of the built-in filter that removes deprecated operations and schemas
pub const DROP_DEPRECATED: &str = "drop-deprecated";
/// Name of the built-in filter that removes vendor extensions
pub const STRIP_EXTENSIONS: &str = "strip-extensions";

/// Per-node keep/discard policy. Every method defaults to keeping the node.
pub trait OpenApiFilter {
    fn filter_schema(&mut self, schema: Schema) -> Option<Schema> {
        Some(schema)
    }

    fn filter_response(&mut self, response: Response) -> Option<Response> {
        Some(response)
    }

    fn filter_parameter(&mut self, parameter: Parameter) -> Option<Parameter> {
        Some(parameter)
    }

    fn filter_example(&mut self, example: Example) -> Option<Example> {
        Some(example)
    }

    fn filter_request_body(&mut self, request_body: RequestBody) -> Option<RequestBody> {
        Some(request_body)
    }

    fn filter_header(&mut self, header: Header) -> Option<Header> {
        Some(header)
    }

    fn filter_security_scheme(&mut self, scheme: SecurityScheme) -> Option<SecurityScheme> {
        Some(scheme)
    }

    fn filter_link(&mut self, link: Link) -> Option<Link> {
        Some(link)
    }

    fn filter_callback(&mut self, callback: Callback) -> Option<Callback> {
        Some(callback)
    }

    /// `path` is the key the item is stored under
    fn filter_path_item(&mut self, _path: &str, item: PathItem) -> Option<PathItem> {
        Some(item)
    }

    fn filter_operation(&mut self, operation: Operation) -> Option<Operation> {
        Some(operation)
    }

    fn filter_server(&mut self, server: Server) -> Option<Server> {
        Some(server)
    }

    fn filter_tag(&mut self, tag: Tag) -> Option<Tag> {
        Some(tag)
    }

    fn filter_security_requirement(
        &mut self,
        requirement: SecurityRequirement,
    ) -> Option<SecurityRequirement> {
        Some(requirement)
    }

    /// Called once, after everything else. The root cannot be removed.
    fn filter_open_api(&mut self, document: OpenApi) -> OpenApi {
        document
    }
}

/// Resolve a built-in filter by its configuration name.
///
/// # Errors
///
/// Returns [`Error::Config`] for an unknown name.
pub fn by_name(name: &str) -> Result<Box<dyn OpenApiFilter>> {
    match name.trim() {
        DROP_DEPRECATED => Ok(Box::new(DropDeprecated)),
        STRIP_EXTENSIONS => Ok(Box::new(StripExtensions)),
        other => Err(Error::Config(format!("unknown filter '{}'", other))),
    }
}

/// Run `filter` over the whole document in place
pub fn apply(filter: &mut dyn OpenApiFilter, document: &mut OpenApi) {
    debug!("Filtering document");
    let mut walker = Walker { filter };

    if let Some(components) = document.components.as_mut() {
        walker.components(components);
    }

    document.paths.0 = filter_map(std::mem::take(&mut document.paths.0), |path, item| {
        let item = walker.filter.filter_path_item(path, item)?;
        Some(walker.path_item(item))
    });

    document.servers = walker.servers(std::mem::take(&mut document.servers));
    document.tags = std::mem::take(&mut document.tags)
        .into_iter()
        .filter_map(|tag| walker.filter.filter_tag(tag))
        .collect();
    document.security = walker.requirements(std::mem::take(&mut document.security));

    let taken = std::mem::take(document);
    *document = walker.filter.filter_open_api(taken);
}

/// Rebuild a map from the entries `f` keeps, in their original order
fn filter_map<T, F>(map: IndexMap<String, T>, mut f: F) -> IndexMap<String, T>
where
    F: FnMut(&str, T) -> Option<T>,
{
    map.into_iter()
        .filter_map(|(key, value)| f(&key, value).map(|value| (key, value)))
        .collect()
}

struct Walker<'f> {
    filter: &'f mut dyn OpenApiFilter,
}

impl Walker<'_> {
    fn components(&mut self, components: &mut Components) {
        components.schemas = filter_map(std::mem::take(&mut components.schemas), |_, s| self.schema(s));
        components.responses =
            filter_map(std::mem::take(&mut components.responses), |_, r| self.response(r));
        components.parameters =
            filter_map(std::mem::take(&mut components.parameters), |_, p| self.parameter(p));
        components.examples = self.examples(std::mem::take(&mut components.examples));
        components.request_bodies = filter_map(std::mem::take(&mut components.request_bodies), |_, b| {
            self.request_body(b)
        });
        components.headers = self.headers(std::mem::take(&mut components.headers));
        components.security_schemes =
            filter_map(std::mem::take(&mut components.security_schemes), |_, s| {
                self.filter.filter_security_scheme(s)
            });
        components.links = self.links(std::mem::take(&mut components.links));
        components.callbacks =
            filter_map(std::mem::take(&mut components.callbacks), |_, c| self.callback(c));
    }

    fn schema(&mut self, schema: Schema) -> Option<Schema> {
        let mut schema = self.filter.filter_schema(schema)?;
        schema.properties = filter_map(std::mem::take(&mut schema.properties), |_, s| self.schema(s));
        schema.items = self.boxed_schema(schema.items.take());
        schema.not = self.boxed_schema(schema.not.take());
        schema.all_of = self.schema_list(std::mem::take(&mut schema.all_of));
        schema.any_of = self.schema_list(std::mem::take(&mut schema.any_of));
        schema.one_of = self.schema_list(std::mem::take(&mut schema.one_of));
        schema.additional_properties = match schema.additional_properties.take() {
            Some(AdditionalProperties::Schema(inner)) => self
                .schema(*inner)
                .map(|inner| AdditionalProperties::Schema(Box::new(inner))),
            other => other,
        };
        Some(schema)
    }

    fn boxed_schema(&mut self, schema: Option<Box<Schema>>) -> Option<Box<Schema>> {
        schema.and_then(|s| self.schema(*s)).map(Box::new)
    }

    fn schema_list(&mut self, schemas: Vec<Schema>) -> Vec<Schema> {
        schemas.into_iter().filter_map(|s| self.schema(s)).collect()
    }

    fn content(&mut self, content: Content) -> Content {
        filter_map(content, |_, media| Some(self.media_type(media)))
    }

    fn media_type(&mut self, mut media: MediaType) -> MediaType {
        media.schema = media.schema.and_then(|s| self.schema(s));
        media.examples = self.examples(std::mem::take(&mut media.examples));
        media
    }

    fn examples(&mut self, examples: IndexMap<String, Example>) -> IndexMap<String, Example> {
        filter_map(examples, |_, e| self.filter.filter_example(e))
    }

    fn headers(&mut self, headers: IndexMap<String, Header>) -> IndexMap<String, Header> {
        filter_map(headers, |_, header| {
            let mut header = self.filter.filter_header(header)?;
            header.schema = header.schema.take().and_then(|s| self.schema(s));
            header.content = self.content(std::mem::take(&mut header.content));
            Some(header)
        })
    }

    fn links(&mut self, links: IndexMap<String, Link>) -> IndexMap<String, Link> {
        filter_map(links, |_, link| {
            let mut link = self.filter.filter_link(link)?;
            link.server = link.server.take().and_then(|s| self.filter.filter_server(s));
            Some(link)
        })
    }

    fn servers(&mut self, servers: Vec<Server>) -> Vec<Server> {
        servers
            .into_iter()
            .filter_map(|s| self.filter.filter_server(s))
            .collect()
    }

    fn requirements(&mut self, requirements: Vec<SecurityRequirement>) -> Vec<SecurityRequirement> {
        requirements
            .into_iter()
            .filter_map(|r| self.filter.filter_security_requirement(r))
            .collect()
    }

    fn parameter(&mut self, parameter: Parameter) -> Option<Parameter> {
        let mut parameter = self.filter.filter_parameter(parameter)?;
        parameter.schema = parameter.schema.take().and_then(|s| self.schema(s));
        parameter.examples = self.examples(std::mem::take(&mut parameter.examples));
        parameter.content = self.content(std::mem::take(&mut parameter.content));
        Some(parameter)
    }

    fn parameters(&mut self, parameters: Vec<Parameter>) -> Vec<Parameter> {
        parameters
            .into_iter()
            .filter_map(|p| self.parameter(p))
            .collect()
    }

    fn request_body(&mut self, body: RequestBody) -> Option<RequestBody> {
        let mut body = self.filter.filter_request_body(body)?;
        body.content = self.content(std::mem::take(&mut body.content));
        Some(body)
    }

    fn response(&mut self, response: Response) -> Option<Response> {
        let mut response = self.filter.filter_response(response)?;
        response.headers = self.headers(std::mem::take(&mut response.headers));
        response.content = self.content(std::mem::take(&mut response.content));
        response.links = self.links(std::mem::take(&mut response.links));
        Some(response)
    }

    fn callback(&mut self, callback: Callback) -> Option<Callback> {
        let mut callback = self.filter.filter_callback(callback)?;
        callback.expressions = filter_map(std::mem::take(&mut callback.expressions), |path, item| {
            let item = self.filter.filter_path_item(path, item)?;
            Some(self.path_item(item))
        });
        Some(callback)
    }

    fn path_item(&mut self, mut item: PathItem) -> PathItem {
        for method in HttpMethod::ALL {
            let slot = item.slot_mut(method);
            *slot = slot.take().and_then(|op| self.operation(op));
        }
        item.parameters = self.parameters(std::mem::take(&mut item.parameters));
        item.servers = self.servers(std::mem::take(&mut item.servers));
        item
    }

    fn operation(&mut self, operation: Operation) -> Option<Operation> {
        let mut operation = self.filter.filter_operation(operation)?;
        operation.parameters = self.parameters(std::mem::take(&mut operation.parameters));
        operation.request_body = operation
            .request_body
            .take()
            .and_then(|b| self.request_body(b));
        if let Some(responses) = operation.responses.as_mut() {
            responses.entries =
                filter_map(std::mem::take(&mut responses.entries), |_, r| self.response(r));
            responses.prune_default();
        }
        operation.callbacks =
            filter_map(std::mem::take(&mut operation.callbacks), |_, c| self.callback(c));
        operation.servers = self.servers(std::mem::take(&mut operation.servers));
        operation.security = operation.security.take().map(|r| self.requirements(r));
        Some(operation)
    }
}

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Removes deprecated operations and deprecated properties.
///
/// A deprecated component schema is removed only once nothing left in the
/// document refers to it.
#[derive(Debug, Default)]
pub struct DropDeprecated;

impl OpenApiFilter for DropDeprecated {
    fn filter_schema(&mut self, mut schema: Schema) -> Option<Schema> {
        let before = schema.properties.len();
        schema.properties.retain(|_, property| !is_deprecated(property));
        if schema.properties.len() != before {
            let properties = &schema.properties;
            schema.required.retain(|name| properties.contains_key(name));
        }
        Some(schema)
    }

    fn filter_operation(&mut self, operation: Operation) -> Option<Operation> {
        if operation.deprecated == Some(true) {
            debug!(
                "Dropping deprecated operation {}",
                operation.operation_id.as_deref().unwrap_or("<unnamed>")
            );
            return None;
        }
        Some(operation)
    }

    fn filter_open_api(&mut self, mut document: OpenApi) -> OpenApi {
        let live = match referenced_deprecated(&document) {
            Ok(live) => live,
            Err(err) => {
                warn!("Keeping deprecated schemas, reference scan failed: {}", err);
                return document;
            }
        };
        if let Some(components) = document.components.as_mut() {
            components.schemas.retain(|name, schema| {
                let keep = !is_deprecated(schema) || live.contains(name);
                if !keep {
                    debug!("Dropping deprecated schema {}", name);
                }
                keep
            });
        }
        document
    }
}

fn is_deprecated(schema: &Schema) -> bool {
    schema.deprecated == Some(true)
}

/// Deprecated component schemas still reachable from the rest of the document
fn referenced_deprecated(document: &OpenApi) -> serde_json::Result<HashSet<String>> {
    let mut live = HashSet::new();
    let Some(components) = document.components.as_ref() else {
        return Ok(live);
    };

    let mut roots = document.clone();
    if let Some(components) = roots.components.as_mut() {
        components.schemas.retain(|_, schema| !is_deprecated(schema));
    }
    let mut pending = Vec::new();
    schema_refs(&serde_json::to_value(&roots)?, &mut pending);

    while let Some(name) = pending.pop() {
        let Some(schema) = components.schemas.get(&name) else {
            continue;
        };
        if is_deprecated(schema) && live.insert(name) {
            schema_refs(&serde_json::to_value(schema)?, &mut pending);
        }
    }
    Ok(live)
}

/// Names of every component schema `value` points at
fn schema_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                if key == "$ref" {
                    if let Some(name) = inner.as_str().and_then(|r| r.strip_prefix(SCHEMA_REF_PREFIX)) {
                        out.push(name.to_string());
                    }
                } else {
                    schema_refs(inner, out);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| schema_refs(item, out)),
        _ => {}
    }
}

/// Removes `x-` extensions from operations, parameters and schemas
#[derive(Debug, Default)]
pub struct StripExtensions;

impl OpenApiFilter for StripExtensions {
    fn filter_schema(&mut self, mut schema: Schema) -> Option<Schema> {
        schema.extensions.clear();
        Some(schema)
    }

    fn filter_parameter(&mut self, mut parameter: Parameter) -> Option<Parameter> {
        parameter.extensions.clear();
        Some(parameter)
    }

    fn filter_operation(&mut self, mut operation: Operation) -> Option<Operation> {
        operation.extensions.clear();
        Some(operation)
    }
}
