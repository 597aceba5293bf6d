//! Static source reader.
//!
//! Walks parsed Rust files and builds the [`model`](crate::model) the
//! compiler works from: every struct and enum goes into the [`TypeIndex`],
//! impl blocks with a `#[path]` or verb-annotated methods become
//! [`EndpointType`]s, and free handler functions are grouped into one
//! endpoint type per source file. Document-level attributes
//! (`#[openapi_definition]`, `#[security_scheme]`, `#[application_path]`)
//! are picked up from any item.

pub mod attrs;
pub mod types;

use crate::annotations::{DefinitionMeta, SecuritySchemeMeta};
use crate::document::ParameterIn;
use crate::error::{Error, Result};
use crate::model::{EndpointMethod, EndpointType, MethodParam, TypeIndex, TypeRef, UNIT};
use log::debug;
use std::path::{Path, PathBuf};
use syn::visit::{self, Visit};
use syn::{Attribute, FnArg, ImplItem, Item, Pat, ReturnType};
use types::type_ref;

/// Request extractors that carry the request body
const BODY_EXTRACTORS: &[&str] = &["Json", "Form"];

/// Framework-supplied arguments that never appear in the document
const INJECTED_TYPES: &[&str] = &[
    "HttpRequest",
    "Request",
    "State",
    "Data",
    "Extension",
    "Payload",
    "HeaderMap",
    "Method",
    "Uri",
    "ConnectInfo",
];

/// Everything read from a set of source files
#[derive(Debug, Default)]
pub struct ReadResult {
    pub types: TypeIndex,
    /// Endpoint types in discovery order
    pub endpoints: Vec<EndpointType>,
    pub definition: DefinitionMeta,
    pub security_schemes: Vec<SecuritySchemeMeta>,
    /// `#[application_path]`, first one wins
    pub base_path: Option<String>,
}

/// Visitor collecting types and endpoints across files
#[derive(Default)]
pub struct SourceReader {
    result: ReadResult,
    /// Free handler functions of the file being read
    file_endpoint: EndpointType,
    error: Option<syn::Error>,
}

impl SourceReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one parsed file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] naming `path` for the first malformed attribute.
    pub fn read_file(&mut self, path: &Path, file: &syn::File) -> Result<()> {
        debug!("Reading declarations from {}", path.display());
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "handlers".to_string());
        self.file_endpoint = EndpointType::new(stem);

        self.visit_file(file);

        if let Some(err) = self.error.take() {
            return Err(Error::metadata(path, err));
        }
        let endpoint = std::mem::take(&mut self.file_endpoint);
        if !endpoint.methods.is_empty() {
            debug!(
                "Grouped {} free handlers under '{}'",
                endpoint.methods.len(),
                endpoint.name
            );
            self.result.endpoints.push(endpoint);
        }
        Ok(())
    }

    pub fn finish(self) -> ReadResult {
        debug!(
            "Read {} types and {} endpoint types",
            self.result.types.len(),
            self.result.endpoints.len()
        );
        self.result
    }

    /// Keep the first error; later ones are usually follow-ups
    fn record<T>(&mut self, result: syn::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                if self.error.is_none() {
                    self.error = Some(err);
                }
                None
            }
        }
    }

    fn document_attrs(&mut self, attrs: &[Attribute]) {
        for attr in attrs {
            match attrs::attr_name(attr).as_deref() {
                Some("openapi_definition") => {
                    if let Some(definition) = self.record(attrs::definition(attr)) {
                        self.result.definition.merge(definition);
                    }
                }
                Some("security_scheme") => {
                    if let Some(scheme) = self.record(attrs::security_scheme(attr)) {
                        self.result.security_schemes.push(scheme);
                    }
                }
                Some("application_path") => {
                    if let Some(path) = self.record(attrs::path_value(attr)) {
                        self.result.base_path.get_or_insert(path);
                    }
                }
                _ => {}
            }
        }
    }

    /// Type-level attributes on an impl block
    fn endpoint_attrs(&mut self, endpoint: &mut EndpointType, attrs: &[Attribute]) {
        for attr in attrs {
            let Some(name) = attrs::attr_name(attr) else {
                continue;
            };
            let applied = match name.as_str() {
                "path" => attrs::path_value(attr).map(|p| endpoint.path = Some(p)),
                "tag" => attrs::tag(attr).map(|t| endpoint.tags.push(t)),
                "server" => attrs::server(attr).map(|s| endpoint.servers.push(s)),
                "security_requirement" => {
                    attrs::security_requirement(attr).map(|s| endpoint.security.push(s))
                }
                "security_requirements_set" => {
                    attrs::security_requirements_set(attr).map(|s| endpoint.security.push(s))
                }
                "produces" => attrs::media_types(attr).map(|m| endpoint.produces.extend(m)),
                "consumes" => attrs::media_types(attr).map(|m| endpoint.consumes.extend(m)),
                "api_response" => attrs::api_response(attr).map(|r| endpoint.responses.push(r)),
                "extension" => attrs::extension(attr).map(|e| endpoint.extensions.push(e)),
                _ => Ok(()),
            };
            self.record(applied);
        }
    }

    /// Build a method from its signature and attributes; `None` when it has no verb
    fn endpoint_method(&mut self, attrs: &[Attribute], sig: &syn::Signature) -> Option<EndpointMethod> {
        let mut method = EndpointMethod {
            name: sig.ident.to_string(),
            deprecated: attrs::is_deprecated(attrs),
            ..Default::default()
        };

        for attr in attrs {
            if let Some(Some((verb, path))) = self.record(attrs::verb(attr)) {
                method.verb = Some(verb);
                if path.is_some() {
                    method.path = path;
                }
                continue;
            }
            let Some(name) = attrs::attr_name(attr) else {
                continue;
            };
            let applied = match name.as_str() {
                "path" => attrs::path_value(attr).map(|p| method.path = Some(p)),
                "operation" => attrs::operation(attr).map(|o| method.operation = Some(o)),
                "parameter" => attrs::parameter(attr).map(|p| method.parameters.push(p)),
                "request_body" => attrs::request_body(attr).map(|b| method.request_body = Some(b)),
                "api_response" => attrs::api_response(attr).map(|r| method.responses.push(r)),
                "tag" => attrs::tag(attr).map(|t| method.tags.push(t)),
                "server" => attrs::server(attr).map(|s| method.servers.push(s)),
                "security_requirement" => {
                    attrs::security_requirement(attr).map(|s| method.security.push(s))
                }
                "security_requirements_set" => {
                    attrs::security_requirements_set(attr).map(|s| method.security.push(s))
                }
                "produces" => attrs::media_types(attr).map(|m| method.produces.extend(m)),
                "consumes" => attrs::media_types(attr).map(|m| method.consumes.extend(m)),
                "callback" => attrs::callback(attr).map(|c| method.callbacks.push(c)),
                "external_docs" => {
                    attrs::external_docs(attr).map(|d| method.external_docs = Some(d))
                }
                "extension" => attrs::extension(attr).map(|e| method.extensions.push(e)),
                _ => Ok(()),
            };
            self.record(applied);
        }

        if method.verb.is_none() {
            debug!("Skipping '{}': no HTTP verb attribute", method.name);
            return None;
        }

        for (index, input) in sig.inputs.iter().enumerate() {
            let FnArg::Typed(pat_type) = input else {
                continue;
            };
            if let Some(params) = tuple_params(pat_type) {
                method.params.extend(params);
                continue;
            }
            let param = self.method_param(index, pat_type);
            if let Some(param) = param {
                method.params.push(param);
            }
        }

        method.return_type = match &sig.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => Some(type_ref(ty)),
        };
        Some(method)
    }

    fn method_param(&mut self, index: usize, pat_type: &syn::PatType) -> Option<MethodParam> {
        let name = pattern_name(&pat_type.pat).unwrap_or_else(|| format!("arg{}", index));
        let declared = type_ref(&pat_type.ty);
        let mut param = extractor_param(name, declared);

        for attr in &pat_type.attrs {
            match attrs::attr_name(attr).as_deref() {
                Some("context") => param.injected = true,
                Some("suspended") => param.suspended = true,
                Some("parameter") => param.parameter = Some(self.record(attrs::parameter(attr))?),
                Some("request_body") => {
                    param.request_body = Some(self.record(attrs::request_body(attr))?)
                }
                _ => {
                    if let Some(Some(binding)) = self.record(attrs::binding(attr, &param.name)) {
                        param.binding = Some(binding);
                    }
                }
            }
        }
        Some(param)
    }
}

fn extractor_location(extractor: &str) -> Option<ParameterIn> {
    match extractor {
        "Path" => Some(ParameterIn::Path),
        "Query" => Some(ParameterIn::Query),
        "Header" | "TypedHeader" => Some(ParameterIn::Header),
        _ => None,
    }
}

/// Interpret well-known extractor wrappers around a parameter type
fn extractor_param(name: String, declared: TypeRef) -> MethodParam {
    let inner = || declared.first_arg().cloned().unwrap_or_else(|| declared.clone());
    if let Some(location) = extractor_location(&declared.name) {
        return MethodParam::bound(name, inner(), location);
    }
    if BODY_EXTRACTORS.contains(&declared.name.as_str()) {
        return MethodParam::new(name, inner());
    }
    let mut param = MethodParam::new(name, declared.clone());
    param.injected = INJECTED_TYPES.contains(&declared.name.as_str());
    param
}

/// `Path((user_id, post_id)): Path<(u64, u64)>` binds one parameter per element
fn tuple_params(pat_type: &syn::PatType) -> Option<Vec<MethodParam>> {
    let declared = type_ref(&pat_type.ty);
    let location = extractor_location(&declared.name)?;
    let tuple_ty = declared.first_arg().filter(|t| t.name == UNIT)?;

    let Pat::TupleStruct(extractor) = &*pat_type.pat else {
        return None;
    };
    if extractor.elems.len() != 1 {
        return None;
    }
    let Pat::Tuple(elements) = &extractor.elems[0] else {
        return None;
    };
    if elements.elems.len() != tuple_ty.args.len() {
        return None;
    }

    elements
        .elems
        .iter()
        .zip(&tuple_ty.args)
        .map(|(pat, ty)| Some(MethodParam::bound(pattern_name(pat)?, ty.clone(), location)))
        .collect()
}

/// `id`, `mut id`, `Path(id)`, `Json(body)`
fn pattern_name(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(ident) => Some(ident.ident.to_string()),
        Pat::TupleStruct(tuple) if tuple.elems.len() == 1 => pattern_name(&tuple.elems[0]),
        Pat::Reference(reference) => pattern_name(&reference.pat),
        Pat::Type(typed) => pattern_name(&typed.pat),
        _ => None,
    }
}

impl<'ast> Visit<'ast> for SourceReader {
    fn visit_item(&mut self, item: &'ast Item) {
        let attrs: &[Attribute] = match item {
            Item::Struct(item) => &item.attrs,
            Item::Enum(item) => &item.attrs,
            Item::Fn(item) => &item.attrs,
            Item::Impl(item) => &item.attrs,
            Item::Mod(item) => &item.attrs,
            Item::Const(item) => &item.attrs,
            Item::Static(item) => &item.attrs,
            Item::Trait(item) => &item.attrs,
            _ => &[],
        };
        self.document_attrs(attrs);
        visit::visit_item(self, item);
    }

    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        if let Some(def) = self.record(types::struct_def(node)) {
            self.result.types.insert(def);
        }
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        if let Some(def) = self.record(types::enum_def(node)) {
            self.result.types.insert(def);
        }
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        if let Some(method) = self.endpoint_method(&node.attrs, &node.sig) {
            debug!("Found handler function '{}'", method.name);
            self.file_endpoint.methods.push(method);
        }
        visit::visit_item_fn(self, node);
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        let self_name = type_ref(&node.self_ty).name;
        let mut endpoint = EndpointType::new(self_name);
        self.endpoint_attrs(&mut endpoint, &node.attrs);

        for item in &node.items {
            if let ImplItem::Fn(method) = item {
                if let Some(method) = self.endpoint_method(&method.attrs, &method.sig) {
                    endpoint.methods.push(method);
                }
            }
        }

        if endpoint.path.is_some() || !endpoint.methods.is_empty() {
            debug!(
                "Found endpoint type '{}' with {} operations",
                endpoint.name,
                endpoint.methods.len()
            );
            self.result.endpoints.push(endpoint);
        }
        visit::visit_item_impl(self, node);
    }
}

/// Read a single in-memory source file
pub fn read_source(code: &str) -> Result<ReadResult> {
    let path = PathBuf::from("source.rs");
    let file = syn::parse_file(code).map_err(|e| Error::Parse {
        file: path.clone(),
        message: e.to_string(),
    })?;
    let mut reader = SourceReader::new();
    reader.read_file(&path, &file)?;
    Ok(reader.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HttpMethod;
    use crate::model::TypeCatalog;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_impl_block_endpoint() {
        let code = r#"
            pub struct ItemResource;

            #[path("/items")]
            #[tag(name = "items")]
            #[produces("application/json")]
            impl ItemResource {
                #[get("/{id}")]
                #[operation(summary = "Fetch one item")]
                pub async fn get_item(&self, #[path_param] id: u64) -> Result<Item, ApiError> {
                    todo!()
                }

                fn helper(&self) {}
            }
        "#;

        let result = read_source(code).unwrap();
        assert_eq!(result.endpoints.len(), 1);

        let endpoint = &result.endpoints[0];
        assert_eq!(endpoint.name, "ItemResource");
        assert_eq!(endpoint.path.as_deref(), Some("/items"));
        assert_eq!(endpoint.produces, vec!["application/json"]);
        assert_eq!(endpoint.methods.len(), 1);

        let method = &endpoint.methods[0];
        assert_eq!(method.verb, Some(HttpMethod::Get));
        assert_eq!(method.path.as_deref(), Some("/{id}"));
        assert_eq!(method.params.len(), 1);
        assert_eq!(method.params[0].binding.as_ref().unwrap().location, ParameterIn::Path);
        assert_eq!(
            method.return_type.as_ref().map(|t| t.to_string()).as_deref(),
            Some("Result<Item, ApiError>")
        );
    }

    #[test]
    fn test_free_functions_grouped_per_file() {
        let code = r#"
            #[post("/orders")]
            async fn create_order(Json(order): Json<NewOrder>, state: State<AppState>) -> Json<Order> {
                todo!()
            }

            #[get("/orders")]
            async fn list_orders(Query(filter): Query<OrderFilter>) -> Json<Vec<Order>> {
                todo!()
            }

            fn not_a_handler() {}
        "#;

        let result = read_source(code).unwrap();
        assert_eq!(result.endpoints.len(), 1);
        assert_eq!(result.endpoints[0].name, "source");

        let methods = &result.endpoints[0].methods;
        assert_eq!(methods.len(), 2);

        let create = &methods[0];
        assert_eq!(create.params[0].name, "order");
        assert_eq!(create.params[0].ty, TypeRef::named("NewOrder"));
        assert!(create.params[0].is_body_candidate());
        assert!(create.params[1].injected);

        let list = &methods[1];
        let binding = list.params[0].binding.as_ref().unwrap();
        assert_eq!(binding.location, ParameterIn::Query);
        assert_eq!(list.params[0].ty, TypeRef::named("OrderFilter"));
    }

    #[test]
    fn test_nested_modules_and_types() {
        let code = r#"
            mod api {
                pub struct Widget { pub id: u32 }

                pub mod v2 {
                    pub enum Shape { Round, Square }

                    #[delete("/widgets/{id}")]
                    pub async fn remove(#[path_param] id: u32) {}
                }
            }
        "#;

        let result = read_source(code).unwrap();
        assert!(result.types.lookup("Widget").is_some());
        assert!(result.types.lookup("Shape").is_some());
        assert_eq!(result.endpoints[0].methods[0].name, "remove");
        assert_eq!(result.endpoints[0].methods[0].return_type, None);
    }

    #[test]
    fn test_tuple_path_extractor_binds_each_element() {
        let code = r#"
            #[get("/users/{user_id}/posts/{post_id}")]
            async fn get_post(Path((user_id, post_id)): Path<(u64, String)>) -> String {
                todo!()
            }
        "#;

        let result = read_source(code).unwrap();
        let params = &result.endpoints[0].methods[0].params;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "user_id");
        assert_eq!(params[0].ty, TypeRef::named("u64"));
        assert_eq!(params[1].name, "post_id");
        assert_eq!(params[1].ty, TypeRef::named("String"));
        for param in params {
            assert_eq!(param.binding.as_ref().unwrap().location, ParameterIn::Path);
        }
    }

    #[test]
    fn test_document_level_attributes() {
        let code = r#"
            #[openapi_definition(info(title = "Inventory", version = "2.0"))]
            #[application_path("/api")]
            #[security_scheme(name = "bearer", type = "http", scheme = "bearer")]
            pub struct InventoryApi;
        "#;

        let result = read_source(code).unwrap();
        assert_eq!(result.base_path.as_deref(), Some("/api"));
        assert_eq!(result.security_schemes.len(), 1);
        assert_eq!(
            result.definition.info.unwrap().title.as_deref(),
            Some("Inventory")
        );
    }

    #[test]
    fn test_parameter_attributes() {
        let code = r#"
            #[put("/items/{id}")]
            async fn update(
                #[path_param] id: u64,
                #[header_param("X-Request-Id")] request_id: Option<String>,
                #[parameter(name = "dry_run", in = "query", description = "Validate only")] dry_run: bool,
                #[context] ctx: RequestContext,
                #[suspended] responder: AsyncResponder,
                body: ItemUpdate,
            ) {}
        "#;

        let result = read_source(code).unwrap();
        let params = &result.endpoints[0].methods[0].params;
        assert_eq!(params.len(), 6);
        assert_eq!(params[1].binding.as_ref().unwrap().name, "X-Request-Id");
        assert!(params[2].parameter.is_some());
        assert!(params[3].injected);
        assert!(params[4].suspended);

        let bodies: Vec<_> = params.iter().filter(|p| p.is_body_candidate()).collect();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].name, "body");
    }

    #[test]
    fn test_malformed_metadata_names_file() {
        let code = r#"
            #[get("/x")]
            #[api_response(status = 200, colour = "red")]
            async fn broken() {}
        "#;

        let err = read_source(code).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("invalid metadata in source.rs:"), "{}", message);
    }

    #[test]
    fn test_method_without_verb_is_skipped() {
        let code = r#"
            #[path("/health")]
            impl HealthResource {
                #[operation(summary = "not routed")]
                pub fn ping(&self) -> String { String::new() }
            }
        "#;

        let result = read_source(code).unwrap();
        assert_eq!(result.endpoints.len(), 1);
        assert!(result.endpoints[0].methods.is_empty());
    }
}
