//! Endpoint -> operation compiler.
//!
//! [`OpenApiBuilder`] holds the reusable settings (configuration source and
//! operation id strategy). Each run gets its own [`BuildContext`], which owns
//! the document being built, the schema arena and the set of operation ids
//! handed out so far.

use crate::annotations::{
    ApiResponseMeta, DefinitionMeta, SecurityRequirementSet, SecuritySchemeMeta, ServerMeta,
    TagMeta,
};
use crate::config::{self, ConfigSource};
use crate::document::{
    HttpMethod, Info, OpenApi, Operation, Parameter, ParameterIn, RequestBody,
    Response, Responses, SecurityRequirement, Server,
};
use crate::error::Result;
use crate::mapper;
use crate::model::{
    EndpointMethod, EndpointType, FieldDef, MethodParam, TypeCatalog, TypeDefKind, TypeRef, UNIT,
};
use crate::naming::{self, MethodName, OperationIdStrategy, OperationIds};
use crate::reader::ReadResult;
use crate::schema_generator::SchemaGenerator;
use log::{debug, info, warn};

/// Title used when neither metadata, base document nor configuration names one
pub const DEFAULT_TITLE: &str = "Generated API";
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Return types that produce a response without a documented body
const UNTYPED_RESPONDERS: &[&str] = &[
    "HttpResponse",
    "Response",
    "Responder",
    "IntoResponse",
    "StatusCode",
    "HttpResponseBuilder",
    "Redirect",
];

/// Wrappers whose first argument is the documented body
const BODY_WRAPPERS: &[&str] = &["Result", "Json", "Form"];

/// Reusable compiler settings
pub struct OpenApiBuilder<'a> {
    config: Option<&'a dyn ConfigSource>,
    strategy: Box<dyn OperationIdStrategy + 'a>,
}

impl Default for OpenApiBuilder<'_> {
    fn default() -> Self {
        Self {
            config: None,
            strategy: Box::new(MethodName),
        }
    }
}

impl<'a> OpenApiBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the operation id strategy and per-operation overrides from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::error::Error::Config) for an unknown strategy name.
    pub fn with_config(mut self, config: &'a dyn ConfigSource) -> Result<Self> {
        if let Some(name) = config.get(config::OPERATION_ID_STRATEGY) {
            self.strategy = naming::by_name(&name)?;
        }
        self.config = Some(config);
        Ok(self)
    }

    /// Derive operation ids with `strategy` instead of the method name
    pub fn with_strategy(mut self, strategy: Box<dyn OperationIdStrategy + 'a>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Start a run on top of `base` (or a fresh document)
    pub fn begin<'c>(&self, base: Option<OpenApi>, catalog: &'c dyn TypeCatalog) -> BuildContext<'_, 'c> {
        let document = base.unwrap_or_default();
        let mut operation_ids = OperationIds::new();
        for (_, _, operation) in document.operations() {
            if let Some(id) = &operation.operation_id {
                operation_ids.reserve(id);
            }
        }
        BuildContext {
            config: self.config,
            strategy: self.strategy.as_ref(),
            catalog,
            generator: SchemaGenerator::new(catalog),
            operation_ids,
            document,
        }
    }

    /// Compile everything a source read produced in one call
    pub fn build(&self, base: Option<OpenApi>, read: &ReadResult) -> Result<OpenApi> {
        let mut context = self.begin(base, &read.types);
        context.apply_definition(&read.definition)?;
        for scheme in &read.security_schemes {
            context.add_security_scheme(scheme)?;
        }
        for endpoint in &read.endpoints {
            context.add_endpoint(endpoint, read.base_path.as_deref())?;
        }
        Ok(context.finish())
    }
}

/// State of one compilation run
pub struct BuildContext<'b, 'c> {
    config: Option<&'b dyn ConfigSource>,
    strategy: &'b dyn OperationIdStrategy,
    catalog: &'c dyn TypeCatalog,
    generator: SchemaGenerator<'c>,
    operation_ids: OperationIds,
    document: OpenApi,
}

/// What a handler's return type documents
#[derive(Debug, Clone, PartialEq)]
enum ReturnKind {
    Void,
    Untyped,
    Typed(TypeRef),
}

impl<'b, 'c> BuildContext<'b, 'c> {
    pub fn document(&self) -> &OpenApi {
        &self.document
    }

    pub fn generator(&self) -> &SchemaGenerator<'c> {
        &self.generator
    }

    fn config_list(&self, key: &str) -> Option<Vec<String>> {
        self.config.and_then(|c| c.get_list(key))
    }

    /// Document-level metadata; whatever the base document already has wins
    pub fn apply_definition(&mut self, definition: &DefinitionMeta) -> Result<()> {
        if let Some(info) = &definition.info {
            if self.document.info.is_none() {
                self.document.info = Some(mapper::info(info)?);
            }
        }
        for server in &definition.servers {
            let server = mapper::server(server)?;
            if !self.document.servers.iter().any(|s| s.url == server.url) {
                self.document.servers.push(server);
            }
        }
        for tag in &definition.tags {
            if let Some(tag) = mapper::tag(tag)? {
                self.document.add_tag(tag);
            }
        }
        for set in &definition.security {
            self.document.security.push(mapper::security_requirement(set));
        }
        if self.document.external_docs.is_none() {
            self.document.external_docs = definition.external_docs.as_ref().map(mapper::external_docs);
        }
        for (key, value) in mapper::extensions(&definition.extensions)? {
            self.document.extensions.entry(key).or_insert(value);
        }
        Ok(())
    }

    pub fn add_security_scheme(&mut self, meta: &SecuritySchemeMeta) -> Result<()> {
        let scheme = mapper::security_scheme(meta)?;
        self.document
            .components_mut()
            .security_schemes
            .entry(meta.name.clone())
            .or_insert(scheme);
        Ok(())
    }

    /// Compile one endpoint type and all of its methods
    pub fn add_endpoint(&mut self, endpoint: &EndpointType, base_path: Option<&str>) -> Result<()> {
        debug!("Adding endpoint type {}", endpoint.name);
        for tag in &endpoint.tags {
            if let Some(tag) = mapper::tag(tag)? {
                self.document.add_tag(tag);
            }
        }
        for method in &endpoint.methods {
            self.add_method(endpoint, method, base_path)?;
        }
        Ok(())
    }

    fn add_method(
        &mut self,
        endpoint: &EndpointType,
        method: &EndpointMethod,
        base_path: Option<&str>,
    ) -> Result<()> {
        let Some(verb) = method.verb else {
            debug!("Skipping {}::{}: unsupported method without verb", endpoint.name, method.name);
            return Ok(());
        };
        let meta = method.operation.clone().unwrap_or_default();
        if meta.hidden {
            debug!("Skipping hidden operation {}::{}", endpoint.name, method.name);
            return Ok(());
        }

        let path = join_paths(&[
            base_path.unwrap_or_default(),
            endpoint.path.as_deref().unwrap_or_default(),
            method.path.as_deref().unwrap_or_default(),
        ]);
        let candidate = match &meta.operation_id {
            Some(id) => id.clone(),
            None => self.strategy.derive(&endpoint.name, &method.name, verb, &path),
        };
        let operation_id = self.operation_ids.claim(&candidate);
        debug!("Adding operation {} {} ({})", verb.as_str(), path, operation_id);

        let deprecated = meta.deprecated.unwrap_or(false) || method.deprecated;
        let mut operation = Operation {
            summary: meta.summary.clone(),
            description: meta.description.clone(),
            operation_id: Some(operation_id.clone()),
            deprecated: deprecated.then_some(true),
            external_docs: method.external_docs.as_ref().map(mapper::external_docs),
            extensions: mapper::extensions(&method.extensions)?,
            ..Default::default()
        };

        operation.tags = self.operation_tags(endpoint, method, &operation_id)?;
        operation.security = self.operation_security(endpoint, method, &operation_id);
        operation.servers = self.operation_servers(endpoint, method, &operation_id)?;
        operation.parameters = self.parameters(method)?;
        operation.request_body = self.request_body(endpoint, method)?;
        operation.responses = Some(self.responses(endpoint, method)?);
        for callback in &method.callbacks {
            operation
                .callbacks
                .insert(callback.name.clone(), mapper::callback(&mut self.generator, callback)?);
        }

        let item = self.document.paths.entry(path.clone()).or_default();
        if item.servers.is_empty() {
            if let Some(urls) = self
                .config
                .and_then(|c| c.get_list(&format!("{}{}", config::PATH_SERVERS_PREFIX, path)))
            {
                item.servers = urls.into_iter().map(Server::new).collect();
            }
        }
        let slot = item.slot_mut(verb);
        if slot.is_some() {
            warn!("Replacing duplicate operation {} {}", verb.as_str(), path);
        }
        *slot = Some(operation);
        Ok(())
    }

    /// Configuration beats method tags beats type tags
    fn operation_tags(
        &mut self,
        endpoint: &EndpointType,
        method: &EndpointMethod,
        operation_id: &str,
    ) -> Result<Vec<String>> {
        if let Some(tags) =
            self.config_list(&format!("{}{}", config::OPERATION_TAGS_PREFIX, operation_id))
        {
            return Ok(tags);
        }
        let declared = if method.tags.is_empty() {
            &endpoint.tags
        } else {
            &method.tags
        };
        let mut names = Vec::new();
        for tag in declared {
            let name = self.resolve_tag(tag, &endpoint.tags)?;
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Register full definitions; reference-only tags resolve against the
    /// document, then the declaring type, then stay a bare name
    fn resolve_tag(&mut self, tag: &TagMeta, type_tags: &[TagMeta]) -> Result<String> {
        if let Some(definition) = mapper::tag(tag)? {
            let name = definition.name.clone();
            self.document.add_tag(definition);
            return Ok(name);
        }
        let name = tag.reference.clone().unwrap_or_default();
        if self.document.tag(&name).is_none() {
            let local = type_tags
                .iter()
                .find(|t| t.name.as_deref() == Some(name.as_str()));
            if let Some(definition) = local {
                if let Some(definition) = mapper::tag(definition)? {
                    self.document.add_tag(definition);
                }
            }
        }
        Ok(name)
    }

    fn operation_security(
        &self,
        endpoint: &EndpointType,
        method: &EndpointMethod,
        operation_id: &str,
    ) -> Option<Vec<SecurityRequirement>> {
        if let Some(schemes) =
            self.config_list(&format!("{}{}", config::OPERATION_SECURITY_PREFIX, operation_id))
        {
            return Some(
                schemes
                    .into_iter()
                    .map(|name| SecurityRequirement::from([(name, Vec::new())]))
                    .collect(),
            );
        }
        let declared: &[SecurityRequirementSet] = if method.security.is_empty() {
            &endpoint.security
        } else {
            &method.security
        };
        if declared.is_empty() {
            return None;
        }
        Some(declared.iter().map(mapper::security_requirement).collect())
    }

    fn operation_servers(
        &self,
        endpoint: &EndpointType,
        method: &EndpointMethod,
        operation_id: &str,
    ) -> Result<Vec<Server>> {
        if let Some(urls) =
            self.config_list(&format!("{}{}", config::OPERATION_SERVERS_PREFIX, operation_id))
        {
            return Ok(urls.into_iter().map(Server::new).collect());
        }
        let declared: &[ServerMeta] = if method.servers.is_empty() {
            &endpoint.servers
        } else {
            &method.servers
        };
        declared.iter().map(mapper::server).collect()
    }

    /// Struct fields of a catalog type used as a parameter bag
    fn bean_fields(&self, ty: &TypeRef) -> Option<Vec<FieldDef>> {
        let def = self.catalog.lookup(&ty.name)?;
        let TypeDefKind::Struct(fields) = &def.kind else {
            return None;
        };
        if fields.is_empty() {
            return None;
        }
        let bindings = def.bindings(&ty.args);
        Some(
            fields
                .iter()
                .map(|field| FieldDef {
                    ty: field.ty.substitute(&bindings),
                    ..field.clone()
                })
                .collect(),
        )
    }

    fn parameters(&mut self, method: &EndpointMethod) -> Result<Vec<Parameter>> {
        let mut parameters: Vec<Parameter> = Vec::new();

        for param in &method.params {
            if param.injected || param.suspended {
                continue;
            }
            if let Some(meta) = &param.parameter {
                if meta.hidden {
                    continue;
                }
                let mut parameter = mapper::parameter(&mut self.generator, meta, Some(&param.ty))?;
                if parameter.reference.is_none() {
                    let binding = param.binding.as_ref();
                    parameter.name = parameter
                        .name
                        .or_else(|| binding.map(|b| b.name.clone()))
                        .or_else(|| Some(param.name.clone()));
                    parameter.location = parameter
                        .location
                        .or_else(|| binding.map(|b| b.location))
                        .or(Some(ParameterIn::Query));
                }
                push_parameter(&mut parameters, parameter);
                continue;
            }
            let Some(binding) = &param.binding else {
                continue;
            };
            if let Some(fields) = self.bean_fields(&param.ty) {
                for field in fields.iter().filter(|f| !f.skip) {
                    let hidden = field.schema.as_ref().is_some_and(|s| s.hidden);
                    if hidden {
                        continue;
                    }
                    let name = field
                        .schema
                        .as_ref()
                        .and_then(|s| s.name.clone())
                        .or_else(|| field.rename.clone())
                        .unwrap_or_else(|| field.name.clone());
                    let mut parameter = Parameter::new(name, binding.location);
                    parameter.description = field.schema.as_ref().and_then(|s| s.description.clone());
                    parameter.deprecated = field.deprecated.then_some(true);
                    parameter.required = Some(!is_option(&field.ty));
                    parameter.schema = Some(
                        self.generator
                            .member_schema(&field.ty, field.schema.as_ref())?,
                    );
                    push_parameter(&mut parameters, parameter);
                }
                continue;
            }
            let mut parameter = Parameter::new(binding.name.clone(), binding.location);
            parameter.schema = Some(self.generator.schema_for(&param.ty)?);
            if !is_option(&param.ty) && binding.location != ParameterIn::Query {
                parameter.required = Some(true);
            }
            push_parameter(&mut parameters, parameter);
        }

        for meta in &method.parameters {
            if meta.hidden {
                continue;
            }
            let signature_param = meta.name.as_deref().and_then(|name| find_param(method, name));
            let mut parameter = mapper::parameter(
                &mut self.generator,
                meta,
                signature_param.map(|p| &p.ty),
            )?;
            if parameter.reference.is_none() && parameter.location.is_none() {
                parameter.location = signature_param
                    .and_then(|p| p.binding.as_ref())
                    .map(|b| b.location)
                    .or(Some(ParameterIn::Query));
            }
            push_parameter(&mut parameters, parameter);
        }

        for parameter in &mut parameters {
            if parameter.reference.is_some() {
                continue;
            }
            if parameter.location == Some(ParameterIn::Path) {
                parameter.required = Some(true);
            }
            if parameter.schema.is_none() && parameter.content.is_empty() {
                let bound = parameter
                    .name
                    .as_deref()
                    .and_then(|name| find_param(method, name));
                if let Some(bound) = bound {
                    parameter.schema = Some(self.generator.schema_for(&bound.ty)?);
                }
            }
        }
        Ok(parameters)
    }

    fn request_body(
        &mut self,
        endpoint: &EndpointType,
        method: &EndpointMethod,
    ) -> Result<Option<RequestBody>> {
        let body_param = method.params.iter().find(|p| p.is_body_candidate());
        let consumes = if method.consumes.is_empty() {
            &endpoint.consumes
        } else {
            &method.consumes
        };
        let explicit = method
            .request_body
            .as_ref()
            .or_else(|| body_param.and_then(|p| p.request_body.as_ref()));

        if let Some(meta) = explicit {
            let body = mapper::request_body(
                &mut self.generator,
                meta,
                consumes,
                body_param.map(|p| &p.ty),
            )?;
            return Ok(Some(body));
        }
        let Some(param) = body_param else {
            return Ok(None);
        };
        Ok(Some(RequestBody {
            content: mapper::inferred_content(&mut self.generator, consumes, &param.ty)?,
            required: Some(!is_option(&param.ty)),
            ..Default::default()
        }))
    }

    fn return_kind(&self, method: &EndpointMethod) -> ReturnKind {
        let Some(mut ty) = method.effective_return() else {
            return ReturnKind::Void;
        };
        loop {
            if self.catalog.lookup(&ty.name).is_some() {
                return ReturnKind::Typed(ty.clone());
            }
            if ty.is_unit() {
                return ReturnKind::Void;
            }
            // axum style `(StatusCode, Json<T>)`
            let next = if ty.name == UNIT {
                ty.args.last()
            } else if BODY_WRAPPERS.contains(&ty.name.as_str()) {
                ty.first_arg()
            } else {
                None
            };
            match next {
                Some(inner) => ty = inner,
                None if UNTYPED_RESPONDERS.contains(&ty.name.as_str()) => return ReturnKind::Untyped,
                None => return ReturnKind::Typed(ty.clone()),
            }
        }
    }

    fn responses(&mut self, endpoint: &EndpointType, method: &EndpointMethod) -> Result<Responses> {
        let produces = if method.produces.is_empty() {
            &endpoint.produces
        } else {
            &method.produces
        };
        let kind = self.return_kind(method);
        let mut responses = Responses::default();

        let inherited = endpoint
            .responses
            .iter()
            .filter(|r| !method.responses.iter().any(|m| m.status == r.status));
        let declared: Vec<&ApiResponseMeta> = method.responses.iter().chain(inherited).collect();

        if !declared.is_empty() {
            let fallback = match &kind {
                ReturnKind::Typed(ty) => Some(ty),
                _ => None,
            };
            for meta in declared {
                let status = if meta.status.is_empty() {
                    "default".to_string()
                } else {
                    meta.status.clone()
                };
                let response = mapper::response(&mut self.generator, meta, produces, fallback)?;
                responses.insert(status, response);
            }
            return Ok(responses);
        }

        let suspended = method.params.iter().any(|p| p.suspended);
        let (status, content) = match kind {
            ReturnKind::Void if !suspended => ("204", None),
            ReturnKind::Void | ReturnKind::Untyped => ("200", None),
            ReturnKind::Typed(ty) => (
                "200",
                Some(mapper::inferred_content(&mut self.generator, produces, &ty)?),
            ),
        };
        responses.insert(
            status.to_string(),
            Response {
                description: Some(mapper::default_description(status)),
                content: content.unwrap_or_default(),
                ..Default::default()
            },
        );
        responses.designate_default(status);
        Ok(responses)
    }

    /// Apply post-conditions and hand the document back
    pub fn finish(mut self) -> OpenApi {
        for item in self.document.paths.values_mut() {
            for method in HttpMethod::ALL {
                if let Some(operation) = item.slot_mut(method) {
                    operation.responses.get_or_insert_with(Responses::default);
                }
            }
        }

        if !self.generator.is_empty() {
            self.generator
                .register_components(self.document.components_mut());
        }

        if let Some(urls) = self.config_list(config::SERVERS) {
            self.document.servers = urls.into_iter().map(Server::new).collect();
        }

        let title = self.config.and_then(|c| c.get(config::INFO_TITLE));
        let version = self.config.and_then(|c| c.get(config::INFO_VERSION));
        let info = self.document.info.get_or_insert_with(Info::default);
        if let Some(title) = title {
            info.title = title;
        }
        if let Some(version) = version {
            info.version = version;
        }
        if info.title.is_empty() {
            info.title = DEFAULT_TITLE.to_string();
        }
        if info.version.is_empty() {
            info.version = DEFAULT_VERSION.to_string();
        }

        info!(
            "Built document with {} paths and {} component schemas",
            self.document.paths.len(),
            self.generator.len()
        );
        self.document
    }
}

fn is_option(ty: &TypeRef) -> bool {
    ty.name == "Option"
}

/// Signature parameter bound (or named) `name`
fn find_param<'m>(method: &'m EndpointMethod, name: &str) -> Option<&'m MethodParam> {
    method
        .params
        .iter()
        .find(|p| p.binding.as_ref().is_some_and(|b| b.name == name))
        .or_else(|| method.params.iter().find(|p| p.name == name))
}

/// Add a parameter, merging onto an existing one with the same name and location
fn push_parameter(parameters: &mut Vec<Parameter>, parameter: Parameter) {
    let existing = parameters.iter_mut().find(|p| {
        p.reference.is_none()
            && parameter.reference.is_none()
            && p.name == parameter.name
            && p.location == parameter.location
    });
    let Some(existing) = existing else {
        parameters.push(parameter);
        return;
    };
    macro_rules! overlay {
        ($($field:ident),*) => {
            $(if parameter.$field.is_some() {
                existing.$field = parameter.$field;
            })*
        };
    }
    overlay!(
        description,
        required,
        deprecated,
        allow_empty_value,
        style,
        explode,
        allow_reserved,
        schema,
        example
    );
    existing.examples.extend(parameter.examples);
    if !parameter.content.is_empty() {
        existing.content = parameter.content;
        existing.schema = None;
    }
    existing.extensions.extend(parameter.extensions);
}

/// Join path fragments into one canonical absolute path.
///
/// Empty segments disappear, so `["", "/items/", "/{id}"]` and
/// `["/", "items", "{id}/"]` both give `/items/{id}`. Axum style `:id`
/// segments become `{id}`.
pub fn join_paths(fragments: &[&str]) -> String {
    let segments: Vec<String> = fragments
        .iter()
        .flat_map(|fragment| fragment.split('/'))
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => segment.to_string(),
        })
        .collect();
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::document::SchemaType;
    use crate::reader::read_source;
    use pretty_assertions::assert_eq;

    fn build_from_code(code: &str) -> OpenApi {
        let read = read_source(code).unwrap();
        OpenApiBuilder::new().build(None, &read).unwrap()
    }

    fn operation<'d>(doc: &'d OpenApi, path: &str, method: HttpMethod) -> &'d Operation {
        doc.paths
            .get(path)
            .and_then(|item| item.operation(method))
            .unwrap_or_else(|| panic!("missing {} {}", method.as_str(), path))
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths(&["", "/items/", "/{id}"]), "/items/{id}");
        assert_eq!(join_paths(&["/api", "users", ":id"]), "/api/users/{id}");
        assert_eq!(join_paths(&["", "", ""]), "/");
        assert_eq!(join_paths(&["//a//", "b/"]), "/a/b");
    }

    #[test]
    fn test_paths_combine_base_type_and_method() {
        let doc = build_from_code(
            r#"
            #[application_path("/api/")]
            pub struct App;

            #[path("/items/")]
            impl ItemResource {
                #[get("/{id}")]
                pub fn get_item(&self, #[path_param] id: u64) -> Item { todo!() }

                #[get]
                pub fn list(&self) -> Vec<Item> { todo!() }
            }

            pub struct Item { pub id: u64 }
            "#,
        );

        let paths: Vec<&String> = doc.paths.keys().collect();
        assert_eq!(paths, vec!["/api/items/{id}", "/api/items"]);

        let get = operation(&doc, "/api/items/{id}", HttpMethod::Get);
        assert_eq!(get.parameters.len(), 1);
        let id = &get.parameters[0];
        assert_eq!(id.name.as_deref(), Some("id"));
        assert_eq!(id.location, Some(ParameterIn::Path));
        assert_eq!(id.required, Some(true));
        assert_eq!(
            id.schema.as_ref().and_then(|s| s.schema_type),
            Some(SchemaType::Integer)
        );
    }

    #[test]
    fn test_operation_id_collisions() {
        let doc = build_from_code(
            r#"
            #[path("/a")]
            impl A {
                #[get]
                pub fn list(&self) -> String { todo!() }
            }

            #[path("/b")]
            impl B {
                #[get]
                pub fn list(&self) -> String { todo!() }
            }
            "#,
        );

        assert_eq!(
            operation(&doc, "/a", HttpMethod::Get).operation_id.as_deref(),
            Some("list")
        );
        assert_eq!(
            operation(&doc, "/b", HttpMethod::Get).operation_id.as_deref(),
            Some("list_1")
        );
    }

    #[test]
    fn test_explicit_operation_id_and_strategy() {
        let read = read_source(
            r#"
            #[path("/orders")]
            impl Orders {
                #[get("/{id}")]
                pub fn fetch(&self, #[path_param] id: u64) -> String { todo!() }

                #[post]
                #[operation(operation_id = "placeOrder", summary = "Place an order")]
                pub fn create(&self, order: String) -> String { todo!() }
            }
            "#,
        )
        .unwrap();

        let doc = OpenApiBuilder::new()
            .with_strategy(Box::new(naming::VerbPath))
            .build(None, &read)
            .unwrap();

        let fetch = operation(&doc, "/orders/{id}", HttpMethod::Get);
        assert_eq!(fetch.operation_id.as_deref(), Some("get_orders_id"));
        let create = operation(&doc, "/orders", HttpMethod::Post);
        assert_eq!(create.operation_id.as_deref(), Some("placeOrder"));
        assert_eq!(create.summary.as_deref(), Some("Place an order"));
    }

    #[test]
    fn test_default_response_synthesis() {
        let doc = build_from_code(
            r#"
            #[post("/void")]
            async fn void_handler() {}

            #[post("/suspended")]
            async fn suspended_handler(#[suspended] responder: AsyncResponder) {}

            #[get("/typed")]
            async fn typed_handler() -> Result<Json<Item>, ApiError> { todo!() }

            #[get("/untyped")]
            async fn untyped_handler() -> impl Responder { todo!() }

            pub struct Item { pub id: u64 }
            "#,
        );

        let void = operation(&doc, "/void", HttpMethod::Post).responses.as_ref().unwrap();
        assert_eq!(void.keys().collect::<Vec<_>>(), vec!["204"]);
        assert_eq!(void.default_status(), Some("204"));
        assert!(void.default_response().unwrap().content.is_empty());

        let suspended = operation(&doc, "/suspended", HttpMethod::Post)
            .responses
            .as_ref()
            .unwrap();
        assert_eq!(suspended.keys().collect::<Vec<_>>(), vec!["200"]);

        let typed = operation(&doc, "/typed", HttpMethod::Get).responses.as_ref().unwrap();
        let ok = typed.default_response().unwrap();
        let schema = ok.content.get("*/*").unwrap().schema.as_ref().unwrap();
        assert_eq!(schema.reference.as_deref(), Some("#/components/schemas/Item"));

        let untyped = operation(&doc, "/untyped", HttpMethod::Get).responses.as_ref().unwrap();
        assert!(untyped.get("200").unwrap().content.is_empty());
    }

    #[test]
    fn test_declared_responses_fill_schema_from_return_type() {
        let doc = build_from_code(
            r#"
            #[path("/items")]
            #[api_response(status = 500, description = "Server error")]
            #[api_response(status = 404, description = "Type level")]
            impl Items {
                #[get("/{id}")]
                #[produces("application/json")]
                #[api_response(status = 200, description = "Found", content(schema(description = "The item")))]
                #[api_response(status = 404, description = "Missing")]
                pub async fn get(&self, #[path_param] id: u64) -> Json<Item> { todo!() }
            }

            pub struct Item { pub id: u64 }
            "#,
        );

        let responses = operation(&doc, "/items/{id}", HttpMethod::Get)
            .responses
            .as_ref()
            .unwrap();
        assert_eq!(responses.keys().collect::<Vec<_>>(), vec!["200", "404", "500"]);
        assert_eq!(
            responses.get("404").unwrap().description.as_deref(),
            Some("Missing")
        );
        assert_eq!(responses.default_status(), None);

        let media = responses.get("200").unwrap().content.get("application/json").unwrap();
        let schema = media.schema.as_ref().unwrap();
        assert_eq!(schema.description.as_deref(), Some("The item"));
        assert_eq!(
            schema.all_of[0].reference.as_deref(),
            Some("#/components/schemas/Item")
        );
    }

    #[test]
    fn test_request_body_inference() {
        let doc = build_from_code(
            r#"
            #[path("/items")]
            #[consumes("application/json")]
            impl Items {
                #[post]
                pub async fn create(&self, #[context] ctx: Ctx, item: NewItem) -> Item { todo!() }

                #[put("/{id}")]
                #[consumes("application/xml")]
                pub async fn update(&self, #[path_param] id: u64, item: Option<NewItem>) {}
            }

            pub struct NewItem { pub name: String }
            pub struct Item { pub id: u64 }
            "#,
        );

        let create = operation(&doc, "/items", HttpMethod::Post);
        let body = create.request_body.as_ref().unwrap();
        assert_eq!(body.required, Some(true));
        assert_eq!(body.content.keys().collect::<Vec<_>>(), vec!["application/json"]);

        let update = operation(&doc, "/items/{id}", HttpMethod::Put);
        let body = update.request_body.as_ref().unwrap();
        assert_eq!(body.required, Some(false));
        assert!(body.content.contains_key("application/xml"));
    }

    #[test]
    fn test_explicit_request_body_wins() {
        let doc = build_from_code(
            r#"
            #[post("/upload")]
            #[request_body(
                description = "Raw upload",
                required = false,
                content(media_type = "application/octet-stream", schema(type = "string", format = "binary"))
            )]
            async fn upload(data: Vec<u8>) {}
            "#,
        );

        let body = operation(&doc, "/upload", HttpMethod::Post)
            .request_body
            .as_ref()
            .unwrap();
        assert_eq!(body.description.as_deref(), Some("Raw upload"));
        assert_eq!(body.required, Some(false));
        let schema = body.content["application/octet-stream"].schema.as_ref().unwrap();
        assert_eq!(schema.format.as_deref(), Some("binary"));
    }

    #[test]
    fn test_bean_parameters_expand() {
        let doc = build_from_code(
            r#"
            #[get("/search")]
            async fn search(Query(filter): Query<SearchFilter>) -> Vec<String> { todo!() }

            pub struct SearchFilter {
                pub q: String,
                #[serde(rename = "pageSize")]
                pub page_size: Option<u32>,
                #[serde(skip)]
                pub internal: bool,
            }
            "#,
        );

        let params = &operation(&doc, "/search", HttpMethod::Get).parameters;
        let names: Vec<_> = params.iter().map(|p| p.name.as_deref().unwrap()).collect();
        assert_eq!(names, vec!["q", "pageSize"]);
        assert!(params.iter().all(|p| p.location == Some(ParameterIn::Query)));
        assert_eq!(params[0].required, Some(true));
        assert_eq!(params[1].required, Some(false));
    }

    #[test]
    fn test_method_level_parameters_merge() {
        let doc = build_from_code(
            r#"
            #[get("/items/{id}")]
            #[parameter(name = "id", description = "Item identifier")]
            #[parameter(name = "X-Trace", in = "header", schema(type = "string"))]
            async fn get_item(#[path_param] id: u64) -> String { todo!() }
            "#,
        );

        let params = &operation(&doc, "/items/{id}", HttpMethod::Get).parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].description.as_deref(), Some("Item identifier"));
        assert_eq!(params[0].location, Some(ParameterIn::Path));
        assert_eq!(
            params[0].schema.as_ref().and_then(|s| s.schema_type),
            Some(SchemaType::Integer)
        );
        assert_eq!(params[1].location, Some(ParameterIn::Header));
    }

    #[test]
    fn test_tags_and_security_precedence() {
        let doc = build_from_code(
            r#"
            #[openapi_definition(tag(name = "admin", description = "Administration"))]
            pub struct Api;

            #[path("/users")]
            #[tag(name = "users", description = "User management")]
            #[security_requirement(name = "api_key")]
            impl Users {
                #[get]
                pub fn list(&self) -> Vec<String> { todo!() }

                #[delete("/{id}")]
                #[tag(ref = "admin")]
                #[tag(ref = "audit")]
                #[security_requirement(name = "oauth", scopes = ["users:write"])]
                pub fn remove(&self, #[path_param] id: u64) {}
            }
            "#,
        );

        let list = operation(&doc, "/users", HttpMethod::Get);
        assert_eq!(list.tags, vec!["users"]);
        let security = list.security.as_ref().unwrap();
        assert!(security[0].contains_key("api_key"));

        let remove = operation(&doc, "/users/{id}", HttpMethod::Delete);
        assert_eq!(remove.tags, vec!["admin", "audit"]);
        let security = remove.security.as_ref().unwrap();
        assert_eq!(security[0]["oauth"], vec!["users:write"]);

        let tag_names: Vec<_> = doc.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tag_names, vec!["admin", "users"]);
    }

    #[test]
    fn test_config_overrides() {
        let read = read_source(
            r#"
            #[path("/items")]
            #[tag(name = "items")]
            impl Items {
                #[get]
                pub fn list(&self) -> Vec<String> { todo!() }
            }
            "#,
        )
        .unwrap();
        let mut config = Config::new();
        config.set("openapi.tags.operation.list", "catalog, public");
        config.set("openapi.security.operation.list", "bearer");
        config.set("openapi.servers.operation.list", "https://read.example.com");
        config.set("openapi.servers.path./items", "https://items.example.com");
        config.set(config::SERVERS, "https://api.example.com");
        config.set(config::INFO_TITLE, "Catalog");

        let doc = OpenApiBuilder::new()
            .with_config(&config)
            .unwrap()
            .build(None, &read)
            .unwrap();

        let list = operation(&doc, "/items", HttpMethod::Get);
        assert_eq!(list.tags, vec!["catalog", "public"]);
        assert!(list.security.as_ref().unwrap()[0].contains_key("bearer"));
        assert_eq!(list.servers[0].url, "https://read.example.com");
        assert_eq!(doc.paths["/items"].servers[0].url, "https://items.example.com");
        assert_eq!(doc.servers[0].url, "https://api.example.com");
        let info = doc.info.as_ref().unwrap();
        assert_eq!(info.title, "Catalog");
        assert_eq!(info.version, DEFAULT_VERSION);
    }

    #[test]
    fn test_unknown_strategy_is_config_error() {
        let mut config = Config::new();
        config.set(config::OPERATION_ID_STRATEGY, "sequential");
        assert!(OpenApiBuilder::new().with_config(&config).is_err());
    }

    #[test]
    fn test_base_document_is_extended() {
        let mut base = OpenApi::new();
        base.info = Some(Info {
            title: "Base".to_string(),
            version: "9".to_string(),
            ..Default::default()
        });
        base.paths.insert(
            "/health".to_string(),
            crate::document::PathItem {
                get: Some(Operation {
                    operation_id: Some("health".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        base.components_mut().schemas.insert(
            "Item".to_string(),
            crate::document::Schema::of_type(SchemaType::String),
        );

        let read = read_source(
            r#"
            #[openapi_definition(info(title = "Ignored", version = "1"))]
            pub struct Api;

            #[get("/ping")]
            async fn health() -> Item { todo!() }

            pub struct Item { pub id: u64 }
            "#,
        )
        .unwrap();
        let doc = OpenApiBuilder::new().build(Some(base), &read).unwrap();

        assert_eq!(doc.info.as_ref().unwrap().title, "Base");
        assert_eq!(
            operation(&doc, "/ping", HttpMethod::Get).operation_id.as_deref(),
            Some("health_1")
        );
        assert!(operation(&doc, "/health", HttpMethod::Get).responses.is_some());
        let item = &doc.components.as_ref().unwrap().schemas["Item"];
        assert_eq!(item.schema_type, Some(SchemaType::String));
    }

    #[test]
    fn test_hidden_and_deprecated_operations() {
        let doc = build_from_code(
            r#"
            #[get("/visible")]
            #[deprecated]
            async fn visible() -> String { todo!() }

            #[get("/hidden")]
            #[operation(hidden)]
            async fn hidden() -> String { todo!() }
            "#,
        );

        assert!(doc.paths.get("/hidden").is_none());
        assert_eq!(operation(&doc, "/visible", HttpMethod::Get).deprecated, Some(true));
    }

    #[test]
    fn test_callbacks_and_security_schemes() {
        let doc = build_from_code(
            r#"
            #[security_scheme(name = "api_key", type = "apiKey", param_name = "X-Api-Key", in = "header")]
            pub struct Api;

            #[post("/subscriptions")]
            #[callback(
                name = "onEvent",
                expression = "{$request.body#/callbackUrl}",
                operation(method = "post", summary = "Event delivery",
                    api_response(status = 200, description = "Received"))
            )]
            async fn subscribe(body: Subscription) {}

            pub struct Subscription { pub callback_url: String }
            "#,
        );

        let op = operation(&doc, "/subscriptions", HttpMethod::Post);
        let callback = &op.callbacks["onEvent"];
        let item = &callback["{$request.body#/callbackUrl}"];
        assert!(item.post.is_some());

        let components = doc.components.as_ref().unwrap();
        assert!(components.security_schemes.contains_key("api_key"));
        assert!(components.schemas.contains_key("Subscription"));
    }

    #[test]
    fn test_callback_reference() {
        let doc = build_from_code(
            r#"
            #[post("/subs")]
            #[callback(name = "onEvent", ref = "OnEvent")]
            async fn subscribe(body: String) {}
            "#,
        );

        let op = operation(&doc, "/subs", HttpMethod::Post);
        let json = serde_json::to_value(&op.callbacks).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "onEvent": { "$ref": "#/components/callbacks/OnEvent" } })
        );
    }

    #[test]
    fn test_tuple_path_extractor() {
        let doc = build_from_code(
            r#"
            #[get("/users/{user_id}/posts/{post_id}")]
            async fn get_post(Path((user_id, post_id)): Path<(u64, String)>) -> String {
                todo!()
            }
            "#,
        );

        let op = operation(&doc, "/users/{user_id}/posts/{post_id}", HttpMethod::Get);
        let names: Vec<_> = op.parameters.iter().map(|p| p.name.as_deref().unwrap()).collect();
        assert_eq!(names, vec!["user_id", "post_id"]);
        for param in &op.parameters {
            assert_eq!(param.location, Some(ParameterIn::Path));
            assert_eq!(param.required, Some(true));
        }
        assert_eq!(
            op.parameters[0].schema.as_ref().unwrap().schema_type,
            Some(SchemaType::Integer)
        );
        assert_eq!(
            op.parameters[1].schema.as_ref().unwrap().schema_type,
            Some(SchemaType::String)
        );
    }

    #[test]
    fn test_custom_operation_id_strategy() {
        struct Prefixed;

        impl OperationIdStrategy for Prefixed {
            fn derive(&self, type_name: &str, method_name: &str, _verb: HttpMethod, _path: &str) -> String {
                format!("{}.{}", type_name.to_lowercase(), method_name)
            }
        }

        let read = read_source(
            r#"
            #[path("/orders")]
            impl Orders {
                #[get]
                pub fn list(&self) -> String { todo!() }

                #[get("/{id}")]
                #[operation(operation_id = "fetchOrder")]
                pub fn fetch(&self, #[path_param] id: u64) -> String { todo!() }
            }
            "#,
        )
        .unwrap();

        let doc = OpenApiBuilder::new()
            .with_strategy(Box::new(Prefixed))
            .build(None, &read)
            .unwrap();

        assert_eq!(
            operation(&doc, "/orders", HttpMethod::Get).operation_id.as_deref(),
            Some("orders.list")
        );
        assert_eq!(
            operation(&doc, "/orders/{id}", HttpMethod::Get).operation_id.as_deref(),
            Some("fetchOrder")
        );
    }
}
