//! Structural view of the declarations the generator works from.
//!
//! The reader fills these from parsed source; the schema generator and the
//! operation builder only ever see this model, never `syn` trees. Tests build
//! the model by hand.

use crate::annotations::{
    ApiResponseMeta, CallbackMeta, ExtensionMeta, ExternalDocsMeta, OperationMeta, ParameterMeta,
    RequestBodyMeta, SchemaMeta, SecurityRequirementSet, ServerMeta, TagMeta,
};
use crate::document::{HttpMethod, ParameterIn};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// Name of the unit type `()` and of tuples
pub const UNIT: &str = "()";
/// Name used for slices and fixed-size arrays
pub const SLICE: &str = "[]";

/// Structural type descriptor.
///
/// A type is its last path segment plus its type arguments, so
/// `std::vec::Vec<crate::Item>` is `Vec<Item>`. `impl Trait` and `dyn Trait`
/// are named after the trait, with associated type bindings such as
/// `Output = T` folded into the arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// Base type name (e.g., "String", "Vec", "User")
    pub name: String,
    /// Type arguments, in declaration order
    pub args: Vec<TypeRef>,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn unit() -> Self {
        Self::named(UNIT)
    }

    pub fn is_unit(&self) -> bool {
        self.name == UNIT && self.args.is_empty()
    }

    /// First type argument, if any
    pub fn first_arg(&self) -> Option<&TypeRef> {
        self.args.first()
    }

    /// Replace generic parameters by the concrete types bound to them
    pub fn substitute(&self, bindings: &HashMap<String, TypeRef>) -> TypeRef {
        if self.args.is_empty() {
            if let Some(bound) = bindings.get(&self.name) {
                return bound.clone();
            }
        }
        TypeRef {
            name: self.name.clone(),
            args: self.args.iter().map(|a| a.substitute(bindings)).collect(),
        }
    }

    /// Concatenated form used for component names: `Page<Item>` -> `PageItem`
    pub fn flat_name(&self) -> String {
        let mut name = match self.name.as_str() {
            UNIT => "Tuple".to_string(),
            SLICE => "Array".to_string(),
            other => other.to_string(),
        };
        for arg in &self.args {
            name.push_str(&arg.flat_name());
        }
        name
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == UNIT {
            write!(f, "(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            return write!(f, ")");
        }
        if self.name == SLICE {
            return match self.args.first() {
                Some(inner) => write!(f, "[{}]", inner),
                None => write!(f, "[]"),
            };
        }
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

/// A struct or enum declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    /// Names of the declared type parameters
    pub generics: Vec<String>,
    pub kind: TypeDefKind,
    /// Type-level `#[schema(..)]`
    pub schema: Option<SchemaMeta>,
    /// Rust `#[deprecated]`
    pub deprecated: bool,
}

impl TypeDef {
    pub fn new_struct(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
            kind: TypeDefKind::Struct(fields),
            schema: None,
            deprecated: false,
        }
    }

    pub fn new_enum(name: impl Into<String>, variants: Vec<VariantDef>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
            kind: TypeDefKind::Enum(variants),
            schema: None,
            deprecated: false,
        }
    }

    /// Bind declared type parameters to the arguments of a concrete use
    pub fn bindings(&self, args: &[TypeRef]) -> HashMap<String, TypeRef> {
        self.generics
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefKind {
    /// Named fields; tuple structs carry no fields
    Struct(Vec<FieldDef>),
    Enum(Vec<VariantDef>),
    /// Single-field tuple struct, documented as its inner type
    Newtype(TypeRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    /// `#[serde(rename = "..")]`, after any container `rename_all`
    pub rename: Option<String>,
    /// `#[serde(skip)]` or `#[serde(skip_serializing)]`
    pub skip: bool,
    pub flatten: bool,
    pub schema: Option<SchemaMeta>,
    pub deprecated: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            rename: None,
            skip: false,
            flatten: false,
            schema: None,
            deprecated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantDef {
    pub name: String,
    pub rename: Option<String>,
    pub fields: VariantFields,
}

impl VariantDef {
    pub fn unit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rename: None,
            fields: VariantFields::Unit,
        }
    }

    /// Name the variant has on the wire
    pub fn wire_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariantFields {
    Unit,
    Newtype(TypeRef),
    Struct(Vec<FieldDef>),
    Tuple(Vec<TypeRef>),
}

/// Lookup of declared types by name
pub trait TypeCatalog {
    fn lookup(&self, name: &str) -> Option<&TypeDef>;
}

/// Declared types in discovery order
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    types: IndexMap<String, TypeDef>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a type; the first declaration of a name is kept
    pub fn insert(&mut self, def: TypeDef) {
        self.types.entry(def.name.clone()).or_insert(def);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }
}

impl TypeCatalog for TypeIndex {
    fn lookup(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }
}

impl FromIterator<TypeDef> for TypeIndex {
    fn from_iter<I: IntoIterator<Item = TypeDef>>(iter: I) -> Self {
        let mut index = TypeIndex::new();
        for def in iter {
            index.insert(def);
        }
        index
    }
}

/// Transport binding of a method parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub location: ParameterIn,
    /// Wire name of the parameter
    pub name: String,
}

/// A parameter of an endpoint method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodParam {
    pub name: String,
    pub ty: TypeRef,
    pub binding: Option<Binding>,
    /// Supplied by the framework (`#[context]`, request handles, shared state)
    pub injected: bool,
    /// Async continuation: the response is produced out of band
    pub suspended: bool,
    pub parameter: Option<ParameterMeta>,
    pub request_body: Option<RequestBodyMeta>,
}

impl MethodParam {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            binding: None,
            injected: false,
            suspended: false,
            parameter: None,
            request_body: None,
        }
    }

    pub fn bound(name: impl Into<String>, ty: TypeRef, location: ParameterIn) -> Self {
        let name = name.into();
        Self {
            binding: Some(Binding {
                location,
                name: name.clone(),
            }),
            ..Self::new(name, ty)
        }
    }

    /// Candidate for the request body
    pub fn is_body_candidate(&self) -> bool {
        self.binding.is_none() && self.parameter.is_none() && !self.injected && !self.suspended
    }
}

/// A method of an endpoint type (or a free handler function)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointMethod {
    pub name: String,
    pub verb: Option<HttpMethod>,
    /// Path fragment relative to the endpoint type
    pub path: Option<String>,
    pub operation: Option<OperationMeta>,
    /// Rust `#[deprecated]`
    pub deprecated: bool,
    pub params: Vec<MethodParam>,
    /// `None` for methods without a return type
    pub return_type: Option<TypeRef>,
    /// Method-level `#[parameter(..)]` entries
    pub parameters: Vec<ParameterMeta>,
    pub request_body: Option<RequestBodyMeta>,
    pub responses: Vec<ApiResponseMeta>,
    pub tags: Vec<TagMeta>,
    pub security: Vec<SecurityRequirementSet>,
    pub servers: Vec<ServerMeta>,
    pub produces: Vec<String>,
    pub consumes: Vec<String>,
    pub callbacks: Vec<CallbackMeta>,
    pub external_docs: Option<ExternalDocsMeta>,
    pub extensions: Vec<ExtensionMeta>,
}

impl EndpointMethod {
    pub fn new(name: impl Into<String>, verb: HttpMethod) -> Self {
        Self {
            name: name.into(),
            verb: Some(verb),
            ..Default::default()
        }
    }

    /// Return type with one async wrapper removed
    pub fn effective_return(&self) -> Option<&TypeRef> {
        let ty = self.return_type.as_ref()?;
        Some(unwrap_async(ty))
    }
}

/// An endpoint type and its operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointType {
    pub name: String,
    /// Path fragment shared by every method
    pub path: Option<String>,
    pub tags: Vec<TagMeta>,
    pub security: Vec<SecurityRequirementSet>,
    pub servers: Vec<ServerMeta>,
    pub produces: Vec<String>,
    pub consumes: Vec<String>,
    /// Responses every method inherits unless it declares the same status
    pub responses: Vec<ApiResponseMeta>,
    pub extensions: Vec<ExtensionMeta>,
    pub methods: Vec<EndpointMethod>,
}

impl EndpointType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

const ASYNC_WRAPPERS: &[&str] = &["Future", "BoxFuture", "LocalBoxFuture", "JoinHandle"];

/// Strip one layer of async wrapping: `impl Future<Output = T>`,
/// `BoxFuture<T>`, `JoinHandle<T>` or `Pin<Box<dyn Future<Output = T>>>`
pub fn unwrap_async(ty: &TypeRef) -> &TypeRef {
    if ty.name == "Pin" {
        if let Some(inner) = ty.first_arg() {
            let inner = if inner.name == "Box" {
                inner.first_arg().unwrap_or(inner)
            } else {
                inner
            };
            if inner.name == "Future" {
                return inner.first_arg().unwrap_or(inner);
            }
        }
        return ty;
    }
    if ASYNC_WRAPPERS.contains(&ty.name.as_str()) {
        // BoxFuture<'a, T> keeps only the type argument
        if let Some(inner) = ty.args.last() {
            return inner;
        }
    }
    ty
}
