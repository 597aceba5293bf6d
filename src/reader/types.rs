//! `syn` types and declarations -> model.

use super::attrs::{self, is_deprecated};
use crate::model::{
    FieldDef, TypeDef, TypeDefKind, TypeRef, VariantDef, VariantFields, SLICE, UNIT,
};
use log::debug;
use syn::meta::ParseNestedMeta;
use syn::{Fields, GenericArgument, PathArguments, Token, TypeParamBound};

/// Extract a structural type descriptor from a `syn::Type`
pub fn type_ref(ty: &syn::Type) -> TypeRef {
    match ty {
        syn::Type::Path(type_path) => path_ref(&type_path.path),
        syn::Type::Reference(reference) => type_ref(&reference.elem),
        syn::Type::Ptr(ptr) => type_ref(&ptr.elem),
        syn::Type::Paren(paren) => type_ref(&paren.elem),
        syn::Type::Group(group) => type_ref(&group.elem),
        syn::Type::Slice(slice) => TypeRef::generic(SLICE, vec![type_ref(&slice.elem)]),
        syn::Type::Array(array) => TypeRef::generic(SLICE, vec![type_ref(&array.elem)]),
        syn::Type::Tuple(tuple) => {
            TypeRef::generic(UNIT, tuple.elems.iter().map(type_ref).collect())
        }
        syn::Type::ImplTrait(impl_trait) => bounds_ref(impl_trait.bounds.iter()),
        syn::Type::TraitObject(object) => bounds_ref(object.bounds.iter()),
        _ => TypeRef::named("Unknown"),
    }
}

/// Last path segment plus its type arguments; `Output = T` bindings count as arguments
fn path_ref(path: &syn::Path) -> TypeRef {
    let Some(segment) = path.segments.last() else {
        return TypeRef::named("Unknown");
    };
    let mut args = Vec::new();
    match &segment.arguments {
        PathArguments::AngleBracketed(bracketed) => {
            for arg in &bracketed.args {
                match arg {
                    GenericArgument::Type(ty) => args.push(type_ref(ty)),
                    GenericArgument::AssocType(assoc) => args.push(type_ref(&assoc.ty)),
                    _ => {}
                }
            }
        }
        // Fn(A) -> B style sugar
        PathArguments::Parenthesized(_) | PathArguments::None => {}
    }
    TypeRef::generic(segment.ident.to_string(), args)
}

fn bounds_ref<'a>(mut bounds: impl Iterator<Item = &'a TypeParamBound>) -> TypeRef {
    bounds
        .find_map(|bound| match bound {
            TypeParamBound::Trait(trait_bound) => Some(path_ref(&trait_bound.path)),
            _ => None,
        })
        .unwrap_or_else(|| TypeRef::named("Unknown"))
}

/// Serde attributes on a container, field or variant
#[derive(Debug, Clone, Default)]
pub struct SerdeAttributes {
    /// Renamed field name
    pub rename: Option<String>,
    /// Container-level `rename_all`
    pub rename_all: Option<String>,
    /// Whether to skip this field during serialization
    pub skip: bool,
    pub flatten: bool,
}

/// Parse `#[serde(..)]` attributes, ignoring keys that do not affect the schema
pub fn serde_attributes(attrs: &[syn::Attribute]) -> syn::Result<SerdeAttributes> {
    let mut serde = SerdeAttributes::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        if !matches!(attr.meta, syn::Meta::List(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                serde.rename = Some(serde_rename(&meta)?);
            } else if meta.path.is_ident("rename_all") {
                serde.rename_all = Some(serde_rename(&meta)?);
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                serde.skip = true;
            } else if meta.path.is_ident("flatten") {
                serde.flatten = true;
            } else {
                skip_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(serde)
}

/// `rename = ".."` or `rename(serialize = "..")`
fn serde_rename(meta: &ParseNestedMeta) -> syn::Result<String> {
    if meta.input.peek(Token![=]) {
        return attrs::lit_str(meta);
    }
    let mut name = None;
    meta.parse_nested_meta(|inner| {
        let value = attrs::lit_str(&inner)?;
        if inner.path.is_ident("serialize") || name.is_none() {
            name = Some(value);
        }
        Ok(())
    })?;
    name.ok_or_else(|| meta.error("expected serialize name"))
}

/// Consume whatever value an ignored key carries
fn skip_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_value(&inner))?;
    }
    Ok(())
}

/// Apply a serde `rename_all` rule to a snake_case field or PascalCase variant
pub fn apply_rename_rule(rule: &str, name: &str, variant: bool) -> String {
    let words: Vec<String> = if variant {
        split_pascal(name)
    } else {
        name.split('_')
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect()
    };

    let capitalize = |w: &String| {
        let mut chars = w.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    };

    match rule {
        "lowercase" => words.concat(),
        "UPPERCASE" => words.concat().to_uppercase(),
        "PascalCase" => words.iter().map(capitalize).collect(),
        "camelCase" => words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
            .collect(),
        "snake_case" => words.join("_"),
        "SCREAMING_SNAKE_CASE" => words.join("_").to_uppercase(),
        "kebab-case" => words.join("-"),
        "SCREAMING-KEBAB-CASE" => words.join("-").to_uppercase(),
        _ => name.to_string(),
    }
}

fn split_pascal(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in name.chars() {
        if c.is_uppercase() && !current.is_empty() {
            words.push(current.to_lowercase());
            current.clear();
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current.to_lowercase());
    }
    words
}

fn generic_names(generics: &syn::Generics) -> Vec<String> {
    generics
        .type_params()
        .map(|param| param.ident.to_string())
        .collect()
}

fn named_fields(
    fields: &syn::FieldsNamed,
    rename_all: Option<&str>,
) -> syn::Result<Vec<FieldDef>> {
    let mut defs = Vec::new();
    for field in &fields.named {
        let Some(ident) = &field.ident else {
            continue;
        };
        let name = ident.to_string();
        let serde = serde_attributes(&field.attrs)?;
        let rename = serde
            .rename
            .or_else(|| rename_all.map(|rule| apply_rename_rule(rule, &name, false)))
            .filter(|renamed| renamed != &name);

        defs.push(FieldDef {
            ty: type_ref(&field.ty),
            rename,
            skip: serde.skip,
            flatten: serde.flatten,
            schema: attrs::schema_attr(&field.attrs)?,
            deprecated: is_deprecated(&field.attrs),
            name,
        });
    }
    debug!("Parsed {} fields", defs.len());
    Ok(defs)
}

/// Parse a struct definition into a TypeDef
pub fn struct_def(item: &syn::ItemStruct) -> syn::Result<TypeDef> {
    let name = item.ident.to_string();
    debug!("Parsing struct definition: {}", name);

    let serde = serde_attributes(&item.attrs)?;
    let kind = match &item.fields {
        Fields::Named(fields) => {
            TypeDefKind::Struct(named_fields(fields, serde.rename_all.as_deref())?)
        }
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
            TypeDefKind::Newtype(type_ref(&fields.unnamed[0].ty))
        }
        Fields::Unnamed(_) | Fields::Unit => TypeDefKind::Struct(Vec::new()),
    };

    Ok(TypeDef {
        name,
        generics: generic_names(&item.generics),
        kind,
        schema: attrs::schema_attr(&item.attrs)?,
        deprecated: is_deprecated(&item.attrs),
    })
}

/// Parse an enum definition into a TypeDef
pub fn enum_def(item: &syn::ItemEnum) -> syn::Result<TypeDef> {
    let name = item.ident.to_string();
    debug!("Parsing enum definition: {}", name);

    let container = serde_attributes(&item.attrs)?;
    let mut variants = Vec::new();
    for variant in &item.variants {
        let serde = serde_attributes(&variant.attrs)?;
        if serde.skip {
            continue;
        }
        let variant_name = variant.ident.to_string();
        let fields = match &variant.fields {
            Fields::Unit => VariantFields::Unit,
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                VariantFields::Newtype(type_ref(&fields.unnamed[0].ty))
            }
            Fields::Unnamed(fields) => {
                VariantFields::Tuple(fields.unnamed.iter().map(|f| type_ref(&f.ty)).collect())
            }
            Fields::Named(fields) => VariantFields::Struct(named_fields(
                fields,
                serde.rename_all.as_deref(),
            )?),
        };
        let rename = serde
            .rename
            .or_else(|| {
                container
                    .rename_all
                    .as_deref()
                    .map(|rule| apply_rename_rule(rule, &variant_name, true))
            })
            .filter(|renamed| renamed != &variant_name);

        variants.push(VariantDef {
            name: variant_name,
            rename,
            fields,
        });
    }
    debug!("Parsed {} variants", variants.len());

    Ok(TypeDef {
        name,
        generics: generic_names(&item.generics),
        kind: TypeDefKind::Enum(variants),
        schema: attrs::schema_attr(&item.attrs)?,
        deprecated: is_deprecated(&item.attrs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_type(code: &str) -> TypeRef {
        type_ref(&syn::parse_str::<syn::Type>(code).unwrap())
    }

    #[test]
    fn test_type_ref_paths_and_generics() {
        assert_eq!(parse_type("std::string::String"), TypeRef::named("String"));
        assert_eq!(
            parse_type("HashMap<String, Vec<crate::User>>").to_string(),
            "HashMap<String, Vec<User>>"
        );
        assert_eq!(parse_type("&'a str"), TypeRef::named("str"));
        assert_eq!(parse_type("[u8; 16]").to_string(), "[u8]");
        assert!(parse_type("()").is_unit());
    }

    #[test]
    fn test_type_ref_impl_trait_keeps_output() {
        assert_eq!(
            parse_type("impl Future<Output = Result<Item, Error>> + Send").to_string(),
            "Future<Result<Item, Error>>"
        );
        assert_eq!(
            parse_type("BoxFuture<'static, Item>").to_string(),
            "BoxFuture<Item>"
        );
        assert_eq!(parse_type("impl Responder").to_string(), "Responder");
    }

    #[test]
    fn test_rename_rules() {
        assert_eq!(apply_rename_rule("camelCase", "created_at", false), "createdAt");
        assert_eq!(apply_rename_rule("PascalCase", "created_at", false), "CreatedAt");
        assert_eq!(apply_rename_rule("kebab-case", "created_at", false), "created-at");
        assert_eq!(apply_rename_rule("snake_case", "OnHold", true), "on_hold");
        assert_eq!(
            apply_rename_rule("SCREAMING_SNAKE_CASE", "OnHold", true),
            "ON_HOLD"
        );
        assert_eq!(apply_rename_rule("lowercase", "OnHold", true), "onhold");
        assert_eq!(apply_rename_rule("camelCase", "OnHold", true), "onHold");
    }

    #[test]
    fn test_struct_with_serde_attributes() {
        let item: syn::ItemStruct = syn::parse_str(
            r#"
            #[derive(Serialize)]
            #[serde(rename_all = "camelCase", deny_unknown_fields)]
            pub struct User {
                pub user_id: u64,
                #[serde(rename = "login")]
                pub user_name: String,
                #[serde(skip_serializing_if = "Option::is_none", default)]
                pub email: Option<String>,
                #[serde(skip)]
                pub password: String,
            }
            "#,
        )
        .unwrap();

        let def = struct_def(&item).unwrap();
        let TypeDefKind::Struct(fields) = def.kind else {
            panic!("Expected struct type");
        };
        let renames: Vec<_> = fields.iter().map(|f| f.rename.clone()).collect();
        assert_eq!(
            renames,
            vec![
                Some("userId".to_string()),
                Some("login".to_string()),
                None,
                None
            ]
        );
        assert!(fields[3].skip);
        assert!(!fields[2].skip);
    }

    #[test]
    fn test_generic_struct_and_newtype() {
        let page: syn::ItemStruct =
            syn::parse_str("pub struct Page<'a, T: Clone> { items: Vec<T>, cursor: &'a str }")
                .unwrap();
        let def = struct_def(&page).unwrap();
        assert_eq!(def.generics, vec!["T"]);

        let id: syn::ItemStruct = syn::parse_str("pub struct UserId(pub u64);").unwrap();
        assert_eq!(
            struct_def(&id).unwrap().kind,
            TypeDefKind::Newtype(TypeRef::named("u64"))
        );
    }

    #[test]
    fn test_enum_variants() {
        let item: syn::ItemEnum = syn::parse_str(
            r#"
            #[serde(rename_all = "snake_case")]
            pub enum Event {
                Created,
                Renamed(String),
                Moved { from: String, to: String },
                #[serde(skip)]
                Internal,
            }
            "#,
        )
        .unwrap();

        let def = enum_def(&item).unwrap();
        let TypeDefKind::Enum(variants) = def.kind else {
            panic!("Expected enum type");
        };
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].wire_name(), "created");
        assert_eq!(
            variants[1].fields,
            VariantFields::Newtype(TypeRef::named("String"))
        );
        assert!(matches!(variants[2].fields, VariantFields::Struct(ref f) if f.len() == 2));
    }
}
