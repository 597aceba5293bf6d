use crate::annotations::SchemaMeta;
use crate::document::{
    component_ref, AdditionalProperties, ComponentKind, Components, Discriminator, ExternalDocs,
    Schema, SchemaType,
};
use crate::error::{Error, Result};
use crate::mapper;
use crate::model::{
    FieldDef, TypeCatalog, TypeDef, TypeDefKind, TypeRef, VariantDef, VariantFields, SLICE, UNIT,
};
use indexmap::IndexMap;
use log::debug;
use serde_json::Number;
use std::collections::HashMap;

/// Index of a component schema in the generator's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaHandle(usize);

impl SchemaHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A component schema under construction
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    schema: Schema,
}

/// Schema generator - converts Rust types to OpenAPI schemas.
///
/// Every named type known to the catalog becomes a component. The component
/// slot is allocated and cached before the type's members are visited, so a
/// type that refers back to itself (directly or through other types) finds
/// its own handle and gets a `$ref` instead of recursing forever.
pub struct SchemaGenerator<'c> {
    /// Declared types available for inference
    catalog: &'c dyn TypeCatalog,
    /// Component schemas in registration order
    entries: Vec<Entry>,
    /// Type key (`Page<Item>`) -> arena slot
    cache: HashMap<String, SchemaHandle>,
    /// Component name -> type key that owns it
    names: HashMap<String, String>,
}

impl<'c> SchemaGenerator<'c> {
    pub fn new(catalog: &'c dyn TypeCatalog) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            catalog,
            entries: Vec::new(),
            cache: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Generate a schema for a type.
    ///
    /// Scalars and containers are returned inline; named types are returned
    /// as a `$ref` to their component.
    pub fn schema_for(&mut self, ty: &TypeRef) -> Result<Schema> {
        if let Some(schema) = scalar_schema(ty) {
            return Ok(schema);
        }

        match ty.name.as_str() {
            "Option" => {
                let Some(inner) = ty.first_arg() else {
                    return Ok(Schema::of_type(SchemaType::Object));
                };
                let mut schema = self.schema_for(inner)?;
                if scalar_schema(inner).is_some() {
                    schema.nullable = Some(true);
                }
                Ok(schema)
            }
            "Box" | "Arc" | "Rc" | "Cow" | "RefCell" | "Cell" | "Mutex" | "RwLock" => {
                match ty.first_arg() {
                    Some(inner) => self.schema_for(inner),
                    None => Ok(Schema::of_type(SchemaType::Object)),
                }
            }
            "Value" => Ok(Schema::default()),
            "HashMap" | "BTreeMap" | "IndexMap" | "Map" => {
                let mut schema = Schema::of_type(SchemaType::Object);
                if let Some(value) = ty.args.get(1) {
                    let value_schema = self.schema_for(value)?;
                    if value_schema != Schema::default() {
                        schema.additional_properties =
                            Some(AdditionalProperties::Schema(Box::new(value_schema)));
                    }
                }
                Ok(schema)
            }
            "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet" | SLICE => {
                let Some(inner) = ty.first_arg() else {
                    return Ok(Schema::of_type(SchemaType::Array));
                };
                if inner.name == "u8" && matches!(ty.name.as_str(), "Vec" | SLICE) {
                    return Ok(Schema::with_format(SchemaType::String, "binary"));
                }
                let mut schema = Schema::array_of(self.schema_for(inner)?);
                if ty.name.ends_with("Set") {
                    schema.unique_items = Some(true);
                }
                Ok(schema)
            }
            UNIT if ty.args.is_empty() => Ok(Schema::default()),
            UNIT => Ok(Schema::of_type(SchemaType::Array)),
            _ => {
                let catalog = self.catalog;
                match catalog.lookup(&ty.name) {
                    Some(def) => self.named_schema(ty, def),
                    None => {
                        debug!("Unknown type: {}, using object placeholder", ty);
                        Ok(Schema::of_type(SchemaType::Object))
                    }
                }
            }
        }
    }

    /// Schema for a member: explicit metadata that names a reference, a type
    /// or an implementation replaces inference; any other metadata is merged
    /// on top of the inferred schema.
    pub fn member_schema(&mut self, ty: &TypeRef, meta: Option<&SchemaMeta>) -> Result<Schema> {
        match meta {
            Some(meta) if meta.overrides_structure() => self.explicit_schema(meta),
            Some(meta) => {
                let inferred = self.schema_for(ty)?;
                self.merge_meta(inferred, meta)
            }
            None => self.schema_for(ty),
        }
    }

    /// Schema described entirely by metadata
    pub fn explicit_schema(&mut self, meta: &SchemaMeta) -> Result<Schema> {
        if meta.reference.is_some() {
            return self.merge_meta(Schema::default(), meta);
        }
        let base = match &meta.implementation {
            Some(implementation) => self.schema_for(implementation)?,
            None => Schema::default(),
        };
        self.merge_meta(base, meta)
    }

    /// Merge declared constraints onto a schema; explicit values win.
    ///
    /// Sibling keywords next to a `$ref` are wrapped as `allOf: [$ref]`.
    pub fn merge_meta(&mut self, schema: Schema, meta: &SchemaMeta) -> Result<Schema> {
        if let Some(reference) = &meta.reference {
            if reference.starts_with("#/components/") && !reference.starts_with("#/components/schemas/") {
                return Err(Error::UnsupportedNode(reference.clone()));
            }
            return Ok(Schema {
                reference: Some(component_ref(ComponentKind::Schemas, reference)),
                ..Default::default()
            });
        }

        let hint = match &meta.schema_type {
            Some(text) => Some(text.parse::<SchemaType>()?),
            None => schema.schema_type,
        };
        let overlay = self.overlay(meta, hint)?;
        if overlay == Schema::default() {
            return Ok(schema);
        }

        let mut target = if schema.reference.is_some() {
            Schema {
                all_of: vec![schema],
                ..Default::default()
            }
        } else {
            schema
        };
        apply_overlay(&mut target, overlay);
        Ok(target)
    }

    /// Arena slot of a named type, if it has been generated
    pub fn handle_of(&self, ty: &TypeRef) -> Option<SchemaHandle> {
        self.cache.get(&ty.to_string()).copied()
    }

    pub fn get(&self, handle: SchemaHandle) -> &Schema {
        &self.entries[handle.0].schema
    }

    pub fn component_name(&self, handle: SchemaHandle) -> &str {
        &self.entries[handle.0].name
    }

    /// Look up a generated component by name
    pub fn component(&self, name: &str) -> Option<&Schema> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.schema)
    }

    /// Number of generated components
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flush generated components, keeping entries the document already has
    pub fn register_components(&self, components: &mut Components) {
        for entry in &self.entries {
            if components.schemas.contains_key(&entry.name) {
                debug!("Keeping existing component schema {}", entry.name);
                continue;
            }
            components
                .schemas
                .insert(entry.name.clone(), entry.schema.clone());
        }
    }

    fn named_schema(&mut self, ty: &TypeRef, def: &TypeDef) -> Result<Schema> {
        let key = ty.to_string();
        if let Some(handle) = self.cache.get(&key) {
            debug!("Schema for {} already exists", key);
            return Ok(Schema::reference_to(&self.entries[handle.0].name));
        }

        let name = self.allocate_name(ty, def, &key);
        debug!("Generating component schema {} for {}", name, key);

        // Register before filling so cycles resolve to this slot
        let handle = SchemaHandle(self.entries.len());
        self.entries.push(Entry {
            name: name.clone(),
            schema: Schema::default(),
        });
        self.cache.insert(key, handle);

        let bindings = def.bindings(&ty.args);
        let mut schema = match &def.kind {
            TypeDefKind::Struct(fields) => self.object_schema(fields, &bindings)?,
            TypeDefKind::Enum(variants) => self.enum_schema(variants, &bindings)?,
            TypeDefKind::Newtype(inner) => self.schema_for(&inner.substitute(&bindings))?,
        };
        if def.deprecated {
            schema.deprecated = Some(true);
        }
        if let Some(meta) = &def.schema {
            schema = self.merge_meta(schema, meta)?;
        }
        self.entries[handle.0].schema = schema;

        Ok(Schema::reference_to(&name))
    }

    fn allocate_name(&mut self, ty: &TypeRef, def: &TypeDef, key: &str) -> String {
        let mut base = def
            .schema
            .as_ref()
            .and_then(|m| m.name.clone())
            .unwrap_or_else(|| def.name.clone());
        for arg in &ty.args {
            base.push_str(&arg.flat_name());
        }

        let mut name = base.clone();
        let mut suffix = 0;
        while let Some(owner) = self.names.get(&name) {
            if owner == key {
                break;
            }
            suffix += 1;
            name = format!("{}_{}", base, suffix);
        }
        self.names.insert(name.clone(), key.to_string());
        name
    }

    fn object_schema(
        &mut self,
        fields: &[FieldDef],
        bindings: &HashMap<String, TypeRef>,
    ) -> Result<Schema> {
        let mut schema = Schema::of_type(SchemaType::Object);

        for field in fields {
            let meta = field.schema.as_ref();
            if field.skip || meta.is_some_and(|m| m.hidden) {
                debug!("Skipping field {}", field.name);
                continue;
            }
            let ty = field.ty.substitute(bindings);

            if field.flatten {
                self.flatten_into(&mut schema, &ty)?;
                continue;
            }

            let name = meta
                .and_then(|m| m.name.clone())
                .or_else(|| field.rename.clone())
                .unwrap_or_else(|| field.name.clone());

            let mut property = self.member_schema(&ty, meta)?;
            if field.deprecated && property.deprecated.is_none() {
                property = self.merge_meta(
                    property,
                    &SchemaMeta {
                        deprecated: Some(true),
                        ..Default::default()
                    },
                )?;
            }
            if meta.and_then(|m| m.required) == Some(true) {
                schema.add_required(&name);
            }
            schema.properties.insert(name, property);
        }

        Ok(schema)
    }

    /// Inline the properties of a `#[serde(flatten)]` member
    fn flatten_into(&mut self, schema: &mut Schema, ty: &TypeRef) -> Result<()> {
        let catalog = self.catalog;
        if let Some(def) = catalog.lookup(&ty.name) {
            if let TypeDefKind::Struct(fields) = &def.kind {
                let inner = self.object_schema(fields, &def.bindings(&ty.args))?;
                for name in &inner.required {
                    schema.add_required(name);
                }
                schema.properties.extend(inner.properties);
                return Ok(());
            }
        }
        let flattened = self.schema_for(ty)?;
        schema.all_of.push(flattened);
        Ok(())
    }

    /// Unit-only enums are string enums; others follow serde's external tagging
    fn enum_schema(
        &mut self,
        variants: &[VariantDef],
        bindings: &HashMap<String, TypeRef>,
    ) -> Result<Schema> {
        if variants.iter().all(|v| v.fields == VariantFields::Unit) {
            let mut schema = Schema::of_type(SchemaType::String);
            schema.enumeration = variants
                .iter()
                .map(|v| serde_json::Value::String(v.wire_name().to_string()))
                .collect();
            return Ok(schema);
        }

        let mut schema = Schema::default();
        for variant in variants {
            let wire = variant.wire_name().to_string();
            let payload = match &variant.fields {
                VariantFields::Unit => {
                    let mut unit = Schema::of_type(SchemaType::String);
                    unit.enumeration = vec![serde_json::Value::String(wire)];
                    schema.one_of.push(unit);
                    continue;
                }
                VariantFields::Newtype(inner) => self.schema_for(&inner.substitute(bindings))?,
                VariantFields::Struct(fields) => self.object_schema(fields, bindings)?,
                VariantFields::Tuple(_) => Schema::of_type(SchemaType::Array),
            };
            let mut tagged = Schema::of_type(SchemaType::Object);
            tagged.add_required(&wire);
            tagged.properties.insert(wire, payload);
            schema.one_of.push(tagged);
        }
        Ok(schema)
    }

    /// Schema holding only the values the metadata declares
    fn overlay(&mut self, meta: &SchemaMeta, hint: Option<SchemaType>) -> Result<Schema> {
        let mut overlay = Schema {
            title: meta.title.clone(),
            description: meta.description.clone(),
            format: meta.format.clone(),
            multiple_of: parse_number("multipleOf", meta.multiple_of.as_deref())?,
            maximum: parse_number("maximum", meta.maximum.as_deref())?,
            exclusive_maximum: meta.exclusive_maximum,
            minimum: parse_number("minimum", meta.minimum.as_deref())?,
            exclusive_minimum: meta.exclusive_minimum,
            max_length: meta.max_length,
            min_length: meta.min_length,
            pattern: meta.pattern.clone(),
            max_items: meta.max_items,
            min_items: meta.min_items,
            unique_items: meta.unique_items,
            max_properties: meta.max_properties,
            min_properties: meta.min_properties,
            nullable: meta.nullable,
            read_only: meta.read_only,
            write_only: meta.write_only,
            deprecated: meta.deprecated,
            default: meta.default_value.as_deref().map(|v| mapper::literal(v, hint)),
            example: meta.example.as_deref().map(|v| mapper::literal(v, hint)),
            external_docs: meta.external_docs.as_ref().map(|d| ExternalDocs {
                url: d.url.clone(),
                description: d.description.clone(),
                ..Default::default()
            }),
            extensions: mapper::extensions(&meta.extensions)?,
            ..Default::default()
        };

        if meta.schema_type.is_some() {
            overlay.schema_type = hint;
        }
        overlay.enumeration = meta
            .enumeration
            .iter()
            .map(|v| mapper::literal(v, hint))
            .collect();

        for ty in &meta.one_of {
            overlay.one_of.push(self.schema_for(ty)?);
        }
        for ty in &meta.any_of {
            overlay.any_of.push(self.schema_for(ty)?);
        }
        for ty in &meta.all_of {
            overlay.all_of.push(self.schema_for(ty)?);
        }
        if let Some(ty) = &meta.not {
            overlay.not = Some(Box::new(self.schema_for(ty)?));
        }

        if let Some(property_name) = &meta.discriminator_property {
            let mut mapping = IndexMap::new();
            for entry in &meta.discriminator_mapping {
                let target = self.schema_for(&entry.schema)?;
                let reference = target.reference.unwrap_or_else(|| {
                    component_ref(ComponentKind::Schemas, &entry.schema.flat_name())
                });
                mapping.insert(entry.value.clone(), reference);
            }
            overlay.discriminator = Some(Discriminator {
                property_name: property_name.clone(),
                mapping,
            });
        }

        Ok(overlay)
    }
}

/// Copy every value the overlay declares onto the target
fn apply_overlay(target: &mut Schema, overlay: Schema) {
    macro_rules! take {
        ($($field:ident),* $(,)?) => {
            $(
                if overlay.$field.is_some() {
                    target.$field = overlay.$field;
                }
            )*
        };
    }
    macro_rules! take_list {
        ($($field:ident),* $(,)?) => {
            $(
                if !overlay.$field.is_empty() {
                    target.$field = overlay.$field;
                }
            )*
        };
    }

    take!(
        title,
        schema_type,
        format,
        description,
        multiple_of,
        maximum,
        exclusive_maximum,
        minimum,
        exclusive_minimum,
        max_length,
        min_length,
        pattern,
        max_items,
        min_items,
        unique_items,
        max_properties,
        min_properties,
        not,
        discriminator,
        nullable,
        read_only,
        write_only,
        deprecated,
        default,
        example,
        external_docs,
    );
    take_list!(enumeration, one_of, any_of);

    // allOf may already hold the wrapped reference
    target.all_of.extend(overlay.all_of);
    target.extensions.extend(overlay.extensions);
}

fn parse_number(field: &str, text: Option<&str>) -> Result<Option<Number>> {
    let Some(text) = text else {
        return Ok(None);
    };
    text.trim()
        .parse::<Number>()
        .map(Some)
        .map_err(|_| Error::MalformedNumber {
            field: field.to_string(),
            value: text.to_string(),
        })
}

/// Fixed scalar table; `None` for anything that is not a scalar
pub fn scalar_schema(ty: &TypeRef) -> Option<Schema> {
    let schema = match ty.name.as_str() {
        "bool" => Schema::of_type(SchemaType::Boolean),
        "f32" => Schema::with_format(SchemaType::Number, "float"),
        "f64" => Schema::with_format(SchemaType::Number, "double"),
        "Decimal" | "BigDecimal" => Schema::of_type(SchemaType::Number),
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => {
            Schema::with_format(SchemaType::Integer, "int32")
        }
        "i64" | "i128" | "u64" | "u128" | "isize" | "usize" => {
            Schema::with_format(SchemaType::Integer, "int64")
        }
        "String" | "str" | "char" => Schema::of_type(SchemaType::String),
        "Cow" if ty.first_arg().is_some_and(|a| a.name == "str") => {
            Schema::of_type(SchemaType::String)
        }
        "NaiveDate" => Schema::with_format(SchemaType::String, "date"),
        "DateTime" | "NaiveDateTime" | "OffsetDateTime" | "SystemTime" => {
            Schema::with_format(SchemaType::String, "date-time")
        }
        "NaiveTime" => Schema::with_format(SchemaType::String, "time"),
        "Uuid" => Schema::with_format(SchemaType::String, "uuid"),
        "Url" => Schema::with_format(SchemaType::String, "uri"),
        "Duration" => Schema::with_format(SchemaType::String, "duration"),
        "Bytes" => Schema::with_format(SchemaType::String, "binary"),
        _ => return None,
    };
    Some(schema)
}
