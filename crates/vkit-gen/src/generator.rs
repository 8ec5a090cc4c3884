//! Type-to-schema generation over a [`SourceProgram`].
//!
//! A requested type and every declaration it reaches become one draft-07
//! document. Named types are emitted once under `definitions` and
//! referenced with `#/definitions/<Name>`, which also makes recursive types
//! finite.
//!
//! The JSON shape follows serde's derive conventions: field renames,
//! `skip`, `default`, `deny_unknown_fields`, `transparent`, and the four enum
//! representations (external, internal `tag`, adjacent `tag` + `content`,
//! `untagged`).

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value};
use syn::{Expr, ExprLit, GenericArgument, Lit, PathArguments, Type};

use crate::attrs::{ContainerAttrs, RenameRule};
use crate::error::GenerationError;
use crate::options::GenerationOptions;
use crate::program::{DeclShape, FieldDecl, FieldSet, SourceProgram, TypeDecl, VariantDecl};

pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Fixed generator behavior derived from [`GenerationOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub top_level_reference: bool,
    pub forbid_extra_properties: bool,
    pub strict_null_checks: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            top_level_reference: true,
            forbid_extra_properties: true,
            strict_null_checks: true,
        }
    }
}

impl From<&GenerationOptions> for GeneratorSettings {
    fn from(options: &GenerationOptions) -> Self {
        Self {
            top_level_reference: options.top_level_reference,
            forbid_extra_properties: options.forbid_extra_properties,
            strict_null_checks: options.strict_null_checks,
        }
    }
}

/// Named declarations referenced while building one document.
type Refs = BTreeSet<String>;

pub struct SchemaGenerator<'p> {
    program: &'p SourceProgram,
    settings: GeneratorSettings,
}

impl<'p> SchemaGenerator<'p> {
    pub fn new(program: &'p SourceProgram, settings: GeneratorSettings) -> Self {
        Self { program, settings }
    }

    /// Builds the complete document for `type_name`.
    pub fn schema_for(&self, type_name: &str) -> Result<Value, GenerationError> {
        let root_decl = self
            .program
            .get(type_name)
            .ok_or_else(|| GenerationError::UnknownType(type_name.to_string()))?;
        if root_decl.generic {
            return Err(GenerationError::unsupported(
                "requested types",
                format!("{type_name}<..> (generic declaration)"),
            ));
        }

        let mut refs = Refs::new();
        let root = self.declaration_schema(root_decl, &mut refs)?;

        let mut definitions: BTreeMap<String, Value> = BTreeMap::new();
        let mut pending: Vec<String> = refs.into_iter().collect();
        while let Some(name) = pending.pop() {
            if definitions.contains_key(&name) {
                continue;
            }
            if name == type_name {
                definitions.insert(name, root.clone());
                continue;
            }
            let decl = self
                .program
                .get(&name)
                .ok_or_else(|| GenerationError::UnknownType(name.clone()))?;
            let mut found = Refs::new();
            let schema = self.declaration_schema(decl, &mut found)?;
            definitions.insert(name, schema);
            pending.extend(found.into_iter().filter(|n| !definitions.contains_key(n)));
        }

        let document = if self.settings.top_level_reference {
            definitions.insert(type_name.to_string(), root);
            json!({
                "$schema": DRAFT_07,
                "$ref": format!("#/definitions/{type_name}"),
                "definitions": definitions,
            })
        } else {
            let mut document = match root {
                Value::Object(map) => map,
                other => {
                    let mut map = Map::new();
                    map.insert("allOf".into(), json!([other]));
                    map
                }
            };
            document.insert("$schema".into(), json!(DRAFT_07));
            if !definitions.is_empty() {
                document.insert("definitions".into(), json!(definitions));
            }
            Value::Object(document)
        };
        tracing::debug!(type_name, "generated schema");
        Ok(document)
    }

    fn declaration_schema(&self, decl: &TypeDecl, refs: &mut Refs) -> Result<Value, GenerationError> {
        let context = decl.name.as_str();
        let mut schema = match &decl.shape {
            DeclShape::Struct { attrs, fields } => self.struct_schema(context, attrs, fields, refs)?,
            DeclShape::Enum { attrs, variants } => self.enum_schema(context, attrs, variants, refs)?,
            DeclShape::Alias(ty) => self.type_schema(ty, context, refs)?,
        };
        describe(&mut schema, decl.description.as_deref());
        Ok(schema)
    }

    fn struct_schema(
        &self,
        context: &str,
        attrs: &ContainerAttrs,
        fields: &FieldSet,
        refs: &mut Refs,
    ) -> Result<Value, GenerationError> {
        match fields {
            FieldSet::Named(fields) if attrs.transparent => {
                match fields.iter().find(|f| !f.attrs.skip) {
                    Some(field) => self.field_value_schema(field, context, refs),
                    None => Err(GenerationError::unsupported(context, "transparent struct without fields")),
                }
            }
            FieldSet::Named(fields) => self
                .object_schema(context, fields, attrs.rename_all, attrs, refs)
                .map(Value::Object),
            FieldSet::Tuple(fields) => {
                let live: Vec<&FieldDecl> = fields.iter().filter(|f| !f.attrs.skip).collect();
                match live.as_slice() {
                    [single] => self.field_value_schema(single, context, refs),
                    _ => self.tuple_schema(live.iter().map(|f| &f.ty), context, refs),
                }
            }
            FieldSet::Unit => Ok(json!({ "type": "null" })),
        }
    }

    /// Object schema for named fields. `rename_all` and `container` come
    /// from the struct, or from the enum and variant for struct variants.
    fn object_schema(
        &self,
        context: &str,
        fields: &[FieldDecl],
        rename_all: Option<RenameRule>,
        container: &ContainerAttrs,
        refs: &mut Refs,
    ) -> Result<Map<String, Value>, GenerationError> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in fields.iter().filter(|f| !f.attrs.skip) {
            let field_context = format!("{context}.{}", field.ident);
            if field.attrs.flatten {
                return Err(GenerationError::unsupported(field_context, "#[serde(flatten)]"));
            }
            let name = field
                .attrs
                .rename
                .clone()
                .or_else(|| rename_all.map(|rule| rule.apply(&field.ident)))
                .unwrap_or_else(|| field.ident.clone());
            let optional = option_inner(&field.ty).is_some();
            let mut schema = self.field_value_schema(field, &field_context, refs)?;
            describe(&mut schema, field.description.as_deref());
            if !(optional || field.attrs.default || container.default) {
                required.push(Value::String(name.clone()));
            }
            properties.insert(name, schema);
        }

        let mut object = Map::new();
        object.insert("type".into(), json!("object"));
        object.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            object.insert("required".into(), Value::Array(required));
        }
        self.close(&mut object, container.deny_unknown_fields);
        Ok(object)
    }

    fn field_value_schema(
        &self,
        field: &FieldDecl,
        context: &str,
        refs: &mut Refs,
    ) -> Result<Value, GenerationError> {
        self.type_schema(&field.ty, context, refs)
    }

    fn enum_schema(
        &self,
        context: &str,
        attrs: &ContainerAttrs,
        variants: &[VariantDecl],
        refs: &mut Refs,
    ) -> Result<Value, GenerationError> {
        let live: Vec<&VariantDecl> = variants.iter().filter(|v| !v.attrs.skip).collect();
        let name_of = |variant: &VariantDecl| {
            variant
                .attrs
                .rename
                .clone()
                .or_else(|| attrs.rename_all.map(|rule| rule.apply(&variant.ident)))
                .unwrap_or_else(|| variant.ident.clone())
        };
        let all_unit = live.iter().all(|v| matches!(v.fields, FieldSet::Unit));

        if !attrs.untagged && attrs.tag.is_none() && all_unit {
            let names: Vec<Value> = live.iter().map(|v| Value::String(name_of(v))).collect();
            return Ok(json!({ "type": "string", "enum": names }));
        }

        let mut branches = Vec::with_capacity(live.len());
        for variant in live {
            let name = name_of(variant);
            let variant_context = format!("{context}::{}", variant.ident);
            let mut branch = match (attrs.untagged, &attrs.tag, &attrs.content) {
                (true, _, _) => self.untagged_variant(&variant_context, attrs, variant, refs)?,
                (false, Some(tag), Some(content)) => self.adjacent_variant(
                    &variant_context,
                    attrs,
                    variant,
                    &name,
                    (tag.as_str(), content.as_str()),
                    refs,
                )?,
                (false, Some(tag), None) => {
                    self.internal_variant(&variant_context, attrs, variant, &name, tag, refs)?
                }
                (false, None, _) => self.external_variant(&variant_context, attrs, variant, &name, refs)?,
            };
            describe(&mut branch, variant.description.as_deref());
            branches.push(branch);
        }

        Ok(match branches.len() {
            1 => branches.remove(0),
            _ => json!({ "anyOf": branches }),
        })
    }

    /// The variant's data: `None` for unit variants.
    fn variant_payload(
        &self,
        context: &str,
        enum_attrs: &ContainerAttrs,
        variant: &VariantDecl,
        refs: &mut Refs,
    ) -> Result<Option<Value>, GenerationError> {
        let payload = match &variant.fields {
            FieldSet::Unit => return Ok(None),
            FieldSet::Tuple(fields) => match fields.as_slice() {
                [single] => self.field_value_schema(single, context, refs)?,
                _ => self.tuple_schema(fields.iter().map(|f| &f.ty), context, refs)?,
            },
            FieldSet::Named(fields) => Value::Object(self.object_schema(
                context,
                fields,
                variant.attrs.rename_all,
                &variant_container(enum_attrs),
                refs,
            )?),
        };
        Ok(Some(payload))
    }

    fn external_variant(
        &self,
        context: &str,
        attrs: &ContainerAttrs,
        variant: &VariantDecl,
        name: &str,
        refs: &mut Refs,
    ) -> Result<Value, GenerationError> {
        Ok(match self.variant_payload(context, attrs, variant, refs)? {
            None => json!({ "type": "string", "enum": [name] }),
            Some(payload) => self.tagged_object([(name, payload)]),
        })
    }

    fn adjacent_variant(
        &self,
        context: &str,
        attrs: &ContainerAttrs,
        variant: &VariantDecl,
        name: &str,
        (tag, content): (&str, &str),
        refs: &mut Refs,
    ) -> Result<Value, GenerationError> {
        let tag_schema = json!({ "type": "string", "enum": [name] });
        Ok(match self.variant_payload(context, attrs, variant, refs)? {
            None => self.tagged_object([(tag, tag_schema)]),
            Some(payload) => self.tagged_object([(tag, tag_schema), (content, payload)]),
        })
    }

    /// Internally tagged: the tag sits beside the variant's own fields, so
    /// the payload must be an object schema built inline.
    fn internal_variant(
        &self,
        context: &str,
        attrs: &ContainerAttrs,
        variant: &VariantDecl,
        name: &str,
        tag: &str,
        refs: &mut Refs,
    ) -> Result<Value, GenerationError> {
        let tag_schema = json!({ "type": "string", "enum": [name] });
        let mut object = match &variant.fields {
            FieldSet::Unit => return Ok(self.tagged_object([(tag, tag_schema)])),
            FieldSet::Named(fields) => self.object_schema(
                context,
                fields,
                variant.attrs.rename_all,
                &variant_container(attrs),
                refs,
            )?,
            FieldSet::Tuple(fields) => match fields.as_slice() {
                [single] => self.inline_struct(&single.ty, context, refs)?,
                _ => {
                    return Err(GenerationError::unsupported(
                        context,
                        "tuple variant in internally tagged enum",
                    ))
                }
            },
        };

        if let Some(Value::Object(properties)) = object.get_mut("properties") {
            properties.insert(tag.to_string(), tag_schema);
        }
        let mut required = vec![Value::String(tag.to_string())];
        if let Some(Value::Array(existing)) = object.remove("required") {
            required.extend(existing);
        }
        object.insert("required".into(), Value::Array(required));
        Ok(Value::Object(object))
    }

    fn untagged_variant(
        &self,
        context: &str,
        attrs: &ContainerAttrs,
        variant: &VariantDecl,
        refs: &mut Refs,
    ) -> Result<Value, GenerationError> {
        Ok(self
            .variant_payload(context, attrs, variant, refs)?
            .unwrap_or_else(|| json!({ "type": "null" })))
    }

    /// Object schema of a named struct with named fields, for inlining.
    fn inline_struct(
        &self,
        ty: &Type,
        context: &str,
        refs: &mut Refs,
    ) -> Result<Map<String, Value>, GenerationError> {
        let not_a_struct = || GenerationError::unsupported(context, type_text(ty));
        let Type::Path(path) = ty else {
            return Err(not_a_struct());
        };
        let name = path
            .path
            .segments
            .last()
            .map(|s| s.ident.to_string())
            .ok_or_else(not_a_struct)?;
        match self.program.get(&name).map(|d| (&d.shape, d.generic)) {
            Some((DeclShape::Struct { attrs, fields: FieldSet::Named(fields) }, false))
                if !attrs.transparent =>
            {
                self.object_schema(&name, fields, attrs.rename_all, attrs, refs)
            }
            _ => Err(not_a_struct()),
        }
    }

    /// `{type: object}` with exactly the given required properties.
    fn tagged_object<'a>(&self, entries: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (key, schema) in entries {
            required.push(Value::String(key.to_string()));
            properties.insert(key.to_string(), schema);
        }
        let mut object = Map::new();
        object.insert("type".into(), json!("object"));
        object.insert("properties".into(), Value::Object(properties));
        object.insert("required".into(), Value::Array(required));
        self.close(&mut object, false);
        Value::Object(object)
    }

    fn close(&self, object: &mut Map<String, Value>, deny_unknown_fields: bool) {
        if self.settings.forbid_extra_properties || deny_unknown_fields {
            object.insert("additionalProperties".into(), Value::Bool(false));
        }
    }

    fn tuple_schema<'t>(
        &self,
        types: impl Iterator<Item = &'t Type>,
        context: &str,
        refs: &mut Refs,
    ) -> Result<Value, GenerationError> {
        let items = types
            .map(|ty| self.type_schema(ty, context, refs))
            .collect::<Result<Vec<_>, _>>()?;
        let len = items.len();
        Ok(if items.is_empty() {
            json!({ "type": "array", "maxItems": 0 })
        } else {
            json!({ "type": "array", "items": items, "minItems": len, "maxItems": len })
        })
    }

    fn type_schema(&self, ty: &Type, context: &str, refs: &mut Refs) -> Result<Value, GenerationError> {
        match ty {
            Type::Path(path) if path.qself.is_none() => self.path_schema(ty, &path.path, context, refs),
            Type::Reference(reference) => self.type_schema(&reference.elem, context, refs),
            Type::Paren(inner) => self.type_schema(&inner.elem, context, refs),
            Type::Group(inner) => self.type_schema(&inner.elem, context, refs),
            Type::Slice(slice) => Ok(json!({
                "type": "array",
                "items": self.type_schema(&slice.elem, context, refs)?,
            })),
            Type::Array(array) => {
                let items = self.type_schema(&array.elem, context, refs)?;
                match &array.len {
                    Expr::Lit(ExprLit { lit: Lit::Int(len), .. }) => {
                        let len: u64 = len
                            .base10_parse()
                            .map_err(|_| GenerationError::unsupported(context, type_text(ty)))?;
                        Ok(json!({ "type": "array", "items": items, "minItems": len, "maxItems": len }))
                    }
                    _ => Ok(json!({ "type": "array", "items": items })),
                }
            }
            Type::Tuple(tuple) if tuple.elems.is_empty() => Ok(json!({ "type": "null" })),
            Type::Tuple(tuple) => self.tuple_schema(tuple.elems.iter(), context, refs),
            _ => Err(GenerationError::unsupported(context, type_text(ty))),
        }
    }

    fn path_schema(
        &self,
        ty: &Type,
        path: &syn::Path,
        context: &str,
        refs: &mut Refs,
    ) -> Result<Value, GenerationError> {
        let unsupported = || GenerationError::unsupported(context, type_text(ty));
        let segment = path.segments.last().ok_or_else(unsupported)?;
        let ident = segment.ident.to_string();
        let args = type_arguments(&segment.arguments);

        let schema = match (ident.as_str(), args.as_slice()) {
            ("String" | "str", []) => json!({ "type": "string" }),
            ("char", []) => json!({ "type": "string", "minLength": 1, "maxLength": 1 }),
            ("i8" | "i16" | "i32" | "i64" | "i128" | "isize", []) => json!({ "type": "integer" }),
            ("u8" | "u16" | "u32" | "u64" | "u128" | "usize", []) => {
                json!({ "type": "integer", "minimum": 0 })
            }
            ("f32" | "f64", []) => json!({ "type": "number" }),
            ("bool", []) => json!({ "type": "boolean" }),
            ("Option", [inner]) => {
                let inner = self.type_schema(inner, context, refs)?;
                if self.settings.strict_null_checks {
                    nullable(inner)
                } else {
                    inner
                }
            }
            ("Vec" | "VecDeque" | "LinkedList" | "BinaryHeap", [item]) => json!({
                "type": "array",
                "items": self.type_schema(item, context, refs)?,
            }),
            ("HashSet" | "BTreeSet" | "IndexSet", [item, ..]) => json!({
                "type": "array",
                "items": self.type_schema(item, context, refs)?,
                "uniqueItems": true,
            }),
            ("HashMap" | "BTreeMap" | "IndexMap", [_, value, ..]) => {
                let value = self.type_schema(value, context, refs)?;
                let mut record = Map::new();
                record.insert("type".into(), json!("object"));
                if self.settings.forbid_extra_properties {
                    record.insert("additionalProperties".into(), Value::Bool(false));
                } else {
                    record.insert("additionalProperties".into(), value);
                }
                Value::Object(record)
            }
            ("Box" | "Rc" | "Arc" | "Cow", [inner]) => self.type_schema(inner, context, refs)?,
            (name, []) if self.program.contains(name) => self.named_ref(name, ty, context, refs)?,
            ("Value", []) => json!({}),
            (name, _) if self.program.contains(name) => {
                return Err(GenerationError::unsupported(
                    context,
                    format!("{} (generic declaration)", type_text(ty)),
                ))
            }
            _ => return Err(unsupported()),
        };
        Ok(schema)
    }

    fn named_ref(
        &self,
        name: &str,
        ty: &Type,
        context: &str,
        refs: &mut Refs,
    ) -> Result<Value, GenerationError> {
        if self.program.get(name).is_some_and(|decl| decl.generic) {
            return Err(GenerationError::unsupported(
                context,
                format!("{} (generic declaration)", type_text(ty)),
            ));
        }
        refs.insert(name.to_string());
        Ok(json!({ "$ref": format!("#/definitions/{name}") }))
    }
}

/// Struct-variant fields inherit the enum's unknown-field policy only.
fn variant_container(enum_attrs: &ContainerAttrs) -> ContainerAttrs {
    ContainerAttrs {
        deny_unknown_fields: enum_attrs.deny_unknown_fields,
        ..ContainerAttrs::default()
    }
}

fn describe(schema: &mut Value, description: Option<&str>) {
    if let (Value::Object(map), Some(text)) = (schema, description) {
        map.insert("description".into(), Value::String(text.to_string()));
    }
}

/// Widens `schema` to also accept `null`.
fn nullable(schema: Value) -> Value {
    let Value::Object(mut map) = schema else {
        return schema;
    };
    if map.is_empty() {
        return Value::Object(map);
    }
    if !map.contains_key("$ref") && !map.contains_key("enum") {
        let widened = match map.get("type") {
            Some(Value::String(single)) if single == "null" => Some(json!("null")),
            Some(Value::String(single)) => Some(json!([single, "null"])),
            Some(Value::Array(types)) if types.iter().any(|t| t == "null") => {
                Some(Value::Array(types.clone()))
            }
            Some(Value::Array(types)) => {
                let mut types = types.clone();
                types.push(json!("null"));
                Some(Value::Array(types))
            }
            _ => None,
        };
        if let Some(widened) = widened {
            map.insert("type".into(), widened);
            return Value::Object(map);
        }
    }
    json!({ "anyOf": [Value::Object(map), { "type": "null" }] })
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    match (segment.ident == "Option", type_arguments(&segment.arguments).as_slice()) {
        (true, [inner]) => Some(*inner),
        _ => None,
    }
}

fn type_arguments(arguments: &PathArguments) -> Vec<&Type> {
    match arguments {
        PathArguments::AngleBracketed(angle) => angle
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Human-readable rendering of a type for error messages.
fn type_text(ty: &Type) -> String {
    fn join<'t>(types: impl Iterator<Item = &'t Type>) -> String {
        types.map(type_text).collect::<Vec<_>>().join(", ")
    }
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .iter()
            .map(|segment| {
                let args = type_arguments(&segment.arguments);
                if args.is_empty() {
                    segment.ident.to_string()
                } else {
                    format!("{}<{}>", segment.ident, join(args.into_iter()))
                }
            })
            .collect::<Vec<_>>()
            .join("::"),
        Type::Reference(reference) => format!("&{}", type_text(&reference.elem)),
        Type::Slice(slice) => format!("[{}]", type_text(&slice.elem)),
        Type::Array(array) => format!("[{}; _]", type_text(&array.elem)),
        Type::Tuple(tuple) => format!("({})", join(tuple.elems.iter())),
        Type::Paren(inner) => type_text(&inner.elem),
        Type::Group(inner) => type_text(&inner.elem),
        Type::Ptr(_) => "raw pointer".into(),
        Type::BareFn(_) => "fn pointer".into(),
        Type::TraitObject(_) => "trait object".into(),
        Type::ImplTrait(_) => "impl Trait".into(),
        Type::Never(_) => "!".into(),
        _ => "type".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn program(text: &str) -> SourceProgram {
        let mut program = SourceProgram::default();
        program.add_source(Path::new("types.rs"), text).unwrap();
        program
    }

    fn generate(text: &str, name: &str) -> Value {
        let program = program(text);
        SchemaGenerator::new(&program, GeneratorSettings::default())
            .schema_for(name)
            .unwrap()
    }

    fn definition(text: &str, name: &str) -> Value {
        generate(text, name)["definitions"][name].clone()
    }

    #[test]
    fn test_top_level_reference_document() {
        let doc = generate("struct Point { x: f64, y: f64 }", "Point");
        assert_eq!(doc["$schema"], json!(DRAFT_07));
        assert_eq!(doc["$ref"], json!("#/definitions/Point"));
        assert_eq!(
            doc["definitions"]["Point"],
            json!({
                "type": "object",
                "properties": {"x": {"type": "number"}, "y": {"type": "number"}},
                "required": ["x", "y"],
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn test_inlined_root_without_top_reference() {
        let program = program("struct A { b: B } struct B { n: u8 }");
        let settings = GeneratorSettings {
            top_level_reference: false,
            ..GeneratorSettings::default()
        };
        let doc = SchemaGenerator::new(&program, settings).schema_for("A").unwrap();
        assert_eq!(doc["type"], json!("object"));
        assert_eq!(doc["properties"]["b"], json!({"$ref": "#/definitions/B"}));
        assert!(doc["definitions"].get("A").is_none());
        assert!(doc["definitions"].get("B").is_some());
    }

    #[test]
    fn test_option_fields_not_required_and_nullable() {
        let def = definition("struct S { a: Option<String>, b: i32 }", "S");
        assert_eq!(def["required"], json!(["b"]));
        assert_eq!(def["properties"]["a"], json!({"type": ["string", "null"]}));
    }

    #[test]
    fn test_option_without_strict_null_checks() {
        let program = program("struct S { a: Option<String> }");
        let settings = GeneratorSettings {
            strict_null_checks: false,
            ..GeneratorSettings::default()
        };
        let doc = SchemaGenerator::new(&program, settings).schema_for("S").unwrap();
        assert_eq!(doc["definitions"]["S"]["properties"]["a"], json!({"type": "string"}));
    }

    #[test]
    fn test_nullable_ref_uses_any_of() {
        let def = definition("struct S { n: Option<N> } struct N { v: u8 }", "S");
        assert_eq!(
            def["properties"]["n"],
            json!({"anyOf": [{"$ref": "#/definitions/N"}, {"type": "null"}]})
        );
    }

    #[test]
    fn test_serde_field_attributes() {
        let def = definition(
            r#"
            #[serde(rename_all = "camelCase")]
            struct S {
                media_output: String,
                #[serde(rename = "seq")]
                sequence: u32,
                #[serde(default)]
                retries: u8,
                #[serde(skip)]
                cache: Vec<u8>,
            }
            "#,
            "S",
        );
        let mut keys: Vec<&String> = def["properties"].as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(keys, ["mediaOutput", "retries", "seq"]);
        assert_eq!(def["required"], json!(["mediaOutput", "seq"]));
    }

    #[test]
    fn test_container_default_makes_all_optional() {
        let def = definition("#[serde(default)] struct S { a: u8, b: u8 }", "S");
        assert!(def.get("required").is_none());
    }

    #[test]
    fn test_deny_unknown_fields_closes_when_extra_props_allowed() {
        let program = program(
            "#[serde(deny_unknown_fields)] struct Closed { a: u8 } struct Open { a: u8 }",
        );
        let settings = GeneratorSettings {
            forbid_extra_properties: false,
            ..GeneratorSettings::default()
        };
        let generator = SchemaGenerator::new(&program, settings);
        let closed = generator.schema_for("Closed").unwrap();
        let open = generator.schema_for("Open").unwrap();
        assert_eq!(closed["definitions"]["Closed"]["additionalProperties"], json!(false));
        assert!(open["definitions"]["Open"].get("additionalProperties").is_none());
    }

    #[test]
    fn test_maps_are_records() {
        let def = definition("struct S { labels: HashMap<String, String> }", "S");
        assert_eq!(
            def["properties"]["labels"],
            json!({"type": "object", "additionalProperties": false})
        );

        let program = program("struct S { labels: BTreeMap<String, u32> }");
        let settings = GeneratorSettings {
            forbid_extra_properties: false,
            ..GeneratorSettings::default()
        };
        let doc = SchemaGenerator::new(&program, settings).schema_for("S").unwrap();
        assert_eq!(
            doc["definitions"]["S"]["properties"]["labels"],
            json!({"type": "object", "additionalProperties": {"type": "integer", "minimum": 0}})
        );
    }

    #[test]
    fn test_collections_and_wrappers() {
        let def = definition(
            "struct S { v: Vec<Box<str>>, s: BTreeSet<i64>, a: [u8; 4], t: (String, bool), j: serde_json::Value }",
            "S",
        );
        let p = &def["properties"];
        assert_eq!(p["v"], json!({"type": "array", "items": {"type": "string"}}));
        assert_eq!(p["s"]["uniqueItems"], json!(true));
        assert_eq!(p["a"]["minItems"], json!(4));
        assert_eq!(p["a"]["maxItems"], json!(4));
        assert_eq!(p["t"]["items"], json!([{"type": "string"}, {"type": "boolean"}]));
        assert_eq!(p["j"], json!({}));
    }

    #[test]
    fn test_unit_enum_is_string_enum() {
        let def = definition(
            r#"#[serde(rename_all = "camelCase")] enum Kind { MakeCall, HangUp }"#,
            "Kind",
        );
        assert_eq!(def, json!({"type": "string", "enum": ["makeCall", "hangUp"]}));
    }

    #[test]
    fn test_externally_tagged_enum() {
        let def = definition("enum Shape { Empty, Circle(f64), Rect { w: f64, h: f64 } }", "Shape");
        let branches = def["anyOf"].as_array().unwrap();
        assert_eq!(branches[0], json!({"type": "string", "enum": ["Empty"]}));
        assert_eq!(branches[1]["required"], json!(["Circle"]));
        assert_eq!(branches[2]["properties"]["Rect"]["required"], json!(["w", "h"]));
    }

    #[test]
    fn test_internally_tagged_enum() {
        let def = definition(
            r#"
            #[serde(tag = "type", rename_all = "camelCase")]
            enum Output { MakeCall { result: String }, Hangup, Play(Clip) }
            struct Clip { url: String }
            "#,
            "Output",
        );
        let branches = def["anyOf"].as_array().unwrap();
        assert_eq!(branches[0]["required"], json!(["type", "result"]));
        assert_eq!(branches[0]["properties"]["type"], json!({"type": "string", "enum": ["makeCall"]}));
        assert_eq!(branches[1]["required"], json!(["type"]));
        assert_eq!(branches[2]["required"], json!(["type", "url"]));
    }

    #[test]
    fn test_adjacently_tagged_enum() {
        let def = definition(
            r#"#[serde(tag = "t", content = "c")] enum Msg { Ping, Text(String) }"#,
            "Msg",
        );
        assert_eq!(def["anyOf"][0]["required"], json!(["t"]));
        assert_eq!(def["anyOf"][1]["required"], json!(["t", "c"]));
        assert_eq!(def["anyOf"][1]["properties"]["c"], json!({"type": "string"}));
    }

    #[test]
    fn test_untagged_enum() {
        let def = definition(
            "#[serde(untagged)] enum U { Text(String), Number(f64), Nested(N) } struct N { v: String }",
            "U",
        );
        assert_eq!(
            def,
            json!({"anyOf": [
                {"type": "string"},
                {"type": "number"},
                {"$ref": "#/definitions/N"}
            ]})
        );
    }

    #[test]
    fn test_transparent_and_newtype_structs() {
        let doc = generate(
            "struct Wrapper { id: Id } struct Id(u64); #[serde(transparent)] struct Name { inner: String }",
            "Wrapper",
        );
        assert_eq!(doc["definitions"]["Id"], json!({"type": "integer", "minimum": 0}));
        let program = program("#[serde(transparent)] struct Name { inner: String }");
        let doc = SchemaGenerator::new(&program, GeneratorSettings::default())
            .schema_for("Name")
            .unwrap();
        assert_eq!(doc["definitions"]["Name"], json!({"type": "string"}));
    }

    #[test]
    fn test_recursive_type_is_finite() {
        let doc = generate("struct Node { children: Vec<Node>, value: i32 }", "Node");
        assert_eq!(
            doc["definitions"]["Node"]["properties"]["children"]["items"],
            json!({"$ref": "#/definitions/Node"})
        );
        assert_eq!(doc["definitions"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_alias_resolves_to_target() {
        let doc = generate("type Tags = Vec<String>; struct S { tags: Tags }", "S");
        assert_eq!(doc["definitions"]["Tags"], json!({"type": "array", "items": {"type": "string"}}));
    }

    #[test]
    fn test_doc_comments_become_descriptions() {
        let def = definition("/// A user.\nstruct U {\n/// Display name.\nname: String }", "U");
        assert_eq!(def["description"], json!("A user."));
        assert_eq!(def["properties"]["name"]["description"], json!("Display name."));
    }

    #[test]
    fn test_unknown_type_errors() {
        let program = program("struct S { when: DateTime<Utc> }");
        let generator = SchemaGenerator::new(&program, GeneratorSettings::default());
        let err = generator.schema_for("S").unwrap_err();
        assert!(
            matches!(&err, GenerationError::UnsupportedType { ty, .. } if ty == "DateTime<Utc>"),
            "got {err:?}"
        );
        assert!(matches!(
            generator.schema_for("Missing").unwrap_err(),
            GenerationError::UnknownType(name) if name == "Missing"
        ));
    }

    #[test]
    fn test_generic_declaration_rejected() {
        let program = program("struct Page<T> { items: Vec<T> } struct S { p: Page<u8> }");
        let generator = SchemaGenerator::new(&program, GeneratorSettings::default());
        assert!(matches!(
            generator.schema_for("S").unwrap_err(),
            GenerationError::UnsupportedType { .. }
        ));
        assert!(generator.schema_for("Page").is_err());
    }

    #[test]
    fn test_flatten_rejected() {
        let program = program("struct S { #[serde(flatten)] extra: HashMap<String, String> }");
        let err = SchemaGenerator::new(&program, GeneratorSettings::default())
            .schema_for("S")
            .unwrap_err();
        assert!(err.to_string().contains("flatten"));
    }

    #[test]
    fn test_nullable_widening() {
        assert_eq!(nullable(json!({"type": "integer"})), json!({"type": ["integer", "null"]}));
        assert_eq!(nullable(json!({})), json!({}));
        assert_eq!(
            nullable(json!({"type": "string", "enum": ["a"]})),
            json!({"anyOf": [{"type": "string", "enum": ["a"]}, {"type": "null"}]})
        );
    }
}
