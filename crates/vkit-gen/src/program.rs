//! The source program: every declaration the generator can see.
//!
//! Files are parsed with `syn`. Structs, enums and type aliases at any
//! module depth (inline `mod` blocks included) are indexed by identifier,
//! with the serde attributes that shape their JSON form already decoded.
//! Identifiers are global: two declarations with the same name in different
//! modules collide, and the first one parsed wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use syn::visit::Visit;
use syn::{Fields, ItemEnum, ItemStruct, ItemType, Type};

use crate::attrs::{doc_comment, ContainerAttrs, MemberAttrs};
use crate::error::GenerationError;

/// One named type declaration.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub description: Option<String>,
    /// File the declaration was parsed from.
    pub origin: PathBuf,
    /// Whether the declaration has generic parameters.
    pub generic: bool,
    pub shape: DeclShape,
}

#[derive(Debug, Clone)]
pub enum DeclShape {
    Struct {
        attrs: ContainerAttrs,
        fields: FieldSet,
    },
    Enum {
        attrs: ContainerAttrs,
        variants: Vec<VariantDecl>,
    },
    Alias(Type),
}

/// The fields of a struct or a variant.
#[derive(Debug, Clone)]
pub enum FieldSet {
    Named(Vec<FieldDecl>),
    Tuple(Vec<FieldDecl>),
    Unit,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Rust identifier, `r#` stripped; the position for tuple fields.
    pub ident: String,
    pub ty: Type,
    pub description: Option<String>,
    pub attrs: MemberAttrs,
}

#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub ident: String,
    pub description: Option<String>,
    pub attrs: MemberAttrs,
    pub fields: FieldSet,
}

/// Indexed declarations from a set of source files.
#[derive(Debug, Default)]
pub struct SourceProgram {
    declarations: BTreeMap<String, TypeDecl>,
    files: Vec<PathBuf>,
}

impl SourceProgram {
    /// Parses every file. Fails on the first unreadable or malformed file,
    /// or when `files` is empty.
    pub fn from_files(files: &[PathBuf]) -> Result<Self, GenerationError> {
        if files.is_empty() {
            return Err(GenerationError::ProgramUnavailable {
                path: PathBuf::from("."),
                reason: "no source files matched".into(),
            });
        }
        let mut program = Self::default();
        for path in files {
            let text = std::fs::read_to_string(path).map_err(|e| {
                GenerationError::ProgramUnavailable {
                    path: path.clone(),
                    reason: format!("cannot read file: {e}"),
                }
            })?;
            program.add_source(path, &text)?;
        }
        tracing::debug!(
            files = program.files.len(),
            declarations = program.declarations.len(),
            "built source program"
        );
        Ok(program)
    }

    /// Parses `text` as if read from `origin` and indexes its declarations.
    pub fn add_source(&mut self, origin: &Path, text: &str) -> Result<(), GenerationError> {
        let unavailable = |reason: String| GenerationError::ProgramUnavailable {
            path: origin.to_path_buf(),
            reason,
        };
        let file = syn::parse_file(text).map_err(|e| unavailable(format!("parse error: {e}")))?;

        let mut collector = Collector {
            origin,
            found: Vec::new(),
            error: None,
        };
        collector.visit_file(&file);
        if let Some(e) = collector.error {
            return Err(unavailable(format!("invalid serde attribute: {e}")));
        }

        for decl in collector.found {
            match self.declarations.get(&decl.name) {
                Some(existing) => tracing::warn!(
                    name = %decl.name,
                    kept = %existing.origin.display(),
                    ignored = %origin.display(),
                    "duplicate type declaration"
                ),
                None => {
                    self.declarations.insert(decl.name.clone(), decl);
                }
            }
        }
        self.files.push(origin.to_path_buf());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeDecl> {
        self.declarations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.declarations.contains_key(name)
    }

    /// Declared type names, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.declarations.keys().map(String::as_str)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

struct Collector<'a> {
    origin: &'a Path,
    found: Vec<TypeDecl>,
    error: Option<syn::Error>,
}

impl Collector<'_> {
    fn record(&mut self, result: syn::Result<TypeDecl>) {
        match result {
            Ok(decl) => self.found.push(decl),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
    }

    fn struct_decl(&self, item: &ItemStruct) -> syn::Result<TypeDecl> {
        Ok(TypeDecl {
            name: item.ident.to_string(),
            description: doc_comment(&item.attrs),
            origin: self.origin.to_path_buf(),
            generic: !item.generics.params.is_empty(),
            shape: DeclShape::Struct {
                attrs: ContainerAttrs::parse(&item.attrs)?,
                fields: field_set(&item.fields)?,
            },
        })
    }

    fn enum_decl(&self, item: &ItemEnum) -> syn::Result<TypeDecl> {
        let variants = item
            .variants
            .iter()
            .map(|variant| {
                Ok(VariantDecl {
                    ident: variant.ident.to_string(),
                    description: doc_comment(&variant.attrs),
                    attrs: MemberAttrs::parse(&variant.attrs)?,
                    fields: field_set(&variant.fields)?,
                })
            })
            .collect::<syn::Result<Vec<_>>>()?;
        Ok(TypeDecl {
            name: item.ident.to_string(),
            description: doc_comment(&item.attrs),
            origin: self.origin.to_path_buf(),
            generic: !item.generics.params.is_empty(),
            shape: DeclShape::Enum {
                attrs: ContainerAttrs::parse(&item.attrs)?,
                variants,
            },
        })
    }

    fn alias_decl(&self, item: &ItemType) -> TypeDecl {
        TypeDecl {
            name: item.ident.to_string(),
            description: doc_comment(&item.attrs),
            origin: self.origin.to_path_buf(),
            generic: !item.generics.params.is_empty(),
            shape: DeclShape::Alias((*item.ty).clone()),
        }
    }
}

impl<'ast> Visit<'ast> for Collector<'_> {
    fn visit_item_struct(&mut self, item: &'ast ItemStruct) {
        let decl = self.struct_decl(item);
        self.record(decl);
    }

    fn visit_item_enum(&mut self, item: &'ast ItemEnum) {
        let decl = self.enum_decl(item);
        self.record(decl);
    }

    fn visit_item_type(&mut self, item: &'ast ItemType) {
        let decl = self.alias_decl(item);
        self.found.push(decl);
    }

    // Items inside function bodies are not nameable from outside.
    fn visit_item_fn(&mut self, _: &'ast syn::ItemFn) {}

    fn visit_item_impl(&mut self, _: &'ast syn::ItemImpl) {}

    fn visit_item_trait(&mut self, _: &'ast syn::ItemTrait) {}
}

fn field_set(fields: &Fields) -> syn::Result<FieldSet> {
    let decls = |fields: &syn::punctuated::Punctuated<syn::Field, syn::token::Comma>| {
        fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                Ok(FieldDecl {
                    ident: field.ident.as_ref().map_or_else(
                        || index.to_string(),
                        |ident| ident.to_string().trim_start_matches("r#").to_string(),
                    ),
                    ty: field.ty.clone(),
                    description: doc_comment(&field.attrs),
                    attrs: MemberAttrs::parse(&field.attrs)?,
                })
            })
            .collect::<syn::Result<Vec<_>>>()
    };
    Ok(match fields {
        Fields::Named(named) => FieldSet::Named(decls(&named.named)?),
        Fields::Unnamed(unnamed) => FieldSet::Tuple(decls(&unnamed.unnamed)?),
        Fields::Unit => FieldSet::Unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(text: &str) -> SourceProgram {
        let mut program = SourceProgram::default();
        program.add_source(Path::new("lib.rs"), text).unwrap();
        program
    }

    #[test]
    fn test_indexes_structs_enums_and_aliases() {
        let p = program(
            r#"
            pub struct User { name: String }
            enum Role { Admin, Guest }
            type Users = Vec<User>;
            "#,
        );
        assert_eq!(p.type_names().collect::<Vec<_>>(), ["Role", "User", "Users"]);
    }

    #[test]
    fn test_traverses_inline_modules() {
        let p = program("mod api { pub mod v1 { pub struct Request { id: u64 } } }");
        assert!(p.contains("Request"));
    }

    #[test]
    fn test_ignores_items_inside_functions() {
        let p = program("fn helper() { struct Local; }");
        assert!(!p.contains("Local"));
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut p = SourceProgram::default();
        p.add_source(Path::new("a.rs"), "/// first\nstruct Dup;").unwrap();
        p.add_source(Path::new("b.rs"), "/// second\nstruct Dup;").unwrap();
        let decl = p.get("Dup").unwrap();
        assert_eq!(decl.origin, PathBuf::from("a.rs"));
        assert_eq!(decl.description.as_deref(), Some("first"));
    }

    #[test]
    fn test_malformed_source_names_the_file() {
        let mut p = SourceProgram::default();
        let err = p
            .add_source(Path::new("broken.rs"), "struct {")
            .unwrap_err();
        assert!(
            matches!(&err, GenerationError::ProgramUnavailable { path, .. } if path == Path::new("broken.rs")),
            "got {err:?}"
        );
        assert!(err.to_string().starts_with("generator could not be constructed"));
    }

    #[test]
    fn test_bad_serde_attribute_is_a_program_error() {
        let mut p = SourceProgram::default();
        let err = p
            .add_source(
                Path::new("attr.rs"),
                "#[serde(rename_all = \"nonsense\")] struct S { a: u8 }",
            )
            .unwrap_err();
        assert!(matches!(err, GenerationError::ProgramUnavailable { .. }));
    }

    #[test]
    fn test_generic_declarations_flagged() {
        let p = program("struct Page<T> { items: Vec<T> }");
        assert!(p.get("Page").unwrap().generic);
    }

    #[test]
    fn test_raw_identifiers_stripped() {
        let p = program("struct S { r#type: String }");
        let DeclShape::Struct { fields: FieldSet::Named(fields), .. } = &p.get("S").unwrap().shape
        else {
            panic!("expected a struct with named fields");
        };
        assert_eq!(fields[0].ident, "type");
    }

    #[test]
    fn test_no_files_is_a_program_error() {
        let err = SourceProgram::from_files(&[]).unwrap_err();
        assert!(matches!(err, GenerationError::ProgramUnavailable { .. }));
    }
}
