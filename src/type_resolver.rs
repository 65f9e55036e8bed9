use crate::parser::ParsedFile;
use crate::source::{ClassDef, ClassKind, ClassSource, PropertyDef};
use crate::types::{component_name, ScalarType, Type};
use log::debug;
use std::collections::HashMap;

/// Resolves struct and enum declarations from parsed Rust files into [`ClassDef`]s.
///
/// This is the static counterpart of runtime reflection: field types are read from
/// the syntax tree and `#[serde(...)]` field attributes decide the serialized shape.
/// Doc comments are carried along so that `@var` tags can override the declared type
/// during schema generation.
pub struct TypeResolver {
    parsed_files: Vec<ParsedFile>,
    /// Cache of resolved declarations
    class_cache: HashMap<String, ClassDef>,
}

/// Serde attributes for a field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerdeAttributes {
    pub rename: Option<String>,
    pub skip: bool,
    pub flatten: bool,
}

impl TypeResolver {
    pub fn new(parsed_files: Vec<ParsedFile>) -> Self {
        debug!("Initializing TypeResolver with {} files", parsed_files.len());
        Self {
            parsed_files,
            class_cache: HashMap::new(),
        }
    }

    /// Find a struct definition by name across all parsed files, including inline modules
    pub fn find_struct_definition(&self, name: &str) -> Option<&syn::ItemStruct> {
        self.parsed_files.iter().find_map(|file| {
            find_item(&file.syntax_tree.items, &|item| match item {
                syn::Item::Struct(item_struct) if item_struct.ident == name => Some(item_struct),
                _ => None,
            })
        })
    }

    /// Find an enum definition by name across all parsed files, including inline modules
    pub fn find_enum_definition(&self, name: &str) -> Option<&syn::ItemEnum> {
        self.parsed_files.iter().find_map(|file| {
            find_item(&file.syntax_tree.items, &|item| match item {
                syn::Item::Enum(item_enum) if item_enum.ident == name => Some(item_enum),
                _ => None,
            })
        })
    }

    /// Resolve a declaration by (possibly path-qualified) name
    pub fn resolve_class(&mut self, name: &str) -> Option<ClassDef> {
        let name = component_name(name);
        if let Some(cached) = self.class_cache.get(&name) {
            debug!("Type {} found in cache", name);
            return Some(cached.clone());
        }

        let resolved = if let Some(item_struct) = self.find_struct_definition(&name) {
            Self::parse_struct_definition(item_struct)
        } else if let Some(item_enum) = self.find_enum_definition(&name) {
            Self::parse_enum_definition(item_enum)
        } else {
            debug!("Type {} not declared in parsed files", name);
            return None;
        };

        self.class_cache.insert(name, resolved.clone());
        Some(resolved)
    }

    fn parse_struct_definition(item_struct: &syn::ItemStruct) -> ClassDef {
        let struct_name = item_struct.ident.to_string();
        debug!("Parsing struct definition: {}", struct_name);

        let mut properties = Vec::new();
        if let syn::Fields::Named(named_fields) = &item_struct.fields {
            for field in &named_fields.named {
                if let Some(property) = Self::parse_field(&struct_name, field) {
                    properties.push(property);
                }
            }
        }

        ClassDef {
            name: struct_name,
            kind: ClassKind::Struct(properties),
        }
    }

    fn parse_enum_definition(item_enum: &syn::ItemEnum) -> ClassDef {
        let variants: Vec<String> = item_enum
            .variants
            .iter()
            .filter_map(|variant| {
                let attrs = Self::parse_serde_attributes(&variant.attrs);
                if attrs.skip {
                    return None;
                }
                Some(attrs.rename.unwrap_or_else(|| variant.ident.to_string()))
            })
            .collect();

        debug!("Parsed enum {} with {} variants", item_enum.ident, variants.len());

        ClassDef {
            name: item_enum.ident.to_string(),
            kind: ClassKind::Enum(variants),
        }
    }

    fn parse_field(struct_name: &str, field: &syn::Field) -> Option<PropertyDef> {
        let field_name = field.ident.as_ref()?.to_string();
        let serde_attrs = Self::parse_serde_attributes(&field.attrs);
        if serde_attrs.skip {
            debug!("Skipping {}.{}", struct_name, field_name);
            return None;
        }

        let ty = Self::rust_type_to_type(&field.ty);
        if ty.is_none() {
            debug!("{}.{} has no schema-compatible type", struct_name, field_name);
        }

        Some(PropertyDef {
            name: serde_attrs.rename.unwrap_or(field_name),
            ty,
            doc: doc_comment(&field.attrs),
            flatten: serde_attrs.flatten,
        })
    }

    /// Parse Serde attributes from field or variant attributes
    pub fn parse_serde_attributes(attrs: &[syn::Attribute]) -> SerdeAttributes {
        let mut serde_attrs = SerdeAttributes::default();

        for attr in attrs {
            if !attr.path().is_ident("serde") {
                continue;
            }

            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    if meta.input.peek(syn::token::Paren) {
                        // rename(serialize = "...", deserialize = "...")
                        meta.parse_nested_meta(|inner| {
                            let value: syn::LitStr = inner.value()?.parse()?;
                            if inner.path.is_ident("serialize") {
                                serde_attrs.rename = Some(value.value());
                            }
                            Ok(())
                        })?;
                    } else {
                        let value: syn::LitStr = meta.value()?.parse()?;
                        serde_attrs.rename = Some(value.value());
                    }
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                    serde_attrs.skip = true;
                } else if meta.path.is_ident("flatten") {
                    serde_attrs.flatten = true;
                } else if meta.input.peek(syn::Token![=]) {
                    // skip_serializing_if = "...", default = "...", with = "..."
                    let _: syn::Expr = meta.value()?.parse()?;
                } else if meta.input.peek(syn::token::Paren) {
                    // bound(serialize = "..."), default lists and other nested forms
                    meta.parse_nested_meta(|inner| {
                        if inner.input.peek(syn::Token![=]) {
                            let _: syn::Expr = inner.value()?.parse()?;
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            });
            if let Err(e) = parsed {
                debug!("Unrecognized serde attribute, later options ignored: {}", e);
            }
        }

        serde_attrs
    }

    /// Map a declared Rust type onto the type model. `None` when the shape has no
    /// meaningful schema (tuples, function pointers, trait objects).
    pub fn rust_type_to_type(ty: &syn::Type) -> Option<Type> {
        match ty {
            syn::Type::Path(type_path) => Self::path_to_type(&type_path.path),
            syn::Type::Reference(reference) => Self::rust_type_to_type(&reference.elem),
            syn::Type::Slice(slice) => Self::rust_type_to_type(&slice.elem).map(Type::list),
            syn::Type::Array(array) => Self::rust_type_to_type(&array.elem).map(Type::list),
            syn::Type::Paren(paren) => Self::rust_type_to_type(&paren.elem),
            syn::Type::Group(group) => Self::rust_type_to_type(&group.elem),
            _ => None,
        }
    }

    fn path_to_type(path: &syn::Path) -> Option<Type> {
        let segment = path.segments.last()?;
        let type_name = segment.ident.to_string();
        let args = generic_type_args(&segment.arguments);

        let ty: Type = match type_name.as_str() {
            "String" | "str" | "char" | "Uuid" | "PathBuf" => ScalarType::String.into(),
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
            | "u128" | "usize" => ScalarType::Integer.into(),
            "f32" | "f64" => ScalarType::Float.into(),
            "bool" => ScalarType::Boolean.into(),
            "Value" => ScalarType::Mixed.into(),
            "Option" => Self::rust_type_to_type(args.first()?)?.nullable(),
            "Box" | "Rc" | "Arc" | "Cow" => Self::rust_type_to_type(args.first()?)?,
            "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet" => {
                Type::list(Self::rust_type_to_type(args.first()?)?)
            }
            "HashMap" | "BTreeMap" | "IndexMap" => {
                let key = Self::rust_type_to_type(args.first()?)?;
                let value = Self::rust_type_to_type(args.get(1)?)?;
                Type::array(key, value)
            }
            _ => Type::object(&type_name),
        };
        Some(ty)
    }
}

impl ClassSource for TypeResolver {
    fn find_class(&mut self, name: &str) -> Option<ClassDef> {
        self.resolve_class(name)
    }
}

fn find_item<'a, T>(
    items: &'a [syn::Item],
    matcher: &dyn Fn(&'a syn::Item) -> Option<&'a T>,
) -> Option<&'a T> {
    for item in items {
        if let Some(found) = matcher(item) {
            return Some(found);
        }
        if let syn::Item::Mod(item_mod) = item {
            if let Some((_, nested)) = &item_mod.content {
                if let Some(found) = find_item(nested, matcher) {
                    return Some(found);
                }
            }
        }
    }
    None
}

fn generic_type_args(arguments: &syn::PathArguments) -> Vec<&syn::Type> {
    match arguments {
        syn::PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                syn::GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Joined `///` lines of an item
fn doc_comment(attrs: &[syn::Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(syn::MetaNameValue {
                value:
                    syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(text),
                        ..
                    }),
                ..
            }) => Some(text.value().trim().to_string()),
            _ => None,
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
