//! Type model for inferred and annotated types.
//!
//! A [`Type`] is a tagged variant (scalar, array, union or class reference) with an
//! orthogonal nullability flag. Types convert to OpenAPI schema fragments through
//! [`Type::to_openapi_schema`], or through [`Type::render_schema`] when the caller wants
//! to decide how class references are rendered (the schema generator inlines them).
//!
//! Type expressions as they appear in docblocks (`?int`, `string|int`, `User[]`,
//! `array<string, int>`) are parsed with [`Type::parse`].

use crate::error::{Error, Result};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Prefix of every schema reference emitted by this crate
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Primitive types known to the type model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    String,
    Integer,
    Float,
    Boolean,
    Null,
    Mixed,
    Object,
}

impl ScalarType {
    /// Parse a primitive type name, accepting the usual aliases (`int`, `bool`, `double`).
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(ScalarType::String),
            "int" | "integer" => Ok(ScalarType::Integer),
            "float" | "double" | "number" => Ok(ScalarType::Float),
            "bool" | "boolean" => Ok(ScalarType::Boolean),
            "null" => Ok(ScalarType::Null),
            "mixed" => Ok(ScalarType::Mixed),
            "object" => Ok(ScalarType::Object),
            _ => Err(Error::InvalidType(name.to_string())),
        }
    }

    /// Canonical name of the primitive
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::Boolean => "boolean",
            ScalarType::Null => "null",
            ScalarType::Mixed => "mixed",
            ScalarType::Object => "object",
        }
    }

    /// Schema fragment of the bare scalar
    pub fn schema(&self) -> Value {
        match self {
            ScalarType::String => json!({"type": "string"}),
            ScalarType::Integer => json!({"type": "integer"}),
            ScalarType::Float => json!({"type": "number", "format": "float"}),
            ScalarType::Boolean => json!({"type": "boolean"}),
            // OpenAPI 3.0 has no null type
            ScalarType::Null => json!({"nullable": true}),
            ScalarType::Mixed => json!({}),
            ScalarType::Object => json!({"type": "object"}),
        }
    }
}

/// The variant part of a [`Type`]
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Scalar(ScalarType),
    Array { key: Box<Type>, value: Box<Type> },
    /// Two or more members, distinct by name, in first-seen order
    Union(Vec<Type>),
    /// A class or struct, identified by its (possibly namespaced) name
    Object(String),
}

/// An inferred or declared type
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    kind: TypeKind,
    nullable: bool,
}

impl From<ScalarType> for Type {
    fn from(scalar: ScalarType) -> Self {
        Type {
            kind: TypeKind::Scalar(scalar),
            nullable: false,
        }
    }
}

impl Type {
    /// Build a scalar type from its name. Unknown names are rejected with
    /// [`Error::InvalidType`]; there is no fallback to `mixed`.
    pub fn scalar(name: &str) -> Result<Type> {
        ScalarType::from_name(name).map(Type::from)
    }

    pub fn array(key: Type, value: Type) -> Type {
        Type {
            kind: TypeKind::Array {
                key: Box::new(key),
                value: Box::new(value),
            },
            nullable: false,
        }
    }

    /// An integer-keyed array of `value`
    pub fn list(value: Type) -> Type {
        Type::array(ScalarType::Integer.into(), value)
    }

    pub fn object(class_name: &str) -> Type {
        Type {
            kind: TypeKind::Object(class_name.trim_start_matches('\\').to_string()),
            nullable: false,
        }
    }

    /// Build a union, flattening nested unions and dropping members whose name was
    /// already seen. A single surviving member is returned as is; no members at all
    /// yields `mixed`.
    pub fn union<I>(types: I) -> Type
    where
        I: IntoIterator<Item = Type>,
    {
        let mut members: Vec<Type> = Vec::new();
        for ty in types {
            let flattened = match ty.kind {
                TypeKind::Union(inner) => {
                    let mut inner = inner;
                    if ty.nullable {
                        inner.push(ScalarType::Null.into());
                    }
                    inner
                }
                kind => vec![Type {
                    kind,
                    nullable: ty.nullable,
                }],
            };
            for member in flattened {
                let name = member.name();
                if !members.iter().any(|m| m.name() == name) {
                    members.push(member);
                }
            }
        }

        match members.len() {
            0 => ScalarType::Mixed.into(),
            1 => members.remove(0),
            _ => Type {
                kind: TypeKind::Union(members),
                nullable: false,
            },
        }
    }

    /// Parse a docblock type expression such as `?int`, `string|null`, `User[]` or
    /// `array<string, int>`.
    pub fn parse(expr: &str) -> Result<Type> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(Error::InvalidType(expr.to_string()));
        }

        if let Some(rest) = expr.strip_prefix('?') {
            let mut ty = Type::parse(rest)?;
            ty.set_nullable(true);
            return Ok(ty);
        }

        let alternatives = split_top_level(expr, '|')?;
        if alternatives.len() > 1 {
            let members = alternatives
                .iter()
                .map(|part| Type::parse(part))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Type::union(members));
        }

        if let Some(inner) = expr.strip_suffix("[]") {
            return Ok(Type::list(Type::parse(inner)?));
        }

        if let Some(open) = expr.find('<') {
            if !expr.ends_with('>') {
                return Err(Error::InvalidType(expr.to_string()));
            }
            let base = expr[..open].trim().to_ascii_lowercase();
            let args = split_top_level(&expr[open + 1..expr.len() - 1], ',')?;
            return match (base.as_str(), args.as_slice()) {
                ("array" | "iterable" | "list", [value]) => Ok(Type::list(Type::parse(value)?)),
                ("array" | "iterable", [key, value]) => {
                    Ok(Type::array(Type::parse(key)?, Type::parse(value)?))
                }
                _ => Err(Error::InvalidType(expr.to_string())),
            };
        }

        if matches!(
            expr.to_ascii_lowercase().as_str(),
            "array" | "iterable" | "list"
        ) {
            return Ok(Type::list(ScalarType::Mixed.into()));
        }

        if let Ok(scalar) = ScalarType::from_name(expr) {
            return Ok(scalar.into());
        }

        if is_class_name(expr) {
            return Ok(Type::object(expr));
        }

        Err(Error::InvalidType(expr.to_string()))
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Canonical type name, without the nullable marker
    pub fn name(&self) -> String {
        match &self.kind {
            TypeKind::Scalar(scalar) => scalar.name().to_string(),
            TypeKind::Array { .. } => "array".to_string(),
            TypeKind::Union(members) => members
                .iter()
                .map(Type::name)
                .collect::<Vec<_>>()
                .join("|"),
            TypeKind::Object(class_name) => class_name.clone(),
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn set_nullable(&mut self, nullable: bool) {
        self.nullable = nullable;
    }

    /// Consuming variant of [`Type::set_nullable`]
    pub fn nullable(mut self) -> Type {
        self.nullable = true;
        self
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, TypeKind::Scalar(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    pub fn is_union(&self) -> bool {
        matches!(self.kind, TypeKind::Union(_))
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, TypeKind::Object(_))
    }

    fn is_null(&self) -> bool {
        matches!(self.kind, TypeKind::Scalar(ScalarType::Null))
    }

    /// Union members, or the type itself when it is not a union
    pub fn types(&self) -> &[Type] {
        match &self.kind {
            TypeKind::Union(members) => members,
            _ => std::slice::from_ref(self),
        }
    }

    /// Add an alternative, turning this type into a union when the name is new.
    /// The nullability of `self` is kept.
    pub fn add_type(&mut self, ty: Type) {
        let nullable = self.nullable;
        let members = match std::mem::replace(&mut self.kind, TypeKind::Scalar(ScalarType::Mixed)) {
            TypeKind::Union(members) => members,
            kind => vec![Type {
                kind,
                nullable: false,
            }],
        };
        let mut merged = Type::union(members.into_iter().chain(std::iter::once(ty)));
        merged.nullable = merged.nullable || nullable;
        *self = merged;
    }

    /// Whether an array keyed by this type serializes as a JSON object
    fn is_string_key(&self) -> bool {
        self.types()
            .iter()
            .any(|member| matches!(member.kind, TypeKind::Scalar(ScalarType::String)))
    }

    /// Schema fragment for this type; classes become `$ref`s to their component.
    pub fn to_openapi_schema(&self) -> Value {
        let rendered = self.render_schema(&mut |class_name: &str| {
            Ok::<Value, Infallible>(schema_reference(&component_name(class_name)))
        });
        match rendered {
            Ok(schema) => schema,
            Err(never) => match never {},
        }
    }

    /// Render a schema fragment, delegating class references to `resolve_class`.
    pub fn render_schema<E, F>(&self, resolve_class: &mut F) -> std::result::Result<Value, E>
    where
        F: FnMut(&str) -> std::result::Result<Value, E>,
    {
        let (schema, nullable) = match &self.kind {
            TypeKind::Scalar(scalar) => (scalar.schema(), self.nullable),
            TypeKind::Object(class_name) => (resolve_class(class_name)?, self.nullable),
            TypeKind::Array { key, value } => {
                let inner = value.render_schema(resolve_class)?;
                let schema = if key.is_string_key() {
                    json!({"type": "object", "additionalProperties": inner})
                } else {
                    json!({"type": "array", "items": inner})
                };
                (schema, self.nullable)
            }
            TypeKind::Union(members) => {
                let mut has_null = false;
                let mut variants = Vec::new();
                for member in members {
                    if member.is_null() {
                        has_null = true;
                        continue;
                    }
                    variants.push(member.render_schema(resolve_class)?);
                }
                let schema = match variants.len() {
                    0 => ScalarType::Mixed.schema(),
                    1 => variants.remove(0),
                    _ => json!({"oneOf": variants}),
                };
                (schema, self.nullable || has_null)
            }
        };

        Ok(if nullable { make_nullable(schema) } else { schema })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "?")?;
        }
        write!(f, "{}", self.name())
    }
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Type::parse(s)
    }
}

/// Component key for a class: the segment after the last `\` or `::`
pub fn component_name(class_name: &str) -> String {
    let trimmed = class_name.trim_start_matches('\\');
    let after_path = trimmed.rsplit("::").next().unwrap_or(trimmed);
    after_path
        .rsplit('\\')
        .next()
        .unwrap_or(after_path)
        .to_string()
}

/// A bare `$ref` fragment pointing into `components.schemas`
pub fn schema_reference(component: &str) -> Value {
    json!({"$ref": format!("{}{}", SCHEMA_REF_PREFIX, component)})
}

/// Mark a fragment nullable. `$ref` fragments cannot carry siblings, so they are
/// wrapped in `allOf`.
pub fn make_nullable(schema: Value) -> Value {
    match schema {
        Value::Object(mut map) => {
            if map.contains_key("$ref") {
                json!({"allOf": [Value::Object(map)], "nullable": true})
            } else {
                map.insert("nullable".to_string(), Value::Bool(true));
                Value::Object(map)
            }
        }
        other => other,
    }
}

fn split_top_level(expr: &str, separator: char) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;

    for c in expr.chars() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth < 0 {
                    return Err(Error::InvalidType(expr.to_string()));
                }
            }
            _ => {}
        }
        if c == separator && depth == 0 {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }

    if depth != 0 {
        return Err(Error::InvalidType(expr.to_string()));
    }
    parts.push(current.trim().to_string());

    if parts.iter().any(String::is_empty) {
        return Err(Error::InvalidType(expr.to_string()));
    }
    Ok(parts)
}

/// Class names start upper-case or carry a namespace separator; this keeps keywords
/// such as `resource` or `callable` from being taken for classes.
fn is_class_name(expr: &str) -> bool {
    let namespaced = expr.contains('\\') || expr.contains("::");
    let bare = expr.trim_start_matches('\\');
    let Some(first) = bare.chars().next() else {
        return false;
    };
    (first.is_ascii_uppercase() || (namespaced && (first.is_alphabetic() || first == '_')))
        && bare
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '\\' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scalar(name: &str) -> Type {
        Type::scalar(name).unwrap()
    }

    #[test]
    fn test_scalar_aliases_are_canonicalized() {
        assert_eq!(scalar("int").name(), "integer");
        assert_eq!(scalar("bool").name(), "boolean");
        assert_eq!(scalar("double").name(), "float");
        assert_eq!(scalar("String").name(), "string");
    }

    #[test]
    fn test_unknown_scalar_is_rejected() {
        match Type::scalar("resource") {
            Err(Error::InvalidType(token)) => assert_eq!(token, "resource"),
            other => panic!("Expected InvalidType, got {:?}", other),
        }
    }

    #[test]
    fn test_nullable_string_form() {
        let mut ty = scalar("string");
        assert_eq!(ty.to_string(), "string");
        ty.set_nullable(true);
        assert_eq!(ty.to_string(), "?string");
        assert_eq!(ty.name(), "string");
    }

    #[test]
    fn test_classification_predicates() {
        let cases = vec![
            (scalar("string"), [true, false, false, false]),
            (Type::list(scalar("int")), [false, true, false, false]),
            (
                Type::union(vec![scalar("string"), scalar("int")]),
                [false, false, true, false],
            ),
            (Type::object("App\\User"), [false, false, false, true]),
        ];
        for (ty, expected) in cases {
            assert_eq!(
                [ty.is_scalar(), ty.is_array(), ty.is_union(), ty.is_class()],
                expected,
                "classification of {}",
                ty
            );
        }
    }

    #[test]
    fn test_union_deduplicates_by_name() {
        let ty = Type::union(vec![
            scalar("string"),
            scalar("int"),
            scalar("string"),
            scalar("integer"),
        ]);
        assert_eq!(ty.name(), "string|integer");
        assert_eq!(ty.types().len(), 2);
    }

    #[test]
    fn test_single_member_union_collapses() {
        let ty = Type::union(vec![scalar("string"), scalar("string")]);
        assert!(!ty.is_union());
        assert_eq!(ty, scalar("string"));
        assert_eq!(ty.name(), "string");
    }

    #[test]
    fn test_union_flattens_nested_unions() {
        let inner = Type::union(vec![scalar("int"), scalar("float")]);
        let ty = Type::union(vec![scalar("string"), inner, scalar("float")]);
        assert_eq!(ty.name(), "string|integer|float");
    }

    #[test]
    fn test_add_type_builds_union_incrementally() {
        let mut ty = scalar("integer");
        ty.add_type(scalar("integer"));
        assert!(ty.is_scalar());

        ty.add_type(scalar("string"));
        assert!(ty.is_union());
        assert_eq!(ty.name(), "integer|string");

        ty.add_type(scalar("boolean"));
        assert_eq!(ty.types().len(), 3);
    }

    #[test]
    fn test_add_type_keeps_nullability() {
        let mut ty = scalar("string").nullable();
        ty.add_type(scalar("int"));
        assert!(ty.is_nullable());
        assert_eq!(ty.to_string(), "?string|integer");
    }

    #[test]
    fn test_scalar_schemas() {
        assert_eq!(scalar("string").to_openapi_schema(), json!({"type": "string"}));
        assert_eq!(scalar("int").to_openapi_schema(), json!({"type": "integer"}));
        assert_eq!(
            scalar("float").to_openapi_schema(),
            json!({"type": "number", "format": "float"})
        );
        assert_eq!(scalar("mixed").to_openapi_schema(), json!({}));
    }

    #[test]
    fn test_nullable_scalar_schema() {
        assert_eq!(
            scalar("string").nullable().to_openapi_schema(),
            json!({"type": "string", "nullable": true})
        );
    }

    #[test]
    fn test_list_schema() {
        let ty = Type::list(scalar("integer"));
        assert_eq!(
            ty.to_openapi_schema(),
            json!({"type": "array", "items": {"type": "integer"}})
        );
    }

    #[test]
    fn test_string_keyed_array_is_object() {
        let ty = Type::array(scalar("string"), scalar("integer"));
        assert_eq!(
            ty.to_openapi_schema(),
            json!({"type": "object", "additionalProperties": {"type": "integer"}})
        );
    }

    #[test]
    fn test_mixed_key_array_is_object() {
        let key = Type::union(vec![scalar("int"), scalar("string")]);
        let ty = Type::array(key, scalar("boolean"));
        assert_eq!(ty.to_openapi_schema()["type"], "object");
    }

    #[test]
    fn test_union_schema_is_one_of() {
        let ty = Type::union(vec![scalar("string"), scalar("integer")]);
        assert_eq!(
            ty.to_openapi_schema(),
            json!({"oneOf": [{"type": "string"}, {"type": "integer"}]})
        );
    }

    #[test]
    fn test_union_with_null_folds_into_nullable() {
        let ty = Type::union(vec![scalar("string"), scalar("null")]);
        assert_eq!(
            ty.to_openapi_schema(),
            json!({"type": "string", "nullable": true})
        );

        let ty = Type::union(vec![scalar("string"), scalar("int"), scalar("null")]);
        assert_eq!(
            ty.to_openapi_schema(),
            json!({"oneOf": [{"type": "string"}, {"type": "integer"}], "nullable": true})
        );
    }

    #[test]
    fn test_class_schema_is_reference() {
        let ty = Type::object("\\App\\Models\\User");
        assert_eq!(ty.name(), "App\\Models\\User");
        assert_eq!(
            ty.to_openapi_schema(),
            json!({"$ref": "#/components/schemas/User"})
        );
    }

    #[test]
    fn test_nullable_reference_wraps_in_all_of() {
        let ty = Type::object("User").nullable();
        assert_eq!(
            ty.to_openapi_schema(),
            json!({"allOf": [{"$ref": "#/components/schemas/User"}], "nullable": true})
        );
    }

    #[test]
    fn test_parse_expressions() {
        assert_eq!(Type::parse("int").unwrap(), scalar("integer"));
        assert_eq!(Type::parse("?string").unwrap().to_string(), "?string");
        assert_eq!(Type::parse("string|int").unwrap().name(), "string|integer");
        assert_eq!(
            Type::parse("User[]").unwrap(),
            Type::list(Type::object("User"))
        );
        assert_eq!(
            Type::parse("array<string, int>").unwrap(),
            Type::array(scalar("string"), scalar("int"))
        );
        assert_eq!(
            Type::parse("list<array<string, bool>>").unwrap(),
            Type::list(Type::array(scalar("string"), scalar("bool")))
        );
        assert_eq!(Type::parse("array").unwrap(), Type::list(scalar("mixed")));
        assert_eq!(
            Type::parse("crate::models::Post").unwrap().to_openapi_schema(),
            json!({"$ref": "#/components/schemas/Post"})
        );
    }

    #[test]
    fn test_parse_rejects_malformed_expressions() {
        for expr in ["", "array<int", "string|", "resource", "map<string>", "in t"] {
            assert!(
                matches!(Type::parse(expr), Err(Error::InvalidType(_))),
                "expected {:?} to be rejected",
                expr
            );
        }
    }

    #[test]
    fn test_component_name() {
        assert_eq!(component_name("App\\Models\\User"), "User");
        assert_eq!(component_name("crate::models::Post"), "Post");
        assert_eq!(component_name("Plain"), "Plain");
    }
}
