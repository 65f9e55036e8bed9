use crate::cache::SchemaCache;
use crate::docblock::DocBlock;
use crate::error::{Error, Result};
use crate::rules::rules_to_schema;
use crate::source::{ClassDef, ClassKind, ClassRegistry, ClassSource, ParameterLocation, ParameterSpec, PropertyDef};
use crate::types::{component_name, schema_reference, ScalarType, Type};
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Schema generator - turns field specs, classes and types into schema fragments
///
/// Every class schema produced along the way is registered under its component
/// name, so `$ref`s emitted for recursive structures always have a target.
/// Component names are class basenames; a second class with a taken basename is
/// named after its namespace as well (`App\Admin\User` -> `AdminUser`).
pub struct SchemaGenerator {
    /// Declarations looked up when a class is reflected
    classes: Box<dyn ClassSource>,
    /// Named schemas, destined for `components.schemas`
    schemas: IndexMap<String, Value>,
    /// Component name -> fully qualified class that owns it
    owners: IndexMap<String, String>,
    /// Memoized class schemas, keyed by the requested class name
    memo: HashMap<String, Value>,
    cache: Option<Box<dyn SchemaCache>>,
}

impl SchemaGenerator {
    pub fn new<S: ClassSource + 'static>(classes: S) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            classes: Box::new(classes),
            schemas: IndexMap::new(),
            owners: IndexMap::new(),
            memo: HashMap::new(),
            cache: None,
        }
    }

    /// A generator that knows no classes; every class reference renders as a plain object
    pub fn without_classes() -> Self {
        Self::new(ClassRegistry::new())
    }

    /// Consult `cache` before reflecting a class
    pub fn with_cache<C: SchemaCache + 'static>(mut self, cache: C) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Generate an object schema from a field spec.
    ///
    /// Each field maps to a type expression (`"string"`, `"?int"`, `"User[]"`), a
    /// nested mapping, or a one-element list holding the spec of the items.
    /// Properties keep the input order and nothing is marked required. With a `name`
    /// the schema is also registered as a component.
    ///
    /// # Errors
    ///
    /// `StructuralError` when `spec` or a field value has none of those shapes,
    /// `InvalidType` when a type expression cannot be parsed.
    pub fn generate_from_array(&mut self, spec: &Value, name: Option<&str>) -> Result<Value> {
        let schema = self.object_from_spec(spec, &mut Vec::new())?;
        if let Some(name) = name {
            self.register_schema(name, schema.clone());
        }
        Ok(schema)
    }

    /// Like [`SchemaGenerator::generate_from_array`], listing `required` fields
    pub fn generate_with_required(
        &mut self,
        spec: &Value,
        name: Option<&str>,
        required: &[&str],
    ) -> Result<Value> {
        let mut schema = self.object_from_spec(spec, &mut Vec::new())?;
        if !required.is_empty() {
            let fields = &schema["properties"];
            if let Some(unknown) = required.iter().find(|field| fields.get(**field).is_none()) {
                return Err(Error::StructuralError(format!(
                    "required field `{}` is not part of the schema",
                    unknown
                )));
            }
            schema["required"] = json!(required);
        }

        if let Some(name) = name {
            self.register_schema(name, schema.clone());
        }
        Ok(schema)
    }

    /// Generate the schema of a class by reflecting its declaration.
    ///
    /// Nested classes are inlined on first sight and emitted as `$ref` when seen again
    /// within the same call, which also breaks self-references.
    ///
    /// # Errors
    ///
    /// `UnresolvedReference` when the class itself is unknown. Unknown classes
    /// referenced by its properties are not errors; they render as plain objects.
    pub fn generate_from_class(&mut self, class_name: &str) -> Result<Value> {
        self.class_component(class_name).map(|(_, schema)| schema)
    }

    /// Render a type, inlining classes the generator can reflect
    pub fn generate_from_type(&mut self, ty: &Type) -> Result<Value> {
        self.render_type(ty, &mut Vec::new())
    }

    /// Render a type for use inside an operation: classes are generated as
    /// components and referenced by `$ref`, unknown classes render as plain objects.
    pub fn generate_reference(&mut self, ty: &Type) -> Result<Value> {
        ty.render_schema(&mut |class_name: &str| match self.class_component(class_name) {
            Ok((component, _)) => Ok(schema_reference(&component)),
            Err(Error::UnresolvedReference(_)) => {
                debug!("Could not resolve class: {}, using object placeholder", class_name);
                Ok(ScalarType::Object.schema())
            }
            Err(e) => Err(e),
        })
    }

    /// Object schema of a validation rule set (field -> `"required|string|max:100"`)
    pub fn generate_from_rules(&mut self, rules: &IndexMap<String, String>, name: Option<&str>) -> Value {
        let schema = rules_to_schema(rules);
        if let Some(name) = name {
            self.register_schema(name, schema.clone());
        }
        schema
    }

    /// Generate an operation parameter. `default_location` applies when the spec
    /// carries none; path parameters are always required.
    pub fn generate_parameter(
        &mut self,
        param: &ParameterSpec,
        default_location: ParameterLocation,
    ) -> Result<Value> {
        debug!("Generating parameter schema for: {}", param.name);

        let location = param.location.unwrap_or(default_location);
        let schema = match param.type_expr.as_deref() {
            Some(expr) => self.generate_from_type(&Type::parse(expr)?)?,
            None => ScalarType::String.schema(),
        };

        let mut parameter = json!({
            "name": param.name,
            "in": location.as_str(),
            "required": param.required || location == ParameterLocation::Path,
            "schema": schema,
        });
        if let Some(description) = &param.description {
            parameter["description"] = json!(description);
        }
        Ok(parameter)
    }

    pub fn register_schema(&mut self, name: &str, schema: Value) {
        self.schemas.insert(name.to_string(), schema);
    }

    /// Get all registered schemas
    pub fn get_schemas(&self) -> &IndexMap<String, Value> {
        &self.schemas
    }

    /// Component name assigned to `class_name`, if it has been reflected
    pub fn component_for(&self, class_name: &str) -> Option<&str> {
        let class_name = class_name.trim_start_matches('\\');
        self.owners
            .iter()
            .find(|(_, owner)| owner.as_str() == class_name)
            .map(|(component, _)| component.as_str())
    }

    /// Drop memoized class schemas. Registered components are kept.
    pub fn clear_cache(&mut self) {
        self.memo.clear();
        if let Some(cache) = self.cache.as_mut() {
            if let Err(e) = cache.clear() {
                warn!("Failed to clear schema cache: {}", e);
            }
        }
    }

    fn object_from_spec(&mut self, spec: &Value, seen: &mut Vec<String>) -> Result<Value> {
        let Value::Object(fields) = spec else {
            return Err(Error::StructuralError(format!(
                "schema spec must be a mapping, got {}",
                spec
            )));
        };

        let mut properties = Map::new();
        for (field, field_spec) in fields {
            let schema = self.field_from_spec(field, field_spec, seen)?;
            properties.insert(field.clone(), schema);
        }

        Ok(json!({"type": "object", "properties": properties}))
    }

    fn field_from_spec(&mut self, field: &str, spec: &Value, seen: &mut Vec<String>) -> Result<Value> {
        match spec {
            Value::String(expr) => {
                let ty = Type::parse(expr)?;
                self.render_type(&ty, seen)
            }
            Value::Object(_) => self.object_from_spec(spec, seen),
            Value::Array(items) if items.len() == 1 => {
                let items = self.field_from_spec(field, &items[0], seen)?;
                Ok(json!({"type": "array", "items": items}))
            }
            other => Err(Error::StructuralError(format!(
                "field `{}` must be a type name, a mapping or a one-element list, got {}",
                field, other
            ))),
        }
    }

    fn render_type(&mut self, ty: &Type, seen: &mut Vec<String>) -> Result<Value> {
        ty.render_schema(&mut |class_name: &str| self.class_fragment(class_name, seen))
    }

    /// Component name and schema of a root class, memoized
    fn class_component(&mut self, class_name: &str) -> Result<(String, Value)> {
        let key = class_name.trim_start_matches('\\');
        if let Some(cached) = self.cached_schema(key) {
            debug!("Schema for {} served from cache", key);
            return Ok(cached);
        }

        debug!("Generating class schema for: {}", class_name);
        let class = self
            .classes
            .find_class(class_name)
            .ok_or_else(|| Error::UnresolvedReference(class_name.to_string()))?;
        let mut seen = Vec::new();
        let (component, schema) = self.reflect_class(class, &mut seen)?;

        let mut components = Map::new();
        let mut owners = Map::new();
        for class in &seen {
            if let Some(name) = self.component_for(class).map(str::to_string) {
                if let Some(schema) = self.schemas.get(&name) {
                    components.insert(name.clone(), schema.clone());
                }
                owners.insert(name, json!(class));
            }
        }
        self.store_schema(
            key,
            json!({
                "component": component,
                "schema": schema,
                "components": components,
                "owners": owners,
            }),
        );

        Ok((component, schema))
    }

    /// Schema of a class met while rendering a type
    fn class_fragment(&mut self, class_name: &str, seen: &mut Vec<String>) -> Result<Value> {
        let Some(class) = self.classes.find_class(class_name) else {
            debug!("Could not resolve class: {}, using object placeholder", class_name);
            return Ok(ScalarType::Object.schema());
        };

        if seen.contains(&class.name) {
            let component = self.assign_component(&class.name);
            debug!("{} already generated in this pass, emitting $ref", class.name);
            return Ok(schema_reference(&component));
        }

        self.reflect_class(class, seen).map(|(_, schema)| schema)
    }

    /// Reflect a class and register its schema under its component name
    fn reflect_class(&mut self, class: ClassDef, seen: &mut Vec<String>) -> Result<(String, Value)> {
        let component = self.assign_component(&class.name);
        seen.push(class.name.clone());

        let schema = match &class.kind {
            ClassKind::Enum(cases) => json!({"type": "string", "enum": cases}),
            ClassKind::Struct(properties) => self.struct_schema(&class, properties, seen)?,
        };

        self.schemas.insert(component.clone(), schema.clone());
        Ok((component, schema))
    }

    /// The component owned by `class_name`, claiming the first free candidate name
    /// on first use
    fn assign_component(&mut self, class_name: &str) -> String {
        if let Some(component) = self.component_for(class_name) {
            return component.to_string();
        }

        let candidates = component_candidates(class_name);
        let base = candidates
            .first()
            .cloned()
            .unwrap_or_else(|| component_name(class_name));
        let component = candidates
            .into_iter()
            .find(|name| !self.owners.contains_key(name))
            .unwrap_or_else(|| {
                (2..)
                    .map(|n| format!("{}{}", base, n))
                    .find(|name| !self.owners.contains_key(name))
                    .unwrap_or(base.clone())
            });

        if component != base {
            debug!("Component {} is taken, naming {} as {}", base, class_name, component);
        }
        self.owners
            .insert(component.clone(), class_name.trim_start_matches('\\').to_string());
        component
    }

    fn struct_schema(
        &mut self,
        class: &ClassDef,
        properties: &[PropertyDef],
        seen: &mut Vec<String>,
    ) -> Result<Value> {
        let mut schemas = Map::new();
        let mut required = Vec::new();

        for property in properties {
            let doc = property
                .doc
                .as_deref()
                .map(DocBlock::parse)
                .unwrap_or_default();
            let annotated = doc.var_type().unwrap_or_else(|e| {
                warn!("Ignoring @var of {}::{}: {}", class.name, property.name, e);
                None
            });

            let Some(ty) = annotated.or_else(|| property.ty.clone()) else {
                warn!(
                    "Property {}::{} has no type, defaulting to string",
                    class.name, property.name
                );
                schemas.insert(property.name.clone(), ScalarType::String.schema());
                continue;
            };

            let mut schema = self.render_type(&ty, seen)?;

            if property.flatten {
                if let Some(Value::Object(inner)) = schema.get("properties") {
                    schemas.extend(inner.clone());
                    if let Some(Value::Array(names)) = schema.get("required") {
                        required.extend(names.iter().filter_map(Value::as_str).map(str::to_string));
                    }
                    continue;
                }
                debug!("{}::{} cannot be flattened, kept as property", class.name, property.name);
            }

            if let (Some(summary), Value::Object(map)) = (&doc.summary, &mut schema) {
                if !map.contains_key("$ref") {
                    map.insert("description".to_string(), json!(summary));
                }
            }

            if schema.get("nullable") != Some(&Value::Bool(true)) {
                required.push(property.name.clone());
            }
            schemas.insert(property.name.clone(), schema);
        }

        let mut schema = json!({"type": "object", "properties": schemas});
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        Ok(schema)
    }

    fn cached_schema(&mut self, class_name: &str) -> Option<(String, Value)> {
        let envelope = match self.memo.get(class_name) {
            Some(envelope) => envelope.clone(),
            None => {
                let cache = self.cache.as_mut()?;
                match cache.get(&cache_key(class_name)) {
                    Ok(Some(envelope)) => envelope,
                    Ok(None) => return None,
                    Err(e) => {
                        warn!("Schema cache lookup for {} failed: {}", class_name, e);
                        return None;
                    }
                }
            }
        };

        let component = envelope.get("component")?.as_str()?.to_string();
        let schema = envelope.get("schema")?.clone();
        if let Some(Value::Object(owners)) = envelope.get("owners") {
            for (name, owner) in owners {
                if let Some(owner) = owner.as_str() {
                    self.owners.entry(name.clone()).or_insert_with(|| owner.to_string());
                }
            }
        }
        if let Some(Value::Object(components)) = envelope.get("components") {
            for (name, component_schema) in components {
                self.schemas.insert(name.clone(), component_schema.clone());
            }
        }
        Some((component, schema))
    }

    fn store_schema(&mut self, class_name: &str, envelope: Value) {
        if let Some(cache) = self.cache.as_mut() {
            if let Err(e) = cache.put(&cache_key(class_name), envelope.clone(), None) {
                warn!("Failed to cache schema for {}: {}", class_name, e);
            }
        }
        self.memo.insert(class_name.to_string(), envelope);
    }
}

fn cache_key(class_name: &str) -> String {
    format!("openapi-scribe:schema:{}", class_name)
}

/// Component names for a class, most preferred first: the basename, then the
/// basename prefixed by more and more of its namespace
fn component_candidates(class_name: &str) -> Vec<String> {
    let segments: Vec<&str> = class_name
        .trim_start_matches('\\')
        .split(['\\', ':'])
        .filter(|segment| !segment.is_empty())
        .collect();

    (1..=segments.len())
        .map(|n| segments[segments.len() - n..].concat())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::parser::AstParser;
    use crate::type_resolver::TypeResolver;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::time::Duration;

    fn create_generator_from_code(code: &str) -> SchemaGenerator {
        let parsed = AstParser::parse_source(code, Path::new("models.rs")).unwrap();
        SchemaGenerator::new(TypeResolver::new(vec![parsed]))
    }

    fn registry(classes: Vec<ClassDef>) -> ClassRegistry {
        let mut registry = ClassRegistry::new();
        for class in classes {
            registry.register(class);
        }
        registry
    }

    fn class(name: &str, properties: Vec<PropertyDef>) -> ClassDef {
        ClassDef {
            name: name.to_string(),
            kind: ClassKind::Struct(properties),
        }
    }

    fn typed(name: &str, expr: &str) -> PropertyDef {
        PropertyDef::new(name, Some(Type::parse(expr).unwrap()))
    }

    /// Cache whose every operation fails
    struct BrokenCache;

    impl SchemaCache for BrokenCache {
        fn get(&mut self, _key: &str) -> Result<Option<Value>> {
            Err(Error::IoError(std::io::Error::other("cache down")))
        }

        fn put(&mut self, _key: &str, _value: Value, _ttl: Option<Duration>) -> Result<()> {
            Err(Error::IoError(std::io::Error::other("cache down")))
        }

        fn clear(&mut self) -> Result<()> {
            Err(Error::IoError(std::io::Error::other("cache down")))
        }
    }

    #[test]
    fn test_generate_from_array_flat() {
        let mut generator = SchemaGenerator::without_classes();
        let spec = json!({"name": "string", "age": "int", "score": "?float"});

        let schema = generator.generate_from_array(&spec, None).unwrap();

        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "age": {"type": "integer"},
                    "score": {"type": "number", "format": "float", "nullable": true}
                }
            })
        );
        assert!(schema.get("required").is_none());
        assert!(generator.get_schemas().is_empty());
    }

    #[test]
    fn test_generate_from_array_keeps_field_order() {
        let mut generator = SchemaGenerator::without_classes();
        let spec = json!({"zeta": "string", "alpha": "string", "mid": "boolean"});

        let schema = generator.generate_from_array(&spec, None).unwrap();
        let keys: Vec<&String> = schema["properties"].as_object().unwrap().keys().collect();

        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_generate_from_array_nested_and_list() {
        let mut generator = SchemaGenerator::without_classes();
        let spec = json!({
            "address": {"city": "string", "zip": "string"},
            "tags": ["string"],
            "points": [{"x": "int", "y": "int"}]
        });

        let schema = generator.generate_from_array(&spec, Some("Profile")).unwrap();

        assert_eq!(
            schema["properties"]["address"],
            json!({
                "type": "object",
                "properties": {"city": {"type": "string"}, "zip": {"type": "string"}}
            })
        );
        assert_eq!(
            schema["properties"]["tags"],
            json!({"type": "array", "items": {"type": "string"}})
        );
        assert_eq!(schema["properties"]["points"]["items"]["type"], "object");
        assert_eq!(generator.get_schemas().get("Profile"), Some(&schema));
    }

    #[test]
    fn test_generate_from_array_rejects_bad_shapes() {
        let mut generator = SchemaGenerator::without_classes();

        let result = generator.generate_from_array(&json!(["string"]), None);
        assert!(matches!(result, Err(Error::StructuralError(_))));

        let result = generator.generate_from_array(&json!({"age": 42}), None);
        assert!(matches!(result, Err(Error::StructuralError(_))));

        let result = generator.generate_from_array(&json!({"tags": ["string", "int"]}), None);
        assert!(matches!(result, Err(Error::StructuralError(_))));

        let result = generator.generate_from_array(&json!({"age": "integr"}), None);
        assert!(matches!(result, Err(Error::InvalidType(_))));
    }

    #[test]
    fn test_generate_with_required() {
        let mut generator = SchemaGenerator::without_classes();
        let spec = json!({"email": "string", "name": "string"});

        let schema = generator
            .generate_with_required(&spec, None, &["email"])
            .unwrap();
        assert_eq!(schema["required"], json!(["email"]));

        let result = generator.generate_with_required(&spec, None, &["password"]);
        assert!(matches!(result, Err(Error::StructuralError(_))));
    }

    #[test]
    fn test_struct_schema_generation() {
        let code = r#"
            pub struct User {
                pub id: u32,
                pub name: String,
                pub email: Option<String>,
                #[serde(skip)]
                pub password_hash: String,
            }
        "#;

        let mut generator = create_generator_from_code(code);
        let schema = generator.generate_from_class("User").unwrap();

        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer"},
                    "name": {"type": "string"},
                    "email": {"type": "string", "nullable": true}
                },
                "required": ["id", "name"]
            })
        );
        assert_eq!(generator.get_schemas().get("User"), Some(&schema));
    }

    #[test]
    fn test_nested_struct_is_inlined_and_registered() {
        let code = r#"
            pub struct Address {
                pub street: String,
            }

            pub struct User {
                pub address: Address,
                pub previous: Vec<Address>,
            }
        "#;

        let mut generator = create_generator_from_code(code);
        let schema = generator.generate_from_class("User").unwrap();

        assert_eq!(
            schema["properties"]["address"],
            json!({
                "type": "object",
                "properties": {"street": {"type": "string"}},
                "required": ["street"]
            })
        );
        assert_eq!(
            schema["properties"]["previous"]["items"],
            json!({"$ref": "#/components/schemas/Address"})
        );
        assert!(generator.get_schemas().contains_key("Address"));
        assert!(generator.get_schemas().contains_key("User"));
    }

    #[test]
    fn test_self_referencing_class_emits_ref() {
        let code = r#"
            pub struct Category {
                pub name: String,
                pub parent: Option<Box<Category>>,
                pub children: Vec<Category>,
            }
        "#;

        let mut generator = create_generator_from_code(code);
        let schema = generator.generate_from_class("Category").unwrap();

        assert_eq!(
            schema["properties"]["parent"],
            json!({"allOf": [{"$ref": "#/components/schemas/Category"}], "nullable": true})
        );
        assert_eq!(
            schema["properties"]["children"],
            json!({"type": "array", "items": {"$ref": "#/components/schemas/Category"}})
        );
        assert_eq!(schema["required"], json!(["name", "children"]));
    }

    #[test]
    fn test_enum_schema_generation() {
        let code = r#"
            pub enum Role {
                Admin,
                #[serde(rename = "member")]
                Member,
            }

            pub struct Account {
                pub role: Role,
            }
        "#;

        let mut generator = create_generator_from_code(code);
        let schema = generator.generate_from_class("Account").unwrap();

        assert_eq!(
            schema["properties"]["role"],
            json!({"type": "string", "enum": ["Admin", "member"]})
        );
        assert_eq!(
            generator.get_schemas().get("Role"),
            Some(&json!({"type": "string", "enum": ["Admin", "member"]}))
        );
    }

    #[test]
    fn test_untyped_property_defaults_to_string() {
        let mut generator = SchemaGenerator::new(registry(vec![class(
            "App\\Models\\Legacy",
            vec![PropertyDef::new("payload", None), typed("id", "int")],
        )]));

        let schema = generator.generate_from_class("App\\Models\\Legacy").unwrap();

        assert_eq!(schema["properties"]["payload"], json!({"type": "string"}));
        assert_eq!(schema["required"], json!(["id"]));
        assert!(generator.get_schemas().contains_key("Legacy"));
    }

    #[test]
    fn test_docblock_var_overrides_declared_type() {
        let mut property = typed("created_at", "int");
        property.doc = Some("/**\n * Creation time\n * @var string\n */".to_string());
        let mut generator = SchemaGenerator::new(registry(vec![class("Event", vec![property])]));

        let schema = generator.generate_from_class("Event").unwrap();

        assert_eq!(
            schema["properties"]["created_at"],
            json!({"type": "string", "description": "Creation time"})
        );
    }

    #[test]
    fn test_flattened_property_is_inlined() {
        let code = r#"
            pub struct Timestamps {
                pub created_at: String,
                pub updated_at: Option<String>,
            }

            pub struct Post {
                pub title: String,
                #[serde(flatten)]
                pub timestamps: Timestamps,
            }
        "#;

        let mut generator = create_generator_from_code(code);
        let schema = generator.generate_from_class("Post").unwrap();

        let keys: Vec<&String> = schema["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["title", "created_at", "updated_at"]);
        assert_eq!(schema["required"], json!(["title", "created_at"]));
    }

    #[test]
    fn test_unknown_property_class_renders_object() {
        let mut generator = SchemaGenerator::new(registry(vec![class(
            "Order",
            vec![typed("customer", "Customer")],
        )]));

        let schema = generator.generate_from_class("Order").unwrap();

        assert_eq!(schema["properties"]["customer"], json!({"type": "object"}));
    }

    #[test]
    fn test_unknown_root_class_is_unresolved() {
        let mut generator = SchemaGenerator::without_classes();
        let result = generator.generate_from_class("Missing");
        assert!(matches!(result, Err(Error::UnresolvedReference(name)) if name == "Missing"));
    }

    #[test]
    fn test_generate_from_type() {
        let mut generator = SchemaGenerator::without_classes();
        let ty = Type::array(ScalarType::String.into(), ScalarType::Integer.into());

        assert_eq!(
            generator.generate_from_type(&ty).unwrap(),
            json!({"type": "object", "additionalProperties": {"type": "integer"}})
        );
    }

    #[test]
    fn test_generate_reference_registers_components() {
        let mut generator = SchemaGenerator::new(registry(vec![class(
            "App\\Models\\User",
            vec![typed("id", "int")],
        )]));

        let schema = generator
            .generate_reference(&Type::parse("?App\\Models\\User[]").unwrap())
            .unwrap();
        assert_eq!(
            schema,
            json!({
                "type": "array",
                "items": {"$ref": "#/components/schemas/User"},
                "nullable": true
            })
        );
        assert!(generator.get_schemas().contains_key("User"));

        let unknown = generator.generate_reference(&Type::object("Invoice")).unwrap();
        assert_eq!(unknown, json!({"type": "object"}));
    }

    #[test]
    fn test_generate_from_rules() {
        let mut generator = SchemaGenerator::without_classes();
        let rules: IndexMap<String, String> = [("email", "required|email")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let schema = generator.generate_from_rules(&rules, Some("StoreUserRequest"));

        assert_eq!(schema["required"], json!(["email"]));
        assert!(generator.get_schemas().contains_key("StoreUserRequest"));
    }

    #[test]
    fn test_generate_parameter() {
        let mut generator = SchemaGenerator::without_classes();

        let path = generator
            .generate_parameter(&ParameterSpec::new("id", Some("int"), false), ParameterLocation::Path)
            .unwrap();
        assert_eq!(
            path,
            json!({"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}})
        );

        let query = generator
            .generate_parameter(&ParameterSpec::new("page", None, false), ParameterLocation::Query)
            .unwrap();
        assert_eq!(query["required"], false);
        assert_eq!(query["schema"], json!({"type": "string"}));
    }

    #[test]
    fn test_clear_cache_does_not_change_results() {
        let code = r#"
            pub struct Node {
                pub value: i32,
                pub next: Option<Box<Node>>,
            }
        "#;

        let mut generator = create_generator_from_code(code);
        let first = generator.generate_from_class("Node").unwrap();
        let memoized = generator.generate_from_class("Node").unwrap();
        generator.clear_cache();
        let regenerated = generator.generate_from_class("Node").unwrap();

        assert_eq!(first, memoized);
        assert_eq!(first, regenerated);
    }

    #[test]
    fn test_external_cache_restores_components() {
        let code = r#"
            pub struct Tag { pub label: String }
            pub struct Article { pub tags: Vec<Tag> }
        "#;
        let cache = MemoryCache::new();

        let mut warm = create_generator_from_code(code).with_cache(cache);
        let schema = warm.generate_from_class("Article").unwrap();
        assert_eq!(warm.get_schemas().len(), 2);

        // A generator without declarations still serves the cached schema
        let mut envelope = MemoryCache::new();
        let key = cache_key("Article");
        let cached = warm.memo.get("Article").unwrap().clone();
        envelope.put(&key, cached, None).unwrap();
        let mut cold = SchemaGenerator::without_classes().with_cache(envelope);

        assert_eq!(cold.generate_from_class("Article").unwrap(), schema);
        assert!(cold.get_schemas().contains_key("Tag"));
    }

    #[test]
    fn test_broken_cache_is_a_miss() {
        let mut generator = SchemaGenerator::new(registry(vec![class(
            "Ping",
            vec![typed("ok", "bool")],
        )]))
        .with_cache(BrokenCache);

        let schema = generator.generate_from_class("Ping").unwrap();
        generator.clear_cache();

        assert_eq!(schema["properties"]["ok"], json!({"type": "boolean"}));
    }

    #[test]
    fn test_classes_sharing_a_basename_get_distinct_components() {
        let mut generator = SchemaGenerator::new(registry(vec![
            class(
                "App\\Models\\User",
                vec![typed("name", "string"), typed("admin", "App\\Admin\\User")],
            ),
            class("App\\Admin\\User", vec![typed("level", "int")]),
        ]));

        let schema = generator.generate_from_class("App\\Models\\User").unwrap();

        assert_eq!(
            schema["properties"]["admin"],
            json!({
                "type": "object",
                "properties": {"level": {"type": "integer"}},
                "required": ["level"]
            })
        );
        let names: Vec<&String> = generator.get_schemas().keys().collect();
        assert_eq!(names, vec!["AdminUser", "User"]);
        assert_eq!(generator.component_for("App\\Models\\User"), Some("User"));
        assert_eq!(generator.component_for("App\\Admin\\User"), Some("AdminUser"));
    }

    #[test]
    fn test_reference_to_second_class_with_taken_basename() {
        let mut generator = SchemaGenerator::new(registry(vec![
            class("App\\Models\\User", vec![typed("name", "string")]),
            class("App\\Admin\\User", vec![typed("level", "int")]),
        ]));

        let first = generator
            .generate_reference(&Type::parse("App\\Models\\User").unwrap())
            .unwrap();
        let second = generator
            .generate_reference(&Type::parse("App\\Admin\\User").unwrap())
            .unwrap();

        assert_eq!(first, json!({"$ref": "#/components/schemas/User"}));
        assert_eq!(second, json!({"$ref": "#/components/schemas/AdminUser"}));
        assert_eq!(
            generator.get_schemas()["AdminUser"]["properties"]["level"],
            json!({"type": "integer"})
        );
    }

    #[test]
    fn test_component_candidates() {
        assert_eq!(
            component_candidates("\\App\\Admin\\User"),
            vec!["User", "AdminUser", "AppAdminUser"]
        );
        assert_eq!(component_candidates("crate::models::Post"), vec!["Post", "modelsPost", "cratemodelsPost"]);
    }
}
