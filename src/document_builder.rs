use crate::config::GeneratorConfig;
use crate::error::{Error, Result};
use crate::rules::FieldRules;
use crate::schema_generator::SchemaGenerator;
use crate::serializer::{serialize_json, serialize_yaml};
use crate::source::{HttpMethod, ParameterLocation, ParameterSpec, RouteInfo};
use crate::types::{component_name, Type};
use log::{debug, warn};
use serde_json::{json, Map, Value};
use std::cell::Cell;
use std::collections::HashSet;

/// Security scheme required by routes behind authentication middleware
const AUTH_SCHEME: &str = "bearerAuth";

/// Lifecycle of a [`DocumentBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    /// Only the defaults are present
    Empty,
    /// At least one `add_*`/`set_*` call was made
    Building,
    /// A snapshot was taken; further mutation moves back to `Building`
    Finalized,
}

/// OpenAPI document builder
///
/// Accumulates paths, components and tags into one insertion-ordered document.
/// Every mutator returns the builder for chaining.
///
/// # Example
///
/// ```
/// use openapi_scribe::config::GeneratorConfig;
/// use openapi_scribe::document_builder::DocumentBuilder;
/// use serde_json::json;
///
/// let mut builder = DocumentBuilder::new(&GeneratorConfig::default());
/// builder
///     .add_path("/users", "GET", json!({"responses": {"200": {"description": "OK"}}}))
///     .add_tag(json!({"name": "Users"}));
/// let document = builder.document();
/// assert!(document["paths"]["/users"]["get"].is_object());
/// ```
pub struct DocumentBuilder {
    document: Map<String, Value>,
    state: Cell<BuilderState>,
}

impl DocumentBuilder {
    pub fn new(config: &GeneratorConfig) -> Self {
        debug!("Initializing DocumentBuilder");
        let mut info = Map::new();
        info.insert("title".to_string(), json!(config.title));
        info.insert("version".to_string(), json!(config.version));
        if let Some(description) = &config.description {
            info.insert("description".to_string(), json!(description));
        }

        let mut document = Map::new();
        document.insert("openapi".to_string(), json!(config.openapi_version));
        document.insert("info".to_string(), Value::Object(info));
        if !config.servers.is_empty() {
            let servers: Vec<Value> = config
                .servers
                .iter()
                .map(|server| server_object(&server.url, server.description.as_deref()))
                .collect();
            document.insert("servers".to_string(), Value::Array(servers));
        }
        document.insert("paths".to_string(), json!({}));

        Self {
            document,
            state: Cell::new(BuilderState::Empty),
        }
    }

    /// Replace the info block
    pub fn with_info(mut self, title: &str, version: &str, description: Option<&str>) -> Self {
        let mut info = json!({"title": title, "version": version});
        if let Some(description) = description {
            info["description"] = json!(description);
        }
        self.document.insert("info".to_string(), info);
        self
    }

    pub fn state(&self) -> BuilderState {
        self.state.get()
    }

    /// Register `operation` under `paths[path][method]`. The method is lowercased; an
    /// existing operation for the same pair is replaced.
    pub fn add_path(&mut self, path: &str, method: &str, operation: Value) -> &mut Self {
        let method = method.to_ascii_lowercase();
        debug!("Adding operation: {} {}", method, path);

        let paths = object_entry(&mut self.document, "paths");
        let path_item = paths
            .entry(path.to_string())
            .or_insert_with(|| json!({}));
        match path_item {
            Value::Object(operations) => {
                operations.insert(method, operation);
            }
            // Reported as a structural error on serialization
            other => debug!("Path item for {} is not a mapping: {}", path, other),
        }
        self.touch()
    }

    pub fn add_schema(&mut self, name: &str, schema: Value) -> &mut Self {
        self.add_component("schemas", name, schema)
    }

    pub fn add_parameter(&mut self, name: &str, parameter: Value) -> &mut Self {
        self.add_component("parameters", name, parameter)
    }

    pub fn add_response(&mut self, name: &str, response: Value) -> &mut Self {
        self.add_component("responses", name, response)
    }

    pub fn add_security_scheme(&mut self, name: &str, scheme: Value) -> &mut Self {
        self.add_component("securitySchemes", name, scheme)
    }

    /// Append a tag unless one with the same `name` is already present
    pub fn add_tag(&mut self, tag: Value) -> &mut Self {
        let tags = self
            .document
            .entry("tags")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(tags) = tags {
            let name = tag.get("name").cloned();
            let duplicate = name.is_some() && tags.iter().any(|t| t.get("name") == name.as_ref());
            if duplicate {
                debug!("Tag {:?} already present", name);
            } else {
                tags.push(tag);
            }
        }
        self.touch()
    }

    /// Replace the document-level security requirements
    pub fn set_security(&mut self, requirements: Vec<Value>) -> &mut Self {
        self.document
            .insert("security".to_string(), Value::Array(requirements));
        self.touch()
    }

    pub fn add_server(&mut self, url: &str, description: Option<&str>) -> &mut Self {
        let servers = self
            .document
            .entry("servers")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(servers) = servers {
            servers.push(server_object(url, description));
        }
        self.touch()
    }

    /// Copy every schema registered by `schema_gen` into `components.schemas`
    pub fn merge_schemas(&mut self, schema_gen: &SchemaGenerator) -> &mut Self {
        for (name, schema) in schema_gen.get_schemas() {
            self.add_component("schemas", name, schema.clone());
        }
        self
    }

    /// Convert an analyzer route into an operation.
    ///
    /// `:id` and `{id?}` segments become `{id}` path parameters; parameters not in the
    /// path go to the query string. Validation rules describe the request body, or the
    /// query string for `GET`/`HEAD`. The controller basename tags the operation and,
    /// with the action, names it uniquely. Routes behind `auth` middleware require
    /// the bearer security scheme.
    pub fn add_route(&mut self, route: &RouteInfo, schema_gen: &mut SchemaGenerator) -> Result<&mut Self> {
        let method = route.method.as_str();
        debug!("Adding route: {} {}", method, route.path);

        let (openapi_path, path_params) = Self::convert_path_format(&route.path);
        let mut operation = Map::new();

        if let Some(tag) = route.controller_class().map(controller_tag) {
            operation.insert("tags".to_string(), json!([tag]));
            self.add_tag(json!({"name": tag}));
        }
        if let Some(name) = &route.name {
            operation.insert("summary".to_string(), json!(name));
        }
        if let Some(description) = &route.description {
            operation.insert("description".to_string(), json!(description));
        }
        if let Some(base) = operation_id(route) {
            let operation_id = self.unique_operation_id(base, &openapi_path, method);
            operation.insert("operationId".to_string(), json!(operation_id));
        }
        if route.middleware.iter().any(|m| is_auth_middleware(m)) {
            let mut requirement = Map::new();
            requirement.insert(AUTH_SCHEME.to_string(), json!([]));
            operation.insert("security".to_string(), json!([requirement]));
            let registered = self
                .document
                .get("components")
                .and_then(|components| components.get("securitySchemes"))
                .and_then(|schemes| schemes.get(AUTH_SCHEME))
                .is_some();
            if !registered {
                self.add_security_scheme(AUTH_SCHEME, json!({"type": "http", "scheme": "bearer"}));
            }
        }

        let mut parameters = Vec::new();
        for name in &path_params {
            let mut spec = route
                .parameters
                .iter()
                .find(|p| &p.name == name)
                .cloned()
                .unwrap_or_else(|| ParameterSpec::new(name, None, true));
            // The template decides: a segment is a path parameter whatever `in` says
            spec.location = Some(ParameterLocation::Path);
            parameters.push(schema_gen.generate_parameter(&spec, ParameterLocation::Path)?);
        }
        for spec in route.parameters.iter().filter(|p| !path_params.contains(&p.name)) {
            if spec.location == Some(ParameterLocation::Path) {
                warn!(
                    "Parameter {} is not in the path template of {}, skipping",
                    spec.name, route.path
                );
                continue;
            }
            parameters.push(schema_gen.generate_parameter(spec, ParameterLocation::Query)?);
        }

        let body_less = matches!(route.method, HttpMethod::Get | HttpMethod::Head);
        if !route.rules.is_empty() {
            if body_less {
                for (field, rules) in route.rules.iter().filter(|(field, _)| !field.contains('.')) {
                    let parsed = FieldRules::parse(rules);
                    parameters.push(json!({
                        "name": field,
                        "in": "query",
                        "required": parsed.required,
                        "schema": Value::Object(parsed.schema),
                    }));
                }
            } else {
                let schema = schema_gen.generate_from_rules(&route.rules, None);
                operation.insert(
                    "requestBody".to_string(),
                    json!({"required": true, "content": {"application/json": {"schema": schema}}}),
                );
            }
        }

        if !parameters.is_empty() {
            operation.insert("parameters".to_string(), Value::Array(parameters));
        }

        let mut response = json!({"description": "Successful response"});
        if let Some(expr) = &route.response {
            let schema = schema_gen.generate_reference(&Type::parse(expr)?)?;
            response["content"] = json!({"application/json": {"schema": schema}});
        }
        operation.insert("responses".to_string(), json!({"200": response}));

        Ok(self.add_path(&openapi_path, method, Value::Object(operation)))
    }

    /// `base`, qualified by the method and then a counter while another operation
    /// already uses it. The operation at `path`/`method` itself is about to be
    /// replaced and does not count.
    fn unique_operation_id(&self, base: String, path: &str, method: &str) -> String {
        let method = method.to_ascii_lowercase();
        let mut used = HashSet::new();
        if let Some(paths) = self.document.get("paths").and_then(Value::as_object) {
            for (item_path, item) in paths {
                let Some(operations) = item.as_object() else {
                    continue;
                };
                for (item_method, op) in operations {
                    if item_path == path && *item_method == method {
                        continue;
                    }
                    if let Some(id) = op.get("operationId").and_then(Value::as_str) {
                        used.insert(id.to_string());
                    }
                }
            }
        }

        if !used.contains(&base) {
            return base;
        }
        let qualified = format!("{}.{}", base, method);
        if !used.contains(&qualified) {
            return qualified;
        }
        (2..)
            .map(|n| format!("{}{}", qualified, n))
            .find(|id| !used.contains(id))
            .unwrap_or(qualified)
    }

    /// Convert `:param` and `{param?}` segments to `{param}`, returning the path and
    /// the parameter names in order
    fn convert_path_format(path: &str) -> (String, Vec<String>) {
        let mut names = Vec::new();
        let converted: Vec<String> = path
            .split('/')
            .map(|part| {
                let name = if let Some(name) = part.strip_prefix(':') {
                    Some(name)
                } else {
                    part.strip_prefix('{')
                        .and_then(|p| p.strip_suffix('}'))
                        .map(|p| p.trim_end_matches('?'))
                };
                match name {
                    Some(name) if !name.is_empty() => {
                        names.push(name.to_string());
                        format!("{{{}}}", name)
                    }
                    _ => part.to_string(),
                }
            })
            .collect();

        (converted.join("/"), names)
    }

    /// Snapshot of the current document
    pub fn document(&self) -> Value {
        self.state.set(BuilderState::Finalized);
        Value::Object(self.document.clone())
    }

    pub fn into_document(self) -> Value {
        Value::Object(self.document)
    }

    /// Serialize the current document; compact output has no whitespace.
    ///
    /// # Errors
    ///
    /// `StructuralError` when a path item or an operation is not a mapping.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        self.validate()?;
        serialize_json(&self.document(), pretty)
    }

    pub fn to_yaml(&self) -> Result<String> {
        self.validate()?;
        serialize_yaml(&self.document())
    }

    fn validate(&self) -> Result<()> {
        let Some(paths) = self.document.get("paths").and_then(Value::as_object) else {
            return Err(Error::StructuralError("`paths` must be a mapping".to_string()));
        };

        for (path, item) in paths {
            let Some(operations) = item.as_object() else {
                return Err(Error::StructuralError(format!(
                    "path item `{}` must be a mapping",
                    path
                )));
            };
            if let Some((method, _)) = operations.iter().find(|(_, op)| !op.is_object()) {
                return Err(Error::StructuralError(format!(
                    "operation `{} {}` must be a mapping",
                    method, path
                )));
            }
        }
        Ok(())
    }

    fn add_component(&mut self, kind: &str, name: &str, definition: Value) -> &mut Self {
        debug!("Adding component {}/{}", kind, name);
        let components = object_entry(&mut self.document, "components");
        object_entry(components, kind).insert(name.to_string(), definition);
        self.touch()
    }

    fn touch(&mut self) -> &mut Self {
        self.state.set(BuilderState::Building);
        self
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new(&GeneratorConfig::default())
    }
}

/// The mapping stored under `key`, created (or replacing a non-mapping) on first use
fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = map.entry(key).or_insert_with(|| json!({}));
    if !entry.is_object() {
        *entry = json!({});
    }
    match entry {
        Value::Object(inner) => inner,
        _ => unreachable!("entry was just replaced by a mapping"),
    }
}

fn server_object(url: &str, description: Option<&str>) -> Value {
    let mut server = json!({"url": url});
    if let Some(description) = description {
        server["description"] = json!(description);
    }
    server
}

/// `App\Http\Controllers\UserController` -> `User`
fn controller_tag(class: &str) -> String {
    let name = component_name(class);
    match name.strip_suffix("Controller") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => name,
    }
}

/// `user.show` for `UserController@show`; invokable and closure routes use the
/// route name
fn operation_id(route: &RouteInfo) -> Option<String> {
    match (route.controller_class(), route.controller_action()) {
        (Some(class), Some(action)) if action != "__invoke" => {
            let tag = controller_tag(class);
            let mut chars = tag.chars();
            let prefix: String = match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            };
            Some(format!("{}.{}", prefix, action))
        }
        _ => route.name.clone(),
    }
}

/// `auth` or a guarded `auth:<guard>`
fn is_auth_middleware(middleware: &str) -> bool {
    middleware == "auth" || middleware.starts_with("auth:")
}
