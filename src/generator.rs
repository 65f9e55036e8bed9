use crate::config::GeneratorConfig;
use crate::docblock::DocBlock;
use crate::document_builder::DocumentBuilder;
use crate::error::{Error, Result};
use crate::schema_generator::SchemaGenerator;
use crate::serializer::serialize_json;
use crate::source::{ControllerInfo, ControllerSource, RouteInfo, RouteSource, ValidationRuleSource};
use log::{debug, info, warn};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Keys placed first in a generated document, in this order
const LEADING_KEYS: [&str; 4] = ["openapi", "info", "servers", "paths"];

/// Finalizes documents: merges fragments, applies configured defaults and checks
/// that every `$ref` resolves.
///
/// # Example
///
/// ```
/// use openapi_scribe::config::GeneratorConfig;
/// use openapi_scribe::generator::OpenApiGenerator;
/// use serde_json::json;
///
/// let mut generator = OpenApiGenerator::new(GeneratorConfig::default());
/// let document = generator
///     .generate(&[json!({"paths": {"/ping": {"get": {"responses": {}}}}})])
///     .unwrap();
/// assert_eq!(document["openapi"], "3.0.0");
/// assert_eq!(document["info"]["title"], "API Documentation");
/// ```
pub struct OpenApiGenerator {
    config: GeneratorConfig,
    /// Finalized documents keyed by their serialized input
    memo: HashMap<String, Value>,
}

impl OpenApiGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            memo: HashMap::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Merge `fragments` in order into one document.
    ///
    /// Mappings merge recursively, other values are replaced by later fragments and
    /// top-level `tags` are deduplicated by name. Missing `openapi`, `info.title`,
    /// `info.version` and `paths` are filled from the configuration.
    ///
    /// # Errors
    ///
    /// `StructuralError` when a fragment, `info` or `paths` is not a mapping;
    /// `UnresolvedReference` when a `$ref` has no target under `components`.
    pub fn generate(&mut self, fragments: &[Value]) -> Result<Value> {
        let key = serde_json::to_string(fragments)?;
        if let Some(document) = self.memo.get(&key) {
            debug!("Document served from cache");
            return Ok(document.clone());
        }

        let mut merged = Map::new();
        for (index, fragment) in fragments.iter().enumerate() {
            let Value::Object(fragment) = fragment else {
                return Err(Error::StructuralError(format!(
                    "document fragment {} is not a mapping",
                    index
                )));
            };
            merge_into(&mut merged, fragment, true);
        }

        let document = Value::Object(self.apply_defaults(merged)?);
        check_references(&document)?;

        info!(
            "Generated document with {} paths",
            document["paths"].as_object().map_or(0, Map::len)
        );
        self.memo.insert(key, document.clone());
        Ok(document)
    }

    /// [`OpenApiGenerator::generate`] followed by JSON encoding
    pub fn generate_json(&mut self, fragments: &[Value], pretty: bool) -> Result<String> {
        let document = self.generate(fragments)?;
        serialize_json(&document, pretty)
    }

    /// Build a document from analyzer sources.
    ///
    /// Routes take their rules from `rules`. When `controllers` knows a route's
    /// action, its parameters and docblock fill in what the route leaves out.
    pub fn generate_from_sources(
        &mut self,
        routes: &dyn RouteSource,
        controllers: &dyn ControllerSource,
        rules: &dyn ValidationRuleSource,
        schema_gen: &mut SchemaGenerator,
    ) -> Result<Value> {
        let mut builder = DocumentBuilder::new(&self.config);

        for mut route in routes.routes()? {
            let route_rules = rules.rules_for(&route);
            if !route_rules.is_empty() {
                route.rules = route_rules;
            }

            let action = route
                .controller_class()
                .zip(route.controller_action())
                .map(|(class, action)| (class.to_string(), action.to_string()));
            if let Some((class, action)) = action {
                match controllers.controller(&class, &action) {
                    Some(controller) => apply_controller(&mut route, &controller),
                    None => debug!("No controller info for {}@{}", class, action),
                }
            }

            builder.add_route(&route, schema_gen)?;
        }

        builder.merge_schemas(schema_gen);
        self.generate(&[builder.into_document()])
    }

    /// Forget finalized documents; output of later calls is unchanged
    pub fn clear_cache(&mut self) {
        self.memo.clear();
    }

    fn apply_defaults(&self, mut merged: Map<String, Value>) -> Result<Map<String, Value>> {
        let mut document = Map::new();

        let openapi = merged
            .get("openapi")
            .cloned()
            .unwrap_or_else(|| json!(self.config.openapi_version));
        document.insert("openapi".to_string(), openapi);

        let mut info = match merged.get("info") {
            None => Map::new(),
            Some(Value::Object(info)) => info.clone(),
            Some(other) => {
                return Err(Error::StructuralError(format!("`info` must be a mapping, got {}", other)))
            }
        };
        info.entry("title").or_insert_with(|| json!(self.config.title));
        info.entry("version").or_insert_with(|| json!(self.config.version));
        if let Some(description) = &self.config.description {
            info.entry("description").or_insert_with(|| json!(description));
        }
        document.insert("info".to_string(), Value::Object(info));

        match merged.get("servers") {
            Some(servers) => {
                document.insert("servers".to_string(), servers.clone());
            }
            None if !self.config.servers.is_empty() => {
                document.insert("servers".to_string(), serde_json::to_value(&self.config.servers)?);
            }
            None => {}
        }

        let paths = merged.get("paths").cloned().unwrap_or_else(|| json!({}));
        if !paths.is_object() {
            return Err(Error::StructuralError(format!("`paths` must be a mapping, got {}", paths)));
        }
        document.insert("paths".to_string(), paths);

        merged.retain(|key, _| !LEADING_KEYS.contains(&key.as_str()));
        document.extend(merged);
        Ok(document)
    }
}

/// Recursive merge; `tags` at the top level are deduplicated by name
fn merge_into(target: &mut Map<String, Value>, source: &Map<String, Value>, top_level: bool) {
    for (key, value) in source {
        let merged = match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming, false);
                true
            }
            (Some(Value::Array(existing)), Value::Array(incoming)) if top_level && key == "tags" => {
                for tag in incoming {
                    let name = tag.get("name");
                    if name.is_none() || !existing.iter().any(|t| t.get("name") == name) {
                        existing.push(tag.clone());
                    }
                }
                true
            }
            _ => false,
        };
        if !merged {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn check_references(document: &Value) -> Result<()> {
    let mut references = Vec::new();
    collect_references(document, &mut references);

    for reference in references {
        let resolved = reference
            .strip_prefix('#')
            .filter(|pointer| pointer.starts_with("/components/"))
            .and_then(|pointer| document.pointer(pointer));
        if resolved.is_none() {
            return Err(Error::UnresolvedReference(reference.to_string()));
        }
    }
    Ok(())
}

fn collect_references<'a>(value: &'a Value, references: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                match inner {
                    Value::String(reference) if key == "$ref" => references.push(reference),
                    _ => collect_references(inner, references),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, references);
            }
        }
        _ => {}
    }
}

/// Fill gaps of `route` from its controller action
fn apply_controller(route: &mut RouteInfo, controller: &ControllerInfo) {
    for param in &controller.parameters {
        if !route.parameters.iter().any(|p| p.name == param.name) {
            route.parameters.push(param.clone());
        }
    }

    let Some(raw) = controller.docblock.as_deref() else {
        return;
    };
    let doc = DocBlock::parse(raw);

    for param in route.parameters.iter_mut().filter(|p| p.type_expr.is_none()) {
        if let Some(tag) = doc.param(&param.name) {
            param.type_expr = tag.type_expr.clone();
            if param.description.is_none() {
                param.description = tag.description.clone();
            }
        }
    }

    if route.description.is_none() {
        route.description = match (&doc.summary, &doc.description) {
            (Some(summary), Some(description)) => Some(format!("{}\n\n{}", summary, description)),
            (summary, description) => summary.clone().or_else(|| description.clone()),
        };
    }

    if route.response.is_none() {
        match doc.return_type() {
            Ok(Some(_)) => route.response = doc.returns.clone(),
            Ok(None) => {}
            Err(e) => warn!(
                "Ignoring @return of {}::{}: {}",
                controller.class, controller.method, e
            ),
        }
    }
}
