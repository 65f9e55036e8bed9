//! Analyzer input: the records the document pipeline consumes and the narrow
//! interfaces that produce them.
//!
//! Framework adapters live outside this crate. They only have to satisfy one of
//! the source traits:
//!
//! - [`RouteSource`] - registered routes (`path`, `method`, `controller`, ...)
//! - [`ControllerSource`] - controller actions and their parameters/docblocks
//! - [`ValidationRuleSource`] - pipe-delimited validation rules per route
//! - [`ClassSource`] - class/struct declarations used for schema generation
//!
//! [`JsonSource`] implements the first three over the JSON document analyzers emit,
//! and [`ClassRegistry`] is an in-memory [`ClassSource`].

use crate::error::{Error, Result};
use crate::types::{component_name, Type};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Produces the routes of the analysed application
pub trait RouteSource {
    fn routes(&self) -> Result<Vec<RouteInfo>>;
}

/// Looks up controller actions
pub trait ControllerSource {
    fn controller(&self, class: &str, method: &str) -> Option<ControllerInfo>;
}

/// Supplies validation rules (field -> `"required|string|max:100"`) for a route
pub trait ValidationRuleSource {
    fn rules_for(&self, route: &RouteInfo) -> IndexMap<String, String>;
}

/// Resolves class declarations by name
pub trait ClassSource {
    fn find_class(&mut self, name: &str) -> Option<ClassDef>;
}

/// HTTP methods an operation can be registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Lowercase verb, as used for keys of an OpenAPI path item
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "OPTIONS" => Ok(HttpMethod::Options),
            "HEAD" => Ok(HttpMethod::Head),
            other => Err(Error::StructuralError(format!(
                "unknown HTTP method `{}`",
                other
            ))),
        }
    }
}

/// Where a parameter value is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

/// A parameter as reported by an analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    /// Type expression (`int`, `?string`, `User[]`)
    #[serde(rename = "type", default)]
    pub type_expr: Option<String>,
    /// Explicit location; when absent it is derived from the route path
    #[serde(rename = "in", default)]
    pub location: Option<ParameterLocation>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ParameterSpec {
    pub fn new(name: &str, type_expr: Option<&str>, required: bool) -> Self {
        Self {
            name: name.to_string(),
            required,
            type_expr: type_expr.map(str::to_string),
            location: None,
            description: None,
        }
    }
}

/// A registered route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInfo {
    /// URL pattern (`/users/{id}`, `/users/:id`, `/users/{id?}`)
    pub path: String,
    pub method: HttpMethod,
    /// `Class@action` or `Class::action`
    pub controller: Option<String>,
    /// Route name
    pub name: Option<String>,
    pub middleware: Vec<String>,
    pub parameters: Vec<ParameterSpec>,
    /// Validation rules of the request body, field -> rule string
    pub rules: IndexMap<String, String>,
    /// Type expression of the successful response body
    pub response: Option<String>,
    pub description: Option<String>,
}

impl RouteInfo {
    /// Create a new RouteInfo with minimal required fields
    pub fn new(path: &str, method: HttpMethod) -> Self {
        Self {
            path: path.to_string(),
            method,
            controller: None,
            name: None,
            middleware: Vec::new(),
            parameters: Vec::new(),
            rules: IndexMap::new(),
            response: None,
            description: None,
        }
    }

    pub fn with_controller(mut self, controller: &str) -> Self {
        self.controller = Some(controller.to_string());
        self
    }

    /// Controller class part of `controller`
    pub fn controller_class(&self) -> Option<&str> {
        self.controller
            .as_deref()
            .map(|c| split_controller(c).0)
            .filter(|class| !class.is_empty())
    }

    /// Action part of `controller`; invokable controllers default to `__invoke`
    pub fn controller_action(&self) -> Option<&str> {
        self.controller
            .as_deref()
            .map(|c| split_controller(c).1.unwrap_or("__invoke"))
    }
}

fn split_controller(controller: &str) -> (&str, Option<&str>) {
    if let Some((class, action)) = controller.split_once('@') {
        return (class, Some(action));
    }
    if let Some((class, action)) = controller.rsplit_once("::") {
        // `App\Http\UserController::show`; a Rust path is a class when the tail is capitalized
        if action.chars().next().map_or(false, |c| !c.is_ascii_uppercase()) {
            return (class, Some(action));
        }
    }
    (controller, None)
}

/// A controller action as reported by an analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerInfo {
    pub class: String,
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub docblock: Option<String>,
}

/// A class, struct or enum declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub kind: ClassKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassKind {
    /// Public properties in declaration order
    Struct(Vec<PropertyDef>),
    /// Enum cases, serialized as strings
    Enum(Vec<String>),
}

/// A public property of a class
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Serialized name
    pub name: String,
    /// Declared type; `None` for untyped properties
    pub ty: Option<Type>,
    /// Raw doc comment attached to the property
    pub doc: Option<String>,
    /// Inline the properties of the property's class into the parent
    pub flatten: bool,
}

impl PropertyDef {
    pub fn new(name: &str, ty: Option<Type>) -> Self {
        Self {
            name: name.to_string(),
            ty,
            doc: None,
            flatten: false,
        }
    }
}

/// In-memory class declarations
#[derive(Debug, Default, Clone)]
pub struct ClassRegistry {
    classes: IndexMap<String, ClassDef>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: ClassDef) -> &mut Self {
        debug!("Registering class {}", class.name);
        self.classes.insert(class.name.clone(), class);
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassSource for ClassRegistry {
    fn find_class(&mut self, name: &str) -> Option<ClassDef> {
        let name = name.trim_start_matches('\\');
        if let Some(class) = self.classes.get(name) {
            return Some(class.clone());
        }
        let short = component_name(name);
        self.classes
            .values()
            .find(|class| component_name(&class.name) == short)
            .cloned()
    }
}

/// Lets several class sources be consulted in order
impl<A: ClassSource, B: ClassSource> ClassSource for (A, B) {
    fn find_class(&mut self, name: &str) -> Option<ClassDef> {
        self.0.find_class(name).or_else(|| self.1.find_class(name))
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzerInput {
    #[serde(default)]
    routes: Vec<RawRoute>,
    #[serde(default)]
    controllers: Vec<ControllerInfo>,
    #[serde(default)]
    classes: Vec<RawClass>,
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    path: String,
    /// `GET`, or several verbs joined with `|`
    method: String,
    #[serde(default)]
    controller: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    middleware: Vec<String>,
    #[serde(default)]
    parameters: Vec<ParameterSpec>,
    #[serde(default)]
    rules: IndexMap<String, String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClass {
    name: String,
    #[serde(default)]
    properties: IndexMap<String, RawProperty>,
    #[serde(rename = "enum", default)]
    cases: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawProperty {
    Type(Option<String>),
    Detailed {
        #[serde(rename = "type", default)]
        type_expr: Option<String>,
        #[serde(default)]
        doc: Option<String>,
    },
}

/// Analyzer output read from JSON
#[derive(Debug, Default)]
pub struct JsonSource {
    routes: Vec<RouteInfo>,
    controllers: Vec<ControllerInfo>,
    classes: ClassRegistry,
}

impl JsonSource {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading analyzer output from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let input: AnalyzerInput = serde_json::from_str(content)?;

        let mut routes = Vec::new();
        for raw in input.routes {
            routes.extend(expand_route(raw)?);
        }

        let mut classes = ClassRegistry::new();
        for raw in input.classes {
            classes.register(convert_class(raw)?);
        }

        debug!(
            "Loaded {} routes, {} controllers, {} classes",
            routes.len(),
            input.controllers.len(),
            classes.len()
        );

        Ok(Self {
            routes,
            controllers: input.controllers,
            classes,
        })
    }

    /// Class declarations embedded in the analyzer output
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }
}

impl RouteSource for JsonSource {
    fn routes(&self) -> Result<Vec<RouteInfo>> {
        Ok(self.routes.clone())
    }
}

impl ControllerSource for JsonSource {
    fn controller(&self, class: &str, method: &str) -> Option<ControllerInfo> {
        let class = class.trim_start_matches('\\');
        self.controllers
            .iter()
            .find(|c| c.class.trim_start_matches('\\') == class && c.method == method)
            .cloned()
    }
}

impl ValidationRuleSource for JsonSource {
    fn rules_for(&self, route: &RouteInfo) -> IndexMap<String, String> {
        route.rules.clone()
    }
}

/// One route per verb. `HEAD` is dropped when it only shadows `GET`.
fn expand_route(raw: RawRoute) -> Result<Vec<RouteInfo>> {
    let methods = raw
        .method
        .split('|')
        .map(HttpMethod::from_str)
        .collect::<Result<Vec<_>>>()?;
    let has_get = methods.contains(&HttpMethod::Get);

    Ok(methods
        .into_iter()
        .filter(|method| !(has_get && *method == HttpMethod::Head))
        .map(|method| RouteInfo {
            path: raw.path.clone(),
            method,
            controller: raw.controller.clone(),
            name: raw.name.clone(),
            middleware: raw.middleware.clone(),
            parameters: raw.parameters.clone(),
            rules: raw.rules.clone(),
            response: raw.response.clone(),
            description: raw.description.clone(),
        })
        .collect())
}

fn convert_class(raw: RawClass) -> Result<ClassDef> {
    if let Some(cases) = raw.cases {
        return Ok(ClassDef {
            name: raw.name,
            kind: ClassKind::Enum(cases),
        });
    }

    let mut properties = Vec::new();
    for (name, property) in raw.properties {
        let (type_expr, doc) = match property {
            RawProperty::Type(type_expr) => (type_expr, None),
            RawProperty::Detailed { type_expr, doc } => (type_expr, doc),
        };
        let ty = type_expr.as_deref().map(Type::parse).transpose()?;
        let mut property = PropertyDef::new(&name, ty);
        property.doc = doc;
        properties.push(property);
    }

    Ok(ClassDef {
        name: raw.name.trim_start_matches('\\').to_string(),
        kind: ClassKind::Struct(properties),
    })
}
