//! openapi-scribe - OpenAPI documentation from analyzer metadata.
//!
//! This library turns the structured metadata produced by route and controller
//! analyzers (routes, parameters, validation rules, class declarations) into an
//! OpenAPI 3.0 document, serialized as JSON or YAML.
//!
//! # Architecture
//!
//! The library is organized into several modules that work together:
//!
//! 1. [`types`] - The type model and its schema rendering
//! 2. [`inference`] - Infers types from runtime values and annotations
//! 3. [`docblock`] - Parses `@param`/`@return`/`@var` docblocks
//! 4. [`source`] - Analyzer records and the traits that supply them
//! 5. [`scanner`], [`parser`], [`type_resolver`] - Reflect Rust structs and enums as classes
//! 6. [`rules`] - Converts validation rules to schemas
//! 7. [`schema_generator`] - Produces schema fragments from specs, classes and types
//! 8. [`document_builder`] - Assembles paths, components and tags
//! 9. [`generator`] - Merges fragments into the final document
//! 10. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```
//! use openapi_scribe::{
//!     config::GeneratorConfig,
//!     generator::OpenApiGenerator,
//!     schema_generator::SchemaGenerator,
//!     serializer::serialize_yaml,
//!     source::JsonSource,
//! };
//!
//! let input = JsonSource::from_json(r#"{
//!     "routes": [{"path": "/users/{id}", "method": "GET", "response": "User"}],
//!     "classes": [{"name": "User", "properties": {"id": "int", "name": "string"}}]
//! }"#).unwrap();
//!
//! let mut schema_gen = SchemaGenerator::new(input.classes().clone());
//! let mut generator = OpenApiGenerator::new(GeneratorConfig::default());
//! let document = generator
//!     .generate_from_sources(&input, &input, &input, &mut schema_gen)
//!     .unwrap();
//!
//! let yaml = serialize_yaml(&document).unwrap();
//! assert!(yaml.contains("/users/{id}"));
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cache;
pub mod cli;
pub mod config;
pub mod docblock;
pub mod document_builder;
pub mod error;
pub mod generator;
pub mod inference;
pub mod parser;
pub mod rules;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod source;
pub mod type_resolver;
pub mod types;
