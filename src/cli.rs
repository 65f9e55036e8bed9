use crate::config::GeneratorConfig;
use crate::generator::OpenApiGenerator;
use crate::parser::AstParser;
use crate::scanner::SourceScanner;
use crate::schema_generator::SchemaGenerator;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::source::JsonSource;
use crate::type_resolver::TypeResolver;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Generate OpenAPI documentation from analyzer output and Rust model declarations
#[derive(Parser, Debug)]
#[command(name = "openapi-scribe")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Analyzer output (routes, controllers, classes) as JSON
    #[arg(value_name = "INPUT_JSON")]
    pub input: PathBuf,

    /// Directory of Rust sources whose structs and enums back class references
    #[arg(short = 's', long = "source", value_name = "SOURCE_DIR")]
    pub source_dir: Option<PathBuf>,

    /// Configuration file (YAML or JSON)
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Emit JSON without indentation
    #[arg(long = "compact")]
    pub compact: bool,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// API title, overriding the configuration
    #[arg(long = "title")]
    pub title: Option<String>,

    /// API version, overriding the configuration
    #[arg(long = "api-version")]
    pub api_version: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.input.is_file() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    if let Some(source_dir) = &args.source_dir {
        if !source_dir.is_dir() {
            anyhow::bail!("Source path is not a directory: {}", source_dir.display());
        }
    }

    if args.compact && args.output_format == OutputFormat::Yaml {
        warn!("--compact only affects JSON output");
    }

    info!("Input: {}", args.input.display());
    info!("Output format: {:?}", args.output_format);
    match &args.output_path {
        Some(output) => info!("Output file: {}", output.display()),
        None => info!("Output: stdout"),
    }

    Ok(args)
}

/// Configuration file contents with command-line overrides applied
pub fn load_config(args: &CliArgs) -> Result<GeneratorConfig> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => GeneratorConfig::default(),
    };

    if let Some(title) = &args.title {
        config.title = title.clone();
    }
    if let Some(version) = &args.api_version {
        config.version = version.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");
    let config = load_config(&args)?;

    // Step 1: Read analyzer output
    let input = JsonSource::from_file(&args.input)
        .with_context(|| format!("Failed to read analyzer output from {}", args.input.display()))?;

    // Step 2: Class declarations, from the input and optionally from Rust sources
    let resolver = match &args.source_dir {
        Some(source_dir) => {
            info!("Scanning source directory...");
            let scan_result = SourceScanner::new(source_dir).scan()?;
            info!("Found {} Rust files", scan_result.files.len());
            for warning in &scan_result.warnings {
                warn!("{}", warning);
            }

            let parsed_files = AstParser::parse_files(&scan_result.files);
            info!("Successfully parsed {} files", parsed_files.len());
            TypeResolver::new(parsed_files)
        }
        None => TypeResolver::new(Vec::new()),
    };
    let mut schema_gen = SchemaGenerator::new((input.classes().clone(), resolver));

    // Step 3: Build and finalize the document
    info!("Building OpenAPI document...");
    let mut generator = OpenApiGenerator::new(config);
    let document = generator
        .generate_from_sources(&input, &input, &input, &mut schema_gen)
        .context("Failed to generate OpenAPI document")?;

    // Step 4: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document, !args.compact)?,
    };

    // Step 5: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    info!("Summary:");
    info!(
        "  - Paths: {}",
        document["paths"].as_object().map_or(0, |paths| paths.len())
    );
    info!("  - Schemas: {}", schema_gen.get_schemas().len());

    Ok(())
}
