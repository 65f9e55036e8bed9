//! openapi-scribe - command-line tool for generating OpenAPI documentation.
//!
//! Reads the JSON emitted by route/controller analyzers, optionally resolves class
//! references against the structs and enums of a Rust source tree, and writes an
//! OpenAPI 3.0 document.
//!
//! # Usage
//!
//! ```bash
//! openapi-scribe [OPTIONS] <INPUT_JSON>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-scribe analyzer.json -o openapi.yaml
//! ```
//!
//! Generate compact JSON, resolving models from `./src`:
//! ```bash
//! openapi-scribe analyzer.json -s ./src -f json --compact -o openapi.json
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-scribe analyzer.json -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_scribe::cli;

fn main() -> Result<()> {
    // Parse once up front so the verbose flag can configure the logger
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-scribe starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
