use crate::error::{Error, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Parses Rust source into syntax trees for declaration lookup.
///
/// # Example
///
/// ```no_run
/// use openapi_scribe::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("src/models.rs")).unwrap();
/// println!("Parsed {} items", parsed.syntax_tree.items.len());
/// ```
pub struct AstParser;

/// A parsed source file
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Read and parse one file.
    ///
    /// # Errors
    ///
    /// `IoError` when the file cannot be read, `ParseError` (carrying the path) when
    /// it is not valid Rust.
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse_source(&content, path)
    }

    /// Parse in-memory source, attributing it to `path`
    pub fn parse_source(content: &str, path: &Path) -> Result<ParsedFile> {
        let syntax_tree = syn::parse_file(content).map_err(|e| Error::ParseError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }

    /// Parse every file, keeping the ones that parse. Failures are logged and skipped
    /// so that one broken file does not hide the declarations of the others.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<ParsedFile> {
        let mut parsed = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::parse_file(path) {
                Ok(file) => parsed.push(file),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        debug!(
            "Parsing complete: {} succeeded, {} failed",
            parsed.len(),
            paths.len() - parsed.len()
        );
        parsed
    }
}
