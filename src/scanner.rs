use crate::error::{Error, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never descended into
const EXCLUDED_DIRS: &[&str] = &["target", "vendor", "node_modules"];

/// Collects the source files whose declarations feed schema generation.
///
/// Hidden directories and build/dependency directories (`target`, `vendor`,
/// `node_modules`) are skipped. Files are returned sorted so that repeated runs
/// over the same tree see declarations in the same order.
///
/// # Example
///
/// ```no_run
/// use openapi_scribe::scanner::SourceScanner;
///
/// let result = SourceScanner::new("./src").scan().unwrap();
/// println!("Found {} source files", result.files.len());
/// ```
pub struct SourceScanner {
    root_path: PathBuf,
    extension: String,
}

/// Outcome of a scan
pub struct ScanResult {
    /// Matching files, sorted
    pub files: Vec<PathBuf>,
    /// Entries that could not be read; scanning continued past them
    pub warnings: Vec<String>,
}

impl SourceScanner {
    pub fn new<P: AsRef<Path>>(root_path: P) -> Self {
        Self {
            root_path: root_path.as_ref().to_path_buf(),
            extension: "rs".to_string(),
        }
    }

    /// Match files with `extension` instead of `rs`
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Walk the tree below the root.
    ///
    /// # Errors
    ///
    /// Fails when the root itself is missing or not a directory; unreadable entries
    /// below it only produce warnings.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            return Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("not a directory: {}", self.root_path.display()),
            )));
        }

        let mut files = Vec::new();
        let mut warnings = Vec::new();

        let walker = WalkDir::new(&self.root_path)
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && !EXCLUDED_DIRS.contains(&&*file_name)
            });

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let matches = path.extension().and_then(|s| s.to_str())
                        == Some(self.extension.as_str());
                    if path.is_file() && matches {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        files.sort();
        debug!(
            "Scanned {}: {} .{} files",
            self.root_path.display(),
            files.len(),
            self.extension
        );

        Ok(ScanResult { files, warnings })
    }
}
