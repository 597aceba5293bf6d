//! Finding and parsing the Rust sources of a project.

use crate::error::{Error, Result};
use crate::reader::{ReadResult, SourceReader};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively collects `.rs` files under a project directory.
///
/// The `target` directory and hidden directories (those starting with `.`)
/// are skipped. Files are returned in a stable, name-sorted order so that
/// the generated document does not depend on directory iteration order.
///
/// # Example
///
/// ```no_run
/// use openapi_from_annotations::source::SourceScanner;
/// use std::path::PathBuf;
///
/// let scanner = SourceScanner::new(PathBuf::from("./my-service"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} Rust files", result.rust_files.len());
/// ```
pub struct SourceScanner {
    root_path: PathBuf,
}

/// Result of a directory scan
pub struct ScanResult {
    /// Paths of all discovered `.rs` files
    pub rust_files: Vec<PathBuf>,
    /// Inaccessible entries, reported but not fatal
    pub warnings: Vec<String>,
}

impl SourceScanner {
    /// # Arguments
    ///
    /// * `root_path` - The root directory to scan for Rust files
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Walk the directory tree and collect all `.rs` files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the root itself is not a readable directory.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("not a directory: {}", self.root_path.display()),
            )));
        }

        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        let walker = WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            });

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                        rust_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        debug!(
            "Scanned {}: {} Rust files",
            self.root_path.display(),
            rust_files.len()
        );
        Ok(ScanResult {
            rust_files,
            warnings,
        })
    }
}

/// A successfully parsed Rust file
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub syntax_tree: syn::File,
}

/// Parse a single Rust source file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read and [`Error::Parse`]
/// if it is not valid Rust.
pub fn parse_file(path: &Path) -> Result<ParsedFile> {
    debug!("Parsing file: {}", path.display());
    let content = fs::read_to_string(path)?;
    let syntax_tree = syn::parse_file(&content).map_err(|e| Error::Parse {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(ParsedFile {
        path: path.to_path_buf(),
        syntax_tree,
    })
}

/// The parsed files of a project
#[derive(Debug, Default)]
pub struct SourceSet {
    pub files: Vec<ParsedFile>,
    /// One entry per file that failed to read or parse
    pub warnings: Vec<String>,
}

impl SourceSet {
    /// Parse every path, continuing past files that fail
    pub fn parse(paths: &[PathBuf]) -> Self {
        let mut set = SourceSet::default();
        for path in paths {
            match parse_file(path) {
                Ok(parsed) => set.files.push(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    set.warnings.push(e.to_string());
                }
            }
        }
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            set.files.len(),
            set.warnings.len()
        );
        set
    }

    /// Scan a project directory and parse what was found
    pub fn from_dir(root: &Path) -> Result<Self> {
        let scan = SourceScanner::new(root.to_path_buf()).scan()?;
        let mut set = Self::parse(&scan.rust_files);
        set.warnings.extend(scan.warnings);
        Ok(set)
    }

    /// Run the source reader over every file
    pub fn read(&self) -> Result<ReadResult> {
        let mut reader = SourceReader::new();
        for file in &self.files {
            reader.read_file(&file.path, &file.syntax_tree)?;
        }
        Ok(reader.finish())
    }
}
