use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use crate::output::ManifestFormat;

/// Top-level importable name (first segment of a dotted import path)
pub type ModuleName = String;

/// Deduplicated, deterministically ordered set of collected modules
pub type ModuleSet = BTreeSet<ModuleName>;

/// Resolved module versions, iterated in name order
pub type DependencyMapping = BTreeMap<ModuleName, Version>;

/// A single import reference found in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// Dotted module path without any leading dots (empty for `from . import x`)
    pub module: String,
    /// Relative import level (number of leading dots, 0 for absolute)
    pub level: usize,
}

impl ImportStatement {
    pub fn is_relative(&self) -> bool {
        self.level > 0
    }

    /// First segment of the module path, `None` for relative imports
    pub fn top_level(&self) -> Option<&str> {
        if self.is_relative() {
            return None;
        }
        self.module.split('.').next().filter(|s| !s.is_empty())
    }
}

/// Installed version of a module, or the `Unknown` sentinel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    Known(String),
    Unknown,
}

impl Version {
    pub fn as_known(&self) -> Option<&str> {
        match self {
            Version::Known(v) => Some(v),
            Version::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Version::Unknown)
    }
}

impl From<Option<String>> for Version {
    fn from(value: Option<String>) -> Self {
        value.map_or(Version::Unknown, Version::Known)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Known(v) => f.write_str(v),
            Version::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Summary of one generator run
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub output: PathBuf,
    pub format: ManifestFormat,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub dependencies: usize,
    pub unresolved: usize,
    pub duration_ms: u64,
}
