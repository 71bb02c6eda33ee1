//! Installed package metadata.
//!
//! A [`MetadataLookup`] answers one question: which version of a package is
//! installed under a given name. [`SitePackagesRegistry`] answers it from the
//! `*.dist-info` / `*.egg-info` entries of a Python search path and
//! [`InMemoryRegistry`] from a fixed table.

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("valid separator pattern"));

/// Canonical form of a distribution name: lowercase, with every run of
/// `-`, `_` and `.` collapsed to a single `-`
pub fn normalize_name(name: &str) -> String {
    SEPARATOR_RUN.replace_all(name, "-").to_lowercase()
}

/// Source of installed package versions
pub trait MetadataLookup {
    /// Version of the installed distribution called `name`, if any
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Fixed name to version table
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    versions: HashMap<String, String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, name: &str, version: &str) -> Self {
        self.insert(name, version);
        self
    }

    pub fn insert(&mut self, name: &str, version: &str) {
        self.versions
            .insert(normalize_name(name), version.to_string());
    }
}

impl MetadataLookup for InMemoryRegistry {
    fn resolve(&self, name: &str) -> Option<String> {
        self.versions.get(&normalize_name(name)).cloned()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for InMemoryRegistry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (name, version) in iter {
            registry.insert(name.as_ref(), version.as_ref());
        }
        registry
    }
}

/// An installed distribution found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledDistribution {
    pub name: String,
    pub version: String,
    pub location: PathBuf,
}

/// Index of the distributions installed in a list of search path directories
#[derive(Debug, Clone, Default)]
pub struct SitePackagesRegistry {
    distributions: HashMap<String, InstalledDistribution>,
}

impl SitePackagesRegistry {
    /// Index every metadata entry directly inside `dirs`.
    ///
    /// Directories are searched in order and the first distribution found
    /// under a name wins. Missing or unreadable directories are skipped.
    pub fn from_dirs<P: AsRef<Path>>(dirs: &[P]) -> Self {
        let mut distributions = HashMap::new();

        for dir in dirs {
            let Ok(entries) = fs::read_dir(dir.as_ref()) else {
                continue;
            };

            let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
            paths.sort();

            for path in paths {
                if let Some(dist) = read_distribution(&path) {
                    distributions
                        .entry(normalize_name(&dist.name))
                        .or_insert(dist);
                }
            }
        }

        Self { distributions }
    }

    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&InstalledDistribution> {
        self.distributions.get(&normalize_name(name))
    }
}

impl MetadataLookup for SitePackagesRegistry {
    fn resolve(&self, name: &str) -> Option<String> {
        self.get(name).map(|d| d.version.clone())
    }
}

/// Read name and version from a `.dist-info` or `.egg-info` entry
fn read_distribution(path: &Path) -> Option<InstalledDistribution> {
    let file_name = path.file_name()?.to_str()?;

    let (stem, metadata_file) = if let Some(stem) = file_name.strip_suffix(".dist-info") {
        (stem, path.join("METADATA"))
    } else if let Some(stem) = file_name.strip_suffix(".egg-info") {
        if path.is_dir() {
            (stem, path.join("PKG-INFO"))
        } else {
            (stem, path.to_path_buf())
        }
    } else {
        return None;
    };

    let (mut name, mut version) = fs::read_to_string(&metadata_file)
        .map(|text| parse_headers(&text))
        .unwrap_or_default();

    // Fall back to `<name>-<version>[-<tags>]` from the entry name
    if name.is_none() || version.is_none() {
        let mut parts = stem.splitn(3, '-');
        let stem_name = parts.next().filter(|s| !s.is_empty());
        let stem_version = parts.next().filter(|s| !s.is_empty());
        name = name.or_else(|| stem_name.map(String::from));
        version = version.or_else(|| stem_version.map(String::from));
    }

    Some(InstalledDistribution {
        name: name?,
        version: version?,
        location: path.to_path_buf(),
    })
}

/// Extract the `Name` and `Version` headers of a core metadata document
fn parse_headers(text: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut version = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if key.eq_ignore_ascii_case("name") && name.is_none() {
            name = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("version") && version.is_none() {
            version = Some(value.to_string());
        }
    }

    (name, version)
}
