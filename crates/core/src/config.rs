use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directories holding installed or generated code rather than project sources
const VENDORED_GLOBS: &[&str] = &[
    "**/.venv/**",
    "**/venv/**",
    "**/site-packages/**",
    "**/__pycache__/**",
    "**/.git/**",
    "**/build/**",
    "**/dist/**",
    "**/node_modules/**",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to build glob pattern: {0}")]
    GlobError(#[from] globset::Error),
    #[error("Failed to parse ignore file: {0}")]
    GitignoreError(#[from] ignore::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Configuration for scanning
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: PathBuf,
    /// Additional ignore patterns (glob style)
    pub ignore_patterns: Vec<String>,
    /// Gitignore-style file with further exclusions
    pub ignore_file: Option<PathBuf>,
    /// Skip virtualenvs, caches and build output
    pub skip_vendored: bool,
    /// Follow symbolic links while walking
    pub follow_links: bool,
    /// Drop modules that are defined inside the scanned tree
    pub exclude_local: bool,
    /// Number of threads (0 = auto, 1 = sequential)
    pub threads: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            ignore_patterns: vec![],
            ignore_file: None,
            skip_vendored: false,
            follow_links: false,
            exclude_local: false,
            threads: 1,
        }
    }
}

impl ScanConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_ignore_file(mut self, path: PathBuf) -> Self {
        self.ignore_file = Some(path);
        self
    }

    pub fn with_skip_vendored(mut self, skip: bool) -> Self {
        self.skip_vendored = skip;
        self
    }

    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn with_exclude_local(mut self, exclude: bool) -> Self {
        self.exclude_local = exclude;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

/// Filter for ignoring files and directories
pub struct IgnoreFilter {
    ignore_file: Option<Gitignore>,
    custom_globs: GlobSet,
    vendored: GlobSet,
}

impl IgnoreFilter {
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        let ignore_file = match config.ignore_file {
            Some(ref path) => {
                let mut builder = GitignoreBuilder::new(&config.root);
                if let Some(err) = builder.add(path) {
                    return Err(err.into());
                }
                Some(builder.build()?)
            }
            None => None,
        };

        let mut custom_builder = GlobSetBuilder::new();
        for pattern in &config.ignore_patterns {
            custom_builder.add(Glob::new(pattern)?);
        }
        let custom_globs = custom_builder.build()?;

        let mut vendored_builder = GlobSetBuilder::new();
        if config.skip_vendored {
            for pattern in VENDORED_GLOBS {
                vendored_builder.add(Glob::new(pattern)?);
            }
        }
        let vendored = vendored_builder.build()?;

        Ok(Self {
            ignore_file,
            custom_globs,
            vendored,
        })
    }

    /// Check if a path should be ignored
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let path_str = path.to_string_lossy();

        if self.vendored.is_match(&*path_str) {
            return true;
        }

        if self.custom_globs.is_match(&*path_str) {
            return true;
        }

        if let Some(ref gi) = self.ignore_file {
            if gi.matched_path_or_any_parents(path, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }
}
