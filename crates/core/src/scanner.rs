use crate::config::{IgnoreFilter, ScanConfig};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::models::{ModuleName, ModuleSet};
use crate::parsers::{ParserError, PythonParser, SOURCE_EXTENSION};
use crate::stdlib::StandardLibrarySet;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("project directory not found: {0}")]
    RootNotFound(PathBuf),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
    #[error("Parser error: {0}")]
    ParserError(#[from] ParserError),
}

/// Third-party modules referenced by a project
#[derive(Debug, Clone, Default)]
pub struct CollectedImports {
    pub modules: ModuleSet,
    pub files_scanned: usize,
    pub files_skipped: usize,
}

/// Result of reading and parsing one source file
enum FileOutcome {
    Parsed(BTreeSet<ModuleName>),
    Unreadable(std::io::Error),
    Malformed(ParserError),
}

/// Walks a project and collects the top-level modules of its absolute imports
pub struct ImportCollector<'a> {
    config: ScanConfig,
    ignore_filter: IgnoreFilter,
    stdlib: &'a StandardLibrarySet,
}

impl<'a> ImportCollector<'a> {
    pub fn new(config: ScanConfig, stdlib: &'a StandardLibrarySet) -> Result<Self, ScanError> {
        let ignore_filter = IgnoreFilter::new(&config)?;
        Ok(Self {
            config,
            ignore_filter,
            stdlib,
        })
    }

    /// Scan the project and return every non-stdlib module it imports.
    ///
    /// Files that cannot be read or parsed are reported to `sink` and skipped.
    pub fn collect(&self, sink: &mut dyn DiagnosticSink) -> Result<CollectedImports, ScanError> {
        if !self.config.root.is_dir() {
            return Err(ScanError::RootNotFound(self.config.root.clone()));
        }

        let source_files = self.find_source_files(sink);

        let outcomes: Vec<FileOutcome> = if self.config.threads == 1 {
            let mut parser = PythonParser::new()?;
            source_files
                .iter()
                .map(|path| self.parse_file(&mut parser, path))
                .collect()
        } else {
            // Fail the run if the grammar can't be loaded
            PythonParser::new()?;

            let pool = match self.config.threads {
                0 => None,
                threads => settle_pool(
                    rayon::ThreadPoolBuilder::new().num_threads(threads).build(),
                    threads,
                    sink,
                ),
            };

            let parse_all = || -> Vec<FileOutcome> {
                source_files
                    .par_iter()
                    .map_init(PythonParser::new, |parser, path| match parser {
                        Ok(parser) => self.parse_file(parser, path),
                        Err(e) => FileOutcome::Malformed(ParserError::InitError(e.to_string())),
                    })
                    .collect()
            };

            match pool {
                Some(pool) => pool.install(parse_all),
                None => parse_all(),
            }
        };

        let mut collected = CollectedImports::default();
        for (path, outcome) in source_files.iter().zip(outcomes) {
            match outcome {
                FileOutcome::Parsed(modules) => {
                    collected.files_scanned += 1;
                    collected.modules.extend(modules);
                }
                FileOutcome::Unreadable(err) => {
                    collected.files_skipped += 1;
                    sink.emit(
                        Diagnostic::warning(
                            DiagnosticKind::UnreadableFile,
                            format!("Couldn't read {}: {}", path.display(), err),
                        )
                        .with_path(path),
                    );
                }
                FileOutcome::Malformed(err) => {
                    collected.files_skipped += 1;
                    sink.emit(
                        Diagnostic::warning(
                            DiagnosticKind::ParseError,
                            format!("Couldn't parse {} due to {}", path.display(), err),
                        )
                        .with_path(path),
                    );
                }
            }
        }

        if self.config.exclude_local {
            let local = self.local_modules()?;
            collected.modules.retain(|m| !local.contains(m));
        }

        Ok(collected)
    }

    /// Find all Python sources under the root, in file name order
    fn find_source_files(&self, sink: &mut dyn DiagnosticSink) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.config.root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    sink.emit(
                        Diagnostic::warning(
                            DiagnosticKind::UnreadableFile,
                            format!("Couldn't walk {}: {}", path.display(), err),
                        )
                        .with_path(&path),
                    );
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
                continue;
            }

            if self.ignore_filter.should_ignore(path, false) {
                continue;
            }

            files.push(path.to_path_buf());
        }

        files
    }

    /// Parse a single source file into its third-party top-level modules
    fn parse_file(&self, parser: &mut PythonParser, path: &Path) -> FileOutcome {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => return FileOutcome::Unreadable(err),
        };

        match parser.parse(&content) {
            Ok(imports) => FileOutcome::Parsed(
                imports
                    .iter()
                    .filter_map(|import| import.top_level())
                    .filter(|module| !self.stdlib.contains(module))
                    .map(String::from)
                    .collect(),
            ),
            Err(err) => FileOutcome::Malformed(err),
        }
    }

    /// Top-level modules defined by the project itself: `<name>.py` files and
    /// directories holding Python sources directly under the root
    fn local_modules(&self) -> Result<BTreeSet<ModuleName>, ScanError> {
        let mut local = BTreeSet::new();

        for entry in fs::read_dir(&self.config.root)? {
            let path = entry?.path();

            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    if contains_sources(&path)? {
                        local.insert(name.to_string());
                    }
                }
            } else if path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    local.insert(stem.to_string());
                }
            }
        }

        Ok(local)
    }
}

fn contains_sources(dir: &Path) -> Result<bool, std::io::Error> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Keep a freshly built pool, or warn and fall back to rayon's shared pool
fn settle_pool(
    built: Result<rayon::ThreadPool, rayon::ThreadPoolBuildError>,
    threads: usize,
    sink: &mut dyn DiagnosticSink,
) -> Option<rayon::ThreadPool> {
    match built {
        Ok(pool) => Some(pool),
        Err(err) => {
            sink.emit(Diagnostic::warning(
                DiagnosticKind::ThreadPoolFallback,
                format!(
                    "Couldn't start {} parser threads ({}); using the shared pool",
                    threads, err
                ),
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn collect(config: ScanConfig) -> (CollectedImports, Diagnostics) {
        let stdlib = StandardLibrarySet::builtin();
        let collector = ImportCollector::new(config, &stdlib).unwrap();
        let mut diagnostics = Diagnostics::new();
        let collected = collector.collect(&mut diagnostics).unwrap();
        (collected, diagnostics)
    }

    fn names(collected: &CollectedImports) -> Vec<&str> {
        collected.modules.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_stdlib_only_project_is_empty() {
        let dir = TempDir::new().unwrap();
        write(&dir, "main.py", "import os\nimport json\n");

        let (collected, _) = collect(ScanConfig::new(dir.path().to_path_buf()));

        assert!(collected.modules.is_empty());
        assert_eq!(collected.files_scanned, 1);
    }

    #[test]
    fn test_relative_import_excluded() {
        let dir = TempDir::new().unwrap();
        write(&dir, "app.py", "import requests\nfrom . import helper\n");

        let (collected, _) = collect(ScanConfig::new(dir.path().to_path_buf()));

        assert_eq!(names(&collected), vec!["requests"]);
    }

    #[test]
    fn test_submodule_reports_top_level() {
        let dir = TempDir::new().unwrap();
        write(&dir, "calc.py", "import numpy.linalg\n");

        let (collected, _) = collect(ScanConfig::new(dir.path().to_path_buf()));

        assert_eq!(names(&collected), vec!["numpy"]);
    }

    #[test]
    fn test_alias_reports_module_name() {
        let dir = TempDir::new().unwrap();
        write(&dir, "frame.py", "import pandas as pd\nfrom flask.views import View\n");

        let (collected, _) = collect(ScanConfig::new(dir.path().to_path_buf()));

        assert_eq!(names(&collected), vec!["flask", "pandas"]);
    }

    #[test]
    fn test_recursive_walk_and_dedup() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", "import requests\n");
        write(&dir, "pkg/sub/b.py", "import requests\nimport yaml\n");
        write(&dir, "pkg/notes.txt", "import ignored_module\n");
        write(&dir, "pkg/empty.py", "");

        let (collected, _) = collect(ScanConfig::new(dir.path().to_path_buf()));

        assert_eq!(names(&collected), vec!["requests", "yaml"]);
        assert_eq!(collected.files_scanned, 3);
    }

    #[test]
    fn test_malformed_file_is_skipped_with_warning() {
        let dir = TempDir::new().unwrap();
        write(&dir, "bad.py", "import broken\ndef oops(:\n    pass\n");
        write(&dir, "good.py", "import requests\n");

        let (collected, diagnostics) = collect(ScanConfig::new(dir.path().to_path_buf()));

        assert_eq!(names(&collected), vec!["requests"]);
        assert_eq!(collected.files_skipped, 1);
        let warnings: Vec<_> = diagnostics.of_kind(DiagnosticKind::ParseError).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path.as_deref(), Some(dir.path().join("bad.py").as_path()));
    }

    #[test]
    fn test_non_utf8_file_is_skipped_with_warning() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("latin.py"), [0x69, 0x6d, 0xff, 0xfe]).unwrap();
        write(&dir, "ok.py", "import attr\n");

        let (collected, diagnostics) = collect(ScanConfig::new(dir.path().to_path_buf()));

        assert_eq!(names(&collected), vec!["attr"]);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::UnreadableFile).count(), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = TempDir::new().unwrap();
        for i in 0..20 {
            write(&dir, &format!("m{i}.py"), &format!("import dep{}\nimport os\n", i % 7));
        }
        write(&dir, "broken.py", "class (:\n");

        let (sequential, seq_diag) = collect(ScanConfig::new(dir.path().to_path_buf()));
        let (parallel, par_diag) = collect(
            ScanConfig::new(dir.path().to_path_buf()).with_threads(4),
        );

        assert_eq!(sequential.modules, parallel.modules);
        assert_eq!(sequential.modules.len(), 7);
        assert_eq!(seq_diag.events(), par_diag.events());
    }

    #[test]
    fn test_exclude_local_modules() {
        let dir = TempDir::new().unwrap();
        write(&dir, "main.py", "import utils\nimport mypkg.core\nimport requests\n");
        write(&dir, "utils.py", "");
        write(&dir, "mypkg/core.py", "");

        let (included, _) = collect(ScanConfig::new(dir.path().to_path_buf()));
        assert_eq!(names(&included), vec!["mypkg", "requests", "utils"]);

        let (excluded, _) = collect(
            ScanConfig::new(dir.path().to_path_buf()).with_exclude_local(true),
        );
        assert_eq!(names(&excluded), vec!["requests"]);
    }

    #[test]
    fn test_ignore_patterns_applied() {
        let dir = TempDir::new().unwrap();
        write(&dir, "app.py", "import requests\n");
        write(&dir, ".venv/lib/site.py", "import setuptools\n");

        let (all, _) = collect(ScanConfig::new(dir.path().to_path_buf()));
        assert_eq!(names(&all), vec!["requests", "setuptools"]);

        let (filtered, _) = collect(
            ScanConfig::new(dir.path().to_path_buf()).with_skip_vendored(true),
        );
        assert_eq!(names(&filtered), vec!["requests"]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let stdlib = StandardLibrarySet::builtin();
        let collector =
            ImportCollector::new(ScanConfig::new(PathBuf::from("/nonexistent/project")), &stdlib)
                .unwrap();
        let mut diagnostics = Diagnostics::new();

        assert!(matches!(
            collector.collect(&mut diagnostics),
            Err(ScanError::RootNotFound(_))
        ));
    }

    #[test]
    fn test_python2_file_is_skipped_with_warning() {
        let dir = TempDir::new().unwrap();
        write(&dir, "legacy.py", "import urllib2\nprint \"hello\"\n");
        write(&dir, "modern.py", "import requests\n");

        let (collected, diagnostics) = collect(ScanConfig::new(dir.path().to_path_buf()));

        assert_eq!(names(&collected), vec!["requests"]);
        assert_eq!(collected.files_skipped, 1);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::ParseError).count(), 1);
    }

    #[cfg(unix)]
    fn project_with_link_loop() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(&dir, "pkg/mod.py", "import requests\n");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("pkg/loop")).unwrap();
        dir
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed_by_default() {
        let dir = project_with_link_loop();

        let (collected, diagnostics) = collect(ScanConfig::new(dir.path().to_path_buf()));

        assert_eq!(names(&collected), vec!["requests"]);
        assert_eq!(collected.files_scanned, 1);
        assert!(diagnostics.events().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_followed_link_loop_is_warned_and_skipped() {
        let dir = project_with_link_loop();

        let (collected, diagnostics) = collect(
            ScanConfig::new(dir.path().to_path_buf()).with_follow_links(true),
        );

        assert_eq!(names(&collected), vec!["requests"]);
        assert_eq!(collected.files_scanned, 1);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::UnreadableFile).count(), 1);
    }

    #[test]
    fn test_built_pool_is_kept() {
        let mut diagnostics = Diagnostics::new();
        let built = rayon::ThreadPoolBuilder::new().num_threads(3).build();

        let pool = settle_pool(built, 3, &mut diagnostics).unwrap();

        assert_eq!(pool.current_num_threads(), 3);
        assert!(diagnostics.events().is_empty());
    }

    #[test]
    fn test_pool_failure_falls_back_with_warning() {
        // The global pool can only be configured once
        let _ = rayon::ThreadPoolBuilder::new().build_global();
        let failed = rayon::ThreadPoolBuilder::new().build_global().unwrap_err();
        let mut diagnostics = Diagnostics::new();

        assert!(settle_pool(Err(failed), 4, &mut diagnostics).is_none());
        let warnings: Vec<_> = diagnostics.of_kind(DiagnosticKind::ThreadPoolFallback).collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("4 parser threads"));
    }
}
