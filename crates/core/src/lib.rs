//! Requmancer Core Library
//!
//! Scans a Python project for the third-party modules it imports, looks up
//! the installed version of each one and writes a dependency manifest.
//!
//! # Pipeline
//!
//! - [`ImportCollector`] walks the project, parses every `.py` file with
//!   tree-sitter and keeps the top-level module of each absolute import,
//!   minus the [`StandardLibrarySet`]
//! - [`VersionResolver`] asks a [`MetadataLookup`] for each module's version
//! - [`write_manifest`] renders the result as a pip requirements file or a
//!   Poetry dependency table
//!
//! [`RequirementsGenerator`] runs the three stages in order. Recoverable
//! problems (unparseable files, missing metadata) are reported through a
//! [`DiagnosticSink`] instead of aborting the run.
//!
//! # Example
//!
//! ```no_run
//! use requmancer_core::{
//!     Diagnostics, GeneratorConfig, HostEnvironment, RequirementsGenerator, ScanConfig,
//!     SitePackagesRegistry,
//! };
//! use std::path::PathBuf;
//!
//! let host = HostEnvironment::probe("python3").unwrap_or_else(|_| HostEnvironment::fallback());
//! let registry = SitePackagesRegistry::from_dirs(&host.search_path);
//! let config = GeneratorConfig::new(ScanConfig::new(PathBuf::from(".")));
//!
//! let mut diagnostics = Diagnostics::new();
//! RequirementsGenerator::new(config, &host.stdlib, &registry).generate(&mut diagnostics);
//! for event in diagnostics.events() {
//!     eprintln!("{}", event);
//! }
//! ```

pub mod config;
pub mod diagnostics;
pub mod generator;
pub mod host;
pub mod models;
pub mod output;
pub mod parsers;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod stdlib;

// Re-exports for convenience
pub use config::ScanConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Diagnostics, Severity};
pub use generator::{GenerateError, GeneratorConfig, RequirementsGenerator, DEFAULT_OUTPUT};
pub use host::{HostEnvironment, ProbeError};
pub use models::*;
pub use output::{render, write_manifest, ManifestError, ManifestFormat};
pub use registry::{InMemoryRegistry, MetadataLookup, SitePackagesRegistry};
pub use resolver::VersionResolver;
pub use scanner::{CollectedImports, ImportCollector, ScanError};
pub use stdlib::StandardLibrarySet;
