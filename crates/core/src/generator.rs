use crate::config::ScanConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::models::GenerationReport;
use crate::output::{write_manifest, ManifestError, ManifestFormat};
use crate::registry::MetadataLookup;
use crate::resolver::VersionResolver;
use crate::scanner::{ImportCollector, ScanError};
use crate::stdlib::StandardLibrarySet;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

pub const DEFAULT_OUTPUT: &str = "requirements.txt";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Settings for one generator run
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub scan: ScanConfig,
    /// Manifest destination
    pub output: PathBuf,
    /// Format selector, `pip` or `poetry`
    pub format: String,
}

impl GeneratorConfig {
    pub fn new(scan: ScanConfig) -> Self {
        Self {
            scan,
            output: PathBuf::from(DEFAULT_OUTPUT),
            format: ManifestFormat::default().to_string(),
        }
    }

    pub fn with_output(mut self, output: PathBuf) -> Self {
        self.output = output;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

/// Runs collection, resolution and manifest writing in sequence
pub struct RequirementsGenerator<'a> {
    config: GeneratorConfig,
    stdlib: &'a StandardLibrarySet,
    lookup: &'a dyn MetadataLookup,
}

impl<'a> RequirementsGenerator<'a> {
    pub fn new(
        config: GeneratorConfig,
        stdlib: &'a StandardLibrarySet,
        lookup: &'a dyn MetadataLookup,
    ) -> Self {
        Self {
            config,
            stdlib,
            lookup,
        }
    }

    /// Run the whole pipeline. Run-level failures are reported to `sink` as
    /// errors and yield `None`; nothing is propagated.
    pub fn generate(&self, sink: &mut dyn DiagnosticSink) -> Option<GenerationReport> {
        match self.run(sink) {
            Ok(report) => {
                sink.emit(Diagnostic::info(
                    DiagnosticKind::Generated,
                    format!("Requirements file created: {}", report.output.display()),
                ));
                Some(report)
            }
            Err(err) => {
                sink.emit(Diagnostic::error(
                    DiagnosticKind::RunFailed,
                    format!("An error occurred: {}", err),
                ));
                None
            }
        }
    }

    /// Run the pipeline, returning the first run-level error
    pub fn run(&self, sink: &mut dyn DiagnosticSink) -> Result<GenerationReport, GenerateError> {
        let start = Instant::now();

        // Reject the format before touching the filesystem
        let format: ManifestFormat = self.config.format.parse()?;

        let collector = ImportCollector::new(self.config.scan.clone(), self.stdlib)?;
        let collected = collector.collect(sink)?;

        let mapping = VersionResolver::new(self.lookup).resolve(&collected.modules, sink);

        write_manifest(&mapping, &self.config.output, format)?;

        Ok(GenerationReport {
            output: self.config.output.clone(),
            format,
            files_scanned: collected.files_scanned,
            files_skipped: collected.files_skipped,
            dependencies: mapping.len(),
            unresolved: mapping.values().filter(|v| v.is_unknown()).count(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
