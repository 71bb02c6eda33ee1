use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::models::{DependencyMapping, ModuleSet, Version};
use crate::registry::MetadataLookup;

/// Looks up the installed version of each collected module
pub struct VersionResolver<'a> {
    lookup: &'a dyn MetadataLookup,
}

impl<'a> VersionResolver<'a> {
    pub fn new(lookup: &'a dyn MetadataLookup) -> Self {
        Self { lookup }
    }

    /// Resolve every module. Modules without installed metadata map to
    /// [`Version::Unknown`] and are reported to `sink`; this never fails.
    pub fn resolve(&self, modules: &ModuleSet, sink: &mut dyn DiagnosticSink) -> DependencyMapping {
        modules
            .iter()
            .map(|module| {
                let version = Version::from(self.lookup.resolve(module));
                if version.is_unknown() {
                    sink.emit(Diagnostic::warning(
                        DiagnosticKind::ResolutionMiss,
                        format!("Couldn't find version for {}", module),
                    ));
                }
                (module.clone(), version)
            })
            .collect()
    }
}
