mod pip;
mod poetry;

pub use pip::to_pip;
pub use poetry::{to_poetry, MIN_PYTHON_VERSION};

use crate::models::DependencyMapping;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Manifest format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestFormat {
    /// pip `requirements.txt`
    #[default]
    Pip,
    /// Poetry `[tool.poetry.dependencies]` table
    Poetry,
}

impl ManifestFormat {
    pub const NAMES: &'static [&'static str] = &["pip", "poetry"];
}

impl FromStr for ManifestFormat {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pip" => Ok(ManifestFormat::Pip),
            "poetry" => Ok(ManifestFormat::Poetry),
            other => Err(ManifestError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ManifestFormat::Pip => "pip",
            ManifestFormat::Poetry => "poetry",
        })
    }
}

/// Render a mapping in the given format
pub fn render(mapping: &DependencyMapping, format: ManifestFormat) -> String {
    match format {
        ManifestFormat::Pip => to_pip(mapping),
        ManifestFormat::Poetry => to_poetry(mapping),
    }
}

/// Render and write a manifest, replacing any existing file at `path`.
///
/// The file is flushed and closed before returning.
pub fn write_manifest(
    mapping: &DependencyMapping,
    path: &Path,
    format: ManifestFormat,
) -> Result<(), ManifestError> {
    let content = render(mapping, format);
    let io_err = |source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content.as_bytes()).map_err(io_err)?;
    let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Unsupported format '{0}'. Choose 'pip' or 'poetry'.")]
    UnsupportedFormat(String),
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
