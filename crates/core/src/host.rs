use crate::stdlib::StandardLibrarySet;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

/// Printed by the interpreter: its version, stdlib module names (`null`
/// before 3.10), compiled-in module names and search path
const PROBE_SCRIPT: &str = r#"
import json, sys
names = getattr(sys, "stdlib_module_names", None)
print(json.dumps({
    "version": "%d.%d.%d" % sys.version_info[:3],
    "stdlib": sorted(names) if names is not None else None,
    "builtin": sorted(sys.builtin_module_names),
    "path": [p for p in sys.path if p],
}))
"#;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to run {interpreter}: {source}")]
    Spawn {
        interpreter: String,
        source: std::io::Error,
    },
    #[error("{interpreter} exited with {status}: {stderr}")]
    Failed {
        interpreter: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("unexpected probe output: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    version: String,
    stdlib: Option<Vec<String>>,
    #[serde(default)]
    builtin: Vec<String>,
    path: Vec<PathBuf>,
}

/// What a Python interpreter reports about itself
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    pub python_version: String,
    pub stdlib: StandardLibrarySet,
    pub search_path: Vec<PathBuf>,
}

impl HostEnvironment {
    /// Run `interpreter` once and capture its stdlib names and search path
    pub fn probe(interpreter: &str) -> Result<Self, ProbeError> {
        let output = Command::new(interpreter)
            .args(["-c", PROBE_SCRIPT])
            .output()
            .map_err(|source| ProbeError::Spawn {
                interpreter: interpreter.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                interpreter: interpreter.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Self::from_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn from_probe_output(stdout: &str) -> Result<Self, ProbeError> {
        let parsed: ProbeOutput = serde_json::from_str(stdout.trim())?;
        // Older interpreters only know their compiled-in modules, which
        // leaves out pure-Python ones such as `json` and `typing`
        let stdlib = match parsed.stdlib {
            Some(names) => StandardLibrarySet::from_names(names),
            None => {
                let mut stdlib = StandardLibrarySet::builtin();
                stdlib.extend(parsed.builtin);
                stdlib
            }
        };
        Ok(Self {
            python_version: parsed.version,
            stdlib,
            search_path: parsed.path,
        })
    }

    /// Environment used when no interpreter is available: the built-in
    /// stdlib list and nothing installed
    pub fn fallback() -> Self {
        Self {
            python_version: String::new(),
            stdlib: StandardLibrarySet::builtin(),
            search_path: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_probe_output() {
        let env = HostEnvironment::from_probe_output(
            r#"{"version": "3.11.4", "stdlib": ["os", "sys"], "path": ["/usr/lib/python3.11", "/venv/lib/python3.11/site-packages"]}"#,
        )
        .unwrap();

        assert_eq!(env.python_version, "3.11.4");
        assert!(env.stdlib.contains("os"));
        assert!(!env.stdlib.contains("json"));
        assert_eq!(env.search_path.len(), 2);
    }

    #[test]
    fn test_interpreter_without_stdlib_names_keeps_builtin_list() {
        let env = HostEnvironment::from_probe_output(
            r#"{"version": "3.8.18", "stdlib": null, "builtin": ["_ssl_legacy", "sys"], "path": []}"#,
        )
        .unwrap();

        for module in ["os", "json", "re", "typing", "_ssl_legacy"] {
            assert!(env.stdlib.contains(module), "{module} should be stdlib");
        }
        assert!(!env.stdlib.contains("requests"));
    }

    #[test]
    fn test_invalid_output() {
        let err = HostEnvironment::from_probe_output("Python 2.7.18").unwrap_err();
        assert!(matches!(err, ProbeError::InvalidOutput(_)));
    }

    #[test]
    fn test_missing_interpreter() {
        let err = HostEnvironment::probe("/nonexistent/bin/python3").unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }));
    }

    #[test]
    fn test_fallback_uses_builtin_stdlib() {
        let env = HostEnvironment::fallback();
        assert!(env.stdlib.contains("json"));
        assert!(env.search_path.is_empty());
    }
}
