//! End-to-end tests for the requmancer CLI
//!
//! Every run points `--python` at a missing interpreter and `--site-packages`
//! at a fabricated directory, so results don't depend on the host.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_test_project() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("app")).unwrap();

    fs::write(
        src.join("app/main.py"),
        "import os\nimport requests\nfrom . import helper\nimport numpy.linalg as la\n",
    )
    .unwrap();
    fs::write(src.join("app/helper.py"), "from yaml import safe_load\n").unwrap();
    fs::write(src.join("app/broken.py"), "def broken(:\n").unwrap();

    let site = dir.path().join("site-packages");
    for (entry, name, version) in [
        ("requests-2.31.0.dist-info", "requests", "2.31.0"),
        ("numpy-1.26.4.dist-info", "numpy", "1.26.4"),
    ] {
        fs::create_dir_all(site.join(entry)).unwrap();
        fs::write(
            site.join(entry).join("METADATA"),
            format!("Metadata-Version: 2.1\nName: {name}\nVersion: {version}\n"),
        )
        .unwrap();
    }

    dir
}

fn requmancer(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("requmancer").unwrap();
    cmd.env("NO_COLOR", "1")
        .arg(root.join("src"))
        .arg("--python")
        .arg(root.join("no-such-python"))
        .arg("--site-packages")
        .arg(root.join("site-packages"));
    cmd
}

#[test]
fn test_pip_output() {
    let project = create_test_project();
    let output = project.path().join("requirements.txt");

    requmancer(project.path())
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("Couldn't find version for yaml"))
        .stderr(predicate::str::contains("broken.py"))
        .stderr(predicate::str::contains("Requirements file created"));

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "numpy==1.26.4\nrequests==2.31.0\nyaml\n"
    );
}

#[test]
fn test_poetry_output() {
    let project = create_test_project();
    let output = project.path().join("deps.toml");

    requmancer(project.path())
        .args(["--format", "poetry", "--output"])
        .arg(&output)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "[tool.poetry.dependencies]\npython = \"^3.6\"\nnumpy = \"^1.26.4\"\nrequests = \"^2.31.0\"\nyaml = \"*\"\n"
    );
}

#[test]
fn test_unsupported_format_fails_without_writing() {
    let project = create_test_project();
    let output = project.path().join("requirements.json");

    requmancer(project.path())
        .args(["-f", "json", "-o"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported format 'json'"));

    assert!(!output.exists());
}

#[test]
fn test_missing_project_directory_fails() {
    let project = create_test_project();
    let output = project.path().join("requirements.txt");

    Command::cargo_bin("requmancer")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg(project.path().join("does-not-exist"))
        .arg("--python")
        .arg(project.path().join("no-such-python"))
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("An error occurred"));

    assert!(!output.exists());
}

#[test]
fn test_quiet_hides_warnings() {
    let project = create_test_project();
    let output = project.path().join("requirements.txt");

    requmancer(project.path())
        .arg("--quiet")
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    assert!(output.exists());
}
