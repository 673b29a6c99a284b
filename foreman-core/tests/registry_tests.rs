//! Registry error-message, atomic-write-safety and init integration tests.

use assert_fs::prelude::*;
use foreman_core::{
    registry,
    types::{Maturity, ProjectEntry, ProjectName, Registry},
    RegistryError,
};
use predicates::prelude::predicate;
use std::fs;
use std::path::PathBuf;

fn entry(name: &str, status: Maturity) -> ProjectEntry {
    ProjectEntry {
        name: ProjectName::from(name),
        path: PathBuf::from(name),
        status,
        language: "rust".into(),
        test_command: Some("cargo test".into()),
    }
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_registry_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = registry::load_at(home.path()).unwrap_err();
    assert!(matches!(err, RegistryError::RegistryNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("registry not found"));
    assert!(err.to_string().contains("projects.json"));
}

#[test]
fn load_corrupt_json_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".foreman/projects.json")
        .write_str("{ \"version\": 1, \"projects\": [ unclosed")
        .expect("write");

    let err = registry::load_at(home.path()).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("projects.json"), "must contain file path, got: {msg}");
}

#[test]
fn load_wrong_shape_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".foreman/projects.json")
        .write_str("[\"this is a list, not an object\"]")
        .expect("write");

    let err = registry::load_at(home.path()).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { .. }), "got: {err}");
}

#[test]
fn unknown_lifecycle_tag_loads_as_unknown() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".foreman/projects.json")
        .write_str(
            r#"{"version":1,"projects_root":"/code","projects":[
                {"name":"x","path":"x","status":"experimental","language":"python"}
            ]}"#,
        )
        .expect("write");

    let reg = registry::load_at(home.path()).expect("load");
    assert_eq!(reg.projects[0].status, Maturity::Unknown);
    assert_eq!(reg.projects[0].test_command, None);
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn mid_write_crash_leaves_original_intact() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let reg = Registry {
        version: 1,
        projects_root: PathBuf::from("/code"),
        projects: vec![entry("jade-core", Maturity::Buildable)],
    };
    registry::save_at(home.path(), &reg).expect("save");

    let path = registry::registry_path_at(home.path());
    let original = fs::read(&path).expect("read original");

    // Simulate crash: .tmp written but process died before rename
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, b"CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    assert_eq!(original, fs::read(&path).expect("read after crash"));
    let loaded = registry::load_at(home.path()).expect("still loadable");
    assert_eq!(loaded, reg);
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_registry_file_with_private_mode() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    registry::init_at(home.path(), PathBuf::from("/code")).expect("init");

    home.child(".foreman/projects.json")
        .assert(predicate::path::exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let path = registry::registry_path_at(home.path());
        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "expected 0600, got {mode:o}");
    }
}

#[test]
fn find_returns_named_entry() {
    let reg = Registry {
        version: 1,
        projects_root: PathBuf::from("/code"),
        projects: vec![
            entry("alpha", Maturity::Buildable),
            entry("beta", Maturity::Scaffolding),
        ],
    };
    assert_eq!(reg.find("beta").map(|p| p.status), Some(Maturity::Scaffolding));
    assert!(reg.find("gamma").is_none());
}
