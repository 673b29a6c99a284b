//! Project registry.
//!
//! # Storage layout
//!
//! ```text
//! ~/.foreman/
//!   projects.json   (registry: mode 0600)
//!   config.yaml     (optional, see [`crate::config`])
//! <projects_root>/<project.path>/
//!   .claude/tasks/tasks.json   (backlog, path configurable)
//! ```
//!
//! # API pattern
//!
//! Every function touching the home directory has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use crate::error::{registry_io, RegistryError};
use crate::types::Registry;

pub const REGISTRY_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.foreman`
pub fn foreman_dir_at(home: &Path) -> PathBuf {
    home.join(".foreman")
}

/// `<home>/.foreman/projects.json`: pure, no I/O.
pub fn registry_path_at(home: &Path) -> PathBuf {
    foreman_dir_at(home).join("projects.json")
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load a registry from an explicit file.
///
/// Returns `RegistryError::RegistryNotFound` if absent,
/// `RegistryError::Parse` (with path + line context) if malformed JSON.
pub fn load_from(path: &Path) -> Result<Registry, RegistryError> {
    if !path.exists() {
        return Err(RegistryError::RegistryNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| registry_io(path, e))?;
    let registry: Registry = serde_json::from_str(&contents).map_err(|e| RegistryError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(
        path = %path.display(),
        projects = registry.projects.len(),
        "loaded registry"
    );
    Ok(registry)
}

/// Load `<home>/.foreman/projects.json`.
pub fn load_at(home: &Path) -> Result<Registry, RegistryError> {
    load_from(&registry_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Registry, RegistryError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the registry to `<home>/.foreman/projects.json`.
///
/// Write flow: serialize → `.json.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, registry: &Registry) -> Result<(), RegistryError> {
    let dir = foreman_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| registry_io(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    let path = registry_path_at(home);
    let tmp = path.with_extension("json.tmp");

    let json = serde_json::to_string_pretty(registry)?;
    std::fs::write(&tmp, json).map_err(|e| registry_io(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| registry_io(&path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// Scaffold an empty registry rooted at `projects_root`.
///
/// Idempotent: if the registry already exists, loads and returns it unchanged.
pub fn init_at(home: &Path, projects_root: PathBuf) -> Result<Registry, RegistryError> {
    let path = registry_path_at(home);
    if path.exists() {
        return load_from(&path);
    }
    let registry = Registry {
        version: REGISTRY_VERSION,
        projects_root,
        projects: vec![],
    };
    save_at(home, &registry)?;
    tracing::info!(path = %path.display(), "created registry");
    Ok(registry)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

pub(crate) fn home() -> Result<PathBuf, RegistryError> {
    dirs::home_dir().ok_or(RegistryError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| registry_io(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| registry_io(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Maturity, ProjectEntry, ProjectName};
    use tempfile::TempDir;

    #[test]
    fn registry_path_is_correct() {
        let home = TempDir::new().expect("tempdir");
        assert!(registry_path_at(home.path()).ends_with(".foreman/projects.json"));
    }

    #[test]
    fn init_then_load_roundtrip() {
        let home = TempDir::new().expect("tempdir");
        let created = init_at(home.path(), PathBuf::from("/code")).expect("init");
        let loaded = load_at(home.path()).expect("load");
        assert_eq!(created, loaded);
        assert_eq!(loaded.version, REGISTRY_VERSION);
    }

    #[test]
    fn init_is_idempotent() {
        let home = TempDir::new().expect("tempdir");
        let mut reg = init_at(home.path(), PathBuf::from("/code")).expect("init");
        reg.projects.push(ProjectEntry {
            name: ProjectName::from("jade-core"),
            path: PathBuf::from("jade-core"),
            status: Maturity::Buildable,
            language: "rust".into(),
            test_command: None,
        });
        save_at(home.path(), &reg).expect("save");

        let again = init_at(home.path(), PathBuf::from("/elsewhere")).expect("init again");
        assert_eq!(again.projects.len(), 1);
        assert_eq!(again.projects_root, PathBuf::from("/code"));
    }

    #[test]
    fn save_cleans_up_tmp() {
        let home = TempDir::new().expect("tempdir");
        init_at(home.path(), PathBuf::from("/code")).expect("init");
        let tmp = registry_path_at(home.path()).with_extension("json.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    fn load_missing_registry_returns_not_found() {
        let home = TempDir::new().expect("tempdir");
        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, RegistryError::RegistryNotFound { .. }));
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let reg = Registry {
            version: 1,
            projects_root: PathBuf::from("/code"),
            projects: vec![],
        };
        let rel = ProjectEntry {
            name: ProjectName::from("a"),
            path: PathBuf::from("a"),
            status: Maturity::Unknown,
            language: String::new(),
            test_command: None,
        };
        let abs = ProjectEntry {
            path: PathBuf::from("/opt/b"),
            ..rel.clone()
        };
        assert_eq!(reg.resolve(&rel), PathBuf::from("/code/a"));
        assert_eq!(reg.resolve(&abs), PathBuf::from("/opt/b"));
    }
}
