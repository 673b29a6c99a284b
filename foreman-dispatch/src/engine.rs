//! Tera rendering engine for dispatch preambles.
//!
//! | Template                     | Section                                      |
//! |------------------------------|----------------------------------------------|
//! | `_partials/assignment.tera`  | title, description, feature, acceptance list |
//! | `_partials/conventions.tera` | language, test command, path, milestone      |
//! | `_partials/constraints.tera` | turn ceiling, working-directory fence        |
//! | `_partials/process.tera`     | mandatory process list                       |
//! | `preamble.md.tera`           | the four partials in order                   |
//!
//! A file at the same relative path under an override directory replaces the
//! embedded copy, e.g. `~/.foreman/templates/_partials/process.tera`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::PreambleContext;
use crate::error::DispatchError;

/// Entry template rendered for every dispatch.
pub const PREAMBLE_TEMPLATE: &str = "preamble.md.tera";

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    (
        "_partials/assignment.tera",
        include_str!("templates/_partials/assignment.tera"),
    ),
    (
        "_partials/conventions.tera",
        include_str!("templates/_partials/conventions.tera"),
    ),
    (
        "_partials/constraints.tera",
        include_str!("templates/_partials/constraints.tera"),
    ),
    (
        "_partials/process.tera",
        include_str!("templates/_partials/process.tera"),
    ),
    (PREAMBLE_TEMPLATE, include_str!("templates/preamble.md.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DispatchError {
    DispatchError::Io {
        path: path.into(),
        source,
    }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), DispatchError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_override_templates(dir: &Path) -> Result<Vec<(String, String)>, DispatchError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        tracing::debug!(template = %name, "using override template");
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(override_dir: Option<&Path>) -> Result<Tera, DispatchError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(
            normalize_template_name(Path::new(name)),
            (*content).to_string(),
        );
    }
    if let Some(dir) = override_dir {
        for (name, content) in load_override_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// PreambleRenderer
// ---------------------------------------------------------------------------

/// Renders the fixed-cost part of a dispatch request. Create once and reuse.
pub struct PreambleRenderer {
    tera: Tera,
}

impl PreambleRenderer {
    /// Embedded templates only.
    pub fn new() -> Result<Self, DispatchError> {
        Self::with_overrides(None)
    }

    /// Embedded templates plus any `.tera` overrides found in `override_dir`.
    pub fn with_overrides(override_dir: Option<&Path>) -> Result<Self, DispatchError> {
        Ok(PreambleRenderer {
            tera: build_tera(override_dir)?,
        })
    }

    pub fn render(&self, ctx: &PreambleContext) -> Result<String, DispatchError> {
        let tera_ctx = ctx.to_tera_context()?;
        let rendered = self.tera.render(PREAMBLE_TEMPLATE, &tera_ctx)?;
        Ok(rendered.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
