//! Size budget and file-context packing.
//!
//! Sizes are *estimated tokens*: `ceil(chars / chars_per_token)`. This is a
//! cheap approximation of what a model tokenizer would count, not a
//! measurement, and the budget it enforces is soft.

use std::path::{Path, PathBuf};

use serde::Serialize;

use foreman_core::config::DispatchConfig;

/// Estimated token count of `text`.
pub fn estimate_tokens(text: &str, chars_per_token: usize) -> usize {
    let chars = text.chars().count();
    chars.div_ceil(chars_per_token.max(1))
}

/// Budget parameters for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    pub total: usize,
    pub overhead: usize,
    pub chars_per_token: usize,
    pub max_file_share: f64,
    pub min_truncated: usize,
}

impl From<&DispatchConfig> for Budget {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            total: config.budget_tokens,
            overhead: config.overhead_tokens,
            chars_per_token: config.chars_per_token,
            max_file_share: config.max_file_share,
            min_truncated: config.min_truncated_tokens,
        }
    }
}

impl Budget {
    /// Tokens left for file context once the preamble and reserve are paid.
    pub fn file_budget(&self, preamble_tokens: usize) -> usize {
        let left = self
            .total
            .saturating_sub(preamble_tokens)
            .saturating_sub(self.overhead);
        let cap = (self.total as f64 * self.max_file_share).floor() as usize;
        left.min(cap)
    }
}

/// What happened to each relevant file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackedFiles {
    /// Rendered file sections, in walk order.
    #[serde(skip)]
    pub text: String,
    pub included: Vec<PathBuf>,
    pub truncated: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub tokens: usize,
}

/// Walk `files` in order and pack as many as fit into `budget_tokens`.
///
/// Relative paths resolve against `project_dir`. A file is included whole if
/// it fits, cut at a line boundary when at least `min_truncated` tokens remain,
/// otherwise skipped. Missing or unreadable files are skipped.
pub fn pack_files(project_dir: &Path, files: &[PathBuf], budget_tokens: usize, budget: &Budget) -> PackedFiles {
    let cpt = budget.chars_per_token.max(1);
    let mut packed = PackedFiles::default();
    let mut remaining = budget_tokens;

    for rel in files {
        let path = if rel.is_absolute() {
            rel.clone()
        } else {
            project_dir.join(rel)
        };
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(file = %path.display(), error = %e, "relevant file unreadable; skipped");
                packed.skipped.push(rel.clone());
                continue;
            }
        };

        let whole = file_section(rel, &contents, None);
        let cost = estimate_tokens(&whole, cpt);
        if cost <= remaining {
            remaining -= cost;
            packed.tokens += cost;
            packed.text.push_str(&whole);
            packed.included.push(rel.clone());
            continue;
        }

        if remaining >= budget.min_truncated {
            if let Some(section) = truncated_section(rel, &contents, remaining * cpt) {
                let cost = estimate_tokens(&section, cpt);
                remaining = remaining.saturating_sub(cost);
                packed.tokens += cost;
                packed.text.push_str(&section);
                packed.truncated.push(rel.clone());
                continue;
            }
        }

        packed.skipped.push(rel.clone());
    }

    tracing::debug!(
        included = packed.included.len(),
        truncated = packed.truncated.len(),
        skipped = packed.skipped.len(),
        tokens = packed.tokens,
        "file context packed"
    );
    packed
}

// ---------------------------------------------------------------------------
// Section rendering
// ---------------------------------------------------------------------------

fn file_section(rel: &Path, body: &str, marker: Option<&str>) -> String {
    let mut out = format!("### {}\n```\n{}", rel.display(), body);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    if let Some(marker) = marker {
        out.push_str(marker);
        out.push('\n');
    }
    out.push_str("```\n\n");
    out
}

/// Longest line-aligned prefix of `contents` whose section fits in `max_chars`.
fn truncated_section(rel: &Path, contents: &str, max_chars: usize) -> Option<String> {
    let total_lines = contents.lines().count();
    let frame = file_section(rel, "", Some(&marker(total_lines, total_lines)))
        .chars()
        .count();
    let room = max_chars.checked_sub(frame)?;

    let mut kept_chars = 0;
    let mut kept_lines = 0;
    for line in contents.split_inclusive('\n') {
        let len = line.chars().count();
        if kept_chars + len > room {
            break;
        }
        kept_chars += len;
        kept_lines += 1;
    }
    if kept_lines == 0 {
        return None;
    }

    let body: String = contents.split_inclusive('\n').take(kept_lines).collect();
    let omitted = total_lines - kept_lines;
    Some(file_section(rel, &body, Some(&marker(omitted, total_lines))))
}

fn marker(omitted: usize, total: usize) -> String {
    format!("[truncated: {omitted} of {total} lines omitted]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn budget() -> Budget {
        Budget::from(&DispatchConfig::default())
    }

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens("", 4), 0);
        assert_eq!(estimate_tokens("abcd", 4), 1);
        assert_eq!(estimate_tokens("abcde", 4), 2);
    }

    #[test]
    fn file_budget_subtracts_then_caps() {
        let b = budget();
        assert_eq!(b.file_budget(3_000), 30_000);
        let small = Budget { total: 10_000, ..b };
        assert_eq!(small.file_budget(3_000), 2_000);
        assert_eq!(small.file_budget(20_000), 0);
    }

    #[test]
    fn missing_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let packed = pack_files(dir.path(), &[PathBuf::from("nope.rs")], 1_000, &budget());
        assert_eq!(packed.skipped, vec![PathBuf::from("nope.rs")]);
        assert!(packed.text.is_empty());
    }

    #[test]
    fn truncation_ends_on_a_line_boundary_with_marker() {
        let dir = TempDir::new().unwrap();
        let body: String = (0..2_000).map(|i| format!("line {i:>73}\n")).collect();
        std::fs::write(dir.path().join("big.rs"), &body).unwrap();

        let packed = pack_files(dir.path(), &[PathBuf::from("big.rs")], 300, &budget());
        assert_eq!(packed.truncated, vec![PathBuf::from("big.rs")]);
        assert!(packed.tokens <= 300);
        assert!(packed.text.contains("[truncated: "));
        let before_marker = packed.text.split("[truncated").next().unwrap();
        assert!(before_marker.ends_with('\n'));
    }

    #[test]
    fn too_little_room_skips_instead_of_truncating() {
        let dir = TempDir::new().unwrap();
        let body = "x\n".repeat(2_000);
        std::fs::write(dir.path().join("big.rs"), &body).unwrap();
        let packed = pack_files(dir.path(), &[PathBuf::from("big.rs")], 200, &budget());
        assert_eq!(packed.skipped.len(), 1);
    }
}
