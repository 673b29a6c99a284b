//! `foreman init [--root <dir>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use foreman_core::registry;

/// Create `~/.foreman/projects.json` if it does not exist yet.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory project paths resolve against. Defaults to the current directory.
    #[arg(long)]
    pub root: Option<PathBuf>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home()?;
        let root = match self.root {
            Some(root) => root,
            None => std::env::current_dir().context("cannot read current directory")?,
        };
        let root = root
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", root.display()))?;

        let existed = registry::registry_path_at(&home).exists();
        let reg = registry::init_at(&home, root).context("failed to initialize registry")?;

        if existed {
            println!(
                "Registry already present ({} projects, root {})",
                reg.projects.len(),
                reg.projects_root.display()
            );
        } else {
            println!("✓ Created registry rooted at {}", reg.projects_root.display());
            println!("  Saved to: ~/.foreman/projects.json");
        }
        Ok(())
    }
}
