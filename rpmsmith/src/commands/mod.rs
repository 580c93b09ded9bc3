//! Subcommand implementations.

pub mod build;
pub mod checkenv;
pub mod clone;
pub mod create_srpm;
pub mod list_unverified;
pub mod mock;

use crate::config::Config;
use crate::manifest::Manifest;
use anyhow::{Context, Result, bail};
use clap::Args;
use std::path::PathBuf;

/// Which repository, and optionally which package in it, to operate on.
#[derive(Debug, Clone, Args)]
pub struct RepoSelection {
    /// Repository name under the source directory
    #[arg(long, short)]
    pub repo: String,

    /// Only this package (default: every package, in manifest order)
    #[arg(long, short)]
    pub package: Option<String>,
}

/// A repository checkout with its parsed manifest.
pub struct LoadedRepo {
    pub dir: PathBuf,
    pub manifest: Manifest,
}

impl RepoSelection {
    pub fn load(&self, config: &Config) -> Result<LoadedRepo> {
        let dir = config.repo_dir(&self.repo);
        if !dir.is_dir() {
            bail!(
                "repository '{}' not found at {}; run `rpmsmith clone` first",
                self.repo,
                dir.display()
            );
        }
        let manifest = Manifest::load(&dir)
            .with_context(|| format!("loading manifest of repository '{}'", self.repo))?;
        Ok(LoadedRepo { dir, manifest })
    }
}
