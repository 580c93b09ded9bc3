//! `rpmsmith clone`: check out a package repository.

use crate::git::{clone_repo, repo_name_from_url};
use crate::output::Output;
use crate::pipeline::BuildEnv;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Debug, Args)]
pub struct CloneArgs {
    /// Git URL of the package repository
    pub url: String,

    /// Directory name under the source directory (default: derived from the URL)
    #[arg(long, short)]
    pub repo: Option<String>,

    /// Replace an existing checkout
    #[arg(long, short)]
    pub force: bool,
}

pub fn run(args: CloneArgs, env: &BuildEnv) -> Result<()> {
    let name = match &args.repo {
        Some(name) => name.as_str(),
        None => repo_name_from_url(&args.url)
            .with_context(|| format!("cannot derive a repository name from {}", args.url))?,
    };
    let target = env.config.repo_dir(name);

    Output::step(format!("cloning {} into {}", args.url, target.display()));
    clone_repo(env.exec(), &args.url, &target, args.force)?;
    Output::success(format!("cloned repository '{name}'"));
    Ok(())
}
