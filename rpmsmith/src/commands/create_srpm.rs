//! `rpmsmith create-srpm`: build source RPMs.

use super::RepoSelection;
use crate::output::Output;
use crate::pipeline::BuildEnv;
use crate::srcconfig::SrcConfig;
use crate::srpm::{SrpmBuilder, SrpmOptions};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct CreateSrpmArgs {
    #[command(flatten)]
    pub selection: RepoSelection,

    /// Skip the `rpmbuild -bp` sanity check
    #[arg(long)]
    pub skip_build_prep: bool,
}

pub fn run(args: CreateSrpmArgs, env: &BuildEnv) -> Result<()> {
    let repo = args.selection.load(&env.config)?;
    let src_config = SrcConfig::load(&env.config.src_config)?;
    let options = SrpmOptions {
        skip_build_prep: args.skip_build_prep,
    };

    for package in repo.manifest.select(args.selection.package.as_deref())? {
        Output::step(format!("{}: create-srpm", package.name));
        let srpm = SrpmBuilder::new(env, &src_config, &repo.dir, package, options).build()?;
        Output::success(format!("published {}", srpm.display()));
    }
    Ok(())
}
