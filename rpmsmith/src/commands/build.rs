//! `rpmsmith build`: create-srpm followed by mock, per package.

use super::RepoSelection;
use super::mock::{MockInputs, MockTargetArgs, report};
use crate::mock_build::{MockBuilder, MockOptions};
use crate::output::Output;
use crate::pipeline::BuildEnv;
use crate::srcconfig::SrcConfig;
use crate::srpm::{SrpmBuilder, SrpmOptions};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub selection: RepoSelection,

    #[command(flatten)]
    pub target: MockTargetArgs,

    /// Skip the `rpmbuild -bp` sanity check
    #[arg(long)]
    pub skip_build_prep: bool,
}

/// Packages are built in manifest order so a package's mock run can use
/// the RPMs published for the dependencies listed before it.
pub fn run(args: BuildArgs, env: &BuildEnv) -> Result<()> {
    let repo = args.selection.load(&env.config)?;
    let src_config = SrcConfig::load(&env.config.src_config)?;
    let inputs = MockInputs::load(env)?;
    let srpm_options = SrpmOptions {
        skip_build_prep: args.skip_build_prep,
    };
    let mock_options = MockOptions {
        target: args.target.target.clone(),
        nocheck: args.target.nocheck,
        only_create_cfg: false,
    };

    let packages = repo.manifest.select(args.selection.package.as_deref())?;
    for package in &packages {
        Output::step(format!("{}: create-srpm", package.name));
        let srpm = SrpmBuilder::new(env, &src_config, &repo.dir, package, srpm_options).build()?;
        Output::success(format!("published {}", srpm.display()));

        Output::step(format!("{}: mock ({})", package.name, mock_options.target));
        let outcome = MockBuilder::new(
            env,
            &inputs.dnf_config,
            &inputs.template,
            &repo.dir,
            package,
            mock_options.clone(),
        )
        .build()?;
        report(&outcome);
    }

    Output::blank();
    Output::success(format!("built {} package(s)", packages.len()));
    Ok(())
}
