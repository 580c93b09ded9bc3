//! `rpmsmith mock`: rebuild binary RPMs in a mock chroot.

use super::RepoSelection;
use crate::dnfconfig::DnfConfig;
use crate::mock_build::{MockBuilder, MockOptions, MockOutcome};
use crate::mock_cfg::MockCfgTemplate;
use crate::output::Output;
use crate::pipeline::{BuildEnv, file_names};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct MockTargetArgs {
    /// Target architecture
    #[arg(long, short, default_value = std::env::consts::ARCH)]
    pub target: String,

    /// Pass --nocheck to mock, skipping %check
    #[arg(long)]
    pub nocheck: bool,
}

#[derive(Debug, Args)]
pub struct MockArgs {
    #[command(flatten)]
    pub selection: RepoSelection,

    #[command(flatten)]
    pub target: MockTargetArgs,

    /// Write the mock config and print the commands a build would run
    #[arg(long)]
    pub only_create_cfg: bool,
}

/// Configs every mock run needs, loaded once per invocation.
pub struct MockInputs {
    pub dnf_config: DnfConfig,
    pub template: MockCfgTemplate,
}

impl MockInputs {
    pub fn load(env: &BuildEnv) -> Result<Self> {
        let config = &env.config;
        Ok(Self {
            dnf_config: DnfConfig::load(&config.dnf_config, &config.dnf_host)?,
            template: MockCfgTemplate::load(config.mock_template.as_deref())?,
        })
    }
}

pub fn run(args: MockArgs, env: &BuildEnv) -> Result<()> {
    let repo = args.selection.load(&env.config)?;
    let inputs = MockInputs::load(env)?;
    let options = MockOptions {
        target: args.target.target.clone(),
        nocheck: args.target.nocheck,
        only_create_cfg: args.only_create_cfg,
    };

    for package in repo.manifest.select(args.selection.package.as_deref())? {
        Output::step(format!("{}: mock ({})", package.name, options.target));
        let outcome = MockBuilder::new(
            env,
            &inputs.dnf_config,
            &inputs.template,
            &repo.dir,
            package,
            options.clone(),
        )
        .build()?;
        report(&outcome);
    }
    Ok(())
}

pub(crate) fn report(outcome: &MockOutcome) {
    match outcome {
        MockOutcome::ConfigOnly { cfg, script } => {
            Output::success(format!("wrote {}", cfg.display()));
            for line in script.lines().skip_while(|l| l.starts_with('#') || l.starts_with("set ")) {
                Output::dry_run(line);
            }
        }
        MockOutcome::Built { rpms } => {
            for (arch, files) in rpms {
                Output::success(format!("published {} {arch} RPM(s)", files.len()));
                for name in file_names(files) {
                    Output::list_item(name);
                }
            }
        }
    }
}
