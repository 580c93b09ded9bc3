//! Binary package builder driving mock.
//!
//! Stages, in order: fetchSrpm, clean, createCfg, then (unless only the
//! config was requested) init, installdeps, rebuild, copyResultsToDestDir.

use crate::dnfconfig::{DnfConfig, RESERVED_PRIORITY, RepoParams};
use crate::error::{BuilderKind, StageError};
use crate::executor::{DryRunExecutor, Executor};
use crate::manifest::Package;
use crate::mock_cfg::{MOCK_CFG_FILE, MockCfgTemplate};
use crate::pipeline::{BuildEnv, PipelineId, copy_into, file_names, files_matching, reset_dir};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the repo built from already-published dependencies.
pub const LOCAL_DEPS_REPO: &str = "local-deps";

#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    pub target: String,
    pub nocheck: bool,
    pub only_create_cfg: bool,
}

/// What a mock run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Only the config was written. `script` holds the commands a full
    /// run would have executed.
    ConfigOnly { cfg: PathBuf, script: String },
    /// Published RPMs, grouped by architecture.
    Built { rpms: Vec<(String, Vec<PathBuf>)> },
}

pub struct MockBuilder<'a> {
    id: PipelineId,
    env: &'a BuildEnv,
    dnf_config: &'a DnfConfig,
    template: &'a MockCfgTemplate,
    repo_dir: &'a Path,
    package: &'a Package,
    options: MockOptions,
}

impl<'a> MockBuilder<'a> {
    pub fn new(
        env: &'a BuildEnv,
        dnf_config: &'a DnfConfig,
        template: &'a MockCfgTemplate,
        repo_dir: &'a Path,
        package: &'a Package,
        options: MockOptions,
    ) -> Self {
        Self {
            id: PipelineId::new(&package.name, BuilderKind::Mock),
            env,
            dnf_config,
            template,
            repo_dir,
            package,
            options,
        }
    }

    fn pkg(&self) -> &str {
        &self.package.name
    }

    fn arch(&self) -> &str {
        &self.options.target
    }

    pub fn build(&self) -> Result<MockOutcome, StageError> {
        let id = &self.id;

        let srpm = id.stage("fetchSrpm", || self.fetch_srpm())?;
        id.stage("clean", || self.clean())?;
        let cfg = id.stage("createCfg", || self.create_cfg())?;

        if self.options.only_create_cfg {
            let dry_run = DryRunExecutor::new();
            self.run_stages(&dry_run, &cfg, &srpm)?;
            let script = dry_run.script();
            info!(cfg = %cfg.display(), "mock config written; equivalent commands:\n{script}");
            return Ok(MockOutcome::ConfigOnly { cfg, script });
        }

        self.run_stages(self.env.exec(), &cfg, &srpm)?;
        let rpms = id.stage("copyResultsToDestDir", || self.copy_results())?;
        Ok(MockOutcome::Built { rpms })
    }

    /// The SRPM to rebuild: the working tree's copy, else the published one.
    fn fetch_srpm(&self) -> Result<PathBuf> {
        let config = &self.env.config;
        let candidates = [
            config.rpmbuild_dir(self.pkg()).join("SRPMS"),
            config.dest_srpm_dir(self.pkg()),
        ];
        for dir in &candidates {
            let files = files_matching(dir, "*")?;
            match files.as_slice() {
                [] => continue,
                [file] => {
                    let is_srpm = file
                        .file_name()
                        .is_some_and(|n| n.to_string_lossy().ends_with(".src.rpm"));
                    if !is_srpm {
                        bail!("{} is not a source RPM", file.display());
                    }
                    debug!(srpm = %file.display(), "found SRPM");
                    return Ok(file.clone());
                }
                _ => bail!(
                    "expected exactly one SRPM in {}, found: {}",
                    dir.display(),
                    file_names(&files).join(", ")
                ),
            }
        }
        bail!(
            "no SRPM for {} in {} or {}; run create-srpm first",
            self.pkg(),
            candidates[0].display(),
            candidates[1].display()
        )
    }

    fn clean(&self) -> Result<()> {
        let config = &self.env.config;
        let (pkg, arch) = (self.pkg(), self.arch());
        reset_dir(&config.mock_cfg_dir(pkg, arch))?;
        reset_dir(&config.mock_deps_dir(pkg, arch))?;
        reset_dir(&config.mock_results_dir(pkg, arch))
    }

    /// Render the mock config. Returns its path.
    fn create_cfg(&self) -> Result<PathBuf> {
        let config = &self.env.config;
        let (pkg, arch) = (self.pkg(), self.arch());
        let cfg_dir = config.mock_cfg_dir(pkg, arch);

        let mut repos = Vec::new();
        for bundle_ref in &self.package.build.repo_bundle {
            let resolved = self
                .dnf_config
                .resolve_ref(bundle_ref, arch)
                .with_context(|| format!("resolving repo bundle '{}'", bundle_ref.name))?;
            repos.extend(resolved);
        }
        if !self.package.build.dependencies.is_empty() {
            repos.push(self.create_local_deps_repo()?);
        }

        let source_dir = self.package.source_dir(self.repo_dir);
        let mut includes = Vec::new();
        for include in &self.package.build.include {
            let src = source_dir.join(include);
            if !src.is_file() {
                bail!("include file {} does not exist", src.display());
            }
            includes.push(copy_into(&src, &cfg_dir)?);
        }

        let root = format!("rpmsmith-{pkg}-{arch}");
        let rendered = self.template.render(&root, arch, &repos, &includes)?;
        let cfg = cfg_dir.join(MOCK_CFG_FILE);
        fs::write(&cfg, rendered).with_context(|| format!("failed to write {}", cfg.display()))?;
        info!(cfg = %cfg.display(), repos = repos.len(), "wrote mock config");
        Ok(cfg)
    }

    /// Collect published RPMs of dependencies into a local repo.
    fn create_local_deps_repo(&self) -> Result<RepoParams> {
        let config = &self.env.config;
        let arch = self.arch();
        let deps_dir = config.mock_deps_dir(self.pkg(), arch);

        for dep in &self.package.build.dependencies {
            let mut found = 0;
            for dep_arch in result_arches(arch) {
                let dir = config.dest_rpm_dir(dep_arch, dep);
                for rpm in files_matching(&dir, "*.rpm")? {
                    copy_into(&rpm, &deps_dir)?;
                    found += 1;
                }
            }
            if found == 0 {
                bail!("dependency '{dep}' has no published RPMs for {arch}");
            }
        }

        let deps_arg = deps_dir.to_string_lossy();
        self.env.exec().exec("createrepo_c", &[&*deps_arg])?;

        Ok(RepoParams {
            name: LOCAL_DEPS_REPO.to_string(),
            base_url: format!("file://{}", deps_dir.display()),
            enabled: true,
            exclude: None,
            priority: RESERVED_PRIORITY,
            gpgcheck: false,
            gpgkey: None,
        })
    }

    fn run_stages(&self, exec: &dyn Executor, cfg: &Path, srpm: &Path) -> Result<(), StageError> {
        let id = &self.id;
        let cfg = cfg.to_string_lossy();
        let srpm = srpm.to_string_lossy();
        let results = self
            .env
            .config
            .mock_results_dir(self.pkg(), self.arch())
            .to_string_lossy()
            .into_owned();

        id.stage("init", || Ok(exec.exec("mock", &["-r", &cfg, "--init"])?))?;
        id.stage("installdeps", || {
            Ok(exec.exec("mock", &["-r", &cfg, "--installdeps", &srpm])?)
        })?;
        id.stage("rebuild", || {
            let mut args = vec![
                "-r",
                &*cfg,
                "--no-clean",
                "--resultdir",
                results.as_str(),
                "--rebuild",
                &*srpm,
            ];
            if self.options.nocheck {
                args.push("--nocheck");
            }
            Ok(exec.exec("mock", &args)?)
        })
    }

    /// Copy binary RPMs into `RPMS/<arch>/<pkg>/` for the target and noarch.
    fn copy_results(&self) -> Result<Vec<(String, Vec<PathBuf>)>> {
        let config = &self.env.config;
        let results = config.mock_results_dir(self.pkg(), self.arch());
        let mut published = Vec::new();

        for arch in result_arches(self.arch()) {
            let rpms = files_matching(&results, &format!("*.{arch}.rpm"))?;
            if rpms.is_empty() {
                debug!(arch, "no RPMs for architecture");
                continue;
            }
            let dest = config.dest_rpm_dir(arch, self.pkg());
            reset_dir(&dest)?;
            let copied = rpms
                .iter()
                .map(|rpm| copy_into(rpm, &dest))
                .collect::<Result<Vec<_>>>()?;
            info!(arch, count = copied.len(), dest = %dest.display(), "published RPMs");
            published.push((arch.to_string(), copied));
        }

        if published.is_empty() {
            bail!("mock produced no binary RPMs in {}", results.display());
        }
        Ok(published)
    }
}

/// Architectures whose RPMs a build for `target` produces.
fn result_arches(target: &str) -> Vec<&str> {
    if target == "noarch" {
        vec!["noarch"]
    } else {
        vec![target, "noarch"]
    }
}
