//! Source package (SRPM) builder.
//!
//! Stages, in order: clean, fetchUpstream, verifyUpstream,
//! setupRpmbuildTree, buildPrep, buildSrpm, copyResultsToDestDir. The
//! first failing stage aborts the package.

use crate::error::{BuilderKind, StageError, VerifyError};
use crate::git;
use crate::manifest::{Manifest, Package, PackageType, SourceLocator, UpstreamSrc};
use crate::pipeline::{
    BuildEnv, PipelineId, copy_into, files_matching, find_exactly_one, remove_dir, reset_dir,
};
use crate::srcconfig::{SrcConfig, SrcHost};
use crate::verify::{check_rpm_signature, verify_detached};
use anyhow::{Context, Result, bail};
use regex::Regex;
use rpmsmith_common::http::fetch_to;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Appended to the Release value of unmodified SRPMs.
pub const RELEASE_SUFFIX_MACRO: &str = "%{?rpmsmith_release:.%{rpmsmith_release}}";

/// Macro name set from a package's `release` field.
pub const RELEASE_MACRO: &str = "rpmsmith_release";

#[derive(Debug, Clone, Copy, Default)]
pub struct SrpmOptions {
    pub skip_build_prep: bool,
}

/// A downloaded (or archived) upstream source.
#[derive(Debug)]
struct Fetched<'p> {
    src: &'p UpstreamSrc,
    file: PathBuf,
    signature: Option<PathBuf>,
    public_key: Option<PathBuf>,
    /// Git sources are verified while the clone still exists.
    from_git: bool,
}

pub struct SrpmBuilder<'a> {
    id: PipelineId,
    env: &'a BuildEnv,
    src_config: &'a SrcConfig,
    repo_dir: &'a Path,
    package: &'a Package,
    options: SrpmOptions,
}

impl<'a> SrpmBuilder<'a> {
    pub fn new(
        env: &'a BuildEnv,
        src_config: &'a SrcConfig,
        repo_dir: &'a Path,
        package: &'a Package,
        options: SrpmOptions,
    ) -> Self {
        Self {
            id: PipelineId::new(&package.name, BuilderKind::Srpm),
            env,
            src_config,
            repo_dir,
            package,
            options,
        }
    }

    fn pkg(&self) -> &str {
        &self.package.name
    }

    fn topdir(&self) -> PathBuf {
        self.env.config.rpmbuild_dir(self.pkg())
    }

    fn topdir_define(&self) -> String {
        format!("_topdir {}", self.topdir().display())
    }

    /// Run every stage. Returns the published SRPM.
    pub fn build(&self) -> Result<PathBuf, StageError> {
        let id = &self.id;
        let standalone = self.package.package_type == PackageType::Standalone;

        id.stage("clean", || self.clean())?;

        let fetched = if standalone {
            debug!(package = self.pkg(), "standalone package, nothing to fetch");
            Vec::new()
        } else {
            let fetched = id.stage("fetchUpstream", || self.fetch_upstream())?;
            id.stage("verifyUpstream", || self.verify_upstream(&fetched))?;
            fetched
        };

        let spec = id.stage("setupRpmbuildTree", || self.setup_rpmbuild_tree(&fetched))?;

        if self.options.skip_build_prep {
            info!(package = self.pkg(), "skipping %prep check");
        } else {
            id.stage("buildPrep", || self.build_prep(&spec))?;
        }
        id.stage("buildSrpm", || self.build_srpm(&spec))?;
        id.stage("copyResultsToDestDir", || self.copy_results())
    }

    fn clean(&self) -> Result<()> {
        let config = &self.env.config;
        remove_dir(&self.topdir())?;
        reset_dir(&config.upstream_dir(self.pkg()))?;
        reset_dir(&config.dest_srpm_dir(self.pkg()))
    }

    fn fetch_upstream(&self) -> Result<Vec<Fetched<'a>>> {
        let config = &self.env.config;
        let package: &'a Package = self.package;
        let pkg = package.name.as_str();
        let package_type = package.package_type;
        let sources = &package.upstream_sources;

        if package_type.is_srpm() && sources.len() != 1 {
            bail!(
                "{package_type} packages need exactly one upstream source, found {}",
                sources.len()
            );
        }

        let upstream = config.upstream_dir(pkg);
        let host = SrcHost::new(&config.src_host, &config.src_path_prefix);
        let mut fetched = Vec::with_capacity(sources.len());

        for src in sources {
            check_signature_contract(package_type, src)?;

            let public_key = match src.public_key() {
                Some(name) if !src.signature.skip_check => {
                    let path = config.public_key(name);
                    if !path.is_file() {
                        return Err(VerifyError::MissingKey { path }.into());
                    }
                    Some(path)
                }
                _ => None,
            };

            if let SourceLocator::Git(revision) = src.locator().map_err(anyhow::Error::msg)? {
                let file = git::fetch_revision(
                    self.env.exec(),
                    pkg,
                    &revision.url,
                    &revision.revision,
                    public_key.as_deref(),
                    &upstream,
                )?;
                fetched.push(Fetched {
                    src,
                    file,
                    signature: None,
                    public_key,
                    from_git: true,
                });
                continue;
            }

            let resolved = self.src_config.resolve(&host, pkg, src)?;
            info!(url = %resolved.source_url, "downloading");
            let file = fetch_to(&resolved.source_url, &upstream)
                .with_context(|| format!("failed to download {}", resolved.source_url))?;

            let signature = if src.signature.skip_check || package_type.is_srpm() {
                None
            } else {
                let Some(url) = resolved.signature_url else {
                    bail!(
                        "no detached signature URL for {}; set signature.detached-sig.full-url or skip-check",
                        resolved.source_url
                    );
                };
                info!(%url, "downloading signature");
                Some(
                    fetch_to(&url, &upstream)
                        .with_context(|| format!("failed to download {url}"))?,
                )
            };

            fetched.push(Fetched {
                src,
                file,
                signature,
                public_key,
                from_git: false,
            });
        }
        Ok(fetched)
    }

    fn verify_upstream(&self, fetched: &[Fetched<'_>]) -> Result<()> {
        let exec = self.env.exec();
        for item in fetched {
            if self.package.package_type.is_srpm() {
                let is_srpm = item
                    .file
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().ends_with(".src.rpm"));
                if !is_srpm {
                    return Err(VerifyError::NotSrpm {
                        path: item.file.clone(),
                    }
                    .into());
                }
            }

            if item.src.signature.skip_check {
                warn!(source = %item.src.describe(), "signature check skipped");
                continue;
            }

            if self.package.package_type.is_srpm() {
                check_rpm_signature(exec, &item.file)?;
            } else if item.from_git {
                debug!(file = %item.file.display(), "verified during fetch");
            } else {
                let (Some(sig), Some(key)) = (&item.signature, &item.public_key) else {
                    bail!("{} has no signature to verify", item.file.display());
                };
                verify_detached(exec, &item.file, sig, key)?;
            }
        }
        Ok(())
    }

    /// Build the rpmbuild tree. Returns the spec file to build.
    fn setup_rpmbuild_tree(&self, fetched: &[Fetched<'_>]) -> Result<PathBuf> {
        let topdir = self.topdir();
        let sources_dir = topdir.join("SOURCES");
        let specs_dir = topdir.join("SPECS");
        let srpms_dir = topdir.join("SRPMS");
        let package_type = self.package.package_type;

        if package_type.is_srpm() {
            let srpm = fetched
                .first()
                .context("no upstream SRPM was fetched")?
                .file
                .to_string_lossy()
                .into_owned();
            self.env
                .exec()
                .exec("rpm", &["-i", "--define", &self.topdir_define(), &srpm])?;
            for dir in [&sources_dir, &specs_dir] {
                if !dir.is_dir() {
                    bail!("installing {srpm} did not create {}", dir.display());
                }
            }
            fs::create_dir_all(&srpms_dir)
                .with_context(|| format!("failed to create {}", srpms_dir.display()))?;
        } else {
            for dir in [&sources_dir, &specs_dir, &srpms_dir] {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            for item in fetched {
                copy_into(&item.file, &sources_dir)?;
            }
        }

        if package_type == PackageType::UnmodifiedSrpm {
            let spec = find_exactly_one(&specs_dir, "*.spec")?;
            patch_release_file(&spec)?;
            return Ok(spec);
        }

        self.overlay_repo_files(&sources_dir, &specs_dir)
    }

    /// Copy the repo's spec, patches and sources over the upstream tree.
    fn overlay_repo_files(&self, sources_dir: &Path, specs_dir: &Path) -> Result<PathBuf> {
        let source_dir = self.package.source_dir(self.repo_dir);
        let repo_spec = find_exactly_one(&source_dir, "*.spec")
            .with_context(|| format!("looking for the spec file of {}", self.pkg()))?;

        for stale in files_matching(specs_dir, "*.spec")? {
            fs::remove_file(&stale)
                .with_context(|| format!("failed to remove {}", stale.display()))?;
        }
        let spec = copy_into(&repo_spec, specs_dir)?;

        let entries = fs::read_dir(&source_dir)
            .with_context(|| format!("failed to read {}", source_dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path == repo_spec {
                continue;
            }
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            if name.starts_with('.') || name == Manifest::FILE_NAME {
                continue;
            }
            copy_into(&path, sources_dir)?;
        }
        Ok(spec)
    }

    fn build_prep(&self, spec: &Path) -> Result<()> {
        let spec = spec.to_string_lossy();
        self.env.exec().exec(
            "rpmbuild",
            &["--verbose", "--nodeps", "--define", &self.topdir_define(), "-bp", &spec],
        )?;
        Ok(())
    }

    fn build_srpm(&self, spec: &Path) -> Result<()> {
        let topdir = self.topdir_define();
        let release = self
            .package
            .release
            .as_ref()
            .map(|release| format!("{RELEASE_MACRO} {release}"));
        let spec = spec.to_string_lossy().into_owned();

        let mut args = vec!["--define", topdir.as_str()];
        if let Some(release) = &release {
            args.extend(["--define", release.as_str()]);
        }
        args.extend(["-bs", spec.as_str()]);
        self.env.exec().exec("rpmbuild", &args)?;
        Ok(())
    }

    fn copy_results(&self) -> Result<PathBuf> {
        let srpm = find_exactly_one(&self.topdir().join("SRPMS"), "*.src.rpm")?;
        let dest_dir = self.env.config.dest_srpm_dir(self.pkg());
        fs::create_dir_all(&dest_dir)
            .with_context(|| format!("failed to create {}", dest_dir.display()))?;
        let dest = copy_into(&srpm, &dest_dir)?;
        info!(srpm = %dest.display(), "published");
        Ok(dest)
    }
}

/// SRPM sources are checked with `rpm -K` and may not carry a detached
/// signature. Other sources need a key unless the check is skipped.
fn check_signature_contract(package_type: PackageType, src: &UpstreamSrc) -> Result<()> {
    let locator = src.locator().map_err(anyhow::Error::msg)?;
    if package_type.is_srpm() {
        if matches!(locator, SourceLocator::Git(_)) {
            bail!("{package_type} packages cannot use a git upstream source");
        }
        if src.signature.detached_sig.is_some() {
            bail!("{package_type} sources must not declare a detached signature or public key");
        }
        return Ok(());
    }
    if src.signature.skip_check {
        return Ok(());
    }
    if src.public_key().is_none() {
        bail!(
            "upstream source {} needs signature.detached-sig.public-key or signature.skip-check",
            src.describe()
        );
    }
    Ok(())
}

/// Append [`RELEASE_SUFFIX_MACRO`] to the single Release line of a spec.
///
/// A trailing comment on the line is kept after the new value, as is a
/// CRLF line ending.
pub fn patch_release(spec: &str) -> Result<String> {
    let re = Regex::new(r"(?mi)^(release[ \t]*:[ \t]*)([^#\s][^#\r\n]*?)([ \t]*(?:#[^\r\n]*)?\r?)$")
        .context("invalid Release pattern")?;
    let count = re.find_iter(spec).count();
    if count != 1 {
        bail!("expected exactly one Release line in spec, found {count}");
    }
    Ok(re
        .replace(spec, |caps: &regex::Captures<'_>| {
            format!("{}{}{RELEASE_SUFFIX_MACRO}{}", &caps[1], &caps[2], &caps[3])
        })
        .into_owned())
}

fn patch_release_file(spec: &Path) -> Result<()> {
    let content =
        fs::read_to_string(spec).with_context(|| format!("failed to read {}", spec.display()))?;
    let patched = patch_release(&content).with_context(|| format!("in {}", spec.display()))?;
    fs::write(spec, patched).with_context(|| format!("failed to write {}", spec.display()))
}
