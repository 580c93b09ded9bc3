//! `rpmsmith list-unverified-sources`: sources fetched with `skip-check`.
//!
//! For each one, prints where it comes from and, when it has already been
//! fetched into the package's upstream directory, its SHA-256 so it can be
//! compared against a trusted value by hand.

use super::RepoSelection;
use crate::config::Config;
use crate::git::archive_name;
use crate::manifest::{Manifest, SourceLocator, UpstreamSrc};
use crate::output::Output;
use crate::srcconfig::{SrcConfig, SrcHost};
use anyhow::{Context, Result};
use clap::Args;
use rpmsmith_common::checksum::sha256_file;
use rpmsmith_common::http::url_file_name;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ListUnverifiedArgs {
    #[command(flatten)]
    pub selection: RepoSelection,
}

/// One source that is not signature-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedSource {
    pub package: String,
    /// Download URL, or `<git url>@<revision>`.
    pub location: String,
    /// Where the fetched file lands in the work tree.
    pub local_file: Option<PathBuf>,
}

pub fn run(args: ListUnverifiedArgs, config: &Config) -> Result<()> {
    let repo = args.selection.load(config)?;
    let src_config = SrcConfig::load(&config.src_config)?;
    let found = find_unverified(
        config,
        &src_config,
        &repo.manifest,
        args.selection.package.as_deref(),
    )?;

    if found.is_empty() {
        Output::success("every upstream source is signature-checked");
        return Ok(());
    }

    for source in &found {
        Output::step(format!("{}: {}", source.package, source.location));
        match source.local_file.as_deref().filter(|p| p.is_file()) {
            Some(path) => {
                let digest = sha256_file(path)
                    .with_context(|| format!("failed to hash {}", path.display()))?;
                Output::kv("sha256", digest);
            }
            None => Output::kv("sha256", "(not fetched yet)"),
        }
    }
    Output::blank();
    Output::warning(format!("{} unverified source(s)", found.len()));
    Ok(())
}

pub fn find_unverified(
    config: &Config,
    src_config: &SrcConfig,
    manifest: &Manifest,
    package: Option<&str>,
) -> Result<Vec<UnverifiedSource>> {
    let host = SrcHost::new(&config.src_host, &config.src_path_prefix);
    let mut found = Vec::new();

    for pkg in manifest.select(package)? {
        let upstream = config.upstream_dir(&pkg.name);
        for src in pkg.upstream_sources.iter().filter(|s| is_unverified(s)) {
            let (location, file_name) = match src.locator().map_err(anyhow::Error::msg)? {
                SourceLocator::Git(git) => (
                    format!("{}@{}", git.url, git.revision),
                    Some(archive_name(&pkg.name, &git.revision)),
                ),
                SourceLocator::Bundle(_) | SourceLocator::Url(_) => {
                    let resolved = src_config.resolve(&host, &pkg.name, src)?;
                    let name = url_file_name(&resolved.source_url).map(str::to_string);
                    (resolved.source_url, name)
                }
            };
            found.push(UnverifiedSource {
                package: pkg.name.clone(),
                location,
                local_file: file_name.map(|name| upstream.join(name)),
            });
        }
    }
    Ok(found)
}

fn is_unverified(src: &UpstreamSrc) -> bool {
    src.signature.skip_check
}
