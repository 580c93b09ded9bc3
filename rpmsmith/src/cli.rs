//! CLI argument definitions for rpmsmith.
//!
//! Kept apart from `main.rs` so tests and library code can build a
//! [`Config`] from parsed arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::config::{Config, absolute_path, default_root};

#[derive(Debug, Parser)]
#[command(name = "rpmsmith")]
#[command(about = "Rebuild modified RPM packages from git repositories")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Directories, config files and hosts shared by every command.
///
/// Unset values fall back to the default layout under the user's cache
/// directory.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Discard stdout of external tools
    #[arg(long, short, global = true, env = "RPMSMITH_QUIET")]
    pub quiet: bool,

    /// Directory holding cloned package repositories
    #[arg(long, global = true, env = "RPMSMITH_SRC_DIR")]
    pub src_dir: Option<PathBuf>,

    /// Directory for per-package working trees
    #[arg(long, global = true, env = "RPMSMITH_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Directory where SRPMs and RPMs are published
    #[arg(long, global = true, env = "RPMSMITH_DEST_DIR")]
    pub dest_dir: Option<PathBuf>,

    /// Directory holding public keys named by manifests
    #[arg(long, global = true, env = "RPMSMITH_PKI_DIR")]
    pub pki_dir: Option<PathBuf>,

    /// Source bundle configuration file
    #[arg(long, global = true, env = "RPMSMITH_SRC_CONFIG")]
    pub src_config: Option<PathBuf>,

    /// DNF repo bundle configuration file
    #[arg(long, global = true, env = "RPMSMITH_DNF_CONFIG")]
    pub dnf_config: Option<PathBuf>,

    /// Mock config template (built-in template if unset)
    #[arg(long, global = true, env = "RPMSMITH_MOCK_TEMPLATE")]
    pub mock_template: Option<PathBuf>,

    /// Host substituted for {host} in source URLs
    #[arg(long, global = true, env = "RPMSMITH_SRC_HOST")]
    pub src_host: Option<String>,

    /// Path prefix substituted for {path-prefix} in source URLs
    #[arg(long, global = true, env = "RPMSMITH_SRC_PATH_PREFIX")]
    pub src_path_prefix: Option<String>,

    /// Host substituted for {host} in DNF base URLs
    #[arg(long, global = true, env = "RPMSMITH_DNF_HOST")]
    pub dnf_host: Option<String>,
}

impl GlobalArgs {
    pub fn config(&self) -> Config {
        let mut config = Config::with_root(&default_root());
        let pick = |flag: &Option<PathBuf>, default: PathBuf| {
            flag.as_deref().map(absolute_path).unwrap_or(default)
        };

        config.src_dir = pick(&self.src_dir, config.src_dir);
        config.work_dir = pick(&self.work_dir, config.work_dir);
        config.dest_dir = pick(&self.dest_dir, config.dest_dir);
        config.pki_dir = pick(&self.pki_dir, config.pki_dir);
        config.src_config = pick(&self.src_config, config.src_config);
        config.dnf_config = pick(&self.dnf_config, config.dnf_config);
        config.mock_template = self.mock_template.as_deref().map(absolute_path);
        if let Some(host) = &self.src_host {
            config.src_host = host.clone();
        }
        if let Some(prefix) = &self.src_path_prefix {
            config.src_path_prefix = prefix.clone();
        }
        if let Some(host) = &self.dnf_host {
            config.dnf_host = host.clone();
        }
        config.quiet = self.quiet;
        config
    }
}

impl Cli {
    pub fn config(&self) -> Config {
        self.global.config()
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clone a package repository into the source directory
    Clone(commands::clone::CloneArgs),

    /// Build source RPMs for the packages of a repository
    CreateSrpm(commands::create_srpm::CreateSrpmArgs),

    /// Build binary RPMs from source RPMs with mock
    Mock(commands::mock::MockArgs),

    /// Run create-srpm and then mock for each package
    Build(commands::build::BuildArgs),

    /// Check that the tools, directories and configs are usable
    Checkenv(commands::checkenv::CheckenvArgs),

    /// List upstream sources that are fetched without verification
    ListUnverifiedSources(commands::list_unverified::ListUnverifiedArgs),
}
