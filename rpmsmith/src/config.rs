//! Runtime configuration and the on-disk layout derived from it.
//!
//! `Config` is built once in `main` from CLI flags (with environment
//! fallbacks) and passed by reference to everything that needs a path.
//! Every path in it is absolute.

use directories::BaseDirs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SRC_HOST: &str = "https://vault.centos.org";
pub const DEFAULT_DNF_HOST: &str = "https://dl.rockylinux.org/pub/rocky";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Cloned source repositories, one directory per repo.
    pub src_dir: PathBuf,
    /// Per-package working trees.
    pub work_dir: PathBuf,
    /// Published artifacts.
    pub dest_dir: PathBuf,
    /// Public keys referenced by manifests.
    pub pki_dir: PathBuf,
    pub src_config: PathBuf,
    pub dnf_config: PathBuf,
    /// Mock config template. The built-in template is used when unset.
    pub mock_template: Option<PathBuf>,
    pub src_host: String,
    pub src_path_prefix: String,
    pub dnf_host: String,
    /// Discard stdout of external tools.
    pub quiet: bool,
}

/// Root for all default directories.
pub fn default_root() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.cache_dir().join("rpmsmith"))
        .unwrap_or_else(|| PathBuf::from(".rpmsmith"))
}

/// `path` resolved against the current directory. Already-absolute paths
/// are returned unchanged.
pub fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

impl Config {
    /// Default layout with every directory under `root`.
    pub fn with_root(root: &Path) -> Self {
        let root = absolute_path(root);
        Self {
            src_dir: root.join("src"),
            work_dir: root.join("work"),
            dest_dir: root.join("dest"),
            pki_dir: root.join("pki"),
            src_config: root.join("src-bundles.yaml"),
            dnf_config: root.join("dnf-bundles.yaml"),
            mock_template: None,
            src_host: DEFAULT_SRC_HOST.to_string(),
            src_path_prefix: String::new(),
            dnf_host: DEFAULT_DNF_HOST.to_string(),
            quiet: false,
        }
    }

    pub fn repo_dir(&self, repo: &str) -> PathBuf {
        self.src_dir.join(repo)
    }

    pub fn package_work_dir(&self, pkg: &str) -> PathBuf {
        self.work_dir.join(pkg)
    }

    pub fn upstream_dir(&self, pkg: &str) -> PathBuf {
        self.package_work_dir(pkg).join("upstream")
    }

    /// `_topdir` for rpmbuild.
    pub fn rpmbuild_dir(&self, pkg: &str) -> PathBuf {
        self.package_work_dir(pkg).join("rpmbuild")
    }

    pub fn mock_dir(&self, pkg: &str, arch: &str) -> PathBuf {
        self.package_work_dir(pkg).join(format!("mock-{arch}"))
    }

    pub fn mock_cfg_dir(&self, pkg: &str, arch: &str) -> PathBuf {
        self.mock_dir(pkg, arch).join("mock-cfg")
    }

    pub fn mock_deps_dir(&self, pkg: &str, arch: &str) -> PathBuf {
        self.mock_dir(pkg, arch).join("mock-deps")
    }

    pub fn mock_results_dir(&self, pkg: &str, arch: &str) -> PathBuf {
        self.mock_dir(pkg, arch).join("mock-results")
    }

    pub fn dest_srpm_dir(&self, pkg: &str) -> PathBuf {
        self.dest_dir.join("SRPMS").join(pkg)
    }

    pub fn dest_rpm_dir(&self, arch: &str, pkg: &str) -> PathBuf {
        self.dest_dir.join("RPMS").join(arch).join(pkg)
    }

    pub fn public_key(&self, name: &str) -> PathBuf {
        self.pki_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let config = Config::with_root(Path::new("/r"));
        assert_eq!(config.upstream_dir("foo"), Path::new("/r/work/foo/upstream"));
        assert_eq!(config.rpmbuild_dir("foo"), Path::new("/r/work/foo/rpmbuild"));
        assert_eq!(
            config.mock_results_dir("foo", "x86_64"),
            Path::new("/r/work/foo/mock-x86_64/mock-results")
        );
        assert_eq!(config.dest_srpm_dir("foo"), Path::new("/r/dest/SRPMS/foo"));
        assert_eq!(
            config.dest_rpm_dir("noarch", "foo"),
            Path::new("/r/dest/RPMS/noarch/foo")
        );
        assert_eq!(config.repo_dir("repo"), Path::new("/r/src/repo"));
    }

    #[test]
    fn relative_root_becomes_absolute() {
        let config = Config::with_root(Path::new("rel-root"));
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(config.work_dir, cwd.join("rel-root/work"));
        for path in [
            &config.src_dir,
            &config.work_dir,
            &config.dest_dir,
            &config.pki_dir,
            &config.src_config,
            &config.dnf_config,
        ] {
            assert!(path.is_absolute(), "{} is relative", path.display());
        }
    }

    #[test]
    fn absolute_path_keeps_absolute_input() {
        assert_eq!(absolute_path(Path::new("/srv/rpms")), Path::new("/srv/rpms"));
    }

    #[test]
    fn default_root_is_named_after_tool() {
        assert!(default_root().ends_with("rpmsmith") || default_root().ends_with(".rpmsmith"));
    }
}
