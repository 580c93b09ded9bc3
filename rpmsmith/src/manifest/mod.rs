//! Per-repository package manifest (`rpmsmith.yaml`).
//!
//! The manifest lists the packages a repository rebuilds, in build order,
//! with their upstream sources and mock build settings. It is loaded once
//! per invocation and never mutated.

pub mod build;
pub mod upstream;

pub use build::{Build, RepoBundleRef, RepoParamsOverride};
pub use upstream::{
    DetachedSig, GitRevision, SignatureSpec, SourceLocator, SrcBundleRef, SrcOverride, UpstreamSrc,
};

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// How a package's build tree is assembled.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PackageType {
    /// Upstream SRPM, overlaid with the repo's spec, patches and sources.
    Srpm,
    /// Upstream SRPM rebuilt as-is, apart from a release suffix.
    UnmodifiedSrpm,
    /// Upstream tarball(s) plus the repo's spec, patches and sources.
    Tarball,
    /// Everything comes from the repo; nothing is fetched.
    Standalone,
}

impl PackageType {
    /// True for types whose single upstream source is an SRPM.
    pub fn is_srpm(self) -> bool {
        matches!(self, PackageType::Srpm | PackageType::UnmodifiedSrpm)
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackageType::Srpm => "srpm",
            PackageType::UnmodifiedSrpm => "unmodified-srpm",
            PackageType::Tarball => "tarball",
            PackageType::Standalone => "standalone",
        };
        f.write_str(s)
    }
}

/// One package entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Package {
    pub name: String,

    /// Package files live in `<repo>/<name>/` instead of the repo root.
    #[serde(default)]
    pub subdir: bool,

    /// Value for the `rpmsmith_release` macro passed to rpmbuild.
    #[serde(default)]
    pub release: Option<String>,

    #[serde(rename = "type")]
    pub package_type: PackageType,

    #[serde(default)]
    pub upstream_sources: Vec<UpstreamSrc>,

    #[serde(default)]
    pub build: Build,
}

impl Package {
    /// Directory holding this package's spec, patches and extra sources.
    pub fn source_dir(&self, repo_dir: &Path) -> PathBuf {
        if self.subdir {
            repo_dir.join(&self.name)
        } else {
            repo_dir.to_path_buf()
        }
    }
}

/// The rpmsmith.yaml manifest.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Packages in build order.
    #[serde(default, rename = "package")]
    pub packages: Vec<Package>,
}

impl Manifest {
    /// Manifest file name at the root of each source repository.
    pub const FILE_NAME: &'static str = "rpmsmith.yaml";

    /// Load the manifest of the repository rooted at `repo_dir`.
    pub fn load(repo_dir: &Path) -> Result<Self, ConfigError> {
        Self::load_from(&repo_dir.join(Self::FILE_NAME))
    }

    /// Load and validate a manifest from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::parse(&content).map_err(|err| err.at(path))?;
        Ok(manifest)
    }

    /// Parse and validate manifest YAML.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let manifest: Self = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: None,
            source,
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for pkg in &self.packages {
            if pkg.name.is_empty()
                || !pkg
                    .name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'))
            {
                return Err(ConfigError::invalid(format!(
                    "invalid package name '{}'",
                    pkg.name
                )));
            }
            if !seen.insert(pkg.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "package '{}' is listed more than once",
                    pkg.name
                )));
            }
            for (idx, src) in pkg.upstream_sources.iter().enumerate() {
                src.locator().map_err(|message| {
                    ConfigError::invalid(format!(
                        "package '{}', upstream source #{}: {message}",
                        pkg.name,
                        idx + 1
                    ))
                })?;
            }
            if pkg.package_type == PackageType::Standalone && !pkg.upstream_sources.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "package '{}' is standalone but declares upstream sources",
                    pkg.name
                )));
            }
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Packages to process: the named one, or all of them in manifest order.
    pub fn select(&self, name: Option<&str>) -> Result<Vec<&Package>, ConfigError> {
        match name {
            Some(name) => self
                .find(name)
                .map(|pkg| vec![pkg])
                .ok_or_else(|| ConfigError::UnknownPackage(name.to_string())),
            None => Ok(self.packages.iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
package:
  - name: libfoo
    subdir: true
    type: tarball
    release: "2.acme"
    upstream-sources:
      - source-bundle:
          name: tarballs
          override:
            version: "1.2.3"
            src-suffix: ".tar.xz"
        signature:
          detached-sig:
            public-key: acme.pem
            on-uncompressed: true
      - full-url: "{host}/extra/data.tar.gz"
        signature:
          skip-check: true
    build:
      include: [ "mock/extra.inc" ]
      dependencies: [ libbar ]
      repo-bundle:
        - name: el9
          version: "9.3"
          override:
            CRB:
              enabled: true
              priority: 5
  - name: bar
    type: srpm
    upstream-sources:
      - source-bundle:
          name: srpm
"#;

    #[test]
    fn parses_sample_manifest() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(manifest.packages.len(), 2);

        let foo = &manifest.packages[0];
        assert_eq!(foo.name, "libfoo");
        assert!(foo.subdir);
        assert_eq!(foo.package_type, PackageType::Tarball);
        assert_eq!(foo.release.as_deref(), Some("2.acme"));
        assert_eq!(foo.upstream_sources.len(), 2);
        assert_eq!(foo.build.include, vec!["mock/extra.inc"]);
        assert_eq!(foo.build.dependencies, vec!["libbar"]);
        let crb = &foo.build.repo_bundle[0].overrides["CRB"];
        assert_eq!(crb.enabled, Some(true));
        assert_eq!(crb.priority, Some(5));

        let sig = foo.upstream_sources[0].signature.detached_sig.as_ref().unwrap();
        assert!(sig.on_uncompressed);
        assert_eq!(sig.public_key.as_deref(), Some("acme.pem"));
        assert!(foo.upstream_sources[1].signature.skip_check);

        let bar = &manifest.packages[1];
        assert!(!bar.subdir);
        assert_eq!(bar.package_type, PackageType::Srpm);
    }

    #[test]
    fn preserves_manifest_order() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        let names: Vec<_> = manifest.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["libfoo", "bar"]);
    }

    #[test]
    fn source_dir_honors_subdir_flag() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        let repo = Path::new("/src/repo");
        assert_eq!(manifest.packages[0].source_dir(repo), repo.join("libfoo"));
        assert_eq!(manifest.packages[1].source_dir(repo), repo);
    }

    #[test]
    fn rejects_unknown_type() {
        let err = Manifest::parse("package:\n  - name: x\n    type: rpm\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = Manifest::parse("package:\n  - name: x\n    type: srpm\n    colour: red\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn rejects_duplicate_package() {
        let yaml = "package:\n  - name: x\n    type: standalone\n  - name: x\n    type: standalone\n";
        let err = Manifest::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_source_with_two_locators() {
        let yaml = r#"
package:
  - name: x
    type: tarball
    upstream-sources:
      - full-url: "https://example.com/x.tar.gz"
        source-bundle: { name: tarballs }
"#;
        let err = Manifest::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("upstream source #1"));
    }

    #[test]
    fn rejects_standalone_with_sources() {
        let yaml = r#"
package:
  - name: x
    type: standalone
    upstream-sources:
      - full-url: "https://example.com/x.tar.gz"
"#;
        assert!(Manifest::parse(yaml).is_err());
    }

    #[test]
    fn rejects_path_like_package_name() {
        let yaml = "package:\n  - name: ../x\n    type: standalone\n";
        assert!(Manifest::parse(yaml).is_err());
    }

    #[test]
    fn select_by_name_or_all() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(manifest.select(None).unwrap().len(), 2);
        assert_eq!(manifest.select(Some("bar")).unwrap()[0].name, "bar");
        let err = manifest.select(Some("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPackage(name) if name == "nope"));
    }

    #[test]
    fn load_from_repo_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(Manifest::FILE_NAME), SAMPLE).unwrap();
        let manifest = Manifest::load(temp.path()).unwrap();
        assert_eq!(manifest.packages.len(), 2);
    }

    #[test]
    fn load_missing_manifest_names_path() {
        let temp = TempDir::new().unwrap();
        let err = Manifest::load(temp.path()).unwrap_err();
        assert!(err.to_string().contains(Manifest::FILE_NAME));
    }

    #[test]
    fn parse_error_names_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(Manifest::FILE_NAME);
        fs::write(&path, "package: [").unwrap();
        let err = Manifest::load_from(&path).unwrap_err();
        assert!(err.to_string().contains(&path.display().to_string()));
    }
}
