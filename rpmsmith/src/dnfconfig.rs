//! DNF repo bundle configuration and repo URL resolution.
//!
//! A repo bundle groups the repositories of one distribution release
//! (BaseOS, AppStream, CRB, ...) behind a single base URL format. Packages
//! pull bundles into their mock chroot through `build.repo-bundle`.

use crate::error::ConfigError;
use crate::manifest::{RepoBundleRef, RepoParamsOverride};
use crate::srcconfig::resolve_version;
use crate::template::Template;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Placeholders a base URL format may use.
pub const BASEURL_KEYS: &[&str] = &["host", "repo", "arch", "version"];

/// Priority reserved for the local dependency repo.
pub const RESERVED_PRIORITY: u32 = 1;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RepoDefaults {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawRepoBundle {
    baseurl_format: String,
    #[serde(default)]
    gpgcheck: bool,
    #[serde(default)]
    gpgkey: Option<String>,
    #[serde(default)]
    use_base_arch: bool,
    #[serde(default)]
    priority: Option<u32>,
    #[serde(default)]
    version_labels: BTreeMap<String, String>,
    #[serde(default)]
    repo: BTreeMap<String, RepoDefaults>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawDnfConfig {
    #[serde(default)]
    repo_bundle: BTreeMap<String, RawRepoBundle>,
}

/// A validated repo bundle.
#[derive(Debug, Clone)]
pub struct DnfRepoBundle {
    pub baseurl_format: Template,
    pub gpgcheck: bool,
    pub gpgkey: Option<String>,
    pub use_base_arch: bool,
    /// Always greater than [`RESERVED_PRIORITY`].
    pub priority: u32,
    pub version_labels: BTreeMap<String, String>,
    pub repos: BTreeMap<String, RepoDefaults>,
}

/// A fully resolved repository, ready for the mock config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoParams {
    pub name: String,
    pub base_url: String,
    pub enabled: bool,
    pub exclude: Option<String>,
    pub priority: u32,
    pub gpgcheck: bool,
    pub gpgkey: Option<String>,
}

/// Map an architecture to the one its repos are published under.
pub fn base_arch(arch: &str) -> &str {
    match arch {
        "i686" => "x86_64",
        other => other,
    }
}

#[derive(Debug, Clone, Default)]
pub struct DnfConfig {
    host: String,
    bundles: BTreeMap<String, DnfRepoBundle>,
}

impl DnfConfig {
    /// Load the config, rendering base URLs against `host`.
    pub fn load(path: &Path, host: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, host).map_err(|err| err.at(path))
    }

    /// Parse and validate. Any bad template or priority fails the whole load.
    pub fn parse(content: &str, host: &str) -> Result<Self, ConfigError> {
        let raw: RawDnfConfig = serde_yaml::from_str(content)
            .map_err(|source| ConfigError::Parse { path: None, source })?;

        let mut bundles = BTreeMap::new();
        for (name, bundle) in raw.repo_bundle {
            let baseurl_format = Template::parse_with_keys(&bundle.baseurl_format, BASEURL_KEYS)
                .map_err(|err| ConfigError::template(format!("repo bundle '{name}'"), err))?;
            let priority = match bundle.priority {
                Some(priority) if priority > RESERVED_PRIORITY => priority,
                _ => return Err(ConfigError::InvalidPriority { bundle: name }),
            };
            bundles.insert(
                name,
                DnfRepoBundle {
                    baseurl_format,
                    gpgcheck: bundle.gpgcheck,
                    gpgkey: bundle.gpgkey,
                    use_base_arch: bundle.use_base_arch,
                    priority,
                    version_labels: bundle.version_labels,
                    repos: bundle.repo,
                },
            );
        }
        Ok(Self {
            host: host.to_string(),
            bundles,
        })
    }

    pub fn bundle(&self, name: &str) -> Result<&DnfRepoBundle, ConfigError> {
        self.bundles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownRepoBundle(name.to_string()))
    }

    pub fn bundle_names(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    /// Resolve one repo of a bundle.
    pub fn resolve(
        &self,
        bundle_name: &str,
        repo: &str,
        arch: &str,
        version: Option<&str>,
        overrides: Option<&RepoParamsOverride>,
    ) -> Result<RepoParams, ConfigError> {
        let bundle = self.bundle(bundle_name)?;
        let defaults = bundle.repos.get(repo).ok_or_else(|| ConfigError::UnknownRepo {
            bundle: bundle_name.to_string(),
            repo: repo.to_string(),
        })?;

        let arch = if bundle.use_base_arch {
            base_arch(arch)
        } else {
            arch
        };
        let version = resolve_version(bundle_name, &bundle.version_labels, version)?;
        let base_url = bundle
            .baseurl_format
            .render(&[
                ("host", self.host.as_str()),
                ("repo", repo),
                ("arch", arch),
                ("version", version),
            ])
            .map_err(|err| ConfigError::template(format!("repo bundle '{bundle_name}'"), err))?;

        let (enabled, exclude, priority) = match overrides {
            Some(o) => {
                let priority = match o.priority {
                    Some(RESERVED_PRIORITY) => {
                        return Err(ConfigError::ReservedPriority {
                            repo: repo.to_string(),
                        });
                    }
                    Some(p) if p != 0 => p,
                    _ => bundle.priority,
                };
                (
                    o.enabled.unwrap_or(defaults.enabled),
                    o.exclude.clone(),
                    priority,
                )
            }
            None => (defaults.enabled, None, bundle.priority),
        };

        Ok(RepoParams {
            name: repo.to_string(),
            base_url,
            enabled,
            exclude,
            priority,
            gpgcheck: bundle.gpgcheck,
            gpgkey: bundle.gpgkey.clone(),
        })
    }

    /// Resolve every repo of a referenced bundle, applying its overrides.
    ///
    /// Overrides naming a repo the bundle does not define are rejected.
    pub fn resolve_ref(
        &self,
        bundle_ref: &RepoBundleRef,
        arch: &str,
    ) -> Result<Vec<RepoParams>, ConfigError> {
        let bundle = self.bundle(&bundle_ref.name)?;
        if let Some(repo) = bundle_ref
            .overrides
            .keys()
            .find(|repo| !bundle.repos.contains_key(*repo))
        {
            return Err(ConfigError::UnknownRepo {
                bundle: bundle_ref.name.clone(),
                repo: repo.clone(),
            });
        }

        bundle
            .repos
            .keys()
            .map(|repo| {
                self.resolve(
                    &bundle_ref.name,
                    repo,
                    arch,
                    bundle_ref.version.as_deref(),
                    bundle_ref.overrides.get(repo),
                )
            })
            .collect()
    }
}
