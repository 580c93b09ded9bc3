//! Mock build settings for a package.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Per-repo overrides merged into a resolved DNF repo.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RepoParamsOverride {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub exclude: Option<String>,
    /// Priority 1 is reserved for the local dependency repo.
    #[serde(default)]
    pub priority: Option<u32>,
}

/// Reference to a DNF repo bundle.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RepoBundleRef {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Overrides keyed by repo name within the bundle.
    #[serde(default, rename = "override")]
    pub overrides: BTreeMap<String, RepoParamsOverride>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Build {
    /// Files (relative to the package source dir) included from the mock config.
    #[serde(default)]
    pub include: Vec<String>,

    /// Sibling packages whose RPMs feed the local dependency repo.
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub repo_bundle: Vec<RepoBundleRef>,
}
