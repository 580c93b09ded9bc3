//! Source bundle configuration and upstream URL resolution.
//!
//! A source bundle names a download location pattern shared by many
//! packages, e.g. a distribution's SRPM mirror or a project's release
//! tarball area. Manifest entries reference a bundle by name and may
//! override its version and suffixes.

use crate::error::ConfigError;
use crate::manifest::{SourceLocator, SrcBundleRef, UpstreamSrc};
use crate::template::Template;
use rpmsmith_common::archive::strip_last_extension;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Placeholders a bundle URL format may use.
pub const BUNDLE_KEYS: &[&str] = &["host", "path-prefix", "pkg", "version", "suffix"];

/// Placeholders a raw `full-url` may use.
pub const RAW_URL_KEYS: &[&str] = &["host", "path-prefix"];

/// Host values substituted into every source URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SrcHost {
    pub host: String,
    pub path_prefix: String,
}

impl SrcHost {
    pub fn new(host: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path_prefix: path_prefix.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawSrcBundle {
    url_format: String,
    default_src_suffix: String,
    #[serde(default)]
    default_sig_suffix: Option<String>,
    #[serde(default)]
    has_detached_sig: bool,
    #[serde(default)]
    version_labels: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawSrcConfig {
    #[serde(default)]
    source_bundle: BTreeMap<String, RawSrcBundle>,
}

/// A validated source bundle.
#[derive(Debug, Clone)]
pub struct SrcBundle {
    pub url_format: Template,
    pub default_src_suffix: String,
    pub default_sig_suffix: Option<String>,
    pub has_detached_sig: bool,
    pub version_labels: BTreeMap<String, String>,
}

/// Concrete URLs for one upstream source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSrc {
    pub source_url: String,
    pub signature_url: Option<String>,
}

/// All source bundles, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SrcConfig {
    bundles: BTreeMap<String, SrcBundle>,
}

impl SrcConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|err| err.at(path))
    }

    /// Parse the YAML and validate every bundle template.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawSrcConfig = serde_yaml::from_str(content)
            .map_err(|source| ConfigError::Parse { path: None, source })?;

        let mut bundles = BTreeMap::new();
        for (name, bundle) in raw.source_bundle {
            let url_format = Template::parse_with_keys(&bundle.url_format, BUNDLE_KEYS)
                .map_err(|err| ConfigError::template(format!("source bundle '{name}'"), err))?;
            if bundle.has_detached_sig && bundle.default_sig_suffix.is_none() {
                return Err(ConfigError::invalid(format!(
                    "source bundle '{name}' has a detached signature but no default-sig-suffix"
                )));
            }
            bundles.insert(
                name,
                SrcBundle {
                    url_format,
                    default_src_suffix: bundle.default_src_suffix,
                    default_sig_suffix: bundle.default_sig_suffix,
                    has_detached_sig: bundle.has_detached_sig,
                    version_labels: bundle.version_labels,
                },
            );
        }
        Ok(Self { bundles })
    }

    pub fn bundle(&self, name: &str) -> Result<&SrcBundle, ConfigError> {
        self.bundles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownSrcBundle(name.to_string()))
    }

    pub fn bundle_names(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    /// Resolve the download and signature URLs of a flat upstream source.
    ///
    /// Git sources have no download URL and are rejected.
    pub fn resolve(
        &self,
        host: &SrcHost,
        pkg: &str,
        src: &UpstreamSrc,
    ) -> Result<ResolvedSrc, ConfigError> {
        let explicit_sig = src
            .signature
            .detached_sig
            .as_ref()
            .and_then(|sig| sig.full_url.as_deref());

        match src.locator().map_err(ConfigError::invalid)? {
            SourceLocator::Bundle(bundle_ref) => {
                let mut resolved =
                    self.resolve_bundle(host, pkg, bundle_ref, src.on_uncompressed())?;
                if let Some(sig) = explicit_sig {
                    resolved.signature_url = Some(render_raw(host, sig)?);
                }
                Ok(resolved)
            }
            SourceLocator::Url(url) => resolve_raw(host, url, explicit_sig),
            SourceLocator::Git(git) => Err(ConfigError::invalid(format!(
                "git source {} has no download URL",
                git.url
            ))),
        }
    }

    /// Resolve a bundle reference with its overrides.
    pub fn resolve_bundle(
        &self,
        host: &SrcHost,
        pkg: &str,
        bundle_ref: &SrcBundleRef,
        on_uncompressed: bool,
    ) -> Result<ResolvedSrc, ConfigError> {
        let bundle = self.bundle(&bundle_ref.name)?;
        let overrides = &bundle_ref.overrides;

        let version = resolve_version(
            &bundle_ref.name,
            &bundle.version_labels,
            overrides.version.as_deref(),
        )?;
        let suffix = overrides
            .src_suffix
            .as_deref()
            .unwrap_or(&bundle.default_src_suffix);

        let source_url = bundle
            .url_format
            .render(&[
                ("host", host.host.as_str()),
                ("path-prefix", host.path_prefix.as_str()),
                ("pkg", pkg),
                ("version", version),
                ("suffix", suffix),
            ])
            .map_err(|err| {
                ConfigError::template(format!("source bundle '{}'", bundle_ref.name), err)
            })?;

        let signature_url = if bundle.has_detached_sig {
            let sig_suffix = overrides
                .sig_suffix
                .as_deref()
                .or(bundle.default_sig_suffix.as_deref())
                .unwrap_or_default();
            Some(signature_url_for(&source_url, sig_suffix, on_uncompressed))
        } else {
            None
        };

        Ok(ResolvedSrc {
            source_url,
            signature_url,
        })
    }
}

/// Resolve a raw `full-url` source and optional raw signature URL.
///
/// Only host and path-prefix are substituted.
pub fn resolve_raw(
    host: &SrcHost,
    url: &str,
    signature_url: Option<&str>,
) -> Result<ResolvedSrc, ConfigError> {
    Ok(ResolvedSrc {
        source_url: render_raw(host, url)?,
        signature_url: signature_url.map(|sig| render_raw(host, sig)).transpose()?,
    })
}

fn render_raw(host: &SrcHost, url: &str) -> Result<String, ConfigError> {
    Template::parse_with_keys(url, RAW_URL_KEYS)
        .and_then(|t| {
            t.render(&[
                ("host", host.host.as_str()),
                ("path-prefix", host.path_prefix.as_str()),
            ])
        })
        .map_err(|err| ConfigError::template("upstream URL", err))
}

/// Signature URL derived from a source URL.
///
/// A signature over the uncompressed payload drops the compression
/// extension first: `foo.tar.gz` with `.sig` gives `foo.tar.sig`.
pub fn signature_url_for(source_url: &str, sig_suffix: &str, on_uncompressed: bool) -> String {
    let base = if on_uncompressed {
        strip_last_extension(source_url)
    } else {
        source_url
    };
    format!("{base}{sig_suffix}")
}

/// Translate a version override through a label map.
///
/// An override that matches a label maps to that label's version, any
/// other override is used verbatim. Without an override the `default`
/// label is required.
pub(crate) fn resolve_version<'a>(
    bundle: &str,
    labels: &'a BTreeMap<String, String>,
    version: Option<&'a str>,
) -> Result<&'a str, ConfigError> {
    match version {
        Some(version) => Ok(labels.get(version).map(String::as_str).unwrap_or(version)),
        None => labels
            .get("default")
            .map(String::as_str)
            .ok_or_else(|| ConfigError::NoDefaultVersion(bundle.to_string())),
    }
}
