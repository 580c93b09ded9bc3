//! Upstream source declarations.

use serde::Deserialize;

/// Reference to a named source bundle plus per-entry overrides.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SrcBundleRef {
    pub name: String,
    #[serde(default, rename = "override")]
    pub overrides: SrcOverride,
}

/// Overrides applied on top of a source bundle's defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SrcOverride {
    /// Literal version, or a label from the bundle's version map.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub src_suffix: Option<String>,
    #[serde(default)]
    pub sig_suffix: Option<String>,
}

/// A git repository pinned at a tag or commit.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GitRevision {
    pub url: String,
    /// Tag name or commit hash.
    pub revision: String,
}

/// Detached signature for a flat download.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DetachedSig {
    /// Explicit signature URL. Without it the URL is derived from the
    /// source bundle.
    #[serde(default)]
    pub full_url: Option<String>,

    /// Public key file name, relative to the PKI directory.
    #[serde(default)]
    pub public_key: Option<String>,

    /// The signature covers the decompressed payload.
    #[serde(default)]
    pub on_uncompressed: bool,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SignatureSpec {
    #[serde(default)]
    pub skip_check: bool,
    #[serde(default)]
    pub detached_sig: Option<DetachedSig>,
}

/// One upstream source entry.
///
/// Exactly one of `source-bundle`, `full-url` or `git` must be set.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct UpstreamSrc {
    #[serde(default)]
    pub source_bundle: Option<SrcBundleRef>,
    #[serde(default)]
    pub full_url: Option<String>,
    #[serde(default)]
    pub git: Option<GitRevision>,
    #[serde(default)]
    pub signature: SignatureSpec,
}

/// Where an upstream source comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLocator<'a> {
    Bundle(&'a SrcBundleRef),
    Url(&'a str),
    Git(&'a GitRevision),
}

impl UpstreamSrc {
    pub fn locator(&self) -> Result<SourceLocator<'_>, String> {
        match (&self.source_bundle, &self.full_url, &self.git) {
            (Some(bundle), None, None) => Ok(SourceLocator::Bundle(bundle)),
            (None, Some(url), None) => Ok(SourceLocator::Url(url)),
            (None, None, Some(git)) => Ok(SourceLocator::Git(git)),
            (None, None, None) => Err("one of source-bundle, full-url or git is required".into()),
            _ => Err("only one of source-bundle, full-url or git may be set".into()),
        }
    }

    /// Public key file declared for this source, if any.
    pub fn public_key(&self) -> Option<&str> {
        self.signature
            .detached_sig
            .as_ref()
            .and_then(|sig| sig.public_key.as_deref())
    }

    pub fn on_uncompressed(&self) -> bool {
        self.signature
            .detached_sig
            .as_ref()
            .is_some_and(|sig| sig.on_uncompressed)
    }

    /// Short label for log lines and error messages.
    pub fn describe(&self) -> String {
        match self.locator() {
            Ok(SourceLocator::Bundle(bundle)) => format!("bundle '{}'", bundle.name),
            Ok(SourceLocator::Url(url)) => url.to_string(),
            Ok(SourceLocator::Git(git)) => format!("{}@{}", git.url, git.revision),
            Err(_) => "<invalid source>".to_string(),
        }
    }
}
