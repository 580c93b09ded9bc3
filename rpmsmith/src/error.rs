//! Error types for rpmsmith.
//!
//! Library code returns these typed errors; command code wraps them in
//! `anyhow` with context.

use crate::template::TemplateError;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

fn at_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!("{}: ", path.display()),
        None => String::new(),
    }
}

/// Errors from loading the manifest or the bundle configs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}invalid YAML: {source}", at_path(path))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{}{message}", at_path(path))]
    Invalid {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("{}{context}: {source}", at_path(path))]
    Template {
        path: Option<PathBuf>,
        context: String,
        #[source]
        source: TemplateError,
    },

    #[error("package '{0}' is not in the manifest")]
    UnknownPackage(String),

    #[error("unknown source bundle '{0}'")]
    UnknownSrcBundle(String),

    #[error("unknown repo bundle '{0}'")]
    UnknownRepoBundle(String),

    #[error("repo '{repo}' is not defined in repo bundle '{bundle}'")]
    UnknownRepo { bundle: String, repo: String },

    #[error("bundle '{0}' has no 'default' version label and no version was given")]
    NoDefaultVersion(String),

    #[error("repo bundle '{bundle}': priority must be set and greater than 1")]
    InvalidPriority { bundle: String },

    #[error("repo '{repo}': priority 1 is reserved for the local dependency repo")]
    ReservedPriority { repo: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            path: None,
            message: message.into(),
        }
    }

    pub fn template(context: impl Into<String>, source: TemplateError) -> Self {
        ConfigError::Template {
            path: None,
            context: context.into(),
            source,
        }
    }

    /// Attach the file the error came from, where the variant carries one.
    pub fn at(self, file: &Path) -> Self {
        match self {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: Some(file.to_path_buf()),
                source,
            },
            ConfigError::Invalid { message, .. } => ConfigError::Invalid {
                path: Some(file.to_path_buf()),
                message,
            },
            ConfigError::Template {
                context, source, ..
            } => ConfigError::Template {
                path: Some(file.to_path_buf()),
                context,
                source,
            },
            other => other,
        }
    }
}

/// Signature and integrity failures.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("{}: RPM signature check did not report 'digests signatures OK':\n{output}", path.display())]
    RpmSignature { path: PathBuf, output: String },

    #[error("{}: expected a .src.rpm file", path.display())]
    NotSrpm { path: PathBuf },

    #[error("signature {sig} does not apply to {file}")]
    SignatureMismatch { file: String, sig: String },

    #[error("public key {} must contain exactly one key, found {count}", path.display())]
    KeyCount { path: PathBuf, count: usize },

    #[error("public key {} does not exist", path.display())]
    MissingKey { path: PathBuf },

    #[error("revision '{0}' is neither a tag nor a commit")]
    UnknownRevision(String),
}

/// Which pipeline produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderKind {
    Srpm,
    Mock,
}

impl fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuilderKind::Srpm => "srpm",
            BuilderKind::Mock => "mock",
        })
    }
}

/// A failure inside one stage of a package pipeline.
#[derive(Error, Debug)]
#[error("{builder} build of '{package}' failed in stage {stage}: {source:#}")]
pub struct StageError {
    pub package: String,
    pub builder: BuilderKind,
    pub stage: &'static str,
    #[source]
    pub source: anyhow::Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_error_gains_path() {
        let err = ConfigError::invalid("bad thing").at(Path::new("/etc/x.yaml"));
        assert_eq!(err.to_string(), "/etc/x.yaml: bad thing");
    }

    #[test]
    fn at_leaves_other_variants_alone() {
        let err = ConfigError::UnknownPackage("foo".into()).at(Path::new("/x"));
        assert_eq!(err.to_string(), "package 'foo' is not in the manifest");
    }

    #[test]
    fn stage_error_names_package_and_stage() {
        let err = StageError {
            package: "libfoo".into(),
            builder: BuilderKind::Srpm,
            stage: "fetchUpstream",
            source: anyhow::anyhow!("download failed"),
        };
        assert_eq!(
            err.to_string(),
            "srpm build of 'libfoo' failed in stage fetchUpstream: download failed"
        );
    }

    #[test]
    fn stage_error_keeps_context_chain() {
        let source = anyhow::anyhow!("exit code 1").context("rpmbuild -bs failed");
        let err = StageError {
            package: "bar".into(),
            builder: BuilderKind::Mock,
            stage: "rebuild",
            source,
        };
        assert!(err.to_string().ends_with("rpmbuild -bs failed: exit code 1"));
    }
}
