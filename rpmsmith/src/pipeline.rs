//! Shared machinery for the package pipelines.
//!
//! Both builders run a fixed sequence of named stages. A stage gets the
//! pipeline's identity and its own label explicitly; any failure comes back
//! as a [`StageError`] naming package, builder and stage.

use crate::config::Config;
use crate::error::{BuilderKind, StageError};
use crate::executor::Executor;
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Everything a builder needs from the invocation.
#[derive(Clone)]
pub struct BuildEnv {
    pub config: Config,
    pub exec: Arc<dyn Executor>,
}

impl BuildEnv {
    pub fn new(config: Config, exec: Arc<dyn Executor>) -> Self {
        Self { config, exec }
    }

    pub fn exec(&self) -> &dyn Executor {
        self.exec.as_ref()
    }
}

/// Immutable identity of one package pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineId {
    pub package: String,
    pub builder: BuilderKind,
}

impl PipelineId {
    pub fn new(package: impl Into<String>, builder: BuilderKind) -> Self {
        Self {
            package: package.into(),
            builder,
        }
    }

    /// Run one stage, tagging any failure with this pipeline and `stage`.
    pub fn stage<T>(
        &self,
        stage: &'static str,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T, StageError> {
        info!(package = %self.package, builder = %self.builder, stage, "stage");
        f().map_err(|source| StageError {
            package: self.package.clone(),
            builder: self.builder,
            stage,
            source,
        })
    }
}

/// Remove `dir` if present and create it empty.
pub fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("failed to remove {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}

/// Remove `dir` if present.
pub fn remove_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("failed to remove {}", dir.display()))?;
    }
    Ok(())
}

/// Files in `dir` whose names match the glob `pattern`, sorted.
pub fn files_matching(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let dir_str = dir
        .to_str()
        .with_context(|| format!("non-UTF-8 path: {}", dir.display()))?;
    let full = format!("{}/{pattern}", glob::Pattern::escape(dir_str));
    let mut files = Vec::new();
    for entry in glob::glob(&full).with_context(|| format!("invalid pattern {full}"))? {
        let path = entry.with_context(|| format!("failed to read {}", dir.display()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The single file in `dir` matching `pattern`.
///
/// Zero or several matches is an error naming what was found.
pub fn find_exactly_one(dir: &Path, pattern: &str) -> Result<PathBuf> {
    let mut files = files_matching(dir, pattern)?;
    match files.len() {
        1 => Ok(files.remove(0)),
        0 => bail!("no {pattern} file found in {}", dir.display()),
        _ => bail!(
            "expected exactly one {pattern} file in {}, found: {}",
            dir.display(),
            file_names(&files).join(", ")
        ),
    }
}

/// Copy `src` into `dir`, keeping its file name.
pub fn copy_into(src: &Path, dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .with_context(|| format!("no file name in {}", src.display()))?;
    let dest = dir.join(name);
    fs::copy(src, &dest)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dest.display()))?;
    Ok(dest)
}

pub fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stage_error_carries_labels() {
        let id = PipelineId::new("foo", BuilderKind::Srpm);
        let err = id
            .stage("clean", || -> Result<()> { bail!("disk full") })
            .unwrap_err();
        assert_eq!(err.package, "foo");
        assert_eq!(err.stage, "clean");
        assert_eq!(err.builder, BuilderKind::Srpm);
    }

    #[test]
    fn stage_passes_value_through() {
        let id = PipelineId::new("foo", BuilderKind::Mock);
        assert_eq!(id.stage("x", || Ok(42)).unwrap(), 42);
    }

    #[test]
    fn reset_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a/b");
        reset_dir(&dir).unwrap();
        fs::write(dir.join("stale"), "x").unwrap();
        reset_dir(&dir).unwrap();
        reset_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn exactly_one_spec() {
        let temp = TempDir::new().unwrap();
        let err = find_exactly_one(temp.path(), "*.spec").unwrap_err();
        assert!(err.to_string().contains("no *.spec file"));

        fs::write(temp.path().join("a.spec"), "").unwrap();
        assert_eq!(
            find_exactly_one(temp.path(), "*.spec").unwrap(),
            temp.path().join("a.spec")
        );

        fs::write(temp.path().join("b.spec"), "").unwrap();
        let err = find_exactly_one(temp.path(), "*.spec").unwrap_err();
        assert!(err.to_string().contains("a.spec, b.spec"));
    }

    #[test]
    fn files_matching_escapes_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("weird[dir]");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("x.src.rpm"), "").unwrap();
        assert_eq!(files_matching(&dir, "*.src.rpm").unwrap().len(), 1);
    }

    #[test]
    fn copy_into_keeps_name() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("p.patch");
        fs::write(&src, "diff").unwrap();
        let dest_dir = temp.path().join("SOURCES");
        fs::create_dir(&dest_dir).unwrap();
        let dest = copy_into(&src, &dest_dir).unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap(), "diff");
    }
}
