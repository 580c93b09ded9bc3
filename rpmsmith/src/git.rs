//! Git upstream sources and repository cloning.

use crate::executor::Executor;
use crate::verify::{Keyring, verify_git_revision};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{info, warn};

/// File name of the archive produced for a git source.
pub fn archive_name(pkg: &str, revision: &str) -> String {
    format!("{}.tar.gz", archive_prefix(pkg, revision))
}

fn archive_prefix(pkg: &str, revision: &str) -> String {
    format!("{pkg}-{}", revision.replace('/', "-"))
}

/// Fetch `revision` of `url` and archive it into `upstream_dir`.
///
/// The revision is fetched into a temporary clone that is removed on
/// every exit path. With a public key, the tag or commit signature is
/// verified before anything is archived.
pub fn fetch_revision(
    exec: &dyn Executor,
    pkg: &str,
    url: &str,
    revision: &str,
    public_key: Option<&Path>,
    upstream_dir: &Path,
) -> Result<PathBuf> {
    let temp = TempDir::with_prefix("rpmsmith-git-").context("failed to create temp clone dir")?;
    let clone = temp.path().join("clone");
    fs::create_dir(&clone).with_context(|| format!("failed to create {}", clone.display()))?;

    exec.exec_in_dir(&clone, "git", &["init", "--quiet"])?;
    exec.exec_in_dir(&clone, "git", &["fetch", "--tags", url, revision])
        .with_context(|| format!("failed to fetch {revision} from {url}"))?;
    exec.exec_in_dir(&clone, "git", &["reset", "--hard", "FETCH_HEAD"])?;

    match public_key {
        Some(key) => {
            let keyring = Keyring::new()?;
            keyring.import_single(exec, key)?;
            verify_git_revision(exec, &clone, revision, &keyring)?;
        }
        None => warn!(url, revision, "skipping git signature check"),
    }

    fs::create_dir_all(upstream_dir)
        .with_context(|| format!("failed to create {}", upstream_dir.display()))?;
    let output = upstream_dir.join(archive_name(pkg, revision));
    let prefix = format!("--prefix={}/", archive_prefix(pkg, revision));
    let output_arg = output.to_string_lossy();
    exec.exec_in_dir(
        &clone,
        "git",
        &["archive", "--format=tar.gz", &prefix, "-o", &output_arg, "HEAD"],
    )?;

    info!(archive = %output.display(), "archived git revision");
    Ok(output)
}

/// Repository name for a clone URL: its last path component without `.git`.
pub fn repo_name_from_url(url: &str) -> Option<&str> {
    let last = url.trim_end_matches('/').rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then_some(name)
}

/// Clone `url` into `target`. An existing target is an error unless `force`.
pub fn clone_repo(exec: &dyn Executor, url: &str, target: &Path, force: bool) -> Result<()> {
    if target.exists() {
        if !force {
            anyhow::bail!(
                "{} already exists (use --force to replace it)",
                target.display()
            );
        }
        fs::remove_dir_all(target)
            .with_context(|| format!("failed to remove {}", target.display()))?;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let target_arg = target.to_string_lossy();
    exec.exec("git", &["clone", url, &target_arg])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MockExecutor;

    #[test]
    fn archive_name_flattens_slashes() {
        assert_eq!(archive_name("foo", "v1.2"), "foo-v1.2.tar.gz");
        assert_eq!(archive_name("foo", "release/1.2"), "foo-release-1.2.tar.gz");
    }

    #[test]
    fn repo_names() {
        assert_eq!(repo_name_from_url("https://git.example/acme/foo.git"), Some("foo"));
        assert_eq!(repo_name_from_url("https://git.example/acme/foo/"), Some("foo"));
        assert_eq!(repo_name_from_url("git@git.example:foo.git"), Some("foo"));
        assert_eq!(repo_name_from_url(""), None);
    }

    #[test]
    fn fetch_without_key_skips_verification() {
        let temp = TempDir::new().unwrap();
        let exec = MockExecutor::new().then_ok().then_ok().then_ok().then_ok();
        let out = fetch_revision(
            &exec,
            "foo",
            "https://git.example/foo.git",
            "v1.2",
            None,
            temp.path(),
        )
        .unwrap();

        assert_eq!(out, temp.path().join("foo-v1.2.tar.gz"));
        let lines = exec.command_lines();
        assert_eq!(lines[0], "git init --quiet");
        assert_eq!(lines[1], "git fetch --tags https://git.example/foo.git v1.2");
        assert_eq!(lines[2], "git reset --hard FETCH_HEAD");
        assert!(lines[3].starts_with("git archive --format=tar.gz --prefix=foo-v1.2/ -o "));

        let clone = exec.calls()[0].dir.clone().unwrap();
        assert!(!clone.exists(), "temporary clone must be removed");
    }

    #[test]
    fn fetch_failure_still_removes_clone() {
        let temp = TempDir::new().unwrap();
        let exec = MockExecutor::new().then_ok().then_exit(128, "couldn't find remote ref");
        let err = fetch_revision(&exec, "foo", "https://x/foo.git", "v9", None, temp.path())
            .unwrap_err();
        assert!(format!("{err:#}").contains("couldn't find remote ref"));
        assert!(!exec.calls()[0].dir.clone().unwrap().exists());
    }

    #[test]
    fn fetch_with_key_verifies_tag() {
        let temp = TempDir::new().unwrap();
        let key = temp.path().join("k.pem");
        fs::write(&key, "key").unwrap();
        let exec = MockExecutor::new()
            .then_ok() // init
            .then_ok() // fetch
            .then_ok() // reset
            .then_ok() // gpg --import
            .then_output("pub:-:1:1:A:::\n")
            .then_ok() // show-ref
            .then_ok() // verify-tag
            .then_ok(); // archive
        fetch_revision(&exec, "foo", "https://x/foo.git", "v1", Some(&key), temp.path()).unwrap();
        exec.assert_exhausted();
        assert!(exec.command_lines()[6].starts_with("git verify-tag v1"));
    }

    #[test]
    fn clone_refuses_existing_without_force() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("repo");
        fs::create_dir(&target).unwrap();

        let exec = MockExecutor::new();
        assert!(clone_repo(&exec, "https://x/repo.git", &target, false).is_err());

        let exec = MockExecutor::new().then_ok();
        clone_repo(&exec, "https://x/repo.git", &target, true).unwrap();
        assert!(!target.exists());
        assert_eq!(
            exec.command_lines(),
            vec![format!("git clone https://x/repo.git {}", target.display())]
        );
    }
}
