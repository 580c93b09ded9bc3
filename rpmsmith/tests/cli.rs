//! Integration tests for the rpmsmith CLI.
//!
//! These tests run the compiled binary and verify its output. None of them
//! reach a tool that would need root, network access or an RPM toolchain.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Get rpmsmith command for testing.
///
/// Clears the `RPMSMITH_*` environment so the developer's own settings
/// cannot leak into a test.
fn rpmsmith() -> Command {
    let mut cmd = cargo_bin_cmd!("rpmsmith");
    for var in [
        "RPMSMITH_QUIET",
        "RPMSMITH_SRC_DIR",
        "RPMSMITH_WORK_DIR",
        "RPMSMITH_DEST_DIR",
        "RPMSMITH_PKI_DIR",
        "RPMSMITH_SRC_CONFIG",
        "RPMSMITH_DNF_CONFIG",
        "RPMSMITH_MOCK_TEMPLATE",
        "RPMSMITH_SRC_HOST",
        "RPMSMITH_SRC_PATH_PREFIX",
        "RPMSMITH_DNF_HOST",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Get rpmsmith command with every directory and config inside `temp`.
fn rpmsmith_isolated(temp: &assert_fs::TempDir) -> Command {
    let mut cmd = rpmsmith();
    cmd.env("RPMSMITH_SRC_DIR", temp.path().join("src"));
    cmd.env("RPMSMITH_WORK_DIR", temp.path().join("work"));
    cmd.env("RPMSMITH_DEST_DIR", temp.path().join("dest"));
    cmd.env("RPMSMITH_PKI_DIR", temp.path().join("pki"));
    cmd.env("RPMSMITH_SRC_CONFIG", temp.path().join("src-bundles.yaml"));
    cmd.env("RPMSMITH_DNF_CONFIG", temp.path().join("dnf-bundles.yaml"));
    cmd
}

const SRC_CONFIG: &str = r#"
source-bundle:
  tarballs:
    url-format: "{host}/{pkg}/{pkg}-{version}{suffix}"
    default-src-suffix: .tar.gz
    version-labels: { default: "1.0" }
"#;

const MANIFEST: &str = r#"
package:
  - name: foo
    type: tarball
    upstream-sources:
      - source-bundle: { name: tarballs }
        signature: { skip-check: true }
"#;

fn write_repo(temp: &assert_fs::TempDir) {
    temp.child("src-bundles.yaml").write_str(SRC_CONFIG).unwrap();
    temp.child("src/acme/rpmsmith.yaml").write_str(MANIFEST).unwrap();
    temp.child("src/acme/foo.spec")
        .write_str("Name: foo\nVersion: 1.0\nRelease: 1\n")
        .unwrap();
}

// ============================================================================
// Basic CLI tests
// ============================================================================

#[test]
fn cli_no_args_shows_help() {
    rpmsmith()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn cli_help_lists_commands() {
    rpmsmith()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create-srpm"))
        .stdout(predicate::str::contains("mock"))
        .stdout(predicate::str::contains("checkenv"))
        .stdout(predicate::str::contains("list-unverified-sources"));
}

#[test]
fn cli_version_flag_shows_version() {
    rpmsmith()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rpmsmith"));
}

#[test]
fn mock_help_shows_options() {
    rpmsmith()
        .args(["mock", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--target"))
        .stdout(predicate::str::contains("--nocheck"))
        .stdout(predicate::str::contains("--only-create-cfg"));
}

#[test]
fn create_srpm_requires_repo() {
    rpmsmith()
        .arg("create-srpm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--repo"));
}

// ============================================================================
// Command behavior
// ============================================================================

#[test]
fn create_srpm_unknown_repo_suggests_clone() {
    let temp = assert_fs::TempDir::new().unwrap();
    rpmsmith_isolated(&temp)
        .args(["create-srpm", "--repo", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rpmsmith clone"));
}

#[test]
fn create_srpm_unknown_package_fails() {
    let temp = assert_fs::TempDir::new().unwrap();
    write_repo(&temp);
    rpmsmith_isolated(&temp)
        .args(["create-srpm", "--repo", "acme", "--package", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn clone_refuses_existing_checkout() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("src/acme/keep.txt").write_str("local work").unwrap();
    rpmsmith_isolated(&temp)
        .args(["clone", "https://git.example/pkgs/acme.git"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    temp.child("src/acme/keep.txt").assert("local work");
}

#[test]
fn checkenv_reports_missing_tools_and_configs() {
    let temp = assert_fs::TempDir::new().unwrap();
    rpmsmith_isolated(&temp)
        .env("PATH", "")
        .args(["checkenv", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"name\": \"rpmbuild\""))
        .stdout(predicate::str::contains("not found on PATH"))
        .stdout(predicate::str::contains("src-config"))
        .stderr(predicate::str::contains("check(s) failed"));
}

#[test]
fn list_unverified_sources_prints_url_and_digest() {
    let temp = assert_fs::TempDir::new().unwrap();
    write_repo(&temp);
    temp.child("work/foo/upstream/foo-1.0.tar.gz")
        .write_str("hello")
        .unwrap();
    rpmsmith_isolated(&temp)
        .env("RPMSMITH_SRC_HOST", "https://src.example")
        .args(["list-unverified-sources", "--repo", "acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://src.example/foo/foo-1.0.tar.gz",
        ))
        .stdout(predicate::str::contains(
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
        ));
}

#[test]
fn list_unverified_sources_before_fetch() {
    let temp = assert_fs::TempDir::new().unwrap();
    write_repo(&temp);
    rpmsmith_isolated(&temp)
        .args(["list-unverified-sources", "--repo", "acme", "--package", "foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not fetched yet"));
}
