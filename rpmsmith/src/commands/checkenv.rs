//! `rpmsmith checkenv`: report whether this host can run builds.

use crate::config::Config;
use crate::dnfconfig::DnfConfig;
use crate::mock_cfg::MockCfgTemplate;
use crate::output::Output;
use crate::srcconfig::SrcConfig;
use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// External tools a full build drives, with how to get them.
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("git", "dnf install git-core"),
    ("rpm", "dnf install rpm"),
    ("rpmbuild", "dnf install rpm-build"),
    ("mock", "dnf install mock, then add yourself to the mock group"),
    ("gpg", "dnf install gnupg2"),
    ("createrepo_c", "dnf install createrepo_c"),
];

#[derive(Debug, Args)]
pub struct CheckenvArgs {
    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    format: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub fix_hint: Option<String>,
}

impl CheckResult {
    fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
            fix_hint: None,
        }
    }

    fn fail(name: impl Into<String>, message: impl Into<String>, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
            fix_hint: (!hint.trim().is_empty()).then_some(hint),
        }
    }
}

pub fn run(args: CheckenvArgs, config: &Config) -> Result<()> {
    let results = run_checks(config);
    let failed = results.iter().filter(|r| !r.passed).count();

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        Output::header("rpmsmith checkenv");
        for result in &results {
            if result.passed {
                Output::success(format!("{}: {}", result.name, result.message));
            } else {
                Output::error(format!("{}: {}", result.name, result.message));
                if let Some(hint) = &result.fix_hint {
                    Output::hint(hint);
                }
            }
        }
        Output::blank();
    }

    if failed > 0 {
        bail!("{failed} check(s) failed");
    }
    if args.format != "json" {
        Output::success("environment is ready");
    }
    Ok(())
}

pub fn run_checks(config: &Config) -> Vec<CheckResult> {
    let mut results: Vec<_> = REQUIRED_TOOLS
        .iter()
        .map(|(tool, hint)| check_tool(tool, hint))
        .collect();

    results.push(check_writable_dir("src-dir", &config.src_dir));
    results.push(check_writable_dir("work-dir", &config.work_dir));
    results.push(check_writable_dir("dest-dir", &config.dest_dir));
    results.push(check_pki_dir(&config.pki_dir));

    results.push(check_loads("src-config", &config.src_config, |p| {
        SrcConfig::load(p).map(|c| c.bundle_names().count())
    }));
    results.push(check_loads("dnf-config", &config.dnf_config, |p| {
        DnfConfig::load(p, &config.dnf_host).map(|c| c.bundle_names().count())
    }));
    results.push(check_mock_template(config.mock_template.as_deref()));
    results
}

fn check_tool(tool: &str, hint: &str) -> CheckResult {
    match which::which(tool) {
        Ok(path) => CheckResult::pass(tool, path.display().to_string()),
        Err(_) => CheckResult::fail(tool, "not found on PATH", hint),
    }
}

/// The directory exists (or can be created) and accepts new files.
fn check_writable_dir(name: &str, dir: &Path) -> CheckResult {
    if let Err(err) = fs::create_dir_all(dir) {
        return CheckResult::fail(
            name,
            format!("cannot create {}: {err}", dir.display()),
            format!("choose a writable location with --{name}"),
        );
    }
    match tempfile::NamedTempFile::new_in(dir) {
        Ok(_) => CheckResult::pass(name, dir.display().to_string()),
        Err(err) => CheckResult::fail(
            name,
            format!("{} is not writable: {err}", dir.display()),
            format!("fix permissions or choose another location with --{name}"),
        ),
    }
}

fn check_pki_dir(dir: &Path) -> CheckResult {
    if dir.is_dir() {
        CheckResult::pass("pki-dir", dir.display().to_string())
    } else {
        CheckResult::fail(
            "pki-dir",
            format!("{} does not exist", dir.display()),
            "create it and add the public keys your manifests reference",
        )
    }
}

fn check_loads<E: std::fmt::Display>(
    name: &str,
    path: &Path,
    load: impl FnOnce(&Path) -> Result<usize, E>,
) -> CheckResult {
    if !path.is_file() {
        return CheckResult::fail(
            name,
            format!("{} does not exist", path.display()),
            format!("create it or point --{name} at an existing file"),
        );
    }
    match load(path) {
        Ok(count) => CheckResult::pass(name, format!("{} ({count} bundles)", path.display())),
        Err(err) => CheckResult::fail(name, err.to_string(), ""),
    }
}

fn check_mock_template(path: Option<&Path>) -> CheckResult {
    let label = path.map_or_else(|| "built-in".to_string(), |p| p.display().to_string());
    match MockCfgTemplate::load(path) {
        Ok(_) => CheckResult::pass("mock-template", label),
        Err(err) => CheckResult::fail("mock-template", err.to_string(), ""),
    }
}
