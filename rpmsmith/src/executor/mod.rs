//! Abstraction over external command execution.
//!
//! Every external tool the pipeline drives (git, rpm, rpmbuild, mock, gpg,
//! createrepo_c) goes through the [`Executor`] trait, which the builders hold
//! as an `Arc<dyn Executor>`. Three backends exist:
//!
//! - [`RealExecutor`] spawns the process.
//! - [`DryRunExecutor`] never spawns anything; it records a description and
//!   an equivalent shell script line for every call.
//! - [`MockExecutor`] replays pre-programmed responses and records calls,
//!   for tests.

mod dry_run;
mod mock;
mod real;

pub use dry_run::DryRunExecutor;
pub use mock::{MockCall, MockExecutor, MockResponse};
pub use real::RealExecutor;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Options for a single command invocation.
///
/// Most call sites use `CommandOptions::default()`. The working directory
/// and environment apply to that one call only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOptions {
    /// Working directory for the command.
    pub cwd: Option<PathBuf>,
    /// Additional environment variables.
    pub env: Vec<(String, String)>,
}

impl CommandOptions {
    /// Create options with a working directory.
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Default::default()
        }
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to execute '{program}'. Is it installed? ({source})")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", failure_message(.command, *.code, .stderr))]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("'{command}': {message}")]
    Injected { command: String, message: String },
}

fn failure_message(command: &str, code: i32, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("'{command}' failed (exit code {code})")
    } else {
        format!("'{command}' failed (exit code {code}):\n{stderr}")
    }
}

/// Trait for running external commands.
///
/// Implementors provide [`run`](Executor::run) and
/// [`run_output`](Executor::run_output); the convenience methods
/// [`exec`](Executor::exec), [`exec_in_dir`](Executor::exec_in_dir) and
/// [`output`](Executor::output) cover almost every call site.
pub trait Executor: Send + Sync {
    /// Run a command with inherited stdio.
    fn run(&self, options: &CommandOptions, program: &str, args: &[&str]) -> Result<(), ExecError>;

    /// Run a command and capture its stdout.
    ///
    /// On failure the error carries the exit code and captured stderr.
    fn run_output(
        &self,
        options: &CommandOptions,
        program: &str,
        args: &[&str],
    ) -> Result<String, ExecError>;

    fn exec(&self, program: &str, args: &[&str]) -> Result<(), ExecError> {
        self.run(&CommandOptions::default(), program, args)
    }

    /// Run a command in `dir` without changing the process working directory.
    fn exec_in_dir(&self, dir: &Path, program: &str, args: &[&str]) -> Result<(), ExecError> {
        self.run(&CommandOptions::with_cwd(dir), program, args)
    }

    fn output(&self, program: &str, args: &[&str]) -> Result<String, ExecError> {
        self.run_output(&CommandOptions::default(), program, args)
    }
}

/// Quote a single token for display or for a shell script line.
///
/// Tokens containing whitespace are wrapped in single quotes. Embedded
/// single quotes become `\'`. Anything else is left bare.
pub fn shell_escape(token: &str) -> String {
    if token.is_empty() {
        return "''".to_string();
    }
    let escaped = token.replace('\'', "\\'");
    if token.chars().any(char::is_whitespace) {
        format!("'{escaped}'")
    } else {
        escaped
    }
}

/// Join a program and its arguments into one shell-escaped line.
pub fn shell_join(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .map(shell_escape)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_options_default() {
        let opts = CommandOptions::default();
        assert!(opts.cwd.is_none());
        assert!(opts.env.is_empty());
    }

    #[test]
    fn command_options_with_cwd_and_env() {
        let opts = CommandOptions::with_cwd("/tmp").env("GNUPGHOME", "/tmp/keyring");
        assert_eq!(opts.cwd.as_deref(), Some(Path::new("/tmp")));
        assert_eq!(
            opts.env,
            vec![("GNUPGHOME".to_string(), "/tmp/keyring".to_string())]
        );
    }

    #[test]
    fn escape_leaves_plain_tokens_bare() {
        assert_eq!(shell_escape("rpmbuild"), "rpmbuild");
        assert_eq!(shell_escape("--define=_topdir"), "--define=_topdir");
    }

    #[test]
    fn escape_quotes_whitespace() {
        assert_eq!(shell_escape("a file"), "'a file'");
        assert_eq!(shell_escape("_topdir /work/rpmbuild"), "'_topdir /work/rpmbuild'");
        assert_eq!(shell_escape("tab\there"), "'tab\there'");
    }

    #[test]
    fn escape_embedded_quotes() {
        assert_eq!(shell_escape("it's here"), "'it\\'s here'");
        assert_eq!(shell_escape("it's"), "it\\'s");
    }

    #[test]
    fn escape_empty_token_keeps_boundary() {
        assert_eq!(shell_join("echo", &["", "x"]), "echo '' x");
    }

    #[test]
    fn join_preserves_argument_boundaries() {
        assert_eq!(shell_join("cat", &["a file"]), "cat 'a file'");
        assert_eq!(shell_join("cat", &["a", "file"]), "cat a file");
    }

    #[test]
    fn failed_error_includes_stderr() {
        let err = ExecError::Failed {
            command: "rpm -K foo.src.rpm".to_string(),
            code: 1,
            stderr: "error: foo.src.rpm: open failed\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'rpm -K foo.src.rpm' failed (exit code 1):\nerror: foo.src.rpm: open failed"
        );
    }

    #[test]
    fn failed_error_without_stderr() {
        let err = ExecError::Failed {
            command: "false".to_string(),
            code: 1,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "'false' failed (exit code 1)");
    }
}
