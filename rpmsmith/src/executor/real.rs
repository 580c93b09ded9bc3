//! Direct execution of external commands.

use super::{CommandOptions, ExecError, Executor, shell_join};
use std::io::{self, Write};
use std::process::{Command, Stdio};
use tracing::debug;

/// Production executor that delegates to [`std::process::Command`].
///
/// Stderr always reaches the terminal, including for captured commands. In
/// quiet mode the stdout of [`run`](Executor::run) calls is discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealExecutor {
    quiet: bool,
}

impl RealExecutor {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn command(&self, options: &CommandOptions, program: &str, args: &[&str]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &options.env {
            cmd.env(k, v);
        }
        cmd
    }

    /// Replay the stderr of a captured command. Quiet mode does not apply.
    fn echo_stderr(&self, stderr: &str, sink: &mut impl Write) {
        if !stderr.trim().is_empty() {
            let _ = sink.write_all(stderr.as_bytes());
        }
    }
}

impl Executor for RealExecutor {
    fn run(&self, options: &CommandOptions, program: &str, args: &[&str]) -> Result<(), ExecError> {
        debug!(program, ?args, cwd = ?options.cwd, "Running command");
        let mut cmd = self.command(options, program, args);
        cmd.stdin(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd.stdout(if self.quiet {
            Stdio::null()
        } else {
            Stdio::inherit()
        });

        let status = cmd.status().map_err(|source| ExecError::Spawn {
            program: program.to_string(),
            source,
        })?;

        if !status.success() {
            return Err(ExecError::Failed {
                command: shell_join(program, args),
                code: status.code().unwrap_or(-1),
                stderr: String::new(),
            });
        }
        Ok(())
    }

    fn run_output(
        &self,
        options: &CommandOptions,
        program: &str,
        args: &[&str],
    ) -> Result<String, ExecError> {
        debug!(program, ?args, cwd = ?options.cwd, "Capturing command output");
        let output = self
            .command(options, program, args)
            .output()
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ExecError::Failed {
                command: shell_join(program, args),
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }
        self.echo_stderr(&stderr, &mut io::stderr().lock());

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
