//! Pre-programmed executor for tests.

use super::{CommandOptions, ExecError, Executor, shell_join};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Canned result for one call.
#[derive(Debug, Clone, Default)]
pub struct MockResponse {
    /// Exit code reported for the call. Non-zero fails the call.
    pub exit_code: i32,
    /// Stdout for `output` calls, stderr for failures.
    pub output: String,
    /// When set, the call fails with this message regardless of exit code.
    pub error: Option<String>,
}

/// Recorded call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub dir: Option<PathBuf>,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl MockCall {
    /// The call rendered as a single command line.
    pub fn command_line(&self) -> String {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        shell_join(&self.program, &args)
    }
}

/// Executor that replays a strictly ordered queue of responses.
///
/// Every call consumes the next response. Calling it with the queue empty
/// is a bug in the test and panics.
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: Mutex<VecDeque<MockResponse>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an arbitrary response.
    pub fn then(self, response: MockResponse) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Queue a successful call with empty output.
    pub fn then_ok(self) -> Self {
        self.then(MockResponse::default())
    }

    /// Queue a successful call producing `output`.
    pub fn then_output(self, output: impl Into<String>) -> Self {
        self.then(MockResponse {
            output: output.into(),
            ..Default::default()
        })
    }

    /// Queue a call exiting with `exit_code`, with `stderr` as captured output.
    pub fn then_exit(self, exit_code: i32, stderr: impl Into<String>) -> Self {
        self.then(MockResponse {
            exit_code,
            output: stderr.into(),
            error: None,
        })
    }

    /// Queue a call failing with an injected error.
    pub fn then_error(self, message: impl Into<String>) -> Self {
        self.then(MockResponse {
            error: Some(message.into()),
            ..Default::default()
        })
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Calls rendered as command lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(MockCall::command_line).collect()
    }

    /// Number of queued responses not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }

    /// Assert that every queued response was consumed.
    pub fn assert_exhausted(&self) {
        let remaining = self.remaining();
        assert!(
            remaining == 0,
            "MockExecutor: {remaining} response(s) never consumed; calls were: {:#?}",
            self.command_lines()
        );
    }

    fn respond(
        &self,
        options: &CommandOptions,
        program: &str,
        args: &[&str],
    ) -> Result<String, ExecError> {
        let call = MockCall {
            dir: options.cwd.clone(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: options.env.clone(),
        };
        let command = call.command_line();
        lock(&self.calls).push(call);

        let Some(response) = lock(&self.responses).pop_front() else {
            panic!("MockExecutor: no response queued for call `{command}`");
        };

        if let Some(message) = response.error {
            return Err(ExecError::Injected { command, message });
        }
        if response.exit_code != 0 {
            return Err(ExecError::Failed {
                command,
                code: response.exit_code,
                stderr: response.output,
            });
        }
        Ok(response.output)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Executor for MockExecutor {
    fn run(&self, options: &CommandOptions, program: &str, args: &[&str]) -> Result<(), ExecError> {
        self.respond(options, program, args).map(|_| ())
    }

    fn run_output(
        &self,
        options: &CommandOptions,
        program: &str,
        args: &[&str],
    ) -> Result<String, ExecError> {
        self.respond(options, program, args)
    }
}
