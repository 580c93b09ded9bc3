//! Scripted dry-run execution.
//!
//! Nothing is spawned. Each call is recorded twice: as a human-readable
//! description and as an equivalent shell script line that could be run
//! by hand to reproduce the invocation.

use super::{CommandOptions, ExecError, Executor, shell_escape, shell_join};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Recorded {
    descriptions: Vec<String>,
    script: Vec<String>,
}

/// Executor that records what would be run instead of running it.
///
/// [`output`](Executor::output) calls succeed with an empty string.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    recorded: Mutex<Recorded>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Human-readable description of every call, in order.
    pub fn descriptions(&self) -> Vec<String> {
        self.lock().descriptions.clone()
    }

    /// One shell line per call, in order.
    pub fn script_lines(&self) -> Vec<String> {
        self.lock().script.clone()
    }

    /// Render the recorded calls as a standalone POSIX shell script.
    pub fn script(&self) -> String {
        let mut script = String::from("#!/bin/sh\nset -e\n");
        for line in &self.lock().script {
            script.push_str(line);
            script.push('\n');
        }
        script
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, options: &CommandOptions, program: &str, args: &[&str]) {
        let mut command = shell_join(program, args);
        if !options.env.is_empty() {
            let assignments: Vec<String> = options
                .env
                .iter()
                .map(|(k, v)| format!("{k}={}", shell_escape(v)))
                .collect();
            command = format!("{} {command}", assignments.join(" "));
        }

        let (description, line) = match &options.cwd {
            Some(dir) => (
                format!("Would execute in {}: {command}", display_dir(dir)),
                format!("(cd {} && {command})", script_dir(dir)),
            ),
            None => (format!("Would execute: {command}"), command),
        };

        let mut recorded = self.lock();
        recorded.descriptions.push(description);
        recorded.script.push(line);
    }
}

/// An empty directory would make `cd` go to `$HOME`; use the current
/// directory instead.
fn script_dir(dir: &Path) -> String {
    if dir.as_os_str().is_empty() {
        "\"$PWD\"".to_string()
    } else {
        format!("'{}'", dir.to_string_lossy().replace('\'', "\\'"))
    }
}

fn display_dir(dir: &Path) -> String {
    if dir.as_os_str().is_empty() {
        "$PWD".to_string()
    } else {
        dir.display().to_string()
    }
}

impl Executor for DryRunExecutor {
    fn run(&self, options: &CommandOptions, program: &str, args: &[&str]) -> Result<(), ExecError> {
        self.record(options, program, args);
        Ok(())
    }

    fn run_output(
        &self,
        options: &CommandOptions,
        program: &str,
        args: &[&str],
    ) -> Result<String, ExecError> {
        self.record(options, program, args);
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_records_description_and_script() {
        let exec = DryRunExecutor::new();
        exec.exec("cat", &["a file"]).unwrap();

        assert_eq!(exec.script_lines(), vec!["cat 'a file'"]);
        assert_eq!(exec.descriptions(), vec!["Would execute: cat 'a file'"]);
    }

    #[test]
    fn exec_in_dir_renders_subshell() {
        let exec = DryRunExecutor::new();
        exec.exec_in_dir(Path::new("/work/my pkg"), "git", &["init"])
            .unwrap();

        assert_eq!(exec.script_lines(), vec!["(cd '/work/my pkg' && git init)"]);
        assert_eq!(
            exec.descriptions(),
            vec!["Would execute in /work/my pkg: git init"]
        );
    }

    #[test]
    fn empty_dir_uses_pwd() {
        let exec = DryRunExecutor::new();
        exec.exec_in_dir(Path::new(""), "ls", &[]).unwrap();

        assert_eq!(exec.script_lines(), vec!["(cd \"$PWD\" && ls)"]);
    }

    #[test]
    fn output_returns_empty_string() {
        let exec = DryRunExecutor::new();
        let out = exec.output("rpm", &["-K", "foo.src.rpm"]).unwrap();
        assert!(out.is_empty());
        assert_eq!(exec.script_lines(), vec!["rpm -K foo.src.rpm"]);
    }

    #[test]
    fn env_is_rendered_as_assignment() {
        let exec = DryRunExecutor::new();
        let opts = CommandOptions::default().env("GNUPGHOME", "/tmp/key ring");
        exec.run(&opts, "git", &["verify-tag", "v1.0"]).unwrap();

        assert_eq!(
            exec.script_lines(),
            vec!["GNUPGHOME='/tmp/key ring' git verify-tag v1.0"]
        );
    }

    #[test]
    fn script_has_shebang_and_all_lines() {
        let exec = DryRunExecutor::new();
        exec.exec("mock", &["-r", "/cfg/mock.cfg", "--init"]).unwrap();
        exec.exec("mock", &["-r", "/cfg/mock.cfg", "--rebuild", "foo.src.rpm"])
            .unwrap();

        assert_eq!(
            exec.script(),
            "#!/bin/sh\nset -e\nmock -r /cfg/mock.cfg --init\nmock -r /cfg/mock.cfg --rebuild foo.src.rpm\n"
        );
    }
}
