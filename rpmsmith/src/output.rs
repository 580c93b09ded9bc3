//! User-facing status lines.
//!
//! Diagnostics go through `tracing`; these helpers print the short,
//! colored lines a person watching a build actually reads.
//!
//! ```rust,ignore
//! use rpmsmith::output::Output;
//!
//! Output::step("libfoo: create-srpm");
//! Output::success("published libfoo-1.0-1.src.rpm");
//! Output::kv("sha256", "9f86d0...");
//! ```

use owo_colors::OwoColorize;

pub struct Output;

impl Output {
    /// `✓ message`
    pub fn success(msg: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), msg.as_ref());
    }

    /// `✗ message`, on stderr.
    pub fn error(msg: impl AsRef<str>) {
        eprintln!("{} {}", "✗".red().bold(), msg.as_ref().red());
    }

    pub fn warning(msg: impl AsRef<str>) {
        println!("{} {}", "⚠".yellow(), msg.as_ref());
    }

    /// A package-level step, e.g. `• libfoo: mock (x86_64)`.
    pub fn step(msg: impl AsRef<str>) {
        println!("{} {}", "•".cyan(), msg.as_ref().bold());
    }

    pub fn header(msg: impl AsRef<str>) {
        println!("\n{}\n", msg.as_ref().bold().cyan());
    }

    pub fn list_item(msg: impl AsRef<str>) {
        println!("  {}", msg.as_ref());
    }

    /// Aligned `key: value` line.
    pub fn kv(key: impl AsRef<str>, value: impl AsRef<str>) {
        println!("  {:<12} {}", format!("{}:", key.as_ref()).cyan(), value.as_ref());
    }

    /// Indented suggestion under a failure.
    pub fn hint(msg: impl AsRef<str>) {
        println!("    {} {}", "→".cyan(), msg.as_ref());
    }

    /// Commands that were rendered but not run.
    pub fn dry_run(msg: impl AsRef<str>) {
        println!("{} {}", "[dry-run]".dimmed(), msg.as_ref().dimmed());
    }

    pub fn blank() {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_methods_dont_panic() {
        Output::success("ok");
        Output::error("bad");
        Output::warning("careful");
        Output::step("libfoo: create-srpm");
        Output::header("checkenv");
        Output::list_item("item");
        Output::kv("url", "https://example.com/foo.tar.gz");
        Output::hint("install mock");
        Output::dry_run("mock -r cfg --init");
        Output::blank();
    }
}
