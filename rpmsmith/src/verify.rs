//! Signature verification for upstream sources.
//!
//! Every check that needs a public key imports it into a throwaway GnuPG
//! home (a [`Keyring`]) so the user's own keyring is never consulted or
//! modified. The directory is removed when the keyring is dropped.

use crate::error::VerifyError;
use crate::executor::{CommandOptions, Executor};
use anyhow::{Context, Result};
use rpmsmith_common::archive::{decompress_one_layer, strip_last_extension};
use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Phrase `rpm -K` prints when both digests and signatures check out.
pub const RPM_SIGNATURE_OK: &str = "digests signatures OK";

/// Check the embedded signature of an RPM with `rpm -K`.
///
/// The confirmation phrase must appear in the output. A zero exit status
/// alone is not enough.
pub fn check_rpm_signature(exec: &dyn Executor, rpm: &Path) -> Result<()> {
    let path = rpm.to_string_lossy();
    let output = exec.output("rpm", &["-K", &path])?;
    if !output.contains(RPM_SIGNATURE_OK) {
        return Err(VerifyError::RpmSignature {
            path: rpm.to_path_buf(),
            output,
        }
        .into());
    }
    info!(file = %rpm.display(), "RPM signature verified");
    Ok(())
}

/// How a detached signature relates to a downloaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMatch {
    /// Signature covers the file as downloaded.
    Direct,
    /// Signature covers the file with one compression layer removed.
    Decompressed,
    NotApplicable,
}

/// Decide from file names whether `sig` signs `file`.
///
/// The signature name minus its last extension must equal either the file
/// name or the file name minus its own last extension.
pub fn match_signature(file: &str, sig: &str) -> SignatureMatch {
    let signed = strip_last_extension(sig);
    if signed == sig || signed.is_empty() {
        return SignatureMatch::NotApplicable;
    }
    if signed == file {
        return SignatureMatch::Direct;
    }
    let uncompressed = strip_last_extension(file);
    if uncompressed != file && signed == uncompressed {
        SignatureMatch::Decompressed
    } else {
        SignatureMatch::NotApplicable
    }
}

/// A GnuPG home directory that lives as long as this value.
pub struct Keyring {
    dir: TempDir,
    home: PathBuf,
}

impl Keyring {
    pub fn new() -> Result<Self> {
        let dir = TempDir::with_prefix("rpmsmith-gpg-").context("failed to create keyring dir")?;
        let home = dir.path().join("gnupg");
        DirBuilder::new()
            .mode(0o700)
            .create(&home)
            .with_context(|| format!("failed to create {}", home.display()))?;
        Ok(Self { dir, home })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Scratch space next to the keyring, removed with it.
    pub fn scratch(&self) -> &Path {
        self.dir.path()
    }

    fn gpg(&self, exec: &dyn Executor, args: &[&str]) -> Result<String> {
        let home = self.home.to_string_lossy();
        let mut full = vec!["--homedir", &*home, "--batch"];
        full.extend_from_slice(args);
        Ok(exec.output("gpg", &full)?)
    }

    /// Import `key`, which must hold exactly one public key.
    pub fn import_single(&self, exec: &dyn Executor, key: &Path) -> Result<()> {
        if !key.is_file() {
            return Err(VerifyError::MissingKey {
                path: key.to_path_buf(),
            }
            .into());
        }
        self.gpg(exec, &["--import", &key.to_string_lossy()])?;

        let listing = self.gpg(exec, &["--with-colons", "--fingerprint"])?;
        let count = listing.lines().filter(|line| line.starts_with("pub:")).count();
        if count != 1 {
            return Err(VerifyError::KeyCount {
                path: key.to_path_buf(),
                count,
            }
            .into());
        }
        debug!(key = %key.display(), "imported public key");
        Ok(())
    }
}

/// Verify a detached signature over `file` using only `key`.
pub fn verify_detached(exec: &dyn Executor, file: &Path, sig: &Path, key: &Path) -> Result<()> {
    let data_name = file_name(file)?;
    let sig_name = file_name(sig)?;

    let keyring = Keyring::new()?;
    let signed = match match_signature(data_name, sig_name) {
        SignatureMatch::Direct => file.to_path_buf(),
        SignatureMatch::Decompressed => decompress_one_layer(file, keyring.scratch())
            .with_context(|| format!("failed to decompress {}", file.display()))?,
        SignatureMatch::NotApplicable => {
            return Err(VerifyError::SignatureMismatch {
                file: data_name.to_string(),
                sig: sig_name.to_string(),
            }
            .into());
        }
    };

    keyring.import_single(exec, key)?;
    keyring.gpg(
        exec,
        &[
            "--verify",
            &sig.to_string_lossy(),
            &signed.to_string_lossy(),
        ],
    )?;
    info!(file = %file.display(), "detached signature verified");
    Ok(())
}

/// Verify the signature of a tag or commit in a git checkout.
///
/// Tags are looked up first. Only when no such tag exists is the revision
/// tried as a commit.
pub fn verify_git_revision(
    exec: &dyn Executor,
    checkout: &Path,
    revision: &str,
    keyring: &Keyring,
) -> Result<()> {
    let opts = CommandOptions::with_cwd(checkout)
        .env("GNUPGHOME", keyring.home().to_string_lossy());

    let tag_ref = format!("refs/tags/{revision}");
    if exec
        .run_output(&opts, "git", &["show-ref", "--verify", "--quiet", &tag_ref])
        .is_ok()
    {
        exec.run(&opts, "git", &["verify-tag", revision])?;
        info!(revision, "git tag signature verified");
        return Ok(());
    }

    let commit = format!("{revision}^{{commit}}");
    if exec
        .run_output(&opts, "git", &["cat-file", "-e", &commit])
        .is_ok()
    {
        exec.run(&opts, "git", &["verify-commit", revision])?;
        info!(revision, "git commit signature verified");
        return Ok(());
    }

    Err(VerifyError::UnknownRevision(revision.to_string()).into())
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid file name: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MockExecutor;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs;
    use std::io::Write;

    #[test]
    fn signature_matching_table() {
        assert_eq!(match_signature("foo.tar.gz", "foo.tar.gz.sig"), SignatureMatch::Direct);
        assert_eq!(
            match_signature("foo.tar.gz", "foo.tar.sig"),
            SignatureMatch::Decompressed
        );
        assert_eq!(
            match_signature("foobar.tar.gz", "signature"),
            SignatureMatch::NotApplicable
        );
        assert_eq!(
            match_signature("foo.tar.gz", "bar.tar.gz.sig"),
            SignatureMatch::NotApplicable
        );
        assert_eq!(match_signature("foo", "foo.asc"), SignatureMatch::Direct);
        assert_eq!(match_signature("foo", "fo.sig"), SignatureMatch::NotApplicable);
    }

    #[test]
    fn rpm_signature_requires_phrase() {
        let exec = MockExecutor::new()
            .then_output("foo.src.rpm: digests signatures OK\n")
            .then_output("foo.src.rpm: digests OK\n");
        let path = Path::new("foo.src.rpm");

        check_rpm_signature(&exec, path).unwrap();
        let err = check_rpm_signature(&exec, path).unwrap_err();
        assert!(err.downcast_ref::<VerifyError>().is_some());
        assert_eq!(exec.command_lines()[0], "rpm -K foo.src.rpm");
    }

    #[test]
    fn rpm_signature_tool_failure_is_failure() {
        let exec = MockExecutor::new().then_exit(1, "error: open failed");
        assert!(check_rpm_signature(&exec, Path::new("x.src.rpm")).is_err());
    }

    fn key_file(dir: &Path) -> PathBuf {
        let key = dir.join("key.pem");
        fs::write(&key, "-----BEGIN PGP PUBLIC KEY BLOCK-----\n").unwrap();
        key
    }

    #[test]
    fn detached_signature_uses_private_homedir() {
        let temp = TempDir::new().unwrap();
        let key = key_file(temp.path());
        let file = temp.path().join("foo.tar.gz");
        let sig = temp.path().join("foo.tar.gz.sig");
        fs::write(&file, b"data").unwrap();
        fs::write(&sig, b"sig").unwrap();

        let exec = MockExecutor::new()
            .then_ok()
            .then_output("tru::1:1\npub:-:255:22:ABC:1::::::scESC:\nfpr:::::::::ABC:\n")
            .then_ok();
        verify_detached(&exec, &file, &sig, &key).unwrap();

        let calls = exec.calls();
        assert_eq!(calls.len(), 3);
        let home = calls[0].args[1].clone();
        assert!(home.ends_with("gnupg"));
        assert!(!Path::new(&home).exists(), "keyring must be removed");
        assert_eq!(calls[0].args[3], "--import");
        assert_eq!(calls[2].args[3], "--verify");
        assert_eq!(calls[2].args[5], file.to_string_lossy());
    }

    #[test]
    fn detached_signature_over_uncompressed_payload() {
        let temp = TempDir::new().unwrap();
        let key = key_file(temp.path());
        let file = temp.path().join("foo.tar.gz");
        let sig = temp.path().join("foo.tar.sig");
        let mut encoder = GzEncoder::new(fs::File::create(&file).unwrap(), Compression::default());
        encoder.write_all(b"tar bytes").unwrap();
        encoder.finish().unwrap();
        fs::write(&sig, b"sig").unwrap();

        let exec = MockExecutor::new()
            .then_ok()
            .then_output("pub:-:255:22:ABC:1::::::scESC:\n")
            .then_ok();
        verify_detached(&exec, &file, &sig, &key).unwrap();

        let verify = &exec.calls()[2];
        assert!(verify.args[5].ends_with("foo.tar"));
    }

    #[test]
    fn mismatched_signature_is_rejected_before_gpg() {
        let temp = TempDir::new().unwrap();
        let key = key_file(temp.path());
        let exec = MockExecutor::new();
        let err = verify_detached(
            &exec,
            &temp.path().join("foobar.tar.gz"),
            &temp.path().join("signature"),
            &key,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VerifyError>(),
            Some(VerifyError::SignatureMismatch { .. })
        ));
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn key_with_two_keys_is_rejected() {
        let temp = TempDir::new().unwrap();
        let key = key_file(temp.path());
        let file = temp.path().join("a.tar.gz");
        fs::write(&file, b"x").unwrap();
        let exec = MockExecutor::new()
            .then_ok()
            .then_output("pub:-:1:1:A:::\npub:-:1:1:B:::\n");
        let err = verify_detached(&exec, &file, &temp.path().join("a.tar.gz.sig"), &key)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VerifyError>(),
            Some(VerifyError::KeyCount { count: 2, .. })
        ));
    }

    #[test]
    fn missing_key_file_fails() {
        let keyring = Keyring::new().unwrap();
        let exec = MockExecutor::new();
        let err = keyring
            .import_single(&exec, Path::new("/nonexistent/key.pem"))
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn git_tag_is_verified_as_tag() {
        let keyring = Keyring::new().unwrap();
        let exec = MockExecutor::new().then_ok().then_ok();
        verify_git_revision(&exec, Path::new("/clone"), "v1.0", &keyring).unwrap();

        let calls = exec.calls();
        assert_eq!(calls[0].args, vec!["show-ref", "--verify", "--quiet", "refs/tags/v1.0"]);
        assert_eq!(calls[1].args, vec!["verify-tag", "v1.0"]);
        assert_eq!(calls[1].dir.as_deref(), Some(Path::new("/clone")));
        assert_eq!(calls[1].env[0].0, "GNUPGHOME");
    }

    #[test]
    fn git_commit_checked_after_tag_lookup_fails() {
        let keyring = Keyring::new().unwrap();
        let exec = MockExecutor::new().then_exit(1, "").then_ok().then_ok();
        verify_git_revision(&exec, Path::new("/clone"), "abc123", &keyring).unwrap();
        assert_eq!(
            exec.command_lines(),
            vec![
                "git show-ref --verify --quiet refs/tags/abc123",
                "git cat-file -e abc123^{commit}",
                "git verify-commit abc123",
            ]
        );
    }

    #[test]
    fn git_unknown_revision_fails() {
        let keyring = Keyring::new().unwrap();
        let exec = MockExecutor::new().then_exit(1, "").then_exit(128, "bad object");
        let err = verify_git_revision(&exec, Path::new("/clone"), "nope", &keyring).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VerifyError>(),
            Some(VerifyError::UnknownRevision(rev)) if rev == "nope"
        ));
    }
}
