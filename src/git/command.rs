//! Running the system `git` binary
//!
//! Every invocation gets `GIT_TERMINAL_PROMPT=0` so a missing credential
//! fails instead of hanging on a prompt, `GIT_MERGE_AUTOEDIT=no` so merges
//! never open an editor, and `LC_ALL=C` so the messages we classify are the
//! English ones.

use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, instrument};

use crate::{Error, Result};

/// Captured result of one git invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    /// Exit code, `None` if git was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// A successful result with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed result with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr; git splits its messages across both
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// The most useful single line for an error message
    pub fn summary(&self) -> String {
        let pick = |text: &str| {
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with("hint:"))
                .find(|line| line.starts_with("fatal:") || line.starts_with("error:"))
                .or_else(|| text.lines().map(str::trim).rfind(|line| !line.is_empty()))
                .map(str::to_string)
        };

        pick(&self.stderr)
            .or_else(|| pick(&self.stdout))
            .unwrap_or_else(|| match self.code {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            })
    }

    /// Turn a non-zero exit into an infrastructure failure
    pub fn check(self, operation: &str) -> Result<GitOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::infra(operation, self.summary()))
        }
    }
}

/// Run `git -C <dir> <args>` and capture its output
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub(super) fn run(dir: &Path, args: &[&str]) -> Result<GitOutput> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir).args(args);

    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd.env("GIT_MERGE_AUTOEDIT", "no");
    cmd.env("LC_ALL", "C");

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let output = cmd
        .output()
        .map_err(|err| Error::infra(args.first().copied().unwrap_or("git"), err.to_string()))?;

    let result = GitOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(code = ?result.code, "git finished");
    Ok(result)
}
