//! Classifying failed merges and rebases
//!
//! A non-zero exit from `git merge` or `git rebase` can mean three very
//! different things: the fast-forward was refused because history diverged,
//! the integration stopped on conflicts, or something else went wrong
//! (network, dirty files in the way, a bad ref). Only the first may be routed
//! into a fallback; only the second gets the continue/abort guidance.

use regex::Regex;
use std::sync::OnceLock;

use super::GitOutput;

/// What a failed integration attempt means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// `--ff-only` refused because local and upstream diverged
    NotFastForward,
    /// Stopped with unresolved conflicts in these paths (may be empty if git
    /// reported a conflict without naming files)
    Conflict(Vec<String>),
    /// Anything else
    Other(String),
}

fn not_ff_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)not possible to fast-forward|diverging branches can't be fast-forwarded")
            .expect("valid regex")
    })
}

fn conflict_marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?mi)^CONFLICT \(|^error: could not apply |automatic merge failed")
            .expect("valid regex")
    })
}

fn conflict_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?m)^CONFLICT \([^)]*\): (?:Merge conflict in (?P<merged>.+?)|(?P<deleted>\S+) deleted in .*)\s*$",
        )
        .expect("valid regex")
    })
}

/// Paths named in `CONFLICT (...)` lines, sorted and deduplicated
pub fn conflict_paths(text: &str) -> Vec<String> {
    let mut paths: Vec<String> = conflict_path_pattern()
        .captures_iter(text)
        .filter_map(|caps| caps.name("merged").or_else(|| caps.name("deleted")))
        .map(|m| m.as_str().trim().to_string())
        .collect();
    paths.sort();
    paths.dedup();
    paths
}

/// Classify a failed `git merge --ff-only`
pub fn classify_fast_forward(output: &GitOutput) -> Failure {
    let text = output.combined();
    if not_ff_pattern().is_match(&text) {
        Failure::NotFastForward
    } else {
        Failure::Other(output.summary())
    }
}

/// Classify a failed `git merge` or `git rebase`
///
/// `index_conflicts` are the conflicted paths the index reports after the
/// attempt; they count as a conflict even when the output is unrecognised.
pub fn classify_integration(output: &GitOutput, index_conflicts: &[String]) -> Failure {
    let text = output.combined();
    let mut paths = conflict_paths(&text);
    paths.extend(index_conflicts.iter().cloned());
    paths.sort();
    paths.dedup();

    if !paths.is_empty() || conflict_marker_pattern().is_match(&text) {
        Failure::Conflict(paths)
    } else {
        Failure::Other(output.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERGE_CONFLICT: &str = "\
Auto-merging README.md
CONFLICT (content): Merge conflict in README.md
CONFLICT (modify/delete): docs/old.md deleted in HEAD and modified in upstream/main.  Version upstream/main of docs/old.md left in tree.
Automatic merge failed; fix conflicts and then commit the result.
";

    #[test]
    fn test_conflict_paths() {
        assert_eq!(
            conflict_paths(MERGE_CONFLICT),
            vec!["README.md".to_string(), "docs/old.md".to_string()]
        );
    }

    #[test]
    fn test_merge_conflict_classified() {
        let out = GitOutput {
            code: Some(1),
            stdout: MERGE_CONFLICT.into(),
            stderr: String::new(),
        };
        assert_eq!(
            classify_integration(&out, &[]),
            Failure::Conflict(vec!["README.md".into(), "docs/old.md".into()])
        );
    }

    #[test]
    fn test_rebase_conflict_classified() {
        let out = GitOutput {
            code: Some(1),
            stdout: "Auto-merging a.txt\nCONFLICT (content): Merge conflict in a.txt\n".into(),
            stderr: "error: could not apply 1a2b3c4... local edit\nhint: Resolve all conflicts manually\n"
                .into(),
        };
        assert_eq!(
            classify_integration(&out, &[]),
            Failure::Conflict(vec!["a.txt".into()])
        );
    }

    #[test]
    fn test_index_conflicts_count_without_output() {
        let out = GitOutput::failed(1, "");
        assert_eq!(
            classify_integration(&out, &["b.txt".to_string()]),
            Failure::Conflict(vec!["b.txt".into()])
        );
    }

    #[test]
    fn test_other_failure_is_not_a_conflict() {
        let out = GitOutput::failed(
            1,
            "error: Your local changes to the following files would be overwritten by merge:\n\ta.txt\nAborting\n",
        );
        assert!(matches!(classify_integration(&out, &[]), Failure::Other(_)));
    }

    #[test]
    fn test_fast_forward_refusal() {
        let old = GitOutput::failed(128, "fatal: Not possible to fast-forward, aborting.\n");
        assert_eq!(classify_fast_forward(&old), Failure::NotFastForward);

        let new = GitOutput::failed(
            128,
            "hint: Diverging branches can't be fast-forwarded, you need to either:\nfatal: Not possible to fast-forward, aborting.\n",
        );
        assert_eq!(classify_fast_forward(&new), Failure::NotFastForward);
    }

    #[test]
    fn test_fast_forward_other_failure() {
        let out = GitOutput::failed(
            128,
            "merge: upstream/main - not something we can merge\n",
        );
        assert_eq!(
            classify_fast_forward(&out),
            Failure::Other("merge: upstream/main - not something we can merge".into())
        );
    }
}
