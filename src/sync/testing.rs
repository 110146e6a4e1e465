//! Scripted in-memory [`Vcs`] for unit tests

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use crate::git::{GitOutput, Vcs};
use crate::Result;

pub const ORIGIN_URL: &str = "https://example.com/me/fork.git";
pub const UPSTREAM_URL: &str = "https://example.com/org/project.git";

/// A fake repository that answers queries from fields and git invocations
/// from a script of `(args prefix, output)` pairs
///
/// Unscripted git invocations succeed with empty output. Every invocation is
/// recorded as its space-joined arguments.
pub struct FakeVcs {
    pub work_tree: bool,
    pub detached: bool,
    pub dirty: bool,
    pub shallow: bool,
    pub remotes: RefCell<BTreeMap<String, String>>,
    pub remote_heads: BTreeMap<String, String>,
    pub tracking_refs: BTreeSet<String>,
    pub local_branches: BTreeSet<String>,
    pub branch_upstreams: BTreeMap<String, String>,
    pub index_conflicts: Vec<String>,
    pub heads: RefCell<VecDeque<String>>,
    pub script: Vec<(String, RefCell<VecDeque<GitOutput>>)>,
    pub calls: RefCell<Vec<String>>,
}

impl Default for FakeVcs {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeVcs {
    /// A clean, deep clone with `origin` configured and `origin/main` fetched
    pub fn new() -> Self {
        let mut remotes = BTreeMap::new();
        remotes.insert("origin".to_string(), ORIGIN_URL.to_string());

        Self {
            work_tree: true,
            detached: false,
            dirty: false,
            shallow: false,
            remotes: RefCell::new(remotes),
            remote_heads: BTreeMap::new(),
            tracking_refs: ["origin/main".to_string()].into_iter().collect(),
            local_branches: ["main".to_string()].into_iter().collect(),
            branch_upstreams: [("main".to_string(), "origin/main".to_string())]
                .into_iter()
                .collect(),
            index_conflicts: Vec::new(),
            heads: RefCell::new(VecDeque::new()),
            script: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Queue an output for invocations starting with `prefix`
    ///
    /// Several outputs for the same prefix are returned in order; the last one
    /// repeats.
    pub fn respond(mut self, prefix: &str, output: GitOutput) -> Self {
        match self.script.iter().position(|(p, _)| p == prefix) {
            Some(i) => self.script[i].1.get_mut().push_back(output),
            None => self
                .script
                .push((prefix.to_string(), RefCell::new(VecDeque::from([output])))),
        }
        self
    }

    pub fn with_remote(self, name: &str, url: &str) -> Self {
        self.remotes
            .borrow_mut()
            .insert(name.to_string(), url.to_string());
        self
    }

    pub fn without_remote(self, name: &str) -> Self {
        self.remotes.borrow_mut().remove(name);
        self
    }

    pub fn with_remote_head(mut self, remote: &str, branch: &str) -> Self {
        self.remote_heads
            .insert(remote.to_string(), branch.to_string());
        self
    }

    /// Successive answers of `head_oid`; the last one repeats
    pub fn with_heads(self, heads: &[&str]) -> Self {
        self.heads
            .borrow_mut()
            .extend(heads.iter().map(|h| h.to_string()));
        self
    }

    /// All recorded invocations
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Recorded invocations starting with `prefix`
    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    /// Position of the first invocation starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|call| call.starts_with(prefix))
    }
}

impl Vcs for FakeVcs {
    fn path(&self) -> &Path {
        Path::new("/work/fork")
    }

    fn is_work_tree(&self) -> Result<bool> {
        Ok(self.work_tree)
    }

    fn is_head_detached(&self) -> Result<bool> {
        Ok(self.detached)
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        Ok(self.dirty)
    }

    fn is_shallow(&self) -> Result<bool> {
        Ok(self.shallow)
    }

    fn remote_url(&self, name: &str) -> Result<Option<String>> {
        Ok(self.remotes.borrow().get(name).cloned())
    }

    fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.calls.borrow_mut().push(format!("remote add {name} {url}"));
        self.remotes
            .borrow_mut()
            .insert(name.to_string(), url.to_string());
        Ok(())
    }

    fn remote_head(&self, remote: &str) -> Result<Option<String>> {
        Ok(self.remote_heads.get(remote).cloned())
    }

    fn remote_tracking_ref_exists(&self, remote: &str, branch: &str) -> Result<bool> {
        Ok(self.tracking_refs.contains(&format!("{remote}/{branch}")))
    }

    fn local_branch_exists(&self, branch: &str) -> Result<bool> {
        Ok(self.local_branches.contains(branch))
    }

    fn branch_upstream(&self, branch: &str) -> Result<Option<String>> {
        Ok(self.branch_upstreams.get(branch).cloned())
    }

    fn head_oid(&self) -> Result<Option<String>> {
        let mut heads = self.heads.borrow_mut();
        let head = if heads.len() > 1 {
            heads.pop_front()
        } else {
            heads.front().cloned()
        };
        Ok(Some(head.unwrap_or_else(|| "0".repeat(40))))
    }

    fn conflicted_paths(&self) -> Result<Vec<String>> {
        Ok(self.index_conflicts.clone())
    }

    fn git(&self, args: &[&str]) -> Result<GitOutput> {
        let call = args.join(" ");
        self.calls.borrow_mut().push(call.clone());

        let scripted = self
            .script
            .iter()
            .find(|(prefix, _)| call.starts_with(prefix.as_str()));

        Ok(match scripted {
            Some((_, queue)) => {
                let mut queue = queue.borrow_mut();
                if queue.len() > 1 {
                    queue.pop_front().unwrap_or_default()
                } else {
                    queue.front().cloned().unwrap_or_default()
                }
            }
            None => GitOutput::ok(""),
        })
    }
}
