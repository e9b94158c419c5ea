//! Version-control state for the `changed` and `staged` scopes.
//!
//! The checker only needs to know which root-relative paths were touched and
//! which were deleted. [`VcsState`] is that narrow interface; [`GitCli`]
//! answers it by shelling out to `git`, so nothing outside this module
//! depends on git's output format.

use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

use format_doc_core::models::normalize_rel;

use crate::error::ScopeResolutionError;

/// Paths touched relative to the last commit (or the staging area).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingChanges {
    touched: BTreeSet<String>,
    deleted: BTreeSet<String>,
}

impl WorkingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a modified or newly added path.
    pub fn touch(&mut self, path: &str) {
        let path = normalize_rel(path);
        self.deleted.remove(&path);
        self.touched.insert(path);
    }

    /// Record a deleted path.
    pub fn delete(&mut self, path: &str) {
        let path = normalize_rel(path);
        self.touched.remove(&path);
        self.deleted.insert(path);
    }

    /// Was this root-relative path modified or added?
    pub fn contains(&self, path: &str) -> bool {
        self.touched.contains(path)
    }

    pub fn deleted(&self) -> impl Iterator<Item = &str> {
        self.deleted.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.touched.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.touched.len() + self.deleted.len()
    }

    fn merge(&mut self, other: WorkingChanges) {
        for path in other.touched {
            self.touch(&path);
        }
        for path in other.deleted {
            self.delete(&path);
        }
    }
}

/// Source of working-tree and staging-area state.
pub trait VcsState: Send + Sync {
    /// Tracked modifications (staged or not), additions, deletions, and
    /// untracked files, relative to the last commit.
    fn changed(&self, root: &Path) -> Result<WorkingChanges, ScopeResolutionError>;

    /// Paths in the staging area.
    fn staged(&self, root: &Path) -> Result<WorkingChanges, ScopeResolutionError>;
}

/// [`VcsState`] backed by the `git` command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl VcsState for GitCli {
    fn changed(&self, root: &Path) -> Result<WorkingChanges, ScopeResolutionError> {
        let mode = "changed";
        ensure_work_tree(root, mode)?;

        let mut changes = if has_head(root) {
            parse_name_status(&git(
                root,
                mode,
                &["diff", "HEAD", "--name-status", "-z", "--no-renames", "--relative"],
            )?)
        } else {
            let mut staged = parse_name_status(&git(
                root,
                mode,
                &["diff", "--cached", "--name-status", "-z", "--no-renames", "--relative"],
            )?);
            staged.merge(parse_name_status(&git(
                root,
                mode,
                &["diff", "--name-status", "-z", "--no-renames", "--relative"],
            )?));
            staged
        };

        let untracked = git(root, mode, &["ls-files", "--others", "--exclude-standard", "-z"])?;
        for path in untracked.split('\0').filter(|p| !p.is_empty()) {
            changes.touch(path);
        }

        tracing::debug!(paths = changes.len(), "git reported changed paths");
        Ok(changes)
    }

    fn staged(&self, root: &Path) -> Result<WorkingChanges, ScopeResolutionError> {
        let mode = "staged";
        ensure_work_tree(root, mode)?;
        let changes = parse_name_status(&git(
            root,
            mode,
            &["diff", "--cached", "--name-status", "-z", "--no-renames", "--relative"],
        )?);
        tracing::debug!(paths = changes.len(), "git reported staged paths");
        Ok(changes)
    }
}

/// Answers from memory; used where git is not the source of truth.
#[derive(Debug, Clone, Default)]
pub struct FixedVcs {
    pub changed: WorkingChanges,
    pub staged: WorkingChanges,
}

impl VcsState for FixedVcs {
    fn changed(&self, _root: &Path) -> Result<WorkingChanges, ScopeResolutionError> {
        Ok(self.changed.clone())
    }

    fn staged(&self, _root: &Path) -> Result<WorkingChanges, ScopeResolutionError> {
        Ok(self.staged.clone())
    }
}

fn git(root: &Path, mode: &'static str, args: &[&str]) -> Result<String, ScopeResolutionError> {
    let unavailable = |reason: String| ScopeResolutionError::VcsUnavailable {
        mode,
        root: root.to_path_buf(),
        reason,
    };

    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .output()
        .map_err(|e| unavailable(format!("failed to execute 'git': {}. Is git installed?", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(unavailable(format!(
            "git {} failed: {}",
            args.first().copied().unwrap_or_default(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn ensure_work_tree(root: &Path, mode: &'static str) -> Result<(), ScopeResolutionError> {
    let inside = git(root, mode, &["rev-parse", "--is-inside-work-tree"])?;
    if inside.trim() != "true" {
        return Err(ScopeResolutionError::VcsUnavailable {
            mode,
            root: root.to_path_buf(),
            reason: "not inside a git work tree".to_string(),
        });
    }
    Ok(())
}

/// Whether the repository has a commit to diff against.
fn has_head(root: &Path) -> bool {
    Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["rev-parse", "--verify", "--quiet", "HEAD"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Parse `git diff --name-status -z` output: NUL-separated status/path pairs,
/// with two paths after rename and copy statuses.
fn parse_name_status(output: &str) -> WorkingChanges {
    let mut changes = WorkingChanges::new();
    let mut tokens = output.split('\0').filter(|t| !t.is_empty());

    while let Some(status) = tokens.next() {
        let Some(path) = tokens.next() else {
            break;
        };
        match status.chars().next() {
            Some('D') => changes.delete(path),
            Some('R') => {
                changes.delete(path);
                if let Some(new_path) = tokens.next() {
                    changes.touch(new_path);
                }
            }
            Some('C') => {
                if let Some(new_path) = tokens.next() {
                    changes.touch(new_path);
                }
            }
            _ => changes.touch(path),
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_status_pairs() {
        let out = "M\0services/user.ts\0A\0auth.go\0D\0billing/invoice.py\0";
        let changes = parse_name_status(out);
        assert!(changes.contains("services/user.ts"));
        assert!(changes.contains("auth.go"));
        assert!(!changes.contains("billing/invoice.py"));
        assert!(changes.deleted.contains("billing/invoice.py"));
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn parses_renames_and_copies() {
        let out = "R100\0old.ts\0new.ts\0C075\0a.ts\0b.ts\0";
        let changes = parse_name_status(out);
        assert!(changes.deleted.contains("old.ts"));
        assert!(changes.contains("new.ts"));
        assert!(changes.contains("b.ts"));
        assert!(!changes.contains("a.ts"));
    }

    #[test]
    fn empty_output_is_empty() {
        assert!(parse_name_status("").is_empty());
    }

    #[test]
    fn later_event_wins() {
        let mut changes = WorkingChanges::new();
        changes.delete("a.ts");
        changes.touch("./a.ts");
        assert!(changes.contains("a.ts"));
        assert!(!changes.deleted.contains("a.ts"));
        assert_eq!(changes.deleted().count(), 0);
    }
}
