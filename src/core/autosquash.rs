//! core::autosquash
//!
//! Autosquash reordering of the stack before the plan is written.
//!
//! Commits whose summary starts with `fixup! ` or `squash! ` are moved to
//! sit right after the commit they name and are marked so the plan renders
//! them with the matching command.
//!
//! Branch anchoring: when a moved commit was the tip of a branch, the
//! branch stays where it was in history, on the commit that preceded the
//! fixup. The target's own branches are not touched.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::core::boundary::Stack;
use crate::git::{GitError, RevisionTarget, Vcs};

/// How a relocated commit is folded into its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SquashKind {
    /// `fixup! ` prefix, message discarded
    Fixup,
    /// `squash! ` prefix, messages combined
    Squash,
}

impl SquashKind {
    /// Split a summary into its kind and target, if it has a prefix.
    ///
    /// ```
    /// use stacked_rebase::core::autosquash::SquashKind;
    ///
    /// assert_eq!(
    ///     SquashKind::parse("fixup! add parser"),
    ///     Some((SquashKind::Fixup, "add parser"))
    /// );
    /// assert_eq!(SquashKind::parse("add parser"), None);
    /// ```
    pub fn parse(summary: &str) -> Option<(SquashKind, &str)> {
        if let Some(target) = summary.strip_prefix("fixup! ") {
            Some((SquashKind::Fixup, target))
        } else {
            summary
                .strip_prefix("squash! ")
                .map(|target| (SquashKind::Squash, target))
        }
    }
}

/// Autosquash failures. All of them abort composition.
#[derive(Debug, Error)]
pub enum AutosquashError {
    /// The target is outside the rebased commits.
    #[error("auto-squash target not found in the set of commits being rebased: '{target}' (from commit {commit})")]
    TargetNotFound {
        /// Target text after the prefix
        target: String,
        /// The fixup/squash commit
        commit: String,
    },

    /// The target names a non-commit object.
    #[error("auto-squash target is not a commit: '{target}' is a {kind} (from commit {commit})")]
    TargetNotCommit {
        /// Target text after the prefix
        target: String,
        /// Object kind
        kind: String,
        /// The fixup/squash commit
        commit: String,
    },

    /// Revision lookup failed.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// Reorder the rewritten part of `stack`.
///
/// Returns a new stack; on error nothing is reordered.
pub fn reorder(vcs: &dyn Vcs, stack: Stack) -> Result<Stack, AutosquashError> {
    let Stack {
        initial,
        latest,
        mut commits,
    } = stack;

    // Index 0 is the merge-base; only later elements are rebased.
    let snapshot: Vec<_> = commits.iter().map(|c| c.oid().clone()).collect();
    for oid in snapshot.iter().skip(1) {
        let Some(index) = commits.iter().position(|c| c.oid() == oid) else {
            continue;
        };
        let Some((kind, target)) = SquashKind::parse(&commits[index].commit.summary) else {
            continue;
        };
        let target = target.to_string();
        let target_index = resolve_target(vcs, &commits, index, &target)?;

        let mut element = commits.remove(index);
        element.squash = Some(kind);

        let insert_at = if target_index < index {
            target_index + 1
        } else {
            target_index
        };
        if insert_at != index {
            // The branches stay put in history: hand them to the commit
            // that preceded this one before it moved.
            let branches = std::mem::take(&mut element.branches);
            commits[index - 1].branches.extend(branches);
            debug!(
                commit = %element.oid().short(7),
                from = index,
                to = insert_at,
                "autosquash move"
            );
        }
        commits.insert(insert_at, element);
    }

    Ok(Stack {
        initial,
        latest,
        commits,
    })
}

/// Find the element a fixup/squash refers to.
///
/// Tried in order: exact summary of an earlier commit, summary prefix of an
/// earlier commit, then any revision git can resolve that lands in the set.
fn resolve_target(
    vcs: &dyn Vcs,
    commits: &[crate::core::boundary::CommitAndBoundary],
    index: usize,
    target: &str,
) -> Result<usize, AutosquashError> {
    let earlier = 1..index;
    if let Some(found) = earlier
        .clone()
        .find(|&i| commits[i].commit.summary == target)
    {
        return Ok(found);
    }
    if let Some(found) = earlier
        .clone()
        .find(|&i| commits[i].commit.summary.starts_with(target))
    {
        return Ok(found);
    }

    let commit = commits[index].oid().short(7).to_string();
    match vcs.resolve_revision(target)? {
        Some(RevisionTarget::Commit(oid)) => commits
            .iter()
            .enumerate()
            .skip(1)
            .find(|(i, c)| *i != index && c.oid() == &oid)
            .map(|(i, _)| i)
            .ok_or(AutosquashError::TargetNotFound {
                target: target.to_string(),
                commit,
            }),
        Some(RevisionTarget::Other { kind }) => Err(AutosquashError::TargetNotCommit {
            target: target.to_string(),
            kind,
            commit,
        }),
        None => Err(AutosquashError::TargetNotFound {
            target: target.to_string(),
            commit,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::boundary::extract;
    use crate::core::types::{BranchName, BranchRef, Oid};
    use crate::git::{Head, MockVcs};

    fn name(s: &str) -> BranchName {
        BranchName::new(s).unwrap()
    }

    /// Builds main at the base and a chain on top; returns the chain ids.
    fn build(vcs: &MockVcs, summaries: &[&str]) -> Vec<Oid> {
        let base = vcs.add_commit(&[], "base");
        vcs.set_local_branch(&name("main"), &base);
        let chain = vcs.add_chain(&base, summaries);
        vcs.set_local_branch(&name("latest"), chain.last().unwrap());
        vcs.set_head(Head::Branch(name("latest")));
        chain
    }

    fn summaries(stack: &Stack) -> Vec<&str> {
        stack
            .rewritten()
            .iter()
            .map(|c| c.commit.summary.as_str())
            .collect()
    }

    #[test]
    fn moves_fixup_after_target() {
        let vcs = MockVcs::new();
        build(&vcs, &["a", "b", "fixup! a", "c"]);
        let stack = extract(&vcs, &name("main"), &name("latest")).unwrap();

        let stack = reorder(&vcs, stack).unwrap();
        assert_eq!(summaries(&stack), vec!["a", "fixup! a", "b", "c"]);
        assert_eq!(stack.rewritten()[1].squash, Some(SquashKind::Fixup));
        assert_eq!(stack.rewritten()[0].squash, None);
    }

    #[test]
    fn adjacent_fixup_is_only_marked() {
        let vcs = MockVcs::new();
        build(&vcs, &["a", "squash! a"]);
        let stack = extract(&vcs, &name("main"), &name("latest")).unwrap();

        let stack = reorder(&vcs, stack).unwrap();
        assert_eq!(summaries(&stack), vec!["a", "squash! a"]);
        assert_eq!(stack.rewritten()[1].squash, Some(SquashKind::Squash));
        assert_eq!(
            stack.rewritten()[1].branches,
            vec![BranchRef::local(name("latest"))]
        );
    }

    #[test]
    fn branch_on_moved_fixup_stays_on_predecessor() {
        let vcs = MockVcs::new();
        let chain = build(&vcs, &["a", "b", "fixup! a", "c"]);
        vcs.set_local_branch(&name("part-1"), &chain[0]);
        vcs.set_local_branch(&name("part-2"), &chain[2]);
        let stack = extract(&vcs, &name("main"), &name("latest")).unwrap();

        let stack = reorder(&vcs, stack).unwrap();
        let rewritten = stack.rewritten();
        assert_eq!(rewritten[0].branches, vec![BranchRef::local(name("part-1"))]);
        assert!(rewritten[1].branches.is_empty());
        assert_eq!(rewritten[2].commit.summary, "b");
        assert_eq!(rewritten[2].branches, vec![BranchRef::local(name("part-2"))]);
    }

    #[test]
    fn fixup_of_fixup() {
        let vcs = MockVcs::new();
        build(&vcs, &["a", "fixup! a", "b", "fixup! fixup! a"]);
        let stack = extract(&vcs, &name("main"), &name("latest")).unwrap();

        let stack = reorder(&vcs, stack).unwrap();
        assert_eq!(
            summaries(&stack),
            vec!["a", "fixup! a", "fixup! fixup! a", "b"]
        );
    }

    #[test]
    fn prefix_match_and_hash_target() {
        let vcs = MockVcs::new();
        build(&vcs, &["add parser for todo", "b", "fixup! add parser"]);
        let stack = extract(&vcs, &name("main"), &name("latest")).unwrap();
        let stack = reorder(&vcs, stack).unwrap();
        assert_eq!(summaries(&stack)[1], "fixup! add parser");

        let vcs = MockVcs::new();
        let base = vcs.add_commit(&[], "base");
        vcs.set_local_branch(&name("main"), &base);
        let a = vcs.add_commit(&[&base], "a");
        let b = vcs.add_commit(&[&a], "b");
        let fix = vcs.add_commit(&[&b], &format!("fixup! {}", a.short(10)));
        vcs.set_local_branch(&name("latest"), &fix);
        let stack = extract(&vcs, &name("main"), &name("latest")).unwrap();
        let stack = reorder(&vcs, stack).unwrap();
        assert_eq!(stack.rewritten()[1].oid(), &fix);
    }

    #[test]
    fn target_outside_set_is_fatal() {
        let vcs = MockVcs::new();
        build(&vcs, &["a", "fixup! base"]);
        let stack = extract(&vcs, &name("main"), &name("latest")).unwrap();

        let err = reorder(&vcs, stack).unwrap_err();
        assert!(matches!(err, AutosquashError::TargetNotFound { .. }));
        assert!(err
            .to_string()
            .starts_with("auto-squash target not found in the set of commits being rebased"));
    }

    #[test]
    fn non_commit_target_is_fatal() {
        let vcs = MockVcs::new();
        vcs.add_object("v1-tree", "tree");
        build(&vcs, &["a", "squash! v1-tree"]);
        let stack = extract(&vcs, &name("main"), &name("latest")).unwrap();

        let err = reorder(&vcs, stack).unwrap_err();
        assert!(matches!(err, AutosquashError::TargetNotCommit { .. }));
    }
}
