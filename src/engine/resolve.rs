//! engine::resolve
//!
//! Where are the stack's branches right now?
//!
//! After a rewrite finished but before it is applied, the branch refs still
//! point at the old commits and the truth lives in the saved plan plus the
//! rewrite log. Otherwise the refs are the truth. The caller states which
//! it wants; [`Strategy::Adaptive`] decides with one check of the
//! needs-to-apply state and nothing else.

use serde::Serialize;
use tracing::debug;

use super::apply::derive;
use super::EngineError;
use crate::core::boundary::{extract_from_head, Boundary};
use crate::core::state::RebaseState;
use crate::core::todo::ValidateOptions;
use crate::core::types::{BranchName, BranchRef};
use crate::git::Vcs;

/// How to find the boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Re-derive the saved plan through the rewrite log.
    PendingPlan,
    /// Walk the current branch refs.
    FreshWalk,
    /// `PendingPlan` when a rewrite still needs applying, else `FreshWalk`.
    Adaptive,
}

/// Which source the boundaries came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    PendingPlan,
    FreshWalk,
}

/// Resolved boundaries, oldest first, initial branch excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub source: Source,
    pub boundaries: Vec<Boundary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Resolve the boundaries of the stack from `initial` to HEAD.
pub fn resolve(
    vcs: &dyn Vcs,
    state: &RebaseState,
    initial: &BranchName,
    strategy: Strategy,
    options: ValidateOptions,
) -> Result<Resolved, EngineError> {
    let source = match strategy {
        Strategy::PendingPlan => Source::PendingPlan,
        Strategy::FreshWalk => Source::FreshWalk,
        Strategy::Adaptive if state.needs_to_apply()? => Source::PendingPlan,
        Strategy::Adaptive => Source::FreshWalk,
    };
    debug!(?strategy, ?source, "resolving boundaries");

    match source {
        Source::FreshWalk => {
            let stack = extract_from_head(vcs, initial)?;
            Ok(Resolved {
                source,
                boundaries: stack.boundaries(),
                warnings: Vec::new(),
            })
        }
        Source::PendingPlan => {
            let derived = derive(vcs, state, options)?;
            let boundaries = derived
                .rederived
                .placements
                .into_iter()
                .map(|p| Boundary {
                    branch: BranchRef::local(p.branch),
                    commit: p.commit,
                })
                .collect();
            Ok(Resolved {
                source,
                boundaries,
                warnings: derived.warnings,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::RebasePaths;
    use crate::core::types::Oid;
    use crate::git::{Head, MockVcs};
    use std::fs;
    use tempfile::TempDir;

    fn name(s: &str) -> BranchName {
        BranchName::new(s).unwrap()
    }

    fn setup() -> (TempDir, MockVcs, RebaseState, Vec<Oid>, Vec<Oid>) {
        let temp = TempDir::new().unwrap();
        let vcs = MockVcs::new();
        let root = vcs.add_commit(&[], "root");
        let old = vcs.add_chain(&root, &["a", "b"]);
        let new = vcs.add_chain(&root, &["a", "b"]);
        vcs.set_local_branch(&name("main"), &root);
        vcs.set_local_branch(&name("part-1"), &old[0]);
        vcs.set_local_branch(&name("latest"), &old[1]);
        vcs.set_head(Head::Branch(name("latest")));
        let state = RebaseState::new(RebasePaths::new(temp.path().join(".git")));
        (temp, vcs, state, old, new)
    }

    fn write_pending(state: &RebaseState, old: &[Oid], new: &[Oid]) {
        state
            .write_plan(&format!(
                "bei main\npick {} a\nbe part-1\npick {} b\nbel latest\n",
                old[0], old[1]
            ))
            .unwrap();
        fs::write(
            state.paths().rewritten_list_path(),
            format!("rebase\n{} {}\n{} {}\n", old[0], new[0], old[1], new[1]),
        )
        .unwrap();
    }

    fn commits(resolved: &Resolved) -> Vec<&Oid> {
        resolved.boundaries.iter().map(|b| &b.commit).collect()
    }

    #[test]
    fn adaptive_walks_refs_when_nothing_pending() {
        let (_temp, vcs, state, old, _) = setup();
        let resolved = resolve(
            &vcs,
            &state,
            &name("main"),
            Strategy::Adaptive,
            ValidateOptions::default(),
        )
        .unwrap();
        assert_eq!(resolved.source, Source::FreshWalk);
        assert_eq!(commits(&resolved), vec![&old[0], &old[1]]);
    }

    #[test]
    fn adaptive_uses_plan_when_pending() {
        let (_temp, vcs, state, old, new) = setup();
        write_pending(&state, &old, &new);

        let resolved = resolve(
            &vcs,
            &state,
            &name("main"),
            Strategy::Adaptive,
            ValidateOptions::default(),
        )
        .unwrap();
        assert_eq!(resolved.source, Source::PendingPlan);
        assert_eq!(commits(&resolved), vec![&new[0], &new[1]]);
        assert_eq!(resolved.boundaries[1].branch.name, name("latest"));
    }

    #[test]
    fn fresh_walk_ignores_pending_plan() {
        let (_temp, vcs, state, old, new) = setup();
        write_pending(&state, &old, &new);

        let resolved = resolve(
            &vcs,
            &state,
            &name("main"),
            Strategy::FreshWalk,
            ValidateOptions::default(),
        )
        .unwrap();
        assert_eq!(commits(&resolved), vec![&old[0], &old[1]]);
    }

    #[test]
    fn pending_plan_without_plan_fails() {
        let (_temp, vcs, state, _, _) = setup();
        let err = resolve(
            &vcs,
            &state,
            &name("main"),
            Strategy::PendingPlan,
            ValidateOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NoPlan(_)));
    }
}
