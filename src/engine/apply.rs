//! engine::apply
//!
//! Move the stack's branches to where the finished rewrite put them.
//!
//! The plan the user saved is re-walked through the reconciled rewrite
//! mapping; every branch it names (except the initial one) is then set with
//! a compare-and-swap ref update. Applying twice is harmless: branches that
//! already sit on their placement are left alone.

use serde::Serialize;
use tracing::{info, warn};

use super::EngineError;
use crate::core::boundary::resolve_initial;
use crate::core::rewrite::{parse_log, reconcile, rederive, Rederived};
use crate::core::state::RebaseState;
use crate::core::todo::{parse_plan_text, validate, PlanValidationError, ValidateOptions};
use crate::core::types::{BranchName, Oid};
use crate::git::Vcs;

/// A branch pointer that was moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchMove {
    pub branch: BranchName,
    pub from: Oid,
    pub to: Oid,
}

/// What apply changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Existing branches moved
    pub moved: Vec<BranchMove>,
    /// Branches created (`branch-end-new`, or names that did not exist)
    pub created: Vec<(BranchName, Oid)>,
    /// Branches already at their placement
    pub unchanged: Vec<BranchName>,
    /// Non-fatal findings from reconciliation
    pub warnings: Vec<String>,
}

/// The saved plan re-walked through the rewrite log.
#[derive(Debug, Clone)]
pub struct Derived {
    /// Branch named by `branch-end-initial`
    pub initial: BranchName,
    /// Re-derived plan and placements
    pub rederived: Rederived,
    /// Reconciliation and re-derivation warnings
    pub warnings: Vec<String>,
}

/// Re-derive the saved plan without touching any branch.
pub fn derive(
    vcs: &dyn Vcs,
    state: &RebaseState,
    options: ValidateOptions,
) -> Result<Derived, EngineError> {
    let paths = state.paths();
    let text = state
        .read_plan()?
        .ok_or_else(|| EngineError::NoPlan(paths.plan_path()))?;
    let instructions = validate(&parse_plan_text(&text), options)?;
    let initial = instructions
        .first()
        .and_then(|i| i.branch())
        .ok_or(PlanValidationError::Empty)?;

    let log = state
        .read_rewritten_list()?
        .ok_or_else(|| EngineError::NoRewriteLog(paths.rewritten_list_path()))?;
    let reconciled = reconcile(&parse_log(&log)?)?;
    let mapping = reconciled.combined()?;

    let onto = resolve_initial(vcs, &initial)?;
    let rederived = rederive(&instructions, &mapping, &onto)?;

    let mut warnings = reconciled.warnings;
    warnings.extend(rederived.warnings.iter().cloned());
    Ok(Derived {
        initial,
        rederived,
        warnings,
    })
}

/// Move every branch of the saved plan, then mark the log applied.
pub fn apply(
    vcs: &dyn Vcs,
    state: &RebaseState,
    options: ValidateOptions,
) -> Result<ApplyReport, EngineError> {
    let derived = derive(vcs, state, options)?;
    let mut report = ApplyReport {
        warnings: derived.warnings,
        ..ApplyReport::default()
    };

    for placement in &derived.rederived.placements {
        if placement.branch == derived.initial {
            continue;
        }
        let target = &placement.commit;
        match vcs.resolve_branch(&placement.branch)? {
            Some(current) if &current == target => {
                report.unchanged.push(placement.branch.clone());
            }
            Some(current) => {
                vcs.set_branch(&placement.branch, target, Some(&current))?;
                info!(branch = %placement.branch, from = %current.short(7), to = %target.short(7), "moved");
                report.moved.push(BranchMove {
                    branch: placement.branch.clone(),
                    from: current,
                    to: target.clone(),
                });
            }
            None => {
                vcs.set_branch(&placement.branch, target, None)?;
                info!(branch = %placement.branch, at = %target.short(7), "created");
                report
                    .created
                    .push((placement.branch.clone(), target.clone()));
            }
        }
    }

    for warning in &report.warnings {
        warn!("{warning}");
    }
    state.mark_applied()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::RebasePaths;
    use crate::git::{Head, MockVcs};
    use std::fs;
    use tempfile::TempDir;

    fn name(s: &str) -> BranchName {
        BranchName::new(s).unwrap()
    }

    struct Fixture {
        _temp: TempDir,
        vcs: MockVcs,
        state: RebaseState,
        old: Vec<Oid>,
        new: Vec<Oid>,
    }

    /// `main` at root; `part-1` at a, `latest` at b. The rewrite produced
    /// a2 and b2 on top of root.
    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let vcs = MockVcs::new();
        let root = vcs.add_commit(&[], "root");
        let old = vcs.add_chain(&root, &["a", "b"]);
        let new = vcs.add_chain(&root, &["a", "b"]);
        vcs.set_local_branch(&name("main"), &root);
        vcs.set_local_branch(&name("part-1"), &old[0]);
        vcs.set_local_branch(&name("latest"), &new[1]);
        vcs.set_head(Head::Branch(name("latest")));

        let state = RebaseState::new(RebasePaths::new(temp.path().join(".git")));
        Fixture {
            _temp: temp,
            vcs,
            state,
            old,
            new,
        }
    }

    fn write_plan(f: &Fixture, extra: &str) {
        let plan = format!(
            "branch-end-initial main\npick {} a\nbranch-end part-1\n{extra}pick {} b\nbranch-end-last latest\n",
            f.old[0], f.old[1]
        );
        f.state.write_plan(&plan).unwrap();
        let log = format!(
            "rebase\n{} {}\n{} {}\n\n",
            f.old[0], f.new[0], f.old[1], f.new[1]
        );
        fs::create_dir_all(f.state.paths().root()).unwrap();
        fs::write(f.state.paths().rewritten_list_path(), log).unwrap();
    }

    #[test]
    fn moves_branches_and_marks_applied() {
        let f = fixture();
        write_plan(&f, "");

        let report = apply(&f.vcs, &f.state, ValidateOptions::default()).unwrap();

        assert_eq!(
            report.moved,
            vec![BranchMove {
                branch: name("part-1"),
                from: f.old[0].clone(),
                to: f.new[0].clone(),
            }]
        );
        assert_eq!(report.unchanged, vec![name("latest")]);
        assert_eq!(f.vcs.local_branches()[&name("part-1")], f.new[0]);
        assert!(!f.state.needs_to_apply().unwrap());
    }

    #[test]
    fn branch_end_new_creates_branch() {
        let f = fixture();
        write_plan(&f, "branch-end-new split\n");

        let report = apply(&f.vcs, &f.state, ValidateOptions::default()).unwrap();
        assert_eq!(report.created, vec![(name("split"), f.new[0].clone())]);
        assert_eq!(f.vcs.local_branches()[&name("split")], f.new[0]);
    }

    #[test]
    fn second_apply_changes_nothing() {
        let f = fixture();
        write_plan(&f, "");
        apply(&f.vcs, &f.state, ValidateOptions::default()).unwrap();

        let report = apply(&f.vcs, &f.state, ValidateOptions::default()).unwrap();
        assert!(report.moved.is_empty());
        assert_eq!(report.unchanged.len(), 2);
    }

    #[test]
    fn missing_log_is_reported() {
        let f = fixture();
        f.state.write_plan("branch-end-initial main\nbranch-end-last latest\n").unwrap();
        let err = apply(&f.vcs, &f.state, ValidateOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::NoRewriteLog(_)));
    }

    #[test]
    fn missing_plan_is_reported() {
        let f = fixture();
        let err = apply(&f.vcs, &f.state, ValidateOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::NoPlan(_)));
    }
}
