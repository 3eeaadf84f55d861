//! Property-based tests for plan validation, rewrite reconciliation,
//! autosquash and the branch sequencer.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated plans, rewrite logs and stacks.

use std::collections::BTreeSet;

use proptest::prelude::*;

use stacked_rebase::core::autosquash;
use stacked_rebase::core::boundary::{extract_from_head, Boundary};
use stacked_rebase::core::rewrite::reduce::{compress, reconcile};
use stacked_rebase::core::rewrite::{BlockKind, RewriteBlock, RewriteMapping};
use stacked_rebase::core::todo::{parse_plan_text, validate, Command, ValidateOptions};
use stacked_rebase::core::types::{BranchName, BranchRef, Oid};
use stacked_rebase::engine::sequencer::{self, SequencerOptions};
use stacked_rebase::engine::CancelToken;
use stacked_rebase::git::{Head, MockVcs, Vcs};

fn oid(n: usize) -> Oid {
    Oid::new(format!("{:040x}", n + 1)).unwrap()
}

fn name(s: &str) -> BranchName {
    BranchName::new(s).unwrap()
}

fn check(text: &str) -> Result<usize, Vec<(usize, Vec<String>)>> {
    validate(&parse_plan_text(text), ValidateOptions::default())
        .map(|instructions| instructions.len())
        .map_err(|e| {
            e.bad_lines()
                .iter()
                .map(|l| (l.line_number, l.reasons.clone()))
                .collect()
        })
}

// =============================================================================
// Plan validation
// =============================================================================

/// Body lines that are valid anywhere between the first and last line.
fn body_line() -> impl Strategy<Value = String> {
    prop_oneof![
        (0usize..50).prop_map(|n| format!("pick {} c{}", oid(n), n)),
        (0usize..50).prop_map(|n| format!("p {}", oid(n))),
        (0usize..50).prop_map(|n| format!("fixup {}", oid(n))),
        (0usize..50).prop_map(|n| format!("reword {} r{}", oid(n), n)),
        (0usize..20).prop_map(|n| format!("be part-{}", n)),
        (0usize..20).prop_map(|n| format!("ben new-{}", n)),
        Just("break".to_string()),
        Just("exec make test".to_string()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every bei ... bel plan of valid lines is accepted whole.
    #[test]
    fn framed_plans_are_accepted(body in prop::collection::vec(body_line(), 0..20)) {
        let mut lines = vec!["branch-end-initial main".to_string()];
        lines.extend(body.iter().cloned());
        lines.push("bel latest".to_string());
        prop_assert_eq!(check(&lines.join("\n")), Ok(body.len() + 2));
    }

    /// Comments and blanks never change the outcome, only line numbers.
    #[test]
    fn comments_do_not_count(
        body in prop::collection::vec(body_line(), 0..10),
        noise in prop::collection::vec(prop::bool::ANY, 0..10),
    ) {
        let mut lines = vec!["bei main".to_string()];
        for (i, line) in body.iter().enumerate() {
            if noise.get(i).copied().unwrap_or(false) {
                lines.push("# note".to_string());
                lines.push(String::new());
            }
            lines.push(line.clone());
        }
        lines.push("bel latest".to_string());
        prop_assert_eq!(check(&lines.join("\n")), Ok(body.len() + 2));
    }

    /// A plan that does not open with branch-end-initial is rejected at
    /// its first line, whatever else it contains.
    #[test]
    fn first_line_must_be_initial(
        first in body_line(),
        body in prop::collection::vec(body_line(), 0..10),
    ) {
        let mut lines = vec![first];
        lines.extend(body);
        lines.push("bel latest".to_string());
        let bad = check(&lines.join("\n")).unwrap_err();
        prop_assert_eq!(bad[0].0, 1);
        prop_assert!(bad[0].1.iter().any(|r| r.contains("first")));
    }

    /// The closing command may only be used once, and its repeats are
    /// reported with the line of the first use.
    #[test]
    fn repeated_last_is_reported(extra in 1usize..4, body in prop::collection::vec(body_line(), 0..6)) {
        let mut lines = vec!["bei main".to_string()];
        lines.extend(body.iter().cloned());
        for _ in 0..extra {
            lines.push("bel latest".to_string());
        }
        lines.push("bel latest".to_string());
        let first_use = body.len() + 2;

        let bad = check(&lines.join("\n")).unwrap_err();
        let over: Vec<_> = bad.iter().filter(|(_, reasons)| {
            reasons.iter().any(|r| r.contains(&format!("first used at line {first_use}")))
        }).collect();
        prop_assert_eq!(over.len(), extra);
    }

    /// Every alias parses to the same command as its name.
    #[test]
    fn aliases_agree(index in 0usize..Command::ALL.len()) {
        let command = Command::ALL[index];
        prop_assert_eq!(Command::parse(command.name()), Some(command));
        prop_assert_eq!(Command::parse(command.alias()), Some(command));
    }
}

// =============================================================================
// Rewrite reconciliation
// =============================================================================

/// A mapping whose keys are distinct; values are arbitrary ids from a small
/// pool so chains and cycles-to-self appear often.
fn mapping_pairs() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::btree_map(0usize..30, 0usize..30, 0..20)
        .prop_map(|m| m.into_iter().collect())
}

/// Drop pairs that would make the mapping cyclic (other than `X -> X`).
fn acyclic(pairs: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    pairs.into_iter().filter(|(old, new)| new >= old).collect()
}

fn build(pairs: &[(usize, usize)]) -> RewriteMapping {
    let mut mapping = RewriteMapping::new();
    for (old, new) in pairs {
        mapping.insert(oid(*old), oid(*new)).unwrap();
    }
    mapping
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Compressing twice changes nothing the second time.
    #[test]
    fn compress_is_idempotent(pairs in mapping_pairs().prop_map(acyclic)) {
        let mut once = build(&pairs);
        compress(&mut once).unwrap();
        let mut twice = once.clone();
        compress(&mut twice).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// After compression no value is also a key, except `X -> X` rows.
    #[test]
    fn compressed_values_are_final(pairs in mapping_pairs().prop_map(acyclic)) {
        let mut mapping = build(&pairs);
        compress(&mut mapping).unwrap();
        for (old, new) in mapping.iter() {
            if old != new {
                prop_assert!(!mapping.contains_key(new) || mapping.get(new) == Some(new));
            }
        }
    }

    /// A chain of amends after one rebase collapses onto the final id.
    #[test]
    fn trailing_amend_chain_collapses(len in 1usize..8) {
        let rebase = RewriteBlock {
            kind: BlockKind::Rebase,
            pairs: vec![(oid(0), oid(100))],
            line: 1,
        };
        let mut blocks = vec![rebase];
        for step in 0..len {
            blocks.push(RewriteBlock {
                kind: BlockKind::Amend,
                pairs: vec![(oid(100 + step), oid(101 + step))],
                line: 4 + step * 3,
            });
        }

        let reconciled = reconcile(&blocks).unwrap();
        prop_assert!(reconciled.warnings.is_empty());
        let combined = reconciled.combined().unwrap();
        prop_assert_eq!(combined.get(&oid(0)), Some(&oid(100 + len)));
    }

    /// Squashing many commits into one maps each of them to the result.
    #[test]
    fn squash_is_many_to_one(count in 1usize..10) {
        let pairs: Vec<(Oid, Oid)> = (0..count).map(|i| (oid(i), oid(200))).collect();
        let blocks = vec![RewriteBlock { kind: BlockKind::Rebase, pairs, line: 1 }];
        let combined = reconcile(&blocks).unwrap().combined().unwrap();
        prop_assert_eq!(combined.len(), count);
        for i in 0..count {
            prop_assert_eq!(combined.get(&oid(i)), Some(&oid(200)));
        }
    }
}

// =============================================================================
// Autosquash
// =============================================================================

/// A stack of plain commits and the fixups to append, each naming an
/// earlier plain commit by index.
fn squash_stack() -> impl Strategy<Value = (usize, Vec<(usize, bool)>)> {
    (2usize..8).prop_flat_map(|plain| {
        (
            Just(plain),
            prop::collection::vec((0..plain, prop::bool::ANY), 0..6),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Each fixup/squash ends up after its target with only other
    /// fixup/squash commits in between, and no commit is lost.
    #[test]
    fn fixups_follow_their_targets((plain, fixups) in squash_stack()) {
        let vcs = MockVcs::new();
        let root = vcs.add_commit(&[], "root");
        let mut summaries: Vec<String> = (0..plain).map(|i| format!("change {i}")).collect();
        for (target, squash) in &fixups {
            let prefix = if *squash { "squash!" } else { "fixup!" };
            summaries.push(format!("{prefix} change {target}"));
        }
        let refs: Vec<&str> = summaries.iter().map(String::as_str).collect();
        let chain = vcs.add_chain(&root, &refs);

        vcs.set_local_branch(&name("main"), &root);
        vcs.set_local_branch(&name("latest"), chain.last().unwrap());
        vcs.set_head(Head::Branch(name("latest")));

        let stack = extract_from_head(&vcs, &name("main")).unwrap();
        let before: BTreeSet<Oid> = stack.commits.iter().map(|c| c.oid().clone()).collect();
        let reordered = autosquash::reorder(&vcs, stack).unwrap();
        let after: BTreeSet<Oid> = reordered.commits.iter().map(|c| c.oid().clone()).collect();
        prop_assert_eq!(before, after);

        for (position, element) in reordered.commits.iter().enumerate() {
            let Some(target) = element.commit.summary.split_once("! ").map(|(_, t)| t) else {
                continue;
            };
            prop_assert!(element.squash.is_some());
            let target_position = reordered
                .commits
                .iter()
                .position(|c| c.commit.summary == target)
                .unwrap();
            prop_assert!(target_position < position);
            for between in &reordered.commits[target_position + 1..position] {
                prop_assert!(between.squash.is_some());
            }
        }

        // The latest branch still closes the stack.
        prop_assert_eq!(reordered.boundaries().last().map(|b| b.branch.name.clone()), Some(name("latest")));
    }
}

// =============================================================================
// Sequencer
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Branches are visited in order (or reverse order), failures never
    /// stop the run, and HEAD always ends where it started.
    #[test]
    fn sequencer_order_and_restore(
        count in 1usize..8,
        reverse in prop::bool::ANY,
        failing in prop::collection::btree_set(0usize..8, 0..4),
    ) {
        let vcs = MockVcs::new();
        let root = vcs.add_commit(&[], "root");
        let summaries: Vec<String> = (0..count).map(|i| format!("c{i}")).collect();
        let refs: Vec<&str> = summaries.iter().map(String::as_str).collect();
        let chain = vcs.add_chain(&root, &refs);

        let boundaries: Vec<Boundary> = chain
            .iter()
            .enumerate()
            .map(|(i, commit)| {
                let branch = name(&format!("b{i}"));
                vcs.set_local_branch(&branch, commit);
                Boundary { branch: BranchRef::local(branch), commit: commit.clone() }
            })
            .collect();
        let start = Head::Branch(name(&format!("b{}", count - 1)));
        vcs.set_head(start.clone());

        let mut visited = Vec::new();
        let mut on_branch = Vec::new();
        let result = sequencer::run(
            &vcs,
            &boundaries,
            SequencerOptions { reverse },
            &CancelToken::new(),
            |vcs, step| {
                on_branch.push(vcs.head().ok() == Some(Head::Branch(step.branch.clone())));
                visited.push(step.index);
                if failing.contains(&step.index) {
                    Err("failed".to_string())
                } else {
                    Ok(())
                }
            },
        );

        prop_assert!(on_branch.iter().all(|ok| *ok));

        let mut expected: Vec<usize> = (0..count).collect();
        if reverse {
            expected.reverse();
        }
        prop_assert_eq!(visited, expected);
        prop_assert_eq!(vcs.head().unwrap(), start);

        let failures = failing.iter().filter(|i| **i < count).count();
        match result {
            Ok(report) => {
                prop_assert_eq!(failures, 0);
                prop_assert_eq!(report.visited, count);
            }
            Err(sequencer::SequencerError::Aggregate(errors)) => {
                prop_assert_eq!(errors.len(), failures);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
