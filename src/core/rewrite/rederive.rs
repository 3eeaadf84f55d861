//! core::rewrite::rederive
//!
//! Re-derive a plan and its branch placements from the reconciled mapping.
//!
//! The walk is identity based: each commit line is looked up in the mapping
//! by its commit id, never by its position, so `exec`/`break` stops and
//! extra lines do not shift anything. A branch line lands on the rewritten
//! commit produced by the nearest preceding commit line that survived.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::warn;

use super::{RewriteError, RewriteMapping};
use crate::core::todo::{Command, Instruction};
use crate::core::types::{BranchName, Oid};

/// Where a plan puts a branch after the rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// The branch
    pub branch: BranchName,
    /// The stacked command that named it
    pub command: Command,
    /// The commit it should point at
    pub commit: Oid,
}

/// Result of re-derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rederived {
    /// The plan with commit ids rewritten through the mapping
    pub instructions: Vec<Instruction>,
    /// Branch placements, `branch-end-initial` excluded
    pub placements: Vec<Placement>,
    /// Non-fatal findings
    pub warnings: Vec<String>,
}

/// Re-walk `instructions` through `mapping`.
///
/// `onto` is the commit the rebase started from; branches named before
/// any commit line land there.
pub fn rederive(
    instructions: &[Instruction],
    mapping: &RewriteMapping,
    onto: &Oid,
) -> Result<Rederived, RewriteError> {
    let mut out = Vec::with_capacity(instructions.len());
    let mut placements: Vec<Placement> = Vec::new();
    let mut warnings = Vec::new();
    let mut used_keys: BTreeSet<Oid> = BTreeSet::new();
    let mut labels: HashMap<String, Option<Oid>> = HashMap::new();
    let mut current: Option<Oid> = Some(onto.clone());

    for instruction in instructions {
        match instruction.command {
            Command::Pick
            | Command::Reword
            | Command::Edit
            | Command::Squash
            | Command::Fixup => {
                let Some(new) = lookup(instruction, mapping, &mut used_keys) else {
                    warnings.push(format!(
                        "line {}: cannot identify commit '{}'",
                        instruction.line_number,
                        instruction.commit_token().unwrap_or_default()
                    ));
                    current = None;
                    out.push(instruction.clone());
                    continue;
                };
                out.push(instruction.with_commit(&new));
                current = Some(new);
            }
            Command::Drop => {
                if let Some(new) = lookup(instruction, mapping, &mut used_keys) {
                    out.push(instruction.with_commit(&new));
                } else {
                    out.push(instruction.clone());
                }
            }
            Command::Label => {
                labels.insert(instruction.rest.trim().to_string(), current.clone());
                out.push(instruction.clone());
            }
            Command::Reset => {
                current = labels.get(instruction.rest.trim()).cloned().flatten();
                if current.is_none() {
                    warnings.push(format!(
                        "line {}: reset to unknown label '{}'",
                        instruction.line_number,
                        instruction.rest.trim()
                    ));
                }
                out.push(instruction.clone());
            }
            Command::Merge => {
                current = merge_result(instruction, mapping, &mut used_keys);
                if current.is_none() {
                    warnings.push(format!(
                        "line {}: result of merge is unknown",
                        instruction.line_number
                    ));
                }
                out.push(instruction.clone());
            }
            Command::Exec | Command::Break | Command::BranchEndInitial => {
                out.push(instruction.clone());
            }
            Command::BranchEnd | Command::BranchEndNew | Command::BranchEndLast => {
                out.push(instruction.clone());
                let Some(branch) = instruction.branch() else {
                    continue;
                };
                let Some(commit) = current.clone() else {
                    warnings.push(format!(
                        "line {}: cannot place branch {}: preceding commit is unknown",
                        instruction.line_number, branch
                    ));
                    continue;
                };
                if let Some(existing) = placements.iter().find(|p| p.branch == branch) {
                    if existing.commit != commit {
                        return Err(RewriteError::BranchPlacedTwice {
                            branch,
                            first: existing.commit.clone(),
                            second: commit,
                        });
                    }
                    continue;
                }
                placements.push(Placement {
                    branch,
                    command: instruction.command,
                    commit,
                });
            }
        }
    }

    for (old, new) in mapping.iter() {
        if !used_keys.contains(old) {
            let message = format!(
                "rewrite of {} -> {} matches no line of the plan; skipped",
                old.short(7),
                new.short(7)
            );
            warn!("{message}");
            warnings.push(message);
        }
    }

    Ok(Rederived {
        instructions: out,
        placements,
        warnings,
    })
}

/// Resolve a commit line to its rewritten id. Commits the rewrite left
/// untouched are absent from the mapping and map to themselves.
fn lookup(
    instruction: &Instruction,
    mapping: &RewriteMapping,
    used: &mut BTreeSet<Oid>,
) -> Option<Oid> {
    let token = instruction.commit_token()?;
    if let Some(key) = mapping.key_for_token(token) {
        used.insert(key.clone());
        return mapping.get(key).cloned();
    }
    Oid::new(token).ok()
}

/// `merge -C <commit> ...` reuses a commit that the mapping may know.
fn merge_result(
    instruction: &Instruction,
    mapping: &RewriteMapping,
    used: &mut BTreeSet<Oid>,
) -> Option<Oid> {
    let mut words = instruction.rest.split_whitespace();
    match words.next()? {
        "-C" | "-c" => {
            let token = words.next()?;
            let key = mapping.key_for_token(token)?.clone();
            used.insert(key.clone());
            mapping.get(&key).cloned()
        }
        _ => None,
    }
}
