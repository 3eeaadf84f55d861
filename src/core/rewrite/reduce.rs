//! core::rewrite::reduce
//!
//! Amend folding and path compression.
//!
//! Amends recorded while a rebase was stopped (e.g. at `edit`) are logged
//! before that rebase's block and are folded into it. Amends logged after
//! the last rebase extend it. Each rebase mapping is then path-compressed
//! so no value is also a key, except for `X -> X` rows.
//!
//! An amend folded in ahead of its rebase only links a commit the rebase
//! itself created; that link is dropped again once the chain is compressed,
//! so every surviving key is a commit from before the rewrite.

use std::collections::BTreeSet;

use tracing::warn;

use super::{BlockKind, RewriteBlock, RewriteError, RewriteMapping};
use crate::core::types::Oid;

/// Output of reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// One compressed mapping per rebase block, in log order
    pub blocks: Vec<RewriteMapping>,
    /// Amends that could not be attached anywhere
    pub warnings: Vec<String>,
}

impl Reconciled {
    /// All blocks merged into one mapping.
    pub fn combined(&self) -> Result<RewriteMapping, RewriteError> {
        RewriteMapping::combine(&self.blocks)
    }

    /// The first rebase block as `<old> <new>` lines, empty without one.
    pub fn first_block_text(&self) -> String {
        self.blocks
            .first()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

/// Fold amends into rebase blocks and compress every rebase mapping.
pub fn reconcile(blocks: &[RewriteBlock]) -> Result<Reconciled, RewriteError> {
    let mut out = Reconciled::default();
    let mut pending: Vec<(Oid, Oid)> = Vec::new();

    for block in blocks {
        match block.kind {
            BlockKind::Amend => pending.extend(block.pairs.iter().cloned()),
            BlockKind::Rebase => {
                let mut mapping = RewriteMapping::from_pairs(&block.pairs)?;
                let mut linked = Vec::new();
                // Latest amend first so a chain of amends links up backwards
                // from the rebase's result.
                for (old, new) in pending.drain(..).rev() {
                    if fold_preceding_amend(&mut mapping, old.clone(), new)? {
                        linked.push(old);
                    }
                }
                compress(&mut mapping)?;
                for old in &linked {
                    mapping.map_mut().remove(old);
                }
                out.blocks.push(mapping);
            }
        }
    }

    if !pending.is_empty() {
        match out.blocks.last_mut() {
            Some(last) => {
                for (old, new) in pending {
                    if let Some(message) = fold_trailing_amend(last, old, new)? {
                        warn!("{message}");
                        out.warnings.push(message);
                    }
                }
                compress(last)?;
            }
            None => {
                let mut mapping = RewriteMapping::from_pairs(&pending)?;
                compress(&mut mapping)?;
                out.blocks.push(mapping);
            }
        }
    }

    Ok(out)
}

/// Attach an amend made during the rebase that follows it. Returns whether
/// the amend was added as a new link of a chain.
fn fold_preceding_amend(
    mapping: &mut RewriteMapping,
    old: Oid,
    new: Oid,
) -> Result<bool, RewriteError> {
    if mapping.contains_key(&old) {
        // Already covered; must agree.
        mapping.insert(old, new)?;
        return Ok(false);
    }
    if mapping.contains_value(&new) {
        mapping.insert(old, new)?;
        return Ok(true);
    }
    Err(RewriteError::Disconnected { old, new })
}

/// Attach an amend made after the last rebase. Returns a warning when the
/// amend has nothing to do with it.
fn fold_trailing_amend(
    mapping: &mut RewriteMapping,
    old: Oid,
    new: Oid,
) -> Result<Option<String>, RewriteError> {
    if mapping.contains_key(&old) {
        mapping.insert(old, new)?;
        return Ok(None);
    }
    if mapping.contains_value(&old) {
        mapping.insert(old, new)?;
        return Ok(None);
    }
    Ok(Some(format!(
        "ignoring amend {} -> {}: not part of the rewritten commits",
        old.short(7),
        new.short(7)
    )))
}

/// Path-compress `mapping` in place.
///
/// Every edge whose target is itself a key is redirected to that key's
/// target until nothing changes; the intermediate keys are then removed.
/// `X -> X` rows are kept.
pub fn compress(mapping: &mut RewriteMapping) -> Result<(), RewriteError> {
    let map = mapping.map_mut();
    let keys: Vec<Oid> = map.keys().cloned().collect();
    let mut intermediate: BTreeSet<Oid> = BTreeSet::new();

    // Every pass shortens at least one chain by one edge.
    let mut passes = 0;
    loop {
        let mut changed = false;
        for key in &keys {
            let Some(target) = map.get(key).cloned() else {
                continue;
            };
            if &target == key {
                continue;
            }
            if let Some(next) = map.get(&target).cloned() {
                if next != target {
                    if &next == key {
                        return Err(RewriteError::Cycle(key.clone()));
                    }
                    map.insert(key.clone(), next);
                    intermediate.insert(target);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
        passes += 1;
        if passes > keys.len() {
            return Err(RewriteError::Cycle(keys[0].clone()));
        }
    }

    for key in intermediate {
        if map.get(&key) != Some(&key) {
            map.remove(&key);
        }
    }
    Ok(())
}
