//! core::rewrite
//!
//! Rewrite-event log and its reconciliation into one commit mapping.
//!
//! # Log Format
//!
//! The post-rewrite hook appends one block per event, blocks separated by a
//! blank line:
//!
//! ```text
//! rebase
//! <old> <new>
//! <old> <new>
//!
//! amend
//! <old> <new>
//! ```
//!
//! Extra fields after `<new>` are ignored.
//!
//! # Pipeline
//!
//! [`parse_log`] → [`reduce::reconcile`] (amend folding, path compression)
//! → [`RewriteMapping::combine`] → [`rederive::rederive`].

pub mod reduce;
pub mod rederive;

pub use reduce::{reconcile, Reconciled};
pub use rederive::{rederive, Placement, Rederived};

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::core::types::{BranchName, Oid};

/// Errors from reading and reconciling the rewrite log.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewriteError {
    /// A line could not be parsed.
    #[error("malformed rewrite log at line {line}: {message}")]
    Malformed {
        /// 1-based line number
        line: usize,
        /// What is wrong
        message: String,
    },

    /// Two events disagree on what a commit became.
    #[error("conflicting rewrite of {old}: {first} vs {second}")]
    Conflict {
        /// Source commit
        old: Oid,
        /// One claimed result
        first: Oid,
        /// The other claimed result
        second: Oid,
    },

    /// An amend that cannot be attached to the rebase it precedes.
    #[error("amend {old} -> {new} is not connected to the following rebase's mapping")]
    Disconnected {
        /// Amended commit
        old: Oid,
        /// Amend result
        new: Oid,
    },

    /// Path compression did not converge.
    #[error("rewrite mapping contains a cycle through {0}")]
    Cycle(Oid),

    /// One plan puts a branch on two different commits.
    #[error("branch {branch} is placed at both {first} and {second}")]
    BranchPlacedTwice {
        /// The branch
        branch: BranchName,
        /// First placement
        first: Oid,
        /// Second placement
        second: Oid,
    },
}

/// What produced a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `git commit --amend`; exactly one pair.
    Amend,
    /// A finished rebase; any number of pairs.
    Rebase,
}

impl BlockKind {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "amend" => Some(BlockKind::Amend),
            "rebase" => Some(BlockKind::Rebase),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Amend => "amend",
            BlockKind::Rebase => "rebase",
        }
    }
}

/// One event from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteBlock {
    pub kind: BlockKind,
    /// `(old, new)` pairs in log order
    pub pairs: Vec<(Oid, Oid)>,
    /// Line of the kind tag
    pub line: usize,
}

/// A function from old commit ids to new ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteMapping {
    map: BTreeMap<Oid, Oid>,
}

impl RewriteMapping {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs, rejecting a key mapped to two values.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = &'a (Oid, Oid)>,
    ) -> Result<Self, RewriteError> {
        let mut mapping = Self::new();
        for (old, new) in pairs {
            mapping.insert(old.clone(), new.clone())?;
        }
        Ok(mapping)
    }

    /// Insert a pair; re-inserting the same pair is a no-op.
    pub fn insert(&mut self, old: Oid, new: Oid) -> Result<(), RewriteError> {
        match self.map.get(&old) {
            Some(existing) if *existing != new => Err(RewriteError::Conflict {
                old,
                first: existing.clone(),
                second: new,
            }),
            Some(_) => Ok(()),
            None => {
                self.map.insert(old, new);
                Ok(())
            }
        }
    }

    pub fn get(&self, old: &Oid) -> Option<&Oid> {
        self.map.get(old)
    }

    pub fn contains_key(&self, old: &Oid) -> bool {
        self.map.contains_key(old)
    }

    /// Whether any key maps to `new`.
    pub fn contains_value(&self, new: &Oid) -> bool {
        self.map.values().any(|v| v == new)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Pairs ordered by old id.
    pub fn iter(&self) -> impl Iterator<Item = (&Oid, &Oid)> {
        self.map.iter()
    }

    /// Find the key an abbreviated token refers to.
    pub fn key_for_token(&self, token: &str) -> Option<&Oid> {
        let mut matches = self.map.keys().filter(|k| k.matches_abbrev(token));
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    /// Merge several mappings and compress the result.
    ///
    /// Later mappings continue earlier ones: `A→B` then `B→C` gives `A→C`.
    pub fn combine<'a>(
        mappings: impl IntoIterator<Item = &'a RewriteMapping>,
    ) -> Result<RewriteMapping, RewriteError> {
        let mut combined = RewriteMapping::new();
        for mapping in mappings {
            for (old, new) in mapping.iter() {
                combined.insert(old.clone(), new.clone())?;
            }
        }
        reduce::compress(&mut combined)?;
        Ok(combined)
    }

    pub(crate) fn map_mut(&mut self) -> &mut BTreeMap<Oid, Oid> {
        &mut self.map
    }
}

impl fmt::Display for RewriteMapping {
    /// One `old new` pair per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (old, new) in &self.map {
            writeln!(f, "{old} {new}")?;
        }
        Ok(())
    }
}

/// Parse the rewrite-event log.
pub fn parse_log(text: &str) -> Result<Vec<RewriteBlock>, RewriteError> {
    let mut blocks = Vec::new();
    let mut current: Option<RewriteBlock> = None;

    for (i, raw) in text.lines().enumerate() {
        let number = i + 1;
        let line = raw.trim();
        if line.is_empty() {
            blocks.extend(current.take());
            continue;
        }

        let Some(block) = current.as_mut() else {
            let kind = BlockKind::parse(line).ok_or_else(|| RewriteError::Malformed {
                line: number,
                message: format!("expected 'amend' or 'rebase', found '{line}'"),
            })?;
            current = Some(RewriteBlock {
                kind,
                pairs: Vec::new(),
                line: number,
            });
            continue;
        };

        let mut fields = line.split_whitespace();
        let (Some(old), Some(new)) = (fields.next(), fields.next()) else {
            return Err(RewriteError::Malformed {
                line: number,
                message: format!("expected '<old> <new>', found '{line}'"),
            });
        };
        let parse = |s: &str| {
            Oid::new(s).map_err(|e| RewriteError::Malformed {
                line: number,
                message: e.to_string(),
            })
        };
        block.pairs.push((parse(old)?, parse(new)?));
    }
    blocks.extend(current);

    for block in &blocks {
        if block.kind == BlockKind::Amend && block.pairs.len() != 1 {
            return Err(RewriteError::Malformed {
                line: block.line,
                message: format!("amend block has {} pairs, expected 1", block.pairs.len()),
            });
        }
    }
    Ok(blocks)
}
