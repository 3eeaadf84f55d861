//! core::todo::command
//!
//! The closed set of plan commands.
//!
//! Every command has one canonical name and one alias. Regular commands are
//! the ones `git rebase -i` understands; stacked commands mark where a branch
//! ends inside the plan and are stripped before the plan reaches git.

use serde::Serialize;

use crate::core::types::BranchName;

/// Which tool a command is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RebaseKind {
    /// Understood by `git rebase -i`.
    Regular,
    /// Branch boundary markers.
    Stacked,
}

/// A plan command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    Pick,
    Reword,
    Edit,
    Squash,
    Fixup,
    Exec,
    Break,
    Drop,
    Label,
    Reset,
    Merge,
    BranchEnd,
    BranchEndNew,
    BranchEndInitial,
    BranchEndLast,
}

/// Alias resolution table: every accepted spelling and what it means.
const SPELLINGS: &[(&str, Command)] = &[
    ("pick", Command::Pick),
    ("p", Command::Pick),
    ("reword", Command::Reword),
    ("r", Command::Reword),
    ("edit", Command::Edit),
    ("e", Command::Edit),
    ("squash", Command::Squash),
    ("s", Command::Squash),
    ("fixup", Command::Fixup),
    ("f", Command::Fixup),
    ("exec", Command::Exec),
    ("x", Command::Exec),
    ("break", Command::Break),
    ("b", Command::Break),
    ("drop", Command::Drop),
    ("d", Command::Drop),
    ("label", Command::Label),
    ("l", Command::Label),
    ("reset", Command::Reset),
    ("t", Command::Reset),
    ("merge", Command::Merge),
    ("m", Command::Merge),
    ("branch-end", Command::BranchEnd),
    ("be", Command::BranchEnd),
    ("branch-end-new", Command::BranchEndNew),
    ("ben", Command::BranchEndNew),
    ("branch-end-initial", Command::BranchEndInitial),
    ("bei", Command::BranchEndInitial),
    ("branch-end-last", Command::BranchEndLast),
    ("bel", Command::BranchEndLast),
];

impl Command {
    /// Every command, regular ones first.
    pub const ALL: [Command; 15] = [
        Command::Pick,
        Command::Reword,
        Command::Edit,
        Command::Squash,
        Command::Fixup,
        Command::Exec,
        Command::Break,
        Command::Drop,
        Command::Label,
        Command::Reset,
        Command::Merge,
        Command::BranchEnd,
        Command::BranchEndNew,
        Command::BranchEndInitial,
        Command::BranchEndLast,
    ];

    /// Resolve a command name or alias.
    ///
    /// ```
    /// use stacked_rebase::core::todo::Command;
    ///
    /// assert_eq!(Command::parse("bei"), Some(Command::BranchEndInitial));
    /// assert_eq!(Command::parse("fixup"), Some(Command::Fixup));
    /// assert_eq!(Command::parse("PICK"), None);
    /// ```
    pub fn parse(token: &str) -> Option<Command> {
        SPELLINGS
            .iter()
            .find(|(spelling, _)| *spelling == token)
            .map(|(_, command)| *command)
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Command::Pick => "pick",
            Command::Reword => "reword",
            Command::Edit => "edit",
            Command::Squash => "squash",
            Command::Fixup => "fixup",
            Command::Exec => "exec",
            Command::Break => "break",
            Command::Drop => "drop",
            Command::Label => "label",
            Command::Reset => "reset",
            Command::Merge => "merge",
            Command::BranchEnd => "branch-end",
            Command::BranchEndNew => "branch-end-new",
            Command::BranchEndInitial => "branch-end-initial",
            Command::BranchEndLast => "branch-end-last",
        }
    }

    /// Short alias.
    pub fn alias(self) -> &'static str {
        match self {
            Command::Pick => "p",
            Command::Reword => "r",
            Command::Edit => "e",
            Command::Squash => "s",
            Command::Fixup => "f",
            Command::Exec => "x",
            Command::Break => "b",
            Command::Drop => "d",
            Command::Label => "l",
            Command::Reset => "t",
            Command::Merge => "m",
            Command::BranchEnd => "be",
            Command::BranchEndNew => "ben",
            Command::BranchEndInitial => "bei",
            Command::BranchEndLast => "bel",
        }
    }

    pub fn kind(self) -> RebaseKind {
        match self {
            Command::BranchEnd
            | Command::BranchEndNew
            | Command::BranchEndInitial
            | Command::BranchEndLast => RebaseKind::Stacked,
            _ => RebaseKind::Regular,
        }
    }

    /// How many times the command may appear in one plan.
    pub fn max_uses(self) -> Option<usize> {
        match self {
            Command::BranchEndInitial | Command::BranchEndLast => Some(1),
            _ => None,
        }
    }

    /// Whether the command's first argument is a commit.
    pub fn takes_commit(self) -> bool {
        matches!(
            self,
            Command::Pick
                | Command::Reword
                | Command::Edit
                | Command::Squash
                | Command::Fixup
                | Command::Drop
        )
    }

    /// Whether the argument is a branch name.
    pub fn takes_branch(self) -> bool {
        self.kind() == RebaseKind::Stacked
    }

    /// Check the arguments after the command word.
    ///
    /// Returns every reason the arguments are unacceptable.
    pub fn check_args(self, rest: &str, branch_name_max_len: usize) -> Vec<String> {
        let rest = rest.trim();
        let mut reasons = Vec::new();
        match self {
            Command::Pick | Command::Reword | Command::Edit | Command::Squash | Command::Drop => {
                if rest.is_empty() {
                    reasons.push(format!("'{}' needs a commit", self.name()));
                }
            }
            Command::Fixup => {
                if commit_token(self, rest).is_none() {
                    reasons.push("'fixup' needs a commit".to_string());
                }
            }
            Command::Exec => {
                if rest.is_empty() {
                    reasons.push("'exec' needs a command to run".to_string());
                }
            }
            Command::Break => {
                if !rest.is_empty() {
                    reasons.push("'break' takes no arguments".to_string());
                }
            }
            Command::Label | Command::Reset => {
                if rest.is_empty() {
                    reasons.push(format!("'{}' needs a name", self.name()));
                }
            }
            Command::Merge => {
                if merge_label(rest).is_none() {
                    reasons.push("'merge' needs a label".to_string());
                }
            }
            Command::BranchEnd
            | Command::BranchEndNew
            | Command::BranchEndInitial
            | Command::BranchEndLast => {
                check_branch_arg(rest, branch_name_max_len, &mut reasons);
            }
        }
        reasons
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn check_branch_arg(rest: &str, max_len: usize, reasons: &mut Vec<String>) {
    if rest.is_empty() {
        reasons.push("missing branch name".to_string());
        return;
    }
    if rest.contains(char::is_whitespace) {
        reasons.push("branch name contains spaces".to_string());
    }
    if rest.chars().count() >= max_len {
        reasons.push(format!(
            "branch name is {} characters long, must be shorter than {}",
            rest.chars().count(),
            max_len
        ));
    }
    if !rest.contains(char::is_whitespace) {
        if let Err(e) = BranchName::new(rest) {
            reasons.push(e.to_string());
        }
    }
}

/// The commit token of a commit command, skipping `fixup -C`/`-c`.
pub(crate) fn commit_token(command: Command, rest: &str) -> Option<&str> {
    if !command.takes_commit() {
        return None;
    }
    let mut words = rest.split_whitespace();
    let first = words.next()?;
    if command == Command::Fixup && (first == "-C" || first == "-c") {
        words.next()
    } else {
        Some(first)
    }
}

/// The label of `merge [-C <commit> | -c <commit>] <label> [# oneline]`.
fn merge_label(rest: &str) -> Option<&str> {
    let mut words = rest.split_whitespace();
    let first = words.next()?;
    let label = if first == "-C" || first == "-c" {
        words.next()?;
        words.next()?
    } else {
        first
    };
    (label != "#").then_some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_parses_by_name_and_alias() {
        for command in Command::ALL {
            assert_eq!(Command::parse(command.name()), Some(command));
            assert_eq!(Command::parse(command.alias()), Some(command));
        }
    }

    #[test]
    fn spellings_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for (spelling, _) in SPELLINGS {
            assert!(seen.insert(spelling), "duplicate spelling {spelling}");
        }
        assert_eq!(SPELLINGS.len(), Command::ALL.len() * 2);
    }

    #[test]
    fn only_boundary_markers_are_capped() {
        for command in Command::ALL {
            let capped = matches!(
                command,
                Command::BranchEndInitial | Command::BranchEndLast
            );
            assert_eq!(command.max_uses().is_some(), capped, "{command}");
        }
    }

    #[test]
    fn stacked_kind() {
        assert_eq!(Command::BranchEndNew.kind(), RebaseKind::Stacked);
        assert_eq!(Command::Merge.kind(), RebaseKind::Regular);
    }

    mod args {
        use super::*;

        #[test]
        fn pick_needs_commit() {
            assert!(!Command::Pick.check_args("", 128).is_empty());
            assert!(Command::Pick.check_args("abc123 message", 128).is_empty());
        }

        #[test]
        fn fixup_with_flag() {
            assert!(Command::Fixup.check_args("-C abc123", 128).is_empty());
            assert!(!Command::Fixup.check_args("-C", 128).is_empty());
            assert_eq!(commit_token(Command::Fixup, "-c abc123 msg"), Some("abc123"));
        }

        #[test]
        fn break_takes_nothing() {
            assert!(Command::Break.check_args("", 128).is_empty());
            assert!(!Command::Break.check_args("now", 128).is_empty());
        }

        #[test]
        fn merge_label_forms() {
            assert!(Command::Merge.check_args("topic", 128).is_empty());
            assert!(Command::Merge.check_args("-C abc123 topic # Merge", 128).is_empty());
            assert!(!Command::Merge.check_args("-C abc123", 128).is_empty());
            assert!(!Command::Merge.check_args("", 128).is_empty());
        }

        #[test]
        fn branch_with_space_and_bad_name() {
            let reasons = Command::BranchEnd.check_args("two words", 128);
            assert_eq!(reasons, vec!["branch name contains spaces".to_string()]);

            let reasons = Command::BranchEnd.check_args("bad..name", 128);
            assert_eq!(reasons.len(), 1);
        }

        #[test]
        fn branch_length_bound_is_exclusive() {
            let at_limit = "a".repeat(128);
            let below = "a".repeat(127);
            assert_eq!(Command::BranchEnd.check_args(&at_limit, 128).len(), 1);
            assert!(Command::BranchEnd.check_args(&below, 128).is_empty());
            assert!(Command::BranchEnd.check_args(&at_limit, 200).is_empty());
        }

        #[test]
        fn branch_missing() {
            assert_eq!(
                Command::BranchEndLast.check_args("  ", 128),
                vec!["missing branch name".to_string()]
            );
        }
    }
}
