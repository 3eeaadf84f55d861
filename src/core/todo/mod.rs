//! core::todo
//!
//! The stacked plan: instruction model, plan generation and the regular
//! todo handed to git.
//!
//! # Plan Format
//!
//! ```text
//! branch-end-initial main
//! pick 5f0c... first commit of part-1
//! branch-end part-1
//! pick 9ab2... first commit of part-2
//! fixup 77d1... fixup! first commit of part-2
//! branch-end-last part-2
//! ```
//!
//! Lines starting with `#` and blank lines are comments. Line numbers in
//! diagnostics are positions in the edited file.

pub mod command;
pub mod validate;

pub use command::{Command, RebaseKind};
pub use validate::{validate, BadLine, PlanValidationError, ValidateOptions};

use serde::Serialize;

use crate::core::autosquash::SquashKind;
use crate::core::boundary::Stack;
use crate::core::types::{BranchName, BranchRef, Oid};

/// A non-comment line of the plan file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLine {
    /// 1-based position in the file
    pub number: usize,
    /// Line text
    pub text: String,
}

/// A validated plan line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    /// 1-based position in the plan file
    pub line_number: usize,
    /// The whole line, trimmed
    pub full_line: String,
    /// Command word as written (name or alias)
    pub command_or_alias: String,
    /// Canonical command
    pub command: Command,
    /// Everything after the command word
    pub rest: String,
}

impl Instruction {
    /// Build an instruction from parts. The line is rendered canonically.
    pub fn new(line_number: usize, command: Command, rest: impl Into<String>) -> Self {
        let rest = rest.into();
        let full_line = if rest.is_empty() {
            command.name().to_string()
        } else {
            format!("{} {}", command.name(), rest)
        };
        Self {
            line_number,
            full_line,
            command_or_alias: command.name().to_string(),
            command,
            rest,
        }
    }

    /// Whether git or the stacking layer interprets this line.
    pub fn kind(&self) -> RebaseKind {
        self.command.kind()
    }

    /// The commit this line operates on, as written.
    pub fn commit_token(&self) -> Option<&str> {
        command::commit_token(self.command, &self.rest)
    }

    /// The branch a stacked line names.
    pub fn branch(&self) -> Option<BranchName> {
        if self.command.takes_branch() {
            BranchName::new(self.rest.trim()).ok()
        } else {
            None
        }
    }

    /// Same line with the commit token replaced.
    pub fn with_commit(&self, oid: &Oid) -> Instruction {
        let Some(token) = self.commit_token() else {
            return self.clone();
        };
        let rest = self.rest.replacen(token, oid.as_str(), 1);
        Instruction {
            full_line: format!("{} {}", self.command_or_alias, rest),
            rest,
            ..self.clone()
        }
    }
}

/// Split plan text into non-comment lines, keeping file line numbers.
pub fn parse_plan_text(text: &str) -> Vec<PlanLine> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let trimmed = line.trim();
            (!trimmed.is_empty() && !trimmed.starts_with('#')).then(|| PlanLine {
                number: i + 1,
                text: trimmed.to_string(),
            })
        })
        .collect()
}

/// Generate the initial plan lines for a stack.
///
/// Branch-ends of a commit are emitted after the fixup/squash run that
/// follows it, so the branch lands on the combined commit. The latest
/// branch is only named by the closing `branch-end-last`.
pub fn plan_lines(stack: &Stack) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {}",
        Command::BranchEndInitial.name(),
        stack.initial
    )];

    let rewritten = stack.rewritten();
    let mut pending: Vec<&BranchRef> = Vec::new();
    for (i, element) in rewritten.iter().enumerate() {
        let command = match element.squash {
            Some(SquashKind::Fixup) => Command::Fixup,
            Some(SquashKind::Squash) => Command::Squash,
            None => Command::Pick,
        };
        lines.push(format!(
            "{} {} {}",
            command.name(),
            element.oid(),
            element.commit.summary
        ));
        pending.extend(element.branches.iter().filter(|b| b.name != stack.latest));

        let run_continues = rewritten
            .get(i + 1)
            .is_some_and(|next| next.squash.is_some());
        if !run_continues {
            for branch in pending.drain(..) {
                lines.push(format!("{} {}", Command::BranchEnd.name(), branch.name));
            }
        }
    }

    lines.push(format!(
        "{} {}",
        Command::BranchEndLast.name(),
        stack.latest
    ));
    lines
}

/// Full plan file contents: plan lines followed by the help block.
pub fn render_plan(stack: &Stack) -> String {
    let mut out = plan_lines(stack).join("\n");
    out.push_str("\n\n");
    out.push_str(&help_text());
    out
}

/// The todo given to `git rebase -i`: regular lines only, verbatim.
pub fn to_regular(instructions: &[Instruction]) -> String {
    let regular: Vec<&Instruction> = instructions
        .iter()
        .filter(|i| i.kind() == RebaseKind::Regular)
        .collect();
    let mut out = String::new();
    for instruction in regular {
        out.push_str(&instruction.full_line);
        out.push('\n');
    }
    out
}

/// Comment block appended to a generated plan.
pub fn help_text() -> String {
    let mut out = String::from(
        "# Stacked rebase plan. Lines run top to bottom.\n\
         #\n\
         # Commands:\n",
    );
    for command in Command::ALL {
        out.push_str(&format!(
            "# {}, {} {}\n",
            command.alias(),
            command.name(),
            describe(command)
        ));
    }
    out.push_str(
        "#\n\
         # The first line must be branch-end-initial and the last branch-end-last.\n\
         # Move a branch-end line to move the branch; add branch-end-new to\n\
         # create a branch. Branch names may not contain spaces.\n",
    );
    out
}

fn describe(command: Command) -> &'static str {
    match command {
        Command::Pick => "<commit> = use commit",
        Command::Reword => "<commit> = use commit, but edit the commit message",
        Command::Edit => "<commit> = use commit, but stop for amending",
        Command::Squash => "<commit> = use commit, but meld into previous commit",
        Command::Fixup => "[-C | -c] <commit> = like squash, keep only the previous message",
        Command::Exec => "<command> = run command using shell",
        Command::Break => "= stop here (continue rebase later)",
        Command::Drop => "<commit> = remove commit",
        Command::Label => "<label> = label current HEAD with a name",
        Command::Reset => "<label> = reset HEAD to a label",
        Command::Merge => "[-C <commit> | -c <commit>] <label> = create a merge commit",
        Command::BranchEnd => "<branch> = the branch ends at the commit above",
        Command::BranchEndNew => "<branch> = create a new branch ending at the commit above",
        Command::BranchEndInitial => "<branch> = the branch the stack is rebased onto",
        Command::BranchEndLast => "<branch> = the latest branch, ends at the last commit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::boundary::CommitAndBoundary;
    use crate::git::CommitInfo;

    fn oid(n: u8) -> Oid {
        Oid::new(format!("{:040x}", n)).unwrap()
    }

    fn name(s: &str) -> BranchName {
        BranchName::new(s).unwrap()
    }

    fn element(n: u8, summary: &str, branches: &[&str], squash: Option<SquashKind>) -> CommitAndBoundary {
        CommitAndBoundary {
            commit: CommitInfo {
                oid: oid(n),
                parents: vec![],
                summary: summary.to_string(),
            },
            branches: branches.iter().map(|b| BranchRef::local(name(b))).collect(),
            squash,
        }
    }

    fn stack(commits: Vec<CommitAndBoundary>) -> Stack {
        Stack {
            initial: name("main"),
            latest: name("latest"),
            commits,
        }
    }

    #[test]
    fn plan_for_simple_stack() {
        let stack = stack(vec![
            element(0, "base", &["main"], None),
            element(1, "a", &[], None),
            element(2, "b", &["part-1"], None),
            element(3, "c", &["latest"], None),
        ]);
        insta::assert_snapshot!(plan_lines(&stack).join("\n"), @r"
        branch-end-initial main
        pick 0000000000000000000000000000000000000001 a
        pick 0000000000000000000000000000000000000002 b
        branch-end part-1
        pick 0000000000000000000000000000000000000003 c
        branch-end-last latest
        ");
    }

    #[test]
    fn branch_end_waits_for_fixup_run() {
        let stack = stack(vec![
            element(0, "base", &["main"], None),
            element(1, "a", &["part-1"], None),
            element(4, "fixup! a", &[], Some(SquashKind::Fixup)),
            element(5, "squash! a", &[], Some(SquashKind::Squash)),
            element(2, "b", &["latest"], None),
        ]);
        let lines = plan_lines(&stack);
        assert_eq!(lines[2], format!("fixup {} fixup! a", oid(4)));
        assert_eq!(lines[3], format!("squash {} squash! a", oid(5)));
        assert_eq!(lines[4], "branch-end part-1");
    }

    #[test]
    fn other_branches_on_last_commit_precede_last_marker() {
        let stack = stack(vec![
            element(0, "base", &["main"], None),
            element(1, "a", &["also-here", "latest"], None),
        ]);
        let lines = plan_lines(&stack);
        assert_eq!(
            &lines[2..],
            &["branch-end also-here".to_string(), "branch-end-last latest".to_string()]
        );
    }

    #[test]
    fn generated_plan_validates() {
        let stack = stack(vec![
            element(0, "base", &["main"], None),
            element(1, "a", &["part-1"], None),
            element(2, "b", &["latest"], None),
        ]);
        let text = render_plan(&stack);
        let instructions = validate(&parse_plan_text(&text), ValidateOptions::default()).unwrap();
        assert_eq!(instructions.len(), 5);
        assert_eq!(instructions[1].commit_token(), Some(oid(1).as_str()));
        assert_eq!(instructions[2].branch(), Some(name("part-1")));
    }

    #[test]
    fn regular_todo_drops_stacked_lines() {
        let text = "bei main\npick 1111111 a\nbe part-1\nexec make test\nbel latest\n";
        let instructions = validate(&parse_plan_text(text), ValidateOptions::default()).unwrap();
        assert_eq!(to_regular(&instructions), "pick 1111111 a\nexec make test\n");
    }

    #[test]
    fn with_commit_rewrites_only_the_token() {
        let instruction = Instruction {
            line_number: 2,
            full_line: "f -C 1111111 msg".to_string(),
            command_or_alias: "f".to_string(),
            command: Command::Fixup,
            rest: "-C 1111111 msg".to_string(),
        };
        let rewritten = instruction.with_commit(&oid(9));
        assert_eq!(rewritten.rest, format!("-C {} msg", oid(9)));
        assert_eq!(rewritten.full_line, format!("f -C {} msg", oid(9)));
    }

    #[test]
    fn help_lists_every_alias() {
        let help = help_text();
        for command in Command::ALL {
            assert!(help.contains(&format!("# {}, {} ", command.alias(), command.name())));
        }
        assert!(help.lines().all(|l| l.starts_with('#')));
    }
}
