//! core::todo::validate
//!
//! Plan validation.
//!
//! One forward pass over the plan lines. Every rule is checked on every
//! line and all failures are collected, so a single report names every bad
//! line with every reason. A plan with any bad line yields no instructions.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::command::Command;
use super::{Instruction, PlanLine};

/// Options that affect validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Branch names must be shorter than this.
    pub branch_name_max_len: usize,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            branch_name_max_len: crate::core::config::DEFAULT_BRANCH_NAME_MAX_LEN,
        }
    }
}

/// One rejected line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadLine {
    /// 1-based line number in the edited file
    pub line_number: usize,
    /// The command word as written
    pub token: String,
    /// Every rule the line breaks
    pub reasons: Vec<String>,
}

impl fmt::Display for BadLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} ('{}'):", self.line_number, self.token)?;
        for reason in &self.reasons {
            write!(f, "\n    - {reason}")?;
        }
        Ok(())
    }
}

/// Why a plan was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanValidationError {
    /// Nothing but comments and blank lines.
    #[error("the plan is empty; it must start with 'branch-end-initial' and end with 'branch-end-last'")]
    Empty,

    /// At least one line is bad.
    #[error("invalid plan, {} bad line(s):\n{}", .0.len(), render(.0))]
    BadLines(Vec<BadLine>),
}

fn render(lines: &[BadLine]) -> String {
    lines
        .iter()
        .map(|l| format!("  {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl PlanValidationError {
    /// The rejected lines, empty for [`PlanValidationError::Empty`].
    pub fn bad_lines(&self) -> &[BadLine] {
        match self {
            PlanValidationError::Empty => &[],
            PlanValidationError::BadLines(lines) => lines,
        }
    }
}

struct Usage {
    count: usize,
    first_line: usize,
}

/// Validate plan lines into instructions.
pub fn validate(
    lines: &[PlanLine],
    options: ValidateOptions,
) -> Result<Vec<Instruction>, PlanValidationError> {
    if lines.is_empty() {
        return Err(PlanValidationError::Empty);
    }

    let last_index = lines.len() - 1;
    let mut usage: HashMap<Command, Usage> = HashMap::new();
    let mut bad = Vec::new();
    let mut accepted = Vec::with_capacity(lines.len());

    for (index, line) in lines.iter().enumerate() {
        let text = line.text.trim();
        let (token, rest) = split_command(text);
        let mut reasons = Vec::new();

        let Some(command) = Command::parse(token) else {
            reasons.push("unrecognized command".to_string());
            if index == 0 {
                reasons.push(position_reason(Command::BranchEndInitial, "first"));
            }
            if index == last_index {
                reasons.push(position_reason(Command::BranchEndLast, "last"));
            }
            bad.push(BadLine {
                line_number: line.number,
                token: token.to_string(),
                reasons,
            });
            continue;
        };

        if index == 0 && command != Command::BranchEndInitial {
            reasons.push(position_reason(Command::BranchEndInitial, "first"));
        }
        if index == last_index && command != Command::BranchEndLast {
            reasons.push(position_reason(Command::BranchEndLast, "last"));
        }

        let entry = usage.entry(command).or_insert(Usage {
            count: 0,
            first_line: line.number,
        });
        entry.count += 1;
        if let Some(max) = command.max_uses() {
            if entry.count > max {
                reasons.push(format!(
                    "'{}' may be used at most {} time(s), this is use {} (first used at line {})",
                    command.name(),
                    max,
                    entry.count,
                    entry.first_line
                ));
            }
        }

        reasons.extend(command.check_args(rest, options.branch_name_max_len));

        if reasons.is_empty() {
            accepted.push(Instruction {
                line_number: line.number,
                full_line: text.to_string(),
                command_or_alias: token.to_string(),
                command,
                rest: rest.trim().to_string(),
            });
        } else {
            bad.push(BadLine {
                line_number: line.number,
                token: token.to_string(),
                reasons,
            });
        }
    }

    if bad.is_empty() {
        Ok(accepted)
    } else {
        Err(PlanValidationError::BadLines(bad))
    }
}

fn position_reason(expected: Command, position: &str) -> String {
    format!(
        "the {} command must be '{}' ({})",
        position,
        expected.name(),
        expected.alias()
    )
}

fn split_command(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::todo::{parse_plan_text, RebaseKind};

    fn check(text: &str) -> Result<Vec<Instruction>, PlanValidationError> {
        validate(&parse_plan_text(text), ValidateOptions::default())
    }

    const GOOD: &str = "\
branch-end-initial main
pick 1111111 first
be part-1
p 2222222 second
bel latest
";

    #[test]
    fn accepts_well_formed_plan() {
        let instructions = check(GOOD).unwrap();
        assert_eq!(instructions.len(), 5);
        assert_eq!(instructions[0].command, Command::BranchEndInitial);
        assert_eq!(instructions[2].command_or_alias, "be");
        assert_eq!(instructions[2].command, Command::BranchEnd);
        assert_eq!(instructions[3].rest, "2222222 second");
        assert_eq!(instructions[4].kind(), RebaseKind::Stacked);
        assert_eq!(instructions[1].kind(), RebaseKind::Regular);
    }

    #[test]
    fn line_numbers_count_comments_and_blanks() {
        let text = "# header\n\nbei main\n# note\npick 1111111 one\nbel latest\n";
        let instructions = check(text).unwrap();
        let numbers: Vec<usize> = instructions.iter().map(|i| i.line_number).collect();
        assert_eq!(numbers, vec![3, 5, 6]);
    }

    #[test]
    fn empty_plan() {
        assert_eq!(check("# only comments\n\n"), Err(PlanValidationError::Empty));
    }

    #[test]
    fn reports_every_line_and_every_reason() {
        let text = "\
pick 1111111 one
frobnicate 2222222
be has space
bei again
";
        let err = check(text).unwrap_err();
        let bad = err.bad_lines();
        assert_eq!(bad.len(), 4);

        assert_eq!(bad[0].line_number, 1);
        assert_eq!(bad[0].reasons.len(), 1);
        assert!(bad[0].reasons[0].contains("branch-end-initial"));

        assert_eq!(bad[1].token, "frobnicate");
        assert_eq!(bad[1].reasons, vec!["unrecognized command".to_string()]);

        assert!(bad[2].reasons[0].contains("spaces"));

        // Last line: wrong position only; first bei use so no max-use reason.
        assert_eq!(bad[3].reasons.len(), 1);
        assert!(bad[3].reasons[0].contains("branch-end-last"));
    }

    #[test]
    fn second_initial_cites_max_count_and_first_line() {
        let text = "bei main\npick 1111111 a\nbei main\nbel latest\n";
        let err = check(text).unwrap_err();
        let bad = err.bad_lines();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].line_number, 3);
        let reason = &bad[0].reasons[0];
        assert!(reason.contains("at most 1"), "{reason}");
        assert!(reason.contains("use 2"), "{reason}");
        assert!(reason.contains("line 1"), "{reason}");
    }

    #[test]
    fn single_line_plan_fails_both_positions() {
        let err = check("pick 1111111 a").unwrap_err();
        assert_eq!(err.bad_lines()[0].reasons.len(), 2);
    }

    #[test]
    fn configurable_name_bound() {
        let text = "bei main\nbe abcdef\nbel latest\n";
        let options = ValidateOptions {
            branch_name_max_len: 6,
        };
        let err = validate(&parse_plan_text(text), options).unwrap_err();
        assert_eq!(err.bad_lines()[0].line_number, 2);
        assert!(validate(&parse_plan_text(text), ValidateOptions::default()).is_ok());
    }

    #[test]
    fn report_display() {
        let err = check("pick 1111111 a\nbel latest\n").unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("invalid plan, 1 bad line(s):"));
        assert!(text.contains("line 1 ('pick'):"));
    }
}
