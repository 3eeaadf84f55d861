//! core::types
//!
//! Strong types for the identities this crate passes around.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Full Git object identifier (SHA-1 or SHA-256)
//! - [`RefName`] - Validated Git reference name
//! - [`BranchRef`] - A local or remote-only branch taking part in a stack
//!
//! Values are validated at construction, so a `BranchName` taken from an
//! edited plan line or an `Oid` read from a rewrite log is known to be
//! well-formed everywhere else.
//!
//! # Examples
//!
//! ```
//! use stacked_rebase::core::types::{BranchName, Oid, RefName};
//!
//! let branch = BranchName::new("feature/part-1").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(RefName::for_branch(&branch).as_str(), "refs/heads/feature/part-1");
//! assert_eq!(oid.short(7), "abc123d");
//!
//! assert!(BranchName::new("bad..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),
}

/// Characters git never allows inside a ref name.
const FORBIDDEN_REF_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// Sequences git never allows inside a ref name.
const FORBIDDEN_REF_SEQUENCES: [&str; 3] = ["..", "@{", "//"];

/// Check the rules shared by branch names and full ref names.
///
/// Returns a human-readable reason for the first violated rule.
fn refname_violation(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("cannot be empty".into());
    }
    if name.ends_with('/') {
        return Some("cannot end with '/'".into());
    }
    if name.ends_with(".lock") {
        return Some("cannot end with '.lock'".into());
    }
    if let Some(seq) = FORBIDDEN_REF_SEQUENCES.iter().find(|s| name.contains(**s)) {
        return Some(format!("cannot contain '{seq}'"));
    }
    if let Some(c) = FORBIDDEN_REF_CHARS.iter().find(|c| name.contains(**c)) {
        return Some(format!("cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Some("cannot contain control characters".into());
    }
    for component in name.split('/').filter(|c| !c.is_empty()) {
        if component.starts_with('.') {
            return Some(format!("component '{component}' cannot start with '.'"));
        }
        if component.ends_with(".lock") {
            return Some(format!("component '{component}' cannot end with '.lock'"));
        }
    }
    None
}

/// A validated Git branch name (the part after `refs/heads/`).
///
/// Follows `git check-ref-format --branch`: no `..`, `@{`, `//`, spaces,
/// control characters or `~^:\?*[`; no leading `.` or `-`; no trailing `/`
/// or `.lock`; not exactly `@`.
///
/// ```
/// use stacked_rebase::core::types::BranchName;
///
/// assert!(BranchName::new("stack/part-2").is_ok());
/// assert!(BranchName::new("-flag").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name == "@" {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be '@' (reserved)".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        if name.starts_with('.') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '.'".into(),
            ));
        }
        if let Some(reason) = refname_violation(&name) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name {reason}"
            )));
        }
        Ok(Self(name))
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A full Git object identifier, normalized to lowercase hex.
///
/// Abbreviated ids are not `Oid`s; plan lines may carry abbreviations, which
/// are matched with [`Oid::matches_abbrev`].
///
/// ```
/// use stacked_rebase::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert!(oid.matches_abbrev("abc123d"));
/// assert!(!oid.matches_abbrev("abc"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Shortest abbreviation accepted when matching plan tokens against ids.
    pub const MIN_ABBREV: usize = 4;

    /// Create a new validated object id.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {} in '{}'",
                oid.len(),
                oid
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(format!(
                "'{oid}' is not hexadecimal"
            )));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the id.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Whether `token` is this id or an abbreviation of it.
    pub fn matches_abbrev(&self, token: &str) -> bool {
        token.len() >= Self::MIN_ABBREV
            && token.len() <= self.0.len()
            && self.0.starts_with(&token.to_ascii_lowercase())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated Git reference name.
///
/// ```
/// use stacked_rebase::core::types::{BranchName, RefName};
///
/// let branch = BranchName::new("part-1").unwrap();
/// assert_eq!(RefName::for_branch(&branch).as_str(), "refs/heads/part-1");
/// assert_eq!(
///     RefName::for_remote_branch("origin", &branch).as_str(),
///     "refs/remotes/origin/part-1"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.starts_with('/') {
            return Err(TypeError::InvalidRefName(
                "ref name cannot start with '/'".into(),
            ));
        }
        if let Some(reason) = refname_violation(&name) {
            return Err(TypeError::InvalidRefName(format!("ref name {reason}")));
        }
        Ok(Self(name))
    }

    /// `refs/heads/<branch>`.
    pub fn for_branch(branch: &BranchName) -> Self {
        Self(format!("refs/heads/{}", branch.as_str()))
    }

    /// `refs/remotes/<remote>/<branch>`.
    pub fn for_remote_branch(remote: &str, branch: &BranchName) -> Self {
        Self(format!("refs/remotes/{}/{}", remote, branch.as_str()))
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A branch as it appears in a stack: local, or remote-tracking only.
///
/// `name` is always the short branch name; `remote` is set when the only
/// ref for this branch is `refs/remotes/<remote>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchRef {
    /// Short branch name.
    pub name: BranchName,
    /// Remote the branch lives on, when there is no local branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

impl BranchRef {
    /// A local branch.
    pub fn local(name: BranchName) -> Self {
        Self { name, remote: None }
    }

    /// A remote-tracking branch with no local counterpart.
    pub fn remote(remote: impl Into<String>, name: BranchName) -> Self {
        Self {
            name,
            remote: Some(remote.into()),
        }
    }

    /// The full ref this branch currently lives at.
    pub fn refname(&self) -> RefName {
        match &self.remote {
            Some(remote) => RefName::for_remote_branch(remote, &self.name),
            None => RefName::for_branch(&self.name),
        }
    }
}

impl std::fmt::Display for BranchRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.remote {
            Some(remote) => write!(f, "{}/{}", remote, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
