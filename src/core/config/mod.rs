//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Settings come from two TOML scopes plus a git-config fallback:
//! - **Global**: User-level settings
//! - **Repo**: Repository-level overrides
//! - **Git config**: `stackedrebase.autoApplyIfNeeded`,
//!   `stackedrebase.autoSquash`, `rebase.autoSquash`
//!
//! # Precedence
//!
//! Later overrides earlier:
//! 1. Default values
//! 2. Git config
//! 3. Global config file
//! 4. Repo config file
//! 5. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$STACKED_REBASE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/stacked-rebase/config.toml`
//! 3. `~/.stacked-rebase/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use stacked_rebase::core::config::Config;
//! use stacked_rebase::core::paths::RebasePaths;
//! use std::path::PathBuf;
//!
//! let paths = RebasePaths::new(PathBuf::from("/path/to/repo/.git"));
//! let config = Config::load(Some(&paths)).unwrap().config;
//!
//! println!("Remote: {}", config.remote());
//! println!("Auto-apply: {}", config.auto_apply());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::paths::RebasePaths;

/// Environment variable naming an explicit global config file.
pub const CONFIG_ENV: &str = "STACKED_REBASE_CONFIG";

/// Default bound on branch names in a plan.
pub const DEFAULT_BRANCH_NAME_MAX_LEN: usize = 128;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Values read from git config, used below both TOML scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitConfigDefaults {
    /// `stackedrebase.autoApplyIfNeeded`
    pub auto_apply: Option<bool>,
    /// `stackedrebase.autoSquash`, falling back to `rebase.autoSquash`
    pub autosquash: Option<bool>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence rules; repo config overrides global config,
/// which overrides git config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
    /// Git config fallback values
    pub git: GitConfigDefaults,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the repo config file (if loaded)
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `paths` is provided, also loads repo-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(paths: Option<&RebasePaths>) -> Result<ConfigLoadResult, ConfigError> {
        let candidates = global_candidates(
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
            dirs::home_dir(),
        );
        Self::load_from(&candidates, paths.map(RebasePaths::repo_config_path))
    }

    /// Load from an explicit list of global candidates and repo path.
    pub fn load_from(
        global_candidates: &[PathBuf],
        repo_path: Option<PathBuf>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = Self::load_global(global_candidates, &mut warnings)?;

        let (repo, repo_path) = match repo_path {
            Some(path) if path.exists() => (Some(read_toml::<RepoConfig>(&path)?), Some(path)),
            _ => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                repo,
                git: GitConfigDefaults::default(),
                global_path,
                repo_path,
            },
            warnings,
        })
    }

    fn load_global(
        candidates: &[PathBuf],
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        for (i, path) in candidates.iter().enumerate() {
            if path.exists() {
                let config = read_toml::<GlobalConfig>(path)?;
                return Ok((config, Some(path.clone())));
            }
            if i == 0 && std::env::var_os(CONFIG_ENV).is_some_and(|v| Path::new(&v) == path) {
                warnings.push(ConfigWarning {
                    message: format!("{CONFIG_ENV} points to a missing file"),
                    path: path.clone(),
                });
            }
        }
        Ok((GlobalConfig::default(), None))
    }

    /// Attach values read from git config.
    pub fn with_git_defaults(mut self, git: GitConfigDefaults) -> Self {
        self.git = git;
        self
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn pick<T>(
        &self,
        repo: impl Fn(&RepoConfig) -> Option<T>,
        global: impl Fn(&GlobalConfig) -> Option<T>,
    ) -> Option<T> {
        self.repo
            .as_ref()
            .and_then(repo)
            .or_else(|| global(&self.global))
    }

    /// Configured initial branch, repo scope only.
    pub fn initial_branch(&self) -> Option<&str> {
        self.repo.as_ref().and_then(|r| r.initial_branch.as_deref())
    }

    /// Whether prompts and editors may be opened. Defaults to `true`.
    pub fn interactive(&self) -> bool {
        self.pick(|r| r.interactive, |g| g.interactive)
            .unwrap_or(true)
    }

    /// Apply a finished rewrite without asking. Defaults to `false`.
    pub fn auto_apply(&self) -> bool {
        self.pick(|r| r.auto_apply, |g| g.auto_apply)
            .or(self.git.auto_apply)
            .unwrap_or(false)
    }

    /// Reorder fixup!/squash! commits. Defaults to `false`.
    pub fn autosquash(&self) -> bool {
        self.pick(|r| r.autosquash, |g| g.autosquash)
            .or(self.git.autosquash)
            .unwrap_or(false)
    }

    /// Editor override, if any.
    pub fn editor(&self) -> Option<&str> {
        self.repo
            .as_ref()
            .and_then(|r| r.editor.as_deref())
            .or(self.global.editor.as_deref())
    }

    /// Remote name. Defaults to "origin".
    pub fn remote(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.remote.as_deref())
            .or(self.global.remote.as_deref())
            .unwrap_or("origin")
    }

    /// Use a lease when force-pushing. Defaults to `true`.
    pub fn force_with_lease(&self) -> bool {
        self.pick(|r| r.force_with_lease, |g| g.force_with_lease)
            .unwrap_or(true)
    }

    /// Maximum branch name length accepted in a plan. Defaults to 128.
    pub fn branch_name_max_len(&self) -> usize {
        self.pick(|r| r.branch_name_max_len, |g| g.branch_name_max_len)
            .unwrap_or(DEFAULT_BRANCH_NAME_MAX_LEN)
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

/// Global config locations in search order.
pub fn global_candidates(
    explicit: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Vec<PathBuf> {
    let mut out = Vec::new();
    out.extend(explicit);
    out.extend(xdg_config_home.map(|p| p.join("stacked-rebase/config.toml")));
    out.extend(home.map(|p| p.join(".stacked-rebase/config.toml")));
    out
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn load_empty_defaults() {
        let temp = TempDir::new().unwrap();
        let result = Config::load_from(&[temp.path().join("missing.toml")], None).unwrap();
        let config = result.config;

        assert!(config.initial_branch().is_none());
        assert_eq!(config.remote(), "origin");
        assert!(config.interactive());
        assert!(!config.auto_apply());
        assert!(!config.autosquash());
        assert!(config.force_with_lease());
        assert_eq!(config.branch_name_max_len(), 128);
        assert!(config.global_config_loaded_from().is_none());
    }

    #[test]
    fn candidates_in_search_order() {
        let candidates = global_candidates(
            Some(PathBuf::from("/explicit.toml")),
            Some(PathBuf::from("/xdg")),
            Some(PathBuf::from("/home/u")),
        );
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/explicit.toml"),
                PathBuf::from("/xdg/stacked-rebase/config.toml"),
                PathBuf::from("/home/u/.stacked-rebase/config.toml"),
            ]
        );
    }

    #[test]
    fn first_existing_global_wins() {
        let temp = TempDir::new().unwrap();
        let xdg = temp.path().join("xdg/stacked-rebase/config.toml");
        let home = temp.path().join("home/.stacked-rebase/config.toml");
        write(&xdg, "remote = \"xdg\"");
        write(&home, "remote = \"home\"");

        let result = Config::load_from(&[temp.path().join("nope.toml"), xdg.clone(), home], None)
            .unwrap();
        assert_eq!(result.config.remote(), "xdg");
        assert_eq!(result.config.global_config_loaded_from(), Some(xdg.as_path()));
    }

    #[test]
    fn load_repo_config() {
        let temp = TempDir::new().unwrap();
        let paths = RebasePaths::new(temp.path().join(".git"));
        write(
            &paths.repo_config_path(),
            r#"
            initial_branch = "main"
            remote = "upstream"
            "#,
        );

        let result = Config::load_from(&[], Some(paths.repo_config_path())).unwrap();
        let config = result.config;

        assert_eq!(config.initial_branch(), Some("main"));
        assert_eq!(config.remote(), "upstream");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn parse_error_names_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        write(&path, "auto_apply = \"yes please\"");

        let err = Config::load_from(&[path.clone()], None).unwrap_err();
        match err {
            ConfigError::ParseError { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        write(&path, "autoapply = true");
        assert!(Config::load_from(&[], Some(path)).is_err());
    }

    #[test]
    fn precedence_repo_global_git_default() {
        let mut config = Config {
            global: GlobalConfig {
                autosquash: Some(false),
                remote: Some("global-remote".to_string()),
                ..Default::default()
            },
            repo: Some(RepoConfig {
                remote: Some("repo-remote".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
        .with_git_defaults(GitConfigDefaults {
            auto_apply: Some(true),
            autosquash: Some(true),
        });

        assert_eq!(config.remote(), "repo-remote");
        // Global TOML beats git config.
        assert!(!config.autosquash());
        // Git config beats the default.
        assert!(config.auto_apply());

        config.repo = None;
        assert_eq!(config.remote(), "global-remote");
    }
}
