pub mod agent;
pub mod bundle;
pub mod config;
pub mod discover;
pub mod search;
pub mod skill;

use anyhow::Context as _;
use std::path::{Path, PathBuf};
use vinsly_core::config::Settings;
use vinsly_core::types::Scope;

/// Everything a subcommand needs from the global flags.
pub struct Context {
    pub project: PathBuf,
    pub config_path: PathBuf,
    pub settings: Settings,
    pub json: bool,
}

impl Context {
    pub fn load(project: PathBuf, config: Option<&Path>, json: bool) -> anyhow::Result<Self> {
        let config_path = Settings::resolve_path(config)?;
        let settings = Settings::load(&config_path)
            .with_context(|| format!("failed to load settings from {}", config_path.display()))?;
        Ok(Self {
            project,
            config_path,
            settings,
            json,
        })
    }

    pub fn project(&self) -> Option<&Path> {
        Some(self.project.as_path())
    }

    /// Build a tokio runtime for the async library entry points.
    pub fn runtime(&self) -> anyhow::Result<tokio::runtime::Runtime> {
        Ok(tokio::runtime::Runtime::new()?)
    }
}

/// `--scope` values for commands that can span both agent directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ScopeArg {
    Global,
    Project,
    All,
}

impl ScopeArg {
    pub fn scopes(self) -> &'static [Scope] {
        match self {
            ScopeArg::Global => &[Scope::Global],
            ScopeArg::Project => &[Scope::Project],
            ScopeArg::All => &[Scope::Project, Scope::Global],
        }
    }
}

/// `--scope` for commands that write into exactly one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TargetScope {
    Global,
    Project,
}

impl From<TargetScope> for Scope {
    fn from(scope: TargetScope) -> Self {
        match scope {
            TargetScope::Global => Scope::Global,
            TargetScope::Project => Scope::Project,
        }
    }
}

/// Shorten `text` to `max` chars for table cells.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}
