use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Where a configuration artifact lives: the user's home (`~/.claude`) or a
/// single project's `.claude` directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Global,
    Project,
}

impl Scope {
    pub fn all() -> &'static [Scope] {
        &[Scope::Global, Scope::Project]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Project => "project",
        }
    }

    /// Display prefix for agent files of this scope, used when no resolved
    /// path is known.
    pub fn agents_display_dir(self) -> &'static str {
        match self {
            Scope::Global => "~/.claude/agents/",
            Scope::Project => ".claude/agents/",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = crate::error::VinslyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Scope::Global),
            "project" => Ok(Scope::Project),
            other => Err(crate::error::VinslyError::InvalidScope(other.to_string())),
        }
    }
}
