use crate::error::{Result, VinslyError};
use crate::types::Scope;
use std::path::{Component, Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CLAUDE_DIR: &str = ".claude";
pub const AGENTS_SUBDIR: &str = "agents";
pub const SKILLS_SUBDIR: &str = "skills";
pub const SKILL_MANIFEST: &str = "SKILL.md";
pub const MARKDOWN_EXT: &str = "md";

pub const CONFIG_DIR: &str = ".vinsly";
pub const CONFIG_FILE: &str = "config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn home_dir() -> Result<PathBuf> {
    home::home_dir().ok_or(VinslyError::HomeNotFound)
}

/// `<home>/.claude`, the global configuration directory.
pub fn global_claude_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(CLAUDE_DIR))
}

/// `<home>/.vinsly/config.yaml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(home_dir()?.join(CONFIG_DIR).join(CONFIG_FILE))
}

fn claude_subdir(scope: Scope, project: Option<&Path>, subdir: &str) -> Result<PathBuf> {
    let base = match scope {
        Scope::Project => project
            .ok_or(VinslyError::ProjectPathRequired)?
            .join(CLAUDE_DIR),
        Scope::Global => global_claude_dir()?,
    };
    Ok(base.join(subdir))
}

/// The `.claude/agents` directory for `scope`. Project scope needs a project root.
pub fn agents_dir(scope: Scope, project: Option<&Path>) -> Result<PathBuf> {
    claude_subdir(scope, project, AGENTS_SUBDIR)
}

/// The `.claude/skills` directory for `scope`. Project scope needs a project root.
pub fn skills_dir(scope: Scope, project: Option<&Path>) -> Result<PathBuf> {
    claude_subdir(scope, project, SKILLS_SUBDIR)
}

pub fn project_agents_dir(project: &Path) -> PathBuf {
    project.join(CLAUDE_DIR).join(AGENTS_SUBDIR)
}

pub fn project_skills_dir(project: &Path) -> PathBuf {
    project.join(CLAUDE_DIR).join(SKILLS_SUBDIR)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        Ok(home_dir()?.join(rest))
    } else if path == "~" {
        home_dir()
    } else {
        Ok(PathBuf::from(path))
    }
}

pub fn is_markdown(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(MARKDOWN_EXT)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject agent/skill names that could escape their directory.
pub fn validate_entry_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        "name cannot be empty"
    } else if name.contains('/') || name.contains('\\') {
        "name cannot contain path separators"
    } else if name.contains("..") {
        "name cannot contain '..'"
    } else if name.contains('\0') {
        "name contains invalid characters"
    } else {
        return Ok(());
    };
    Err(VinslyError::InvalidEntryName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

/// Require that the canonical form of `path` sits inside a `.claude/<subdir>`
/// directory. The path must exist.
pub fn ensure_path_in_claude_subdir(path: &Path, subdir: &str) -> Result<()> {
    let canonical = std::fs::canonicalize(path)?;

    let mut saw_claude = false;
    for component in canonical.components() {
        match component {
            Component::Normal(part) => {
                if saw_claude && part == subdir {
                    return Ok(());
                }
                saw_claude = part == CLAUDE_DIR;
            }
            _ => saw_claude = false,
        }
    }

    Err(VinslyError::OutsideClaudeDir(subdir.to_string()))
}

pub fn ensure_path_in_agents_dir(path: &Path) -> Result<()> {
    ensure_path_in_claude_subdir(path, AGENTS_SUBDIR)
}

pub fn ensure_path_in_skills_dir(path: &Path) -> Result<()> {
    ensure_path_in_claude_subdir(path, SKILLS_SUBDIR)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
