//! Agent files on disk under `.claude/agents`.

use crate::agent::{self, Agent};
use crate::error::{Result, VinslyError};
use crate::frontmatter::{self, FrontmatterStatus};
use crate::io::{atomic_write, ensure_dir};
use crate::paths;
use crate::types::Scope;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw agent file as found on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFile {
    /// File stem.
    pub name: String,
    pub path: String,
    pub content: String,
    pub scope: Scope,
}

impl AgentFile {
    /// Parse into an [`Agent`] using the real file path as its id.
    pub fn to_agent(&self) -> Option<Agent> {
        agent::to_agent(
            &self.content,
            &format!("{}.md", self.name),
            self.scope,
            Some(&self.path),
        )
    }
}

fn read_agents_in(dir: &Path, scope: Scope) -> Result<Vec<AgentFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && paths::is_markdown(p))
        .collect();
    entries.sort();

    let mut agents = Vec::with_capacity(entries.len());
    for path in entries {
        let content = std::fs::read_to_string(&path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        agents.push(AgentFile {
            name,
            path: path.to_string_lossy().into_owned(),
            content,
            scope,
        });
    }
    Ok(agents)
}

/// All `.md` files in the agents directory for `scope`, sorted by file name.
/// A missing directory yields an empty list.
pub fn list_agents(scope: Scope, project: Option<&Path>) -> Result<Vec<AgentFile>> {
    read_agents_in(&paths::agents_dir(scope, project)?, scope)
}

/// Agents of an arbitrary project directory, e.g. one found by discovery.
pub fn list_agents_from_directory(directory: &Path) -> Result<Vec<AgentFile>> {
    read_agents_in(&paths::project_agents_dir(directory), Scope::Project)
}

/// Parsed agents for `scope`; files that are not valid definitions are
/// skipped with a warning.
pub fn load_agents(scope: Scope, project: Option<&Path>) -> Result<Vec<Agent>> {
    let files = list_agents(scope, project)?;
    Ok(files
        .iter()
        .filter_map(|file| {
            let parsed = file.to_agent();
            if parsed.is_none() {
                let reason = match frontmatter::inspect(&file.content) {
                    FrontmatterStatus::Missing => "no frontmatter".to_string(),
                    FrontmatterStatus::Malformed(e) => e,
                    FrontmatterStatus::Valid => "missing name or description".to_string(),
                };
                tracing::warn!(path = %file.path, %reason, "skipping invalid agent file");
            }
            parsed
        })
        .collect())
}

pub fn read_agent(path: &str) -> Result<String> {
    let path = paths::expand_path(path)?;
    if !path.exists() {
        return Err(VinslyError::NotFound(path.display().to_string()));
    }
    paths::ensure_path_in_agents_dir(&path)?;
    Ok(std::fs::read_to_string(&path)?)
}

/// Write `<agents dir>/<name>.md` and return its path.
pub fn write_agent(
    scope: Scope,
    name: &str,
    content: &str,
    project: Option<&Path>,
) -> Result<PathBuf> {
    paths::validate_entry_name(name)?;
    let dir = paths::agents_dir(scope, project)?;
    ensure_dir(&dir)?;
    paths::ensure_path_in_agents_dir(&dir)?;

    let path = dir.join(format!("{name}.md"));
    atomic_write(&path, content.as_bytes())?;
    tracing::info!(path = %path.display(), "wrote agent");
    Ok(path)
}

/// Serialize `agent` and store it under its name.
pub fn save_agent(agent: &Agent, project: Option<&Path>) -> Result<PathBuf> {
    let markdown = agent::agent_to_markdown(agent)?;
    write_agent(agent.scope, &agent.name, &markdown, project)
}

pub fn delete_agent(path: &str) -> Result<()> {
    let path = paths::expand_path(path)?;
    if !path.exists() {
        return Err(VinslyError::NotFound(path.display().to_string()));
    }
    paths::ensure_path_in_agents_dir(&path)?;
    std::fs::remove_file(&path)?;
    tracing::info!(path = %path.display(), "deleted agent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TESTER: &str = "---\nname: tester\ndescription: Writes tests\n---\n\nWrite tests first.";

    #[test]
    fn list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(list_agents(Scope::Project, Some(dir.path())).unwrap().is_empty());
    }

    #[test]
    fn write_list_read_delete() {
        let dir = TempDir::new().unwrap();
        let path = write_agent(Scope::Project, "tester", TESTER, Some(dir.path())).unwrap();
        assert!(path.ends_with(".claude/agents/tester.md"));

        let files = list_agents(Scope::Project, Some(dir.path())).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "tester");
        assert_eq!(files[0].scope, Scope::Project);

        let path_str = path.to_string_lossy().into_owned();
        assert_eq!(read_agent(&path_str).unwrap(), TESTER);

        delete_agent(&path_str).unwrap();
        assert!(!path.exists());
        assert!(matches!(delete_agent(&path_str), Err(VinslyError::NotFound(_))));
    }

    #[test]
    fn listing_ignores_non_markdown_and_sorts() {
        let dir = TempDir::new().unwrap();
        let agents = paths::project_agents_dir(dir.path());
        std::fs::create_dir_all(&agents).unwrap();
        std::fs::write(agents.join("zeta.md"), TESTER).unwrap();
        std::fs::write(agents.join("alpha.md"), TESTER).unwrap();
        std::fs::write(agents.join("notes.txt"), "x").unwrap();

        let names: Vec<_> = list_agents_from_directory(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn load_agents_skips_invalid_files() {
        let dir = TempDir::new().unwrap();
        write_agent(Scope::Project, "tester", TESTER, Some(dir.path())).unwrap();
        write_agent(Scope::Project, "broken", "no frontmatter", Some(dir.path())).unwrap();

        let agents = load_agents(Scope::Project, Some(dir.path())).unwrap();
        assert_eq!(agents.len(), 1);
        assert!(agents[0].path.ends_with("tester.md"));
        assert_eq!(agents[0].id, agents[0].path);
    }

    #[test]
    fn write_rejects_bad_names() {
        let dir = TempDir::new().unwrap();
        assert!(write_agent(Scope::Project, "../escape", TESTER, Some(dir.path())).is_err());
    }

    #[test]
    fn read_refuses_files_outside_agents_dir() {
        let dir = TempDir::new().unwrap();
        let stray = dir.path().join("stray.md");
        std::fs::write(&stray, TESTER).unwrap();
        assert!(matches!(
            read_agent(&stray.to_string_lossy()),
            Err(VinslyError::OutsideClaudeDir(_))
        ));
    }

    #[test]
    fn save_agent_roundtrips() {
        let dir = TempDir::new().unwrap();
        let a = agent::to_agent(TESTER, "tester.md", Scope::Project, None).unwrap();
        let path = save_agent(&a, Some(dir.path())).unwrap();
        let loaded = load_agents(Scope::Project, Some(dir.path())).unwrap();
        assert_eq!(loaded[0].path, path.to_string_lossy());
        assert_eq!(loaded[0].frontmatter, a.frontmatter);
        assert_eq!(loaded[0].body, a.body);
    }
}
