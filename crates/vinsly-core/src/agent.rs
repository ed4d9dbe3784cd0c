use crate::error::Result;
use crate::frontmatter::{self, Frontmatter};
use crate::types::Scope;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// A Claude subagent definition: a markdown file whose frontmatter carries at
/// least a non-empty `name` and `description`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Resolved file path when known, else the display path.
    pub id: String,
    pub name: String,
    pub scope: Scope,
    pub path: String,
    pub frontmatter: Frontmatter,
    pub body: String,
}

impl Agent {
    pub fn description(&self) -> &str {
        self.frontmatter
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// File name this agent is stored and exported under.
    pub fn file_name(&self) -> String {
        format!("{}.md", self.name)
    }
}

/// Trimmed, non-empty string value for `key`.
fn required_str(fm: &Frontmatter, key: &str) -> Option<String> {
    let value = fm.get(key)?.as_str()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn required_fields(fm: &Frontmatter) -> Option<(String, String)> {
    Some((
        required_str(fm, "name")?,
        required_str(fm, "description")?,
    ))
}

/// Default location shown for an agent whose file path is not known yet.
pub fn display_path(scope: Scope, name: &str) -> String {
    format!("{}{name}.md", scope.agents_display_dir())
}

/// Build an [`Agent`] from document text.
///
/// Returns `None` when the text has no parseable frontmatter or when `name`
/// or `description` is missing or blank. `explicit_path` wins over the
/// scope's display path for both `id` and `path`.
pub fn to_agent(
    text: &str,
    display_file_name: &str,
    scope: Scope,
    explicit_path: Option<&str>,
) -> Option<Agent> {
    let doc = frontmatter::parse(text)?;
    let Some((name, description)) = required_fields(&doc.frontmatter) else {
        tracing::debug!(file = display_file_name, "agent is missing name or description");
        return None;
    };

    let path = explicit_path
        .map(str::to_string)
        .unwrap_or_else(|| display_path(scope, &name));

    let mut fm = doc.frontmatter;
    fm.insert("name".into(), name.clone().into());
    fm.insert("description".into(), description.into());

    Some(Agent {
        id: path.clone(),
        name,
        scope,
        path,
        frontmatter: fm,
        body: doc.body,
    })
}

/// Cheap pre-check: does `text` carry frontmatter with a usable name and description?
pub fn has_valid_definition(text: &str) -> bool {
    frontmatter::parse(text)
        .and_then(|doc| required_fields(&doc.frontmatter))
        .is_some()
}

/// Render an agent back to its on-disk markdown form.
pub fn agent_to_markdown(agent: &Agent) -> Result<String> {
    frontmatter::render(&agent.frontmatter, &agent.body)
}
