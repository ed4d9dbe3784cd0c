use super::{truncate, Context, ScopeArg, TargetScope};
use crate::output::{print_json, print_table};
use anyhow::{Context as _, Result};
use std::path::PathBuf;
use vinsly_core::{agent, paths, store, types::Scope};

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

#[derive(clap::Subcommand)]
pub enum AgentSubcommand {
    /// List agents
    List {
        #[arg(long, value_enum, default_value = "all")]
        scope: ScopeArg,
    },

    /// Print an agent file
    Show {
        /// Path of the agent file (may start with ~)
        path: String,
    },

    /// Store a markdown file as an agent
    Write {
        #[arg(long, value_enum)]
        scope: TargetScope,

        /// Agent name; the file is written as <name>.md
        #[arg(long)]
        name: String,

        /// Markdown file with the agent definition
        #[arg(long)]
        file: PathBuf,
    },

    /// Delete an agent file
    Delete { path: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, subcommand: AgentSubcommand) -> Result<()> {
    match subcommand {
        AgentSubcommand::List { scope } => list(ctx, scope),
        AgentSubcommand::Show { path } => show(ctx, &path),
        AgentSubcommand::Write { scope, name, file } => write(ctx, scope.into(), &name, &file),
        AgentSubcommand::Delete { path } => delete(ctx, &path),
    }
}

fn list(ctx: &Context, scope: ScopeArg) -> Result<()> {
    let mut agents = Vec::new();
    for &s in scope.scopes() {
        agents.extend(store::load_agents(s, ctx.project()).context("failed to list agents")?);
    }

    if ctx.json {
        return print_json(&agents);
    }
    if agents.is_empty() {
        println!("No agents found.");
        return Ok(());
    }
    let rows = agents
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                a.scope.to_string(),
                truncate(a.description(), 60),
                a.path.clone(),
            ]
        })
        .collect();
    print_table(&["NAME", "SCOPE", "DESCRIPTION", "PATH"], rows);
    Ok(())
}

fn show(ctx: &Context, path: &str) -> Result<()> {
    let content = store::read_agent(path).with_context(|| format!("failed to read {path}"))?;
    if ctx.json {
        let expanded = paths::expand_path(path)?;
        let scope = match paths::global_claude_dir() {
            Ok(global) if expanded.starts_with(&global) => Scope::Global,
            _ => Scope::Project,
        };
        let file_name = expanded
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parsed = agent::to_agent(&content, &file_name, scope, Some(path))
            .with_context(|| format!("{path} is not a valid agent definition"))?;
        return print_json(&parsed);
    }
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn write(ctx: &Context, scope: Scope, name: &str, file: &std::path::Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    if !agent::has_valid_definition(&content) {
        anyhow::bail!(
            "{}: missing required frontmatter (name and description)",
            file.display()
        );
    }
    let path = store::write_agent(scope, name, &content, ctx.project())?;

    if ctx.json {
        print_json(&serde_json::json!({ "path": path }))?;
    } else {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn delete(ctx: &Context, path: &str) -> Result<()> {
    store::delete_agent(path).with_context(|| format!("failed to delete {path}"))?;
    if ctx.json {
        print_json(&serde_json::json!({ "deleted": path }))?;
    } else {
        println!("Deleted {path}");
    }
    Ok(())
}
