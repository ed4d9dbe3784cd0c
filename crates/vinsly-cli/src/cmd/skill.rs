use super::{truncate, Context, ScopeArg, TargetScope};
use crate::output::{print_json, print_table};
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use vinsly_core::skills::{self, SkillFile};

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

#[derive(clap::Subcommand)]
pub enum SkillSubcommand {
    /// List skills
    List {
        #[arg(long, value_enum, default_value = "all")]
        scope: ScopeArg,
    },

    /// Zip one skill directory
    Export {
        /// Skill directory (may start with ~)
        directory: String,

        #[arg(long)]
        out: PathBuf,
    },

    /// Zip every skill in scope into one archive
    ExportAll {
        #[arg(long, value_enum, default_value = "all")]
        scope: ScopeArg,

        #[arg(long)]
        out: PathBuf,
    },

    /// Unpack a skill archive into a skills directory
    Import {
        archive: String,

        #[arg(long, value_enum, default_value = "project")]
        scope: TargetScope,
    },

    /// Delete a skill directory
    Delete { path: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, subcommand: SkillSubcommand) -> Result<()> {
    match subcommand {
        SkillSubcommand::List { scope } => list(ctx, scope),
        SkillSubcommand::Export { directory, out } => export(ctx, &directory, &out),
        SkillSubcommand::ExportAll { scope, out } => export_all(ctx, scope, &out),
        SkillSubcommand::Import { archive, scope } => import(ctx, &archive, scope),
        SkillSubcommand::Delete { path } => delete(ctx, &path),
    }
}

fn collect(ctx: &Context, scope: ScopeArg) -> Result<Vec<SkillFile>> {
    let mut all = Vec::new();
    for &s in scope.scopes() {
        all.extend(skills::list_skills(s, ctx.project()).context("failed to list skills")?);
    }
    Ok(all)
}

fn list(ctx: &Context, scope: ScopeArg) -> Result<()> {
    let all = collect(ctx, scope)?;
    if ctx.json {
        return print_json(&all);
    }
    if all.is_empty() {
        println!("No skills found.");
        return Ok(());
    }
    let rows = all
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.scope.to_string(),
                if s.has_assets { "yes" } else { "no" }.to_string(),
                truncate(&s.description().unwrap_or_default(), 60),
            ]
        })
        .collect();
    print_table(&["NAME", "SCOPE", "ASSETS", "DESCRIPTION"], rows);
    Ok(())
}

fn export(ctx: &Context, directory: &str, out: &Path) -> Result<()> {
    skills::export_skill_directory(directory, out)
        .with_context(|| format!("failed to export {directory}"))?;
    if ctx.json {
        print_json(&serde_json::json!({ "path": out }))?;
    } else {
        println!("Exported {directory} to {}", out.display());
    }
    Ok(())
}

fn export_all(ctx: &Context, scope: ScopeArg, out: &Path) -> Result<()> {
    let directories: Vec<String> = collect(ctx, scope)?
        .into_iter()
        .map(|s| s.directory)
        .collect();
    skills::export_skills_archive(&directories, out)
        .with_context(|| format!("failed to write {}", out.display()))?;
    if ctx.json {
        print_json(&serde_json::json!({
            "path": out,
            "count": directories.len(),
        }))?;
    } else {
        println!(
            "Exported {} skill(s) to {}",
            directories.len(),
            out.display()
        );
    }
    Ok(())
}

fn import(ctx: &Context, archive: &str, scope: TargetScope) -> Result<()> {
    let limits = ctx.settings.bundle_limits();
    let dir = skills::import_skill_archive(archive, scope.into(), ctx.project(), &limits)
        .with_context(|| format!("failed to import {archive}"))?;
    if ctx.json {
        print_json(&serde_json::json!({ "directory": dir }))?;
    } else {
        println!("Imported skill into {}", dir.display());
    }
    Ok(())
}

fn delete(ctx: &Context, path: &str) -> Result<()> {
    skills::delete_skill(path).with_context(|| format!("failed to delete {path}"))?;
    if ctx.json {
        print_json(&serde_json::json!({ "deleted": path }))?;
    } else {
        println!("Deleted {path}");
    }
    Ok(())
}
