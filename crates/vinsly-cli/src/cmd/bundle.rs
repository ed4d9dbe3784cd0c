use super::{Context, ScopeArg, TargetScope};
use crate::output::print_json;
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use vinsly_core::bundle::{self, ImportResult};
use vinsly_core::{paths, store, types::Scope};

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

#[derive(clap::Subcommand)]
pub enum BundleSubcommand {
    /// Pack agents into a ZIP bundle
    Export {
        #[arg(long, value_enum, default_value = "all")]
        scope: ScopeArg,

        /// Destination .zip file
        #[arg(long)]
        out: PathBuf,
    },

    /// Unpack a ZIP bundle (or a single .md file) into an agents directory
    Import {
        /// Bundle to import
        path: PathBuf,

        #[arg(long, value_enum, default_value = "project")]
        scope: TargetScope,

        /// Report what would be imported without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, subcommand: BundleSubcommand) -> Result<()> {
    match subcommand {
        BundleSubcommand::Export { scope, out } => export(ctx, scope, &out),
        BundleSubcommand::Import {
            path,
            scope,
            dry_run,
        } => import(ctx, &path, scope.into(), dry_run),
    }
}

fn export(ctx: &Context, scope: ScopeArg, out: &Path) -> Result<()> {
    let mut agents = Vec::new();
    for &s in scope.scopes() {
        agents.extend(store::load_agents(s, ctx.project())?);
    }
    if agents.is_empty() {
        anyhow::bail!("no agents to export");
    }

    bundle::export_agents_to_file(&agents, out)
        .with_context(|| format!("failed to write {}", out.display()))?;

    if ctx.json {
        print_json(&serde_json::json!({
            "path": out,
            "count": agents.len(),
        }))?;
    } else {
        println!("Exported {} agent(s) to {}", agents.len(), out.display());
    }
    Ok(())
}

fn read_import(ctx: &Context, path: &Path, scope: Scope) -> Result<ImportResult> {
    let limits = ctx.settings.bundle_limits();
    let rt = ctx.runtime()?;

    if paths::is_markdown(path) {
        let file_name = path.display().to_string();
        let parsed = rt.block_on(bundle::import_agent_file(path, scope, limits))?;
        return Ok(match parsed {
            Some(a) => ImportResult {
                documents: vec![a],
                errors: Vec::new(),
            },
            None => ImportResult {
                documents: Vec::new(),
                errors: vec![format!(
                    "{file_name}: Missing required frontmatter (name and description)"
                )],
            },
        });
    }
    Ok(rt.block_on(bundle::import_archive_file(path, scope, limits))?)
}

fn import(ctx: &Context, path: &Path, scope: Scope, dry_run: bool) -> Result<()> {
    let mut result = read_import(ctx, path, scope)
        .with_context(|| format!("failed to import {}", path.display()))?;

    // One unwritable agent must not abandon the rest of the batch.
    let mut written = Vec::new();
    if !dry_run {
        let mut saved = Vec::with_capacity(result.documents.len());
        for a in std::mem::take(&mut result.documents) {
            match store::save_agent(&a, ctx.project()) {
                Ok(p) => {
                    written.push(p);
                    saved.push(a);
                }
                Err(e) => {
                    tracing::warn!(agent = %a.name, error = %e, "failed to save imported agent");
                    result.errors.push(format!("{}: {e}", a.file_name()));
                }
            }
        }
        result.documents = saved;
    }

    if ctx.json {
        return print_json(&serde_json::json!({
            "documents": result.documents,
            "errors": result.errors,
            "written": written,
            "dry_run": dry_run,
        }));
    }

    for a in &result.documents {
        let verb = if dry_run { "would import" } else { "imported" };
        println!("{verb}: {} ({})", a.name, a.scope);
    }
    for e in &result.errors {
        println!("[error] {e}");
    }
    println!(
        "{} imported, {} rejected",
        result.documents.len(),
        result.errors.len()
    );
    Ok(())
}
