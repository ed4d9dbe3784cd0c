use super::Context;
use crate::output::{print_json, print_table};
use anyhow::Result;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use vinsly_core::discovery::{DiscoveryCache, DiscoveryRequest, ScanWalker};
use vinsly_core::{paths, skills, store};

pub fn run(ctx: &Context, depth: Option<usize>, include_protected: bool) -> Result<()> {
    let depth = depth.unwrap_or(ctx.settings.discovery.depth);
    let include_protected = include_protected || ctx.settings.discovery.include_protected;
    let home = paths::home_dir()?;

    let cache = DiscoveryCache::with_ttl(ScanWalker::new(home), ctx.settings.discovery.cache_ttl());
    let signal = CancellationToken::new();
    let request = DiscoveryRequest::new(depth, include_protected).with_signal(signal.clone());

    let rt = ctx.runtime()?;
    let directories = rt.block_on(async {
        let ctrl_c = signal.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });
        cache.discover(request).await
    })?;

    if ctx.json {
        return print_json(&directories);
    }
    if directories.is_empty() {
        println!("No projects with .claude/agents found (depth {depth}).");
        return Ok(());
    }

    let rows = directories
        .iter()
        .map(|dir| {
            let root = Path::new(dir);
            let agents = store::list_agents_from_directory(root).map_or(0, |a| a.len());
            let skills = skills::list_skills_from_directory(root).map_or(0, |s| s.len());
            vec![dir.clone(), agents.to_string(), skills.to_string()]
        })
        .collect();
    print_table(&["PROJECT", "AGENTS", "SKILLS"], rows);
    Ok(())
}
