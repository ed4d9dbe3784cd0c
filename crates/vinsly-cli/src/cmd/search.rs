use super::{truncate, Context, ScopeArg};
use crate::output::{print_json, print_table};
use anyhow::Result;
use vinsly_core::{fuzzy, store};

/// Fuzzy-filter agents from both scopes by name and description.
pub fn run(ctx: &Context, query: &str, tolerance: usize) -> Result<()> {
    let mut agents = Vec::new();
    for &scope in ScopeArg::All.scopes() {
        agents.extend(store::load_agents(scope, ctx.project())?);
    }

    let hits = fuzzy::filter(&agents, query, tolerance, |a| {
        vec![a.name.as_str(), a.description()]
    });

    if ctx.json {
        return print_json(&hits);
    }
    if hits.is_empty() {
        println!("No agents match '{query}'.");
        return Ok(());
    }
    let rows = hits
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                a.scope.to_string(),
                truncate(a.description(), 60),
            ]
        })
        .collect();
    print_table(&["NAME", "SCOPE", "DESCRIPTION"], rows);
    Ok(())
}
