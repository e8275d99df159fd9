//! Explaining why a unit is part of a resolution.

use anyhow::Result;

use crate::ops::load::RepositoryRegistry;
use crate::ops::resolve::{resolve_into, ResolveOptions};
use crate::resolver::{ExplainStep, ResolutionState, ResolveMode};

/// Outcome of an explanation request.
#[derive(Debug)]
pub struct Explanation {
    /// Chain from a seed down to the unit, or `None` if it was never reached.
    pub chain: Option<Vec<ExplainStep>>,
    /// Units that directly require the explained unit.
    pub dependents: Vec<String>,
}

/// Resolve `opts` in slicer mode and explain how `unit_id` was reached.
///
/// Slicer mode is forced so a gap elsewhere in the graph does not hide the
/// chain.
pub fn explain(registry: &RepositoryRegistry, opts: &ResolveOptions, unit_id: &str) -> Result<Explanation> {
    let opts = ResolveOptions {
        mode: ResolveMode::Slicer,
        ..opts.clone()
    };
    let repositories = registry.get_all(&opts.repositories)?;
    let mut state = ResolutionState::new();
    resolve_into(registry, &repositories, &opts, &mut state)?;

    let graph = state.graph();
    let chain = graph.explain(unit_id);
    let dependents = match chain.as_ref().and_then(|c| c.last()) {
        Some(step) => graph
            .dependents(&step.unit)
            .iter()
            .map(|node| node.key.to_string())
            .collect(),
        None => Vec::new(),
    };

    Ok(Explanation { chain, dependents })
}

/// Render a chain as an indented tree, seed first.
pub fn format_chain(chain: &[ExplainStep]) -> String {
    let mut out = String::new();
    for (depth, step) in chain.iter().enumerate() {
        if depth == 0 {
            out.push_str(&format!("{}\n", step.unit));
            continue;
        }
        let indent = "   ".repeat(depth - 1);
        match &step.via {
            Some(req) => out.push_str(&format!("{}└─ {} (requires {})\n", indent, step.unit, req)),
            None => out.push_str(&format!("{}└─ {}\n", indent, step.unit)),
        }
    }
    out
}
