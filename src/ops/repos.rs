//! Inspecting repository trees.

use anyhow::{Context, Result};
use serde_json::json;
use url::Url;

use crate::sources::{Concern, DescriptorCache, Navigator, TreeNode};

/// The flattened tree of one concern under a root.
#[derive(Debug)]
pub struct RepositoryTree {
    pub concern: Concern,
    pub nodes: Vec<TreeNode>,
    pub leaves: usize,
}

/// Flatten both descriptor trees under `root`.
///
/// A concern without any repository is reported as an empty tree.
pub fn repository_trees(cache: &DescriptorCache, root: &Url) -> Result<Vec<RepositoryTree>> {
    Concern::ALL
        .iter()
        .map(|&concern| {
            let navigator = Navigator::new(cache, concern);
            match navigator.flatten(root) {
                Ok(flat) => Ok(RepositoryTree {
                    concern,
                    leaves: flat.leaves.len(),
                    nodes: flat.nodes,
                }),
                Err(crate::sources::NavigatorError::RepositoryNotFound { .. }) => Ok(RepositoryTree {
                    concern,
                    nodes: Vec::new(),
                    leaves: 0,
                }),
                Err(e) => Err(e).with_context(|| format!("failed to navigate {} repository {}", concern, root)),
            }
        })
        .collect()
}

/// Render a tree, one node per line, children indented under parents.
pub fn format_tree(tree: &RepositoryTree) -> String {
    let mut out = format!("{} ({} leaves)\n", tree.concern, tree.leaves);
    if tree.nodes.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }
    for node in &tree.nodes {
        let indent = "  ".repeat(node.depth + 1);
        match (&node.kind, &node.error) {
            (_, Some(error)) => out.push_str(&format!("{}{} [skipped: {}]\n", indent, node.url, error)),
            (Some(kind), None) => out.push_str(&format!(
                "{}{} [{}, {}]\n",
                indent,
                node.url,
                kind,
                node.filename.as_deref().unwrap_or("")
            )),
            (None, None) => out.push_str(&format!("{}{}\n", indent, node.url)),
        }
    }
    out
}

pub fn trees_to_json(trees: &[RepositoryTree]) -> serde_json::Value {
    let entries: Vec<_> = trees
        .iter()
        .map(|tree| {
            let nodes: Vec<_> = tree
                .nodes
                .iter()
                .map(|node| {
                    json!({
                        "depth": node.depth,
                        "url": node.url.as_str(),
                        "kind": node.kind.as_ref().map(|k| k.to_string()),
                        "filename": node.filename,
                        "error": node.error,
                    })
                })
                .collect();
            json!({ "concern": tree.concern.as_str(), "leaves": tree.leaves, "nodes": nodes })
        })
        .collect();
    json!(entries)
}
