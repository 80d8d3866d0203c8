use crate::tree::{NodeKind, TreeNode};
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Instant;

/// Prune `tree` to entries whose full path contains `query`, ignoring case.
///
/// Directories survive when their own path matches or when anything below
/// them does. The empty query returns the tree itself.
pub fn filter<'a>(tree: &'a TreeNode, query: &str) -> Cow<'a, TreeNode> {
    if query.is_empty() {
        return Cow::Borrowed(tree);
    }

    let start_time = Instant::now();
    let needle = query.to_lowercase();
    let children = match tree.children() {
        Some(children) => prune_children(children, &needle),
        None => HashMap::new(),
    };
    let filtered = TreeNode {
        name: tree.name.clone(),
        path: tree.path.clone(),
        kind: NodeKind::Dir { children },
    };
    log::debug!("🔍 filter: query '{}' took {:?}", query, start_time.elapsed());
    Cow::Owned(filtered)
}

fn prune_children(children: &HashMap<String, TreeNode>, needle: &str) -> HashMap<String, TreeNode> {
    children
        .iter()
        .filter_map(|(name, child)| prune(child, needle).map(|kept| (name.clone(), kept)))
        .collect()
}

fn prune(node: &TreeNode, needle: &str) -> Option<TreeNode> {
    let matches = node.path.to_lowercase().contains(needle);
    match &node.kind {
        NodeKind::File => matches.then(|| node.clone()),
        NodeKind::Dir { children } => {
            let kept = prune_children(children, needle);
            if kept.is_empty() && !matches {
                return None;
            }
            Some(TreeNode {
                name: node.name.clone(),
                path: node.path.clone(),
                kind: NodeKind::Dir { children: kept },
            })
        }
    }
}

/// Current search query of the tree view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    query: String,
    lowered: String,
}

impl SearchFilter {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            lowered: query.to_lowercase(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        !self.is_active() || path.to_lowercase().contains(&self.lowered)
    }

    pub fn apply<'a>(&self, tree: &'a TreeNode) -> Cow<'a, TreeNode> {
        filter(tree, &self.query)
    }
}
