use crate::path_set::{self, ArchivePath};
use crate::tree::TreeNode;
use std::collections::HashMap;

/// Expand state keyed by full path, independent of any particular tree.
///
/// A rebuilt tree asks this store for every directory; paths it has never
/// seen are collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseStore {
    expanded: HashMap<ArchivePath, bool>,
}

impl CollapseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.get(path).copied().unwrap_or(false)
    }

    pub fn set_expanded(&mut self, path: &str, expanded: bool) {
        self.expanded.insert(path.to_string(), expanded);
    }

    pub fn expand(&mut self, path: &str) {
        self.set_expanded(path, true);
    }

    pub fn collapse(&mut self, path: &str) {
        self.set_expanded(path, false);
    }

    /// Flip the state and return the new value
    pub fn toggle(&mut self, path: &str) -> bool {
        let expanded = !self.is_expanded(path);
        self.set_expanded(path, expanded);
        expanded
    }

    /// Expand every directory above `path` so the entry becomes visible
    pub fn expand_ancestors(&mut self, path: &str) {
        for ancestor in path_set::ancestors(path) {
            self.expand(ancestor);
        }
    }

    /// Expand every directory of `tree`
    pub fn expand_all(&mut self, tree: &TreeNode) {
        for child in tree.sorted_children() {
            if child.is_dir() {
                self.expand(&child.path);
                self.expand_all(child);
            }
        }
    }

    /// Drop entries for paths that are no longer directories of `tree`.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&mut self, tree: &TreeNode) -> usize {
        let before = self.expanded.len();
        self.expanded
            .retain(|path, _| tree.find(path).map_or(false, |node| node.is_dir() && !node.is_root()));
        before - self.expanded.len()
    }

    /// Currently expanded paths, sorted
    pub fn expanded_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .expanded
            .iter()
            .filter(|(_, expanded)| **expanded)
            .map(|(path, _)| path.as_str())
            .collect();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}
