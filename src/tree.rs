use crate::path_set::{self, ArchivePath};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// File leaf or directory with children keyed by segment name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Dir { children: HashMap<String, TreeNode> },
}

/// Represents a single node in the archive tree.
///
/// Nodes carry no UI state. Anything that must survive a rebuild is keyed
/// by `path` elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub path: ArchivePath,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl TreeNode {
    /// Create a new file node
    pub fn new_file(path: impl Into<ArchivePath>) -> Self {
        let path = path.into();
        Self {
            name: path_set::file_name(&path).to_string(),
            path,
            kind: NodeKind::File,
        }
    }

    /// Create a new, empty directory node
    pub fn new_dir(path: impl Into<ArchivePath>) -> Self {
        let path = path.into();
        Self {
            name: path_set::file_name(&path).to_string(),
            path,
            kind: NodeKind::Dir {
                children: HashMap::new(),
            },
        }
    }

    /// The unnamed directory every tree hangs off
    pub fn root() -> Self {
        Self::new_dir("")
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Dir { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File)
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn children(&self) -> Option<&HashMap<String, TreeNode>> {
        match &self.kind {
            NodeKind::Dir { children } => Some(children),
            NodeKind::File => None,
        }
    }

    /// Check if this node has children
    pub fn has_children(&self) -> bool {
        self.children().map_or(false, |c| !c.is_empty())
    }

    /// Children in display order: directories first, then files, both by name
    pub fn sorted_children(&self) -> Vec<&TreeNode> {
        let mut children: Vec<&TreeNode> = match self.children() {
            Some(children) => children.values().collect(),
            None => return Vec::new(),
        };
        children.sort_by(|a, b| match (a.is_dir(), b.is_dir()) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.name.cmp(&b.name),
        });
        children
    }

    /// Find a node by its full path. The empty path is the node itself.
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        let mut current = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.children()?.get(segment)?;
        }
        Some(current)
    }

    /// All file paths below this node, sorted
    pub fn flatten(&self) -> Vec<ArchivePath> {
        let mut files = Vec::new();
        self.collect_files(&mut files);
        files.sort();
        files
    }

    fn collect_files(&self, files: &mut Vec<ArchivePath>) {
        match &self.kind {
            NodeKind::File => files.push(self.path.clone()),
            NodeKind::Dir { children } => {
                for child in children.values() {
                    child.collect_files(files);
                }
            }
        }
    }

    /// Depth below the root; root level entries are at depth 0
    pub fn depth(&self) -> usize {
        if self.path.is_empty() {
            0
        } else {
            self.path.matches('/').count()
        }
    }

    /// Get tree statistics, not counting the root itself
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        for child in self.children().into_iter().flat_map(|c| c.values()) {
            child.collect_stats(&mut stats);
        }
        stats
    }

    fn collect_stats(&self, stats: &mut TreeStats) {
        stats.total_nodes += 1;
        stats.max_depth = stats.max_depth.max(self.depth());
        match &self.kind {
            NodeKind::File => stats.files += 1,
            NodeKind::Dir { children } => {
                stats.directories += 1;
                for child in children.values() {
                    child.collect_stats(stats);
                }
            }
        }
    }
}

impl Default for TreeNode {
    fn default() -> Self {
        TreeNode::root()
    }
}

/// Statistics about the archive tree
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub files: usize,
    pub directories: usize,
    pub max_depth: usize,
}

/// A path that collided with an entry of the other kind during a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathConflict {
    /// A file was replaced by a directory needed for a deeper path
    FileBecameDir { path: ArchivePath },
    /// A directory was replaced by a file with the same full path
    DirBecameFile { path: ArchivePath },
}

pub struct TreeBuilder;

impl TreeBuilder {
    /// Build a tree from a flat path list. Conflicts resolve to the last write.
    pub fn build<I, S>(paths: I) -> TreeNode
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build_with_conflicts(paths).0
    }

    pub fn build_with_conflicts<I, S>(paths: I) -> (TreeNode, Vec<PathConflict>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let start_time = Instant::now();
        let mut root = TreeNode::root();
        let mut conflicts = Vec::new();
        let mut count = 0usize;

        for path in paths {
            let segments: Vec<&str> = path.as_ref().split('/').filter(|s| !s.is_empty()).collect();
            if segments.is_empty() {
                continue;
            }
            insert(&mut root, "", &segments, &mut conflicts);
            count += 1;
        }

        for conflict in &conflicts {
            log::warn!("⚠️ TreeBuilder: path conflict resolved by last write: {:?}", conflict);
        }
        log::debug!(
            "🌳 TreeBuilder: built tree from {} paths in {:?}",
            count,
            start_time.elapsed()
        );

        (root, conflicts)
    }
}

fn insert(node: &mut TreeNode, prefix: &str, segments: &[&str], conflicts: &mut Vec<PathConflict>) {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };
    let children = match &mut node.kind {
        NodeKind::Dir { children } => children,
        NodeKind::File => return,
    };
    let path = path_set::join(prefix, first);

    if rest.is_empty() {
        if let Some(existing) = children.get(*first) {
            if existing.is_dir() {
                conflicts.push(PathConflict::DirBecameFile { path: path.clone() });
            }
        }
        children.insert(first.to_string(), TreeNode::new_file(path));
        return;
    }

    let child = children
        .entry(first.to_string())
        .or_insert_with(|| TreeNode::new_dir(path.clone()));
    if child.is_file() {
        conflicts.push(PathConflict::FileBecameDir { path: path.clone() });
        *child = TreeNode::new_dir(path.clone());
    }
    insert(child, &path, rest, conflicts);
}
