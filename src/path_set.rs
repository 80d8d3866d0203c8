//! Flat archive listing as delivered by the engine.
//!
//! A `PathSet` is never patched locally: every open, mutation or search
//! response carries a complete one that replaces the previous value.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// `/`-delimited key of an entry inside the archive, without a leading slash.
pub type ArchivePath = String;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSet {
    #[serde(default)]
    pub paths: Vec<ArchivePath>,
    #[serde(default)]
    pub added_paths: Vec<ArchivePath>,
    #[serde(rename = "modded_paths", default)]
    pub modified_paths: Vec<ArchivePath>,
}

/// Marker shown next to an entry in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMarker {
    Added,
    Modified,
}

impl PathSet {
    pub fn new(paths: Vec<ArchivePath>, added_paths: Vec<ArchivePath>, modified_paths: Vec<ArchivePath>) -> Self {
        Self {
            paths,
            added_paths,
            modified_paths,
        }
    }

    /// Build a set with no markers
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ArchivePath>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True if `path` is a file entry of this set
    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// True if `path` is a directory implied by the entries of this set
    pub fn contains_dir(&self, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        !path.is_empty() && self.paths.iter().any(|p| p.starts_with(&prefix))
    }

    /// Check the subset invariant of both marker lists
    pub fn is_consistent(&self) -> bool {
        let all: HashSet<&str> = self.paths.iter().map(String::as_str).collect();
        self.added_paths
            .iter()
            .chain(self.modified_paths.iter())
            .all(|p| all.contains(p.as_str()))
    }

    /// Drop marker entries that do not name a file of this set.
    pub fn normalized(mut self) -> Self {
        let all: HashSet<String> = self.paths.iter().cloned().collect();
        self.added_paths.retain(|p| all.contains(p));
        self.modified_paths.retain(|p| all.contains(p));
        self
    }

    pub fn marker_index(&self) -> MarkerIndex {
        MarkerIndex {
            added: self.added_paths.iter().cloned().collect(),
            modified: self.modified_paths.iter().cloned().collect(),
        }
    }
}

/// Hash lookups over the marker subsets, rebuilt with the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerIndex {
    added: HashSet<ArchivePath>,
    modified: HashSet<ArchivePath>,
}

impl MarkerIndex {
    /// Added takes precedence when a path is listed in both subsets
    pub fn marker(&self, path: &str) -> Option<EntryMarker> {
        if self.added.contains(path) {
            Some(EntryMarker::Added)
        } else if self.modified.contains(path) {
            Some(EntryMarker::Modified)
        } else {
            None
        }
    }

    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn modified_count(&self) -> usize {
        self.modified.len()
    }
}

/// Join a directory path and a child name
pub fn join(parent: &str, name: &str) -> ArchivePath {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Parent directory of `path`, `None` for root level entries
pub fn parent_of(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx])
}

/// Last segment of `path`
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// An entry target needs a `.` in its final segment
pub fn has_extension(path: &str) -> bool {
    file_name(path).contains('.')
}

/// Backslashes become `/`, duplicate and leading separators are dropped.
pub fn normalize(path: &str) -> ArchivePath {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `path` has a `..` segment and could point outside the archive
pub fn escapes_root(path: &str) -> bool {
    path.replace('\\', "/").split('/').any(|segment| segment == "..")
}

/// All proper ancestors of `path`, outermost first
pub fn ancestors(path: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut current = parent_of(path);
    while let Some(parent) = current {
        result.push(parent);
        current = parent_of(parent);
    }
    result.reverse();
    result
}
