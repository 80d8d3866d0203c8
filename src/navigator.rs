//! Tree view state
//!
//! `TreeState` owns the current `PathSet` and everything derived from it.
//! The tree is rebuilt from scratch on every replacement while expand state
//! lives on in the `CollapseStore`, keyed by path. Search acts as a filter
//! over the built tree rather than a separate mode.

use crate::collapse::CollapseStore;
use crate::path_set::{EntryMarker, MarkerIndex, PathSet};
use crate::search::SearchFilter;
use crate::selection::SelectionState;
use crate::tree::{TreeBuilder, TreeNode};
use std::borrow::Cow;

/// Events that change what the tree view shows
#[derive(Debug, Clone, PartialEq)]
pub enum NavigatorEvent {
    ToggleExpanded(String),
    Expand(String),
    Collapse(String),
    ExpandAll,
    UpdateSearchQuery(String),
    ClearSearchQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A visible item in the tree view
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleItem {
    pub path: String,
    pub name: String,
    pub depth: usize,
    pub is_dir: bool,
    pub is_expanded: bool,
    pub is_selected: bool,
    pub marker: Option<EntryMarker>,
}

/// View model for rendering the tree view
#[derive(Debug, Clone)]
pub struct NavigatorViewModel {
    pub items: Vec<VisibleItem>,
    pub cursor_position: usize,
    pub search_query: String,
    pub added_count: usize,
    pub modified_count: usize,
}

#[derive(Debug, Default)]
pub struct TreeState {
    path_set: PathSet,
    markers: MarkerIndex,
    tree: TreeNode,
    collapse: CollapseStore,
    filter: SearchFilter,
    filtered: Option<TreeNode>,
    generation: u64,
}

impl TreeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole listing and rebuild the tree from it.
    ///
    /// This is the only way the listing changes. Nothing of the previous
    /// set is kept apart from expand state and the search query.
    pub fn replace_path_set(&mut self, path_set: PathSet) {
        if !path_set.is_consistent() {
            log::warn!("⚠️ TreeState: marker entries outside of the listing are ignored");
        }
        let path_set = path_set.normalized();
        let tree = TreeBuilder::build(&path_set.paths);

        self.markers = path_set.marker_index();
        self.tree = tree;
        self.path_set = path_set;
        self.refresh_filter();
        self.generation += 1;

        log::info!(
            "🌳 TreeState: listing replaced ({} entries, {} added, {} modified), generation {}",
            self.path_set.len(),
            self.markers.added_count(),
            self.markers.modified_count(),
            self.generation
        );
    }

    /// Handle an event and return whether the visible state changed
    pub fn handle_event(&mut self, event: NavigatorEvent) -> bool {
        match event {
            NavigatorEvent::ToggleExpanded(path) => {
                if !self.is_dir(&path) {
                    return false;
                }
                self.collapse.toggle(&path);
                true
            }
            NavigatorEvent::Expand(path) => {
                if !self.is_dir(&path) || self.collapse.is_expanded(&path) {
                    return false;
                }
                self.collapse.expand(&path);
                true
            }
            NavigatorEvent::Collapse(path) => {
                if !self.is_dir(&path) || !self.collapse.is_expanded(&path) {
                    return false;
                }
                self.collapse.collapse(&path);
                true
            }
            NavigatorEvent::ExpandAll => {
                let before = self.collapse.clone();
                self.collapse.expand_all(&self.tree);
                before != self.collapse
            }
            NavigatorEvent::UpdateSearchQuery(query) => {
                if query == self.filter.query() {
                    return false;
                }
                self.filter = SearchFilter::new(&query);
                self.refresh_filter();
                true
            }
            NavigatorEvent::ClearSearchQuery => {
                if !self.filter.is_active() {
                    return false;
                }
                self.filter = SearchFilter::default();
                self.refresh_filter();
                true
            }
        }
    }

    fn refresh_filter(&mut self) {
        self.filtered = match self.filter.apply(&self.tree) {
            Cow::Borrowed(_) => None,
            Cow::Owned(filtered) => Some(filtered),
        };
    }

    pub fn path_set(&self) -> &PathSet {
        &self.path_set
    }

    /// The full tree, unaffected by the search query
    pub fn tree(&self) -> &TreeNode {
        &self.tree
    }

    /// The tree as displayed, pruned by the search query if one is set
    pub fn visible_tree(&self) -> &TreeNode {
        self.filtered.as_ref().unwrap_or(&self.tree)
    }

    pub fn collapse_store(&self) -> &CollapseStore {
        &self.collapse
    }

    pub fn query(&self) -> &str {
        self.filter.query()
    }

    /// Number of listing replacements so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn marker(&self, path: &str) -> Option<EntryMarker> {
        self.markers.marker(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.tree.find(path).map_or(false, |node| !node.is_root())
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.tree.find(path).map_or(false, TreeNode::is_file)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.tree
            .find(path)
            .map_or(false, |node| node.is_dir() && !node.is_root())
    }

    /// Drop expand entries for directories that no longer exist
    pub fn prune_collapse_store(&mut self) -> usize {
        self.collapse.prune(&self.tree)
    }

    /// Items in display order, descending only into expanded directories.
    ///
    /// While a search query is active every directory of the pruned tree
    /// is shown open, without touching the stored expand state.
    pub fn visible_items(&self, selection: &SelectionState) -> Vec<VisibleItem> {
        let mut items = Vec::new();
        let reveal = self.filter.is_active();
        for child in self.visible_tree().sorted_children() {
            self.collect_visible_items(child, 0, reveal, selection, &mut items);
        }
        items
    }

    fn collect_visible_items(
        &self,
        node: &TreeNode,
        depth: usize,
        reveal: bool,
        selection: &SelectionState,
        items: &mut Vec<VisibleItem>,
    ) {
        let is_dir = node.is_dir();
        let is_expanded = is_dir && (reveal || self.collapse.is_expanded(&node.path));
        items.push(VisibleItem {
            path: node.path.clone(),
            name: node.name.clone(),
            depth,
            is_dir,
            is_expanded,
            is_selected: !selection.is_empty() && selection.path == node.path,
            marker: if is_dir { None } else { self.markers.marker(&node.path) },
        });

        if is_expanded {
            for child in node.sorted_children() {
                self.collect_visible_items(child, depth + 1, reveal, selection, items);
            }
        }
    }

    /// Build view model for rendering
    pub fn view_model(&self, selection: &SelectionState) -> NavigatorViewModel {
        let start = std::time::Instant::now();
        let items = self.visible_items(selection);
        let cursor_position = items.iter().position(|item| item.is_selected).unwrap_or(0);
        log::debug!("View model: computed {} items in {:?}", items.len(), start.elapsed());

        NavigatorViewModel {
            items,
            cursor_position,
            search_query: self.filter.query().to_string(),
            added_count: self.markers.added_count(),
            modified_count: self.markers.modified_count(),
        }
    }

    /// The visible item next to the selection, or the first one without a
    /// visible selection. Stays put at either end.
    pub fn step(&self, selection: &SelectionState, direction: Direction) -> Option<VisibleItem> {
        let items = self.visible_items(selection);
        if items.is_empty() {
            return None;
        }

        let current = match items.iter().position(|item| item.is_selected) {
            Some(index) => index,
            None => return items.into_iter().next(),
        };
        let target = match direction {
            Direction::Up => current.saturating_sub(1),
            Direction::Down => (current + 1).min(items.len() - 1),
        };
        items.into_iter().nth(target)
    }

    /// Plain text rendering of the visible items, one per line
    pub fn render(&self, selection: &SelectionState) -> String {
        let mut out = String::new();
        for item in self.visible_items(selection) {
            let cursor = if item.is_selected { ">" } else { " " };
            let icon = match (item.is_dir, item.is_expanded) {
                (true, true) => "▾ ",
                (true, false) => "▸ ",
                (false, _) => "  ",
            };
            let marker = match item.marker {
                Some(EntryMarker::Added) => " [+]",
                Some(EntryMarker::Modified) => " [*]",
                None => "",
            };
            out.push_str(&format!(
                "{}{}{}{}{}\n",
                cursor,
                "  ".repeat(item.depth),
                icon,
                item.name,
                marker
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_state() -> TreeState {
        let mut state = TreeState::new();
        state.replace_path_set(PathSet::new(
            vec!["a/b.txt".into(), "a/c.txt".into(), "d.txt".into()],
            vec!["a/c.txt".into()],
            vec![],
        ));
        state
    }

    fn paths(items: &[VisibleItem]) -> Vec<&str> {
        items.iter().map(|i| i.path.as_str()).collect()
    }

    #[test]
    fn test_scenario_markers() {
        let mut state = scenario_state();
        state.handle_event(NavigatorEvent::Expand("a".into()));
        let items = state.visible_items(&SelectionState::default());

        assert_eq!(paths(&items), vec!["a", "a/b.txt", "a/c.txt", "d.txt"]);
        let flagged: Vec<&str> = items
            .iter()
            .filter(|i| i.marker == Some(EntryMarker::Added))
            .map(|i| i.path.as_str())
            .collect();
        assert_eq!(flagged, vec!["a/c.txt"]);
        assert!(items.iter().all(|i| i.marker != Some(EntryMarker::Modified)));
    }

    #[test]
    fn test_directories_start_collapsed() {
        let state = scenario_state();
        let items = state.visible_items(&SelectionState::default());
        assert_eq!(paths(&items), vec!["a", "d.txt"]);
        assert!(!items[0].is_expanded);
    }

    #[test]
    fn test_collapse_state_survives_replacement() {
        let mut state = scenario_state();
        assert!(state.handle_event(NavigatorEvent::ToggleExpanded("a".into())));

        state.replace_path_set(PathSet::from_paths(["a/b.txt", "a/c.txt", "d.txt", "e/f.txt"]));
        let items = state.visible_items(&SelectionState::default());
        assert_eq!(paths(&items), vec!["a", "a/b.txt", "a/c.txt", "e", "d.txt"]);
        assert!(!state.collapse_store().is_expanded("e"));
        assert_eq!(state.generation(), 2);
    }

    #[test]
    fn test_toggle_ignores_files_and_unknown_paths() {
        let mut state = scenario_state();
        assert!(!state.handle_event(NavigatorEvent::ToggleExpanded("d.txt".into())));
        assert!(!state.handle_event(NavigatorEvent::ToggleExpanded("nope".into())));
        assert!(state.collapse_store().is_empty());
    }

    #[test]
    fn test_expand_and_collapse_report_changes() {
        let mut state = scenario_state();
        assert!(state.handle_event(NavigatorEvent::Expand("a".into())));
        assert!(!state.handle_event(NavigatorEvent::Expand("a".into())));
        assert!(state.handle_event(NavigatorEvent::Collapse("a".into())));
        assert!(!state.handle_event(NavigatorEvent::Collapse("a".into())));
    }

    #[test]
    fn test_search_reveals_without_touching_store() {
        let mut state = TreeState::new();
        state.replace_path_set(PathSet::from_paths(["x/y/match.txt", "x/other.txt", "z.txt"]));

        assert!(state.handle_event(NavigatorEvent::UpdateSearchQuery("MATCH".into())));
        let items = state.visible_items(&SelectionState::default());
        assert_eq!(paths(&items), vec!["x", "x/y", "x/y/match.txt"]);
        assert!(items.iter().filter(|i| i.is_dir).all(|i| i.is_expanded));
        assert!(state.collapse_store().is_empty());

        assert!(state.handle_event(NavigatorEvent::ClearSearchQuery));
        let items = state.visible_items(&SelectionState::default());
        assert_eq!(paths(&items), vec!["x", "z.txt"]);
    }

    #[test]
    fn test_filter_reapplied_after_replacement() {
        let mut state = scenario_state();
        state.handle_event(NavigatorEvent::UpdateSearchQuery("c.txt".into()));
        assert_eq!(state.visible_tree().flatten(), vec!["a/c.txt".to_string()]);

        state.replace_path_set(PathSet::from_paths(["a/b.txt", "q/c.txt"]));
        assert_eq!(state.visible_tree().flatten(), vec!["q/c.txt".to_string()]);
        assert_eq!(state.query(), "c.txt");
    }

    #[test]
    fn test_step_navigation() {
        let state = scenario_state();
        let mut selection = SelectionState::default();

        let first = state.step(&selection, Direction::Down).unwrap();
        assert_eq!(first.path, "a");
        selection.select(first.path, !first.is_dir);

        let next = state.step(&selection, Direction::Down).unwrap();
        assert_eq!(next.path, "d.txt");
        selection.select(next.path, !next.is_dir);

        assert_eq!(state.step(&selection, Direction::Down).unwrap().path, "d.txt");
        assert_eq!(state.step(&selection, Direction::Up).unwrap().path, "a");
    }

    #[test]
    fn test_step_on_empty_tree() {
        let state = TreeState::new();
        assert!(state.step(&SelectionState::default(), Direction::Down).is_none());
    }

    #[test]
    fn test_directory_markers_are_ignored() {
        let mut state = TreeState::new();
        state.replace_path_set(PathSet::new(
            vec!["a/b.txt".into()],
            vec!["a".into()],
            vec!["a".into()],
        ));
        assert_eq!(state.marker("a"), None);
        assert!(state.path_set().added_paths.is_empty());
        let items = state.visible_items(&SelectionState::default());
        assert_eq!(items[0].marker, None);
    }

    #[test]
    fn test_view_model_and_render() {
        let mut state = scenario_state();
        state.handle_event(NavigatorEvent::ExpandAll);
        let mut selection = SelectionState::default();
        selection.select("a/c.txt", true);

        let view_model = state.view_model(&selection);
        assert_eq!(view_model.cursor_position, 2);
        assert_eq!(view_model.added_count, 1);

        let rendered = state.render(&selection);
        assert_eq!(rendered, " ▾ a\n     b.txt\n>    c.txt [+]\n   d.txt\n");
    }
}
