use crate::error::ValidationError;
use crate::path_set::ArchivePath;
use crate::tree::TreeNode;

/// Entry actions that depend on what is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryAction {
    Edit,
    Extract,
    Replace,
    Rename,
    Remove,
    CopyPath,
    CompareWithReference,
    AddToDirectory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTarget {
    File,
    Directory,
    Any,
}

impl EntryAction {
    pub const ALL: [EntryAction; 8] = [
        EntryAction::Edit,
        EntryAction::Extract,
        EntryAction::Replace,
        EntryAction::Rename,
        EntryAction::Remove,
        EntryAction::CopyPath,
        EntryAction::CompareWithReference,
        EntryAction::AddToDirectory,
    ];

    pub fn target(self) -> ActionTarget {
        match self {
            EntryAction::Edit
            | EntryAction::Extract
            | EntryAction::Replace
            | EntryAction::CopyPath
            | EntryAction::CompareWithReference => ActionTarget::File,
            EntryAction::AddToDirectory => ActionTarget::Directory,
            EntryAction::Rename | EntryAction::Remove => ActionTarget::Any,
        }
    }
}

/// The single selected entry. An empty path means nothing is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub path: ArchivePath,
    pub is_file: bool,
}

impl SelectionState {
    pub fn select(&mut self, path: impl Into<ArchivePath>, is_file: bool) {
        self.path = path.into();
        self.is_file = is_file;
    }

    pub fn clear(&mut self) {
        self.path.clear();
        self.is_file = false;
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn allows(&self, action: EntryAction) -> bool {
        self.require(action).is_ok()
    }

    /// Selected path if `action` is enabled for the current selection
    pub fn require(&self, action: EntryAction) -> Result<&str, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::NoSelection);
        }
        match action.target() {
            ActionTarget::File if !self.is_file => Err(ValidationError::NotAFile(self.path.clone())),
            ActionTarget::Directory if self.is_file => Err(ValidationError::NotADirectory(self.path.clone())),
            _ => Ok(&self.path),
        }
    }

    pub fn available_actions(&self) -> Vec<EntryAction> {
        EntryAction::ALL.iter().copied().filter(|a| self.allows(*a)).collect()
    }

    /// Clear the selection if its path is gone from `tree` or changed kind.
    ///
    /// Returns true when the selection was dropped.
    pub fn retain_in(&mut self, tree: &TreeNode) -> bool {
        if self.is_empty() {
            return false;
        }
        let still_there = tree
            .find(&self.path)
            .map_or(false, |node| !node.is_root() && node.is_file() == self.is_file);
        if !still_there {
            log::debug!("Selection '{}' no longer in tree, clearing", self.path);
            self.clear();
        }
        !still_there
    }
}
