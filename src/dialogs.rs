use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// What a picked path will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickPurpose {
    OpenArchive,
    ReplaceContent,
    AddToDirectory,
    SaveAs,
    CompareLeft,
    CompareRight,
}

/// File and directory dialogs. `None` means the user cancelled.
pub trait FilePicker: Send + Sync {
    fn pick_file(&self, purpose: PickPurpose) -> Option<PathBuf>;

    fn pick_directory(&self, purpose: PickPurpose) -> Option<PathBuf>;
}

/// Answers dialogs from a prepared queue; an empty queue cancels.
///
/// Clones share the queue, so a script can feed answers to a picker that
/// has already been handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct QueuedPicker {
    answers: Arc<Mutex<VecDeque<Option<PathBuf>>>>,
}

impl QueuedPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next answer, `None` for a cancelled dialog
    pub fn push(&self, answer: Option<PathBuf>) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push_back(answer);
        }
    }

    pub fn pending(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or(0)
    }

    fn next(&self, purpose: PickPurpose) -> Option<PathBuf> {
        let answer = self.answers.lock().ok().and_then(|mut a| a.pop_front()).flatten();
        log::debug!("📂 QueuedPicker: {:?} -> {:?}", purpose, answer);
        answer
    }
}

impl FilePicker for QueuedPicker {
    fn pick_file(&self, purpose: PickPurpose) -> Option<PathBuf> {
        self.next(purpose)
    }

    fn pick_directory(&self, purpose: PickPurpose) -> Option<PathBuf> {
        self.next(purpose)
    }
}
