//! Top-level composition of the state slices.
//!
//! Each slice has one owner: `TreeState` holds the listing, `SelectionState`
//! the selected entry, `CompareEngine` the comparison and `EditorBuffer` the
//! open document. User operations validate, dispatch and return; answers
//! come back through `handle_task_result`, the only place where engine
//! responses are written into the slices.

use crate::async_task::{run_worker, RequestId, Task, TaskEnvelope, TaskOutcome, TaskResult};
use crate::compare::{CompareDataset, CompareEngine, CompareMode, CompareOutcome};
use crate::config::Config;
use crate::dialogs::FilePicker;
use crate::dispatcher::MutationDispatcher;
use crate::error::{DispatchError, ValidationError};
use crate::guard::SingleFlight;
use crate::navigator::{Direction, NavigatorEvent, NavigatorViewModel, TreeState};
use crate::path_set::PathSet;
use crate::remote::{ArchiveEngine, CloseResponse, DocumentKind, OpenResponse, OpenedKind, PathSetResponse, SaveRequest};
use crate::selection::{EntryAction, SelectionState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    #[default]
    Archive,
    Editor,
    Comparer,
}

/// What the editor shows. Written by open, edit and close-all answers and
/// by the user typing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorBuffer {
    pub text: String,
    pub language: String,
    pub label: String,
}

/// Serializable picture of a session for scripts and the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status_message: String,
    pub view: ActiveView,
    pub archive_label: Option<String>,
    pub selection: Option<String>,
    pub search_query: String,
    pub path_set: PathSet,
    pub tree: Vec<String>,
    pub editor: EditorBuffer,
    pub compare: Option<CompareDataset>,
    pub diff_index: usize,
    pub diff_total: usize,
}

pub struct Session {
    tree: TreeState,
    selection: SelectionState,
    compare: CompareEngine,
    editor: EditorBuffer,
    dispatcher: MutationDispatcher,
    picker: Arc<dyn FilePicker>,
    config: Config,
    view: ActiveView,
    status_message: String,
    archive_label: Option<String>,
    pending: HashSet<RequestId>,
    last_listing_id: RequestId,
}

impl Session {
    pub fn new(
        config: Config,
        sender: mpsc::UnboundedSender<TaskEnvelope>,
        picker: Arc<dyn FilePicker>,
    ) -> Self {
        let guard = SingleFlight::from_config(&config.guard);
        Self {
            tree: TreeState::new(),
            selection: SelectionState::default(),
            compare: CompareEngine::new(config.compare.clone()),
            editor: EditorBuffer {
                language: config.compare.default_language.clone(),
                ..EditorBuffer::default()
            },
            dispatcher: MutationDispatcher::new(sender, guard),
            picker,
            config,
            view: ActiveView::Archive,
            status_message: "Ready".to_string(),
            archive_label: None,
            pending: HashSet::new(),
            last_listing_id: 0,
        }
    }

    /// Spawn a request worker for `engine` and wire a session to it.
    ///
    /// Answers arrive on the returned receiver and must be fed back through
    /// `handle_task_result`.
    pub fn connect(
        engine: Arc<dyn ArchiveEngine>,
        config: Config,
        picker: Arc<dyn FilePicker>,
    ) -> (Self, mpsc::UnboundedReceiver<TaskResult>) {
        let (task_sender, task_receiver) = mpsc::unbounded_channel();
        let (result_sender, result_receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(engine, task_receiver, result_sender));
        (Self::new(config, task_sender, picker), result_receiver)
    }

    // Accessors

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn view(&self) -> ActiveView {
        self.view
    }

    pub fn tree_state(&self) -> &TreeState {
        &self.tree
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn compare(&self) -> &CompareEngine {
        &self.compare
    }

    pub fn editor(&self) -> &EditorBuffer {
        &self.editor
    }

    pub fn archive_label(&self) -> Option<&str> {
        self.archive_label.as_deref()
    }

    pub fn guard(&self) -> &SingleFlight {
        self.dispatcher.guard()
    }

    /// Requests sent whose answer has not been handled yet
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn view_model(&self) -> NavigatorViewModel {
        self.tree.view_model(&self.selection)
    }

    pub fn render_tree(&self) -> String {
        self.tree.render(&self.selection)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let navigator = self.compare.navigator();
        SessionSnapshot {
            status_message: self.status_message.clone(),
            view: self.view,
            archive_label: self.archive_label.clone(),
            selection: (!self.selection.is_empty()).then(|| self.selection.path.clone()),
            search_query: self.tree.query().to_string(),
            path_set: self.tree.path_set().clone(),
            tree: self.render_tree().lines().map(str::to_string).collect(),
            editor: self.editor.clone(),
            compare: self.compare.dataset().cloned(),
            diff_index: navigator.current_index(),
            diff_total: navigator.total(),
        }
    }

    // Opening

    pub fn open(&mut self) -> Option<RequestId> {
        let sent = self.dispatcher.submit(Task::OpenArchiveOrFile);
        self.track(sent)
    }

    /// Open a path handed over by a drop or the command line
    pub fn open_path(&mut self, path: &Path) -> Option<RequestId> {
        let sent = self.dispatcher.open_dropped(path);
        self.track(sent)
    }

    /// Open the selected entry in the editor
    pub fn edit_selected(&mut self) -> Option<RequestId> {
        let internal_path = self.require(EntryAction::Edit)?;
        let sent = self.dispatcher.submit(Task::OpenInternalEntry { internal_path });
        self.track(sent)
    }

    // Tree view

    /// Select an entry of the displayed tree; entries hidden by the filter
    /// cannot be selected
    pub fn select(&mut self, path: &str) -> bool {
        let path = crate::path_set::normalize(path);
        let is_file = match self.tree.visible_tree().find(&path) {
            Some(node) if !node.is_root() => node.is_file(),
            _ => {
                self.set_status(ValidationError::NotFound(path).to_string());
                return false;
            }
        };
        self.selection.select(path, is_file);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Move the selection one visible row up or down
    pub fn step(&mut self, direction: Direction) -> bool {
        match self.tree.step(&self.selection, direction) {
            Some(item) if item.path != self.selection.path => {
                self.selection.select(item.path, !item.is_dir);
                true
            }
            _ => false,
        }
    }

    pub fn navigate(&mut self, event: NavigatorEvent) -> bool {
        let changed = self.tree.handle_event(event);
        self.retain_visible_selection();
        changed
    }

    pub fn set_filter(&mut self, query: &str) -> bool {
        self.navigate(NavigatorEvent::UpdateSearchQuery(query.to_string()))
    }

    pub fn clear_filter(&mut self) -> bool {
        self.navigate(NavigatorEvent::ClearSearchQuery)
    }

    // Mutations

    pub fn add(&mut self, internal_path: &str, source_path: &Path, overwrite: bool) -> Option<RequestId> {
        let sent = self.dispatcher.add(&self.tree, internal_path, source_path, overwrite);
        self.track(sent)
    }

    pub fn add_recursive(&mut self, base_internal_path: &str, source_dir: &Path) -> Option<RequestId> {
        let sent = self.dispatcher.add_recursive(base_internal_path, source_dir);
        self.track(sent)
    }

    pub fn add_to_selected_directory(&mut self) -> Option<RequestId> {
        let directory = self.require(EntryAction::AddToDirectory)?;
        let sent = self
            .dispatcher
            .add_to_directory(&self.tree, &directory, self.picker.as_ref());
        self.track_optional(sent)
    }

    pub fn remove_selected(&mut self) -> Option<RequestId> {
        let internal_path = self.require(EntryAction::Remove)?;
        let sent = self.dispatcher.remove(&internal_path);
        self.track(sent)
    }

    pub fn rename_selected(&mut self, new_internal_path: &str) -> Option<RequestId> {
        let internal_path = self.require(EntryAction::Rename)?;
        let sent = self.dispatcher.rename(&internal_path, new_internal_path);
        self.track(sent)
    }

    pub fn replace_selected(&mut self) -> Option<RequestId> {
        let internal_path = self.require(EntryAction::Replace)?;
        let sent = self
            .dispatcher
            .replace_content(&self.tree, &internal_path, self.picker.as_ref());
        self.track_optional(sent)
    }

    pub fn extract_selected(&mut self) -> Option<RequestId> {
        let internal_path = self.require(EntryAction::Extract)?;
        let sent = self.dispatcher.submit(Task::ExtractEntry { internal_path });
        self.track(sent)
    }

    /// Path of the selected entry, as the copy-path action hands it out
    pub fn copy_selected_path(&mut self) -> Option<String> {
        let path = self.require(EntryAction::CopyPath)?;
        self.set_status(format!("Copied path: {}", path));
        Some(path)
    }

    // Entry text search

    pub fn search_entries(&mut self, query: &str) -> Option<RequestId> {
        let query = query.trim();
        if query.is_empty() {
            self.set_status(ValidationError::EmptyQuery.to_string());
            return None;
        }
        let sent = self.dispatcher.submit(Task::SearchEntries {
            query: query.to_string(),
        });
        self.track(sent)
    }

    pub fn clear_entry_search(&mut self) -> Option<RequestId> {
        let sent = self.dispatcher.submit(Task::ClearEntrySearch);
        self.track(sent)
    }

    // Editor

    /// Replace the editor text, as typing would
    pub fn set_buffer(&mut self, text: impl Into<String>) {
        self.editor.text = text.into();
    }

    pub fn save(&mut self, kind: DocumentKind) -> Option<RequestId> {
        let sent = self.dispatcher.submit(Task::SaveDocument(SaveRequest {
            kind,
            text: self.editor.text.clone(),
        }));
        self.track(sent)
    }

    /// Save to a target the engine asks the user for. A cancelled dialog
    /// answers with nothing and leaves the session as it is.
    pub fn save_as(&mut self, kind: DocumentKind) -> Option<RequestId> {
        let sent = self.dispatcher.submit(Task::SaveDocumentAs(SaveRequest {
            kind,
            text: self.editor.text.clone(),
        }));
        self.track(sent)
    }

    pub fn close_all(&mut self) -> Option<RequestId> {
        let sent = self.dispatcher.submit(Task::CloseAllDocuments);
        self.track(sent)
    }

    // Comparison

    /// Compare the selected entry with its reference counterpart
    pub fn compare_selected(&mut self) -> Option<RequestId> {
        let internal_path = if self.selection.is_empty() {
            String::new()
        } else {
            self.require(EntryAction::CompareWithReference)?
        };
        self.compare_with(CompareMode::InternalVsReference { internal_path })
    }

    pub fn compare_buffer_with_reference(&mut self) -> Option<RequestId> {
        let buffer = self.editor.text.clone();
        self.compare_with(CompareMode::LiveBufferVsReference { buffer })
    }

    pub fn compare_disk_files(&mut self) -> Option<RequestId> {
        self.compare_with(CompareMode::DiskVsDisk)
    }

    pub fn compare_buffer_with_disk(&mut self) -> Option<RequestId> {
        let buffer = self.editor.text.clone();
        self.compare_with(CompareMode::LiveBufferVsDisk { buffer })
    }

    pub fn compare_with(&mut self, mode: CompareMode) -> Option<RequestId> {
        let task = match self.compare.prepare(&mode) {
            Ok(task) => task,
            Err(e) => {
                log::warn!("🚫 compare rejected: {}", e);
                self.set_status(e.to_string());
                return None;
            }
        };
        let sent = self.dispatcher.submit(task);
        let id = self.track(sent)?;
        self.compare.begin(id, mode);
        Some(id)
    }

    pub fn next_difference(&mut self) -> Option<usize> {
        let index = self.compare.next_difference()?;
        self.report_difference(index);
        Some(index)
    }

    pub fn previous_difference(&mut self) -> Option<usize> {
        let index = self.compare.previous_difference()?;
        self.report_difference(index);
        Some(index)
    }

    /// Leave the comparer, back to where the comparison started from
    pub fn close_compare(&mut self) {
        let back_to_editor = self
            .compare
            .dataset()
            .map_or(false, |dataset| dataset.is_tied_to_live_editor);
        self.compare.clear();
        if self.view == ActiveView::Comparer {
            self.view = if back_to_editor { ActiveView::Editor } else { ActiveView::Archive };
        }
    }

    fn report_difference(&mut self, index: usize) {
        let total = self.compare.navigator().total();
        self.set_status(format!("Difference {} of {}", index + 1, total));
    }

    // Answers

    /// Apply an engine answer to the slices
    pub fn handle_task_result(&mut self, result: TaskResult) {
        let TaskResult { id, token, task, outcome } = result;
        self.pending.remove(&id);
        if let Some(token) = token {
            self.dispatcher.complete(token);
        }
        log::debug!("📨 session: answer to request {} ({})", id, task.name());

        match outcome {
            TaskOutcome::Opened(response) => self.apply_opened(id, response),
            TaskOutcome::EntryOpened(None) => self.set_status("Ready"),
            TaskOutcome::EntryOpened(Some(response)) => self.apply_entry_opened(id, response),
            TaskOutcome::Mutated(None) => log::debug!("request {} ({}) returned nothing", id, task.name()),
            TaskOutcome::Mutated(Some(response)) => self.apply_mutation(id, response),
            TaskOutcome::Status(response) => self.set_status(response.status_text),
            TaskOutcome::Listing(response) => self.apply_listing(id, &task, response),
            TaskOutcome::Compared(response) => {
                let outcome = self.compare.apply(id, response);
                self.apply_compare_outcome(outcome);
            }
            TaskOutcome::Closed(response) => self.apply_closed(id, response),
            TaskOutcome::Failed { message } => {
                if matches!(task, Task::CompareEntryWithReference { .. } | Task::CompareArbitraryFiles { .. }) {
                    self.compare.apply(id, None);
                }
                self.set_status(format!("Error: {}", message));
            }
        }
    }

    fn apply_opened(&mut self, id: RequestId, response: OpenResponse) {
        match response.kind {
            OpenedKind::Archive => {
                self.replace_listing(id, response.path_set.unwrap_or_default());
                self.archive_label = Some(response.label);
                self.editor = EditorBuffer {
                    text: response.text.unwrap_or_default(),
                    language: self.language_or_default(response.language),
                    label: String::new(),
                };
                self.compare.clear();
                self.view = ActiveView::Archive;
                self.set_status(response.status_text);
            }
            OpenedKind::Document => self.show_document(response),
            OpenedKind::Error => {
                let status = if response.status_text.is_empty() {
                    "Error opening file".to_string()
                } else {
                    response.status_text
                };
                self.set_status(status);
            }
        }
    }

    fn apply_entry_opened(&mut self, id: RequestId, response: OpenResponse) {
        match response.kind {
            OpenedKind::Document => {
                let label = response.label.clone();
                self.show_document(response);
                self.set_status(format!("Opened file: {}", label));
            }
            OpenedKind::Error => self.set_status("Unsupported file type"),
            OpenedKind::Archive => self.apply_opened(id, response),
        }
    }

    fn show_document(&mut self, response: OpenResponse) {
        self.editor = EditorBuffer {
            text: response.text.unwrap_or_default(),
            language: self.language_or_default(response.language),
            label: response.label,
        };
        self.view = ActiveView::Editor;
        self.set_status(response.status_text);
    }

    fn apply_mutation(&mut self, id: RequestId, response: PathSetResponse) {
        self.set_status(response.status_text);
        if response.path_set.is_empty() {
            log::debug!("request {} returned an empty listing, keeping the current one", id);
            return;
        }
        self.replace_listing(id, response.path_set);
    }

    fn apply_listing(&mut self, id: RequestId, task: &Task, response: PathSetResponse) {
        match task {
            Task::SearchEntries { query } => {
                if response.path_set.is_empty() {
                    self.set_status(format!("No matches found: {}", query));
                } else {
                    self.set_status(response.status_text);
                    self.replace_listing(id, response.path_set);
                }
            }
            Task::ClearEntrySearch => {
                self.set_status(response.status_text);
                self.replace_listing(id, response.path_set);
            }
            _ => self.apply_mutation(id, response),
        }
    }

    fn apply_compare_outcome(&mut self, outcome: CompareOutcome) {
        if let CompareOutcome::Published { .. } = outcome {
            self.view = ActiveView::Comparer;
        }
        if let Some(status) = outcome.status() {
            self.set_status(status.to_string());
        }
    }

    fn apply_closed(&mut self, id: RequestId, response: CloseResponse) {
        self.force_listing(id, response.path_set);
        self.tree.prune_collapse_store();
        self.selection.clear();
        self.compare.clear();
        self.archive_label = None;
        self.editor = EditorBuffer {
            text: response.text,
            language: self.language_or_default(response.language),
            label: String::new(),
        };
        self.view = ActiveView::Archive;
        self.set_status(response.status_text);
    }

    /// Full replace of the listing, unless it is older than the one shown
    /// and stale answers are configured to be dropped
    fn replace_listing(&mut self, id: RequestId, path_set: PathSet) {
        if self.config.reconciliation.discard_stale_responses && id < self.last_listing_id {
            log::warn!(
                "⏭️ session: listing of request {} is older than request {}, ignored",
                id,
                self.last_listing_id
            );
            return;
        }
        self.force_listing(id, path_set);
    }

    fn force_listing(&mut self, id: RequestId, path_set: PathSet) {
        self.last_listing_id = self.last_listing_id.max(id);
        self.tree.replace_path_set(path_set);
        self.retain_visible_selection();
    }

    /// Drop a selection the displayed tree no longer shows, whether it left
    /// the listing or was pruned by the filter
    fn retain_visible_selection(&mut self) {
        self.selection.retain_in(self.tree.visible_tree());
    }

    // Helpers

    fn require(&mut self, action: EntryAction) -> Option<String> {
        match self.selection.require(action) {
            Ok(path) => Some(path.to_string()),
            Err(e) => {
                self.set_status(e.to_string());
                None
            }
        }
    }

    fn track(&mut self, sent: Result<RequestId, DispatchError>) -> Option<RequestId> {
        match sent {
            Ok(id) => {
                self.pending.insert(id);
                Some(id)
            }
            Err(DispatchError::Busy) => {
                log::debug!("session: request suppressed, another one is in flight");
                None
            }
            Err(DispatchError::Validation(e)) => {
                self.set_status(e.to_string());
                None
            }
            Err(e @ DispatchError::ChannelClosed) => {
                log::error!("❌ session: {}", e);
                self.set_status(format!("Error: {}", e));
                None
            }
        }
    }

    fn track_optional(&mut self, sent: Result<Option<RequestId>, DispatchError>) -> Option<RequestId> {
        match sent {
            Ok(Some(id)) => self.track(Ok(id)),
            Ok(None) => None,
            Err(e) => self.track(Err(e)),
        }
    }

    fn language_or_default(&self, language: Option<String>) -> String {
        language
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| self.config.compare.default_language.clone())
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status_message = status.into();
    }
}
