use crate::guard::FlightToken;
use crate::remote::{
    AddRecursiveRequest, AddRequest, ArchiveEngine, CloseResponse, CompareResponse, EngineResult, OpenResponse,
    PathSetResponse, RemoveRequest, RenameRequest, ReplaceRequest, SaveRequest, StatusResponse,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

pub type RequestId = u64;

/// One engine command
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    OpenArchiveOrFile,
    OpenPath { path: PathBuf },
    OpenInternalEntry { internal_path: String },
    AddEntry(AddRequest),
    RenameEntry(RenameRequest),
    RemoveEntry(RemoveRequest),
    ReplaceEntry(ReplaceRequest),
    AddEntriesRecursively(AddRecursiveRequest),
    ExtractEntry { internal_path: String },
    SearchEntries { query: String },
    ClearEntrySearch,
    CompareEntryWithReference { internal_path: String, from_archive: bool },
    CompareArbitraryFiles { from_disk: bool },
    SaveDocument(SaveRequest),
    SaveDocumentAs(SaveRequest),
    CloseAllDocuments,
}

impl Task {
    /// Tasks whose answer replaces the listing go through the single-flight guard
    pub fn replaces_listing(&self) -> bool {
        matches!(
            self,
            Task::OpenArchiveOrFile
                | Task::OpenPath { .. }
                | Task::AddEntry(_)
                | Task::RenameEntry(_)
                | Task::RemoveEntry(_)
                | Task::ReplaceEntry(_)
                | Task::AddEntriesRecursively(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Task::OpenArchiveOrFile => "open",
            Task::OpenPath { .. } => "open_path",
            Task::OpenInternalEntry { .. } => "open_entry",
            Task::AddEntry(_) => "add",
            Task::RenameEntry(_) => "rename",
            Task::RemoveEntry(_) => "remove",
            Task::ReplaceEntry(_) => "replace",
            Task::AddEntriesRecursively(_) => "add_recursive",
            Task::ExtractEntry { .. } => "extract",
            Task::SearchEntries { .. } => "search",
            Task::ClearEntrySearch => "clear_search",
            Task::CompareEntryWithReference { .. } => "compare_reference",
            Task::CompareArbitraryFiles { .. } => "compare_files",
            Task::SaveDocument(_) => "save",
            Task::SaveDocumentAs(_) => "save_as",
            Task::CloseAllDocuments => "close_all",
        }
    }
}

/// A task on its way to the worker
#[derive(Debug, Clone)]
pub struct TaskEnvelope {
    pub id: RequestId,
    pub token: Option<FlightToken>,
    pub task: Task,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Opened(OpenResponse),
    EntryOpened(Option<OpenResponse>),
    Mutated(Option<PathSetResponse>),
    Status(StatusResponse),
    Listing(PathSetResponse),
    Compared(Option<CompareResponse>),
    Closed(CloseResponse),
    Failed { message: String },
}

/// A task's answer, carrying the request back for context
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub id: RequestId,
    pub token: Option<FlightToken>,
    pub task: Task,
    pub outcome: TaskOutcome,
}

/// Serve envelopes until the sending side goes away.
///
/// Each request runs as its own task, so answers may come back in a
/// different order than the requests went out.
pub async fn run_worker(
    engine: Arc<dyn ArchiveEngine>,
    mut task_receiver: mpsc::UnboundedReceiver<TaskEnvelope>,
    result_sender: mpsc::UnboundedSender<TaskResult>,
) {
    while let Some(envelope) = task_receiver.recv().await {
        let engine = Arc::clone(&engine);
        let result_sender = result_sender.clone();
        tokio::spawn(async move {
            let TaskEnvelope { id, token, task } = envelope;
            log::debug!("⚙️ worker: running request {} ({})", id, task.name());
            let outcome = execute(engine.as_ref(), task.clone()).await;
            if result_sender.send(TaskResult { id, token, task, outcome }).is_err() {
                log::debug!("worker: result receiver dropped, discarding request {}", id);
            }
        });
    }
    log::debug!("worker: task channel closed, exiting");
}

/// Run a single task against the engine
pub async fn execute(engine: &dyn ArchiveEngine, task: Task) -> TaskOutcome {
    let name = task.name();
    let outcome = match task {
        Task::OpenArchiveOrFile => wrap(engine.open_archive_or_file().await, TaskOutcome::Opened),
        Task::OpenPath { path } => wrap(engine.open_path(path).await, TaskOutcome::Opened),
        Task::OpenInternalEntry { internal_path } => {
            wrap(engine.open_internal_entry(internal_path).await, TaskOutcome::EntryOpened)
        }
        Task::AddEntry(request) => wrap(engine.add_entry(request).await, TaskOutcome::Mutated),
        Task::RenameEntry(request) => wrap(engine.rename_entry(request).await, TaskOutcome::Mutated),
        Task::RemoveEntry(request) => wrap(engine.remove_entry(request).await, TaskOutcome::Mutated),
        Task::ReplaceEntry(request) => wrap(engine.replace_entry(request).await, TaskOutcome::Mutated),
        Task::AddEntriesRecursively(request) => {
            wrap(engine.add_entries_recursively(request).await, TaskOutcome::Mutated)
        }
        Task::ExtractEntry { internal_path } => wrap(engine.extract_entry(internal_path).await, TaskOutcome::Status),
        Task::SearchEntries { query } => wrap(engine.search_entries(query).await, TaskOutcome::Listing),
        Task::ClearEntrySearch => wrap(engine.clear_entry_search().await, TaskOutcome::Listing),
        Task::CompareEntryWithReference {
            internal_path,
            from_archive,
        } => wrap(
            engine.compare_entry_with_reference(internal_path, from_archive).await,
            TaskOutcome::Compared,
        ),
        Task::CompareArbitraryFiles { from_disk } => {
            wrap(engine.compare_arbitrary_files(from_disk).await, TaskOutcome::Compared)
        }
        Task::SaveDocument(request) => wrap(engine.save_document(request).await, TaskOutcome::Listing),
        Task::SaveDocumentAs(request) => wrap(engine.save_document_as(request).await, TaskOutcome::Mutated),
        Task::CloseAllDocuments => wrap(engine.close_all_documents().await, TaskOutcome::Closed),
    };
    if let TaskOutcome::Failed { message } = &outcome {
        log::error!("❌ {} failed: {}", name, message);
    }
    outcome
}

fn wrap<T>(result: EngineResult<T>, into: impl FnOnce(T) -> TaskOutcome) -> TaskOutcome {
    match result {
        Ok(value) => into(value),
        Err(e) => TaskOutcome::Failed { message: e.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_set::PathSet;
    use crate::remote::{EngineError, MockArchiveEngine};
    use assert_matches::assert_matches;

    #[test]
    fn test_guarded_tasks() {
        assert!(Task::OpenArchiveOrFile.replaces_listing());
        assert!(Task::RemoveEntry(RemoveRequest { internal_path: "a".into() }).replaces_listing());
        assert!(!Task::SearchEntries { query: "x".into() }.replaces_listing());
        assert!(!Task::CloseAllDocuments.replaces_listing());
        assert!(!Task::CompareArbitraryFiles { from_disk: true }.replaces_listing());
    }

    #[tokio::test]
    async fn test_execute_maps_rejection_to_failure() {
        let mut engine = MockArchiveEngine::new();
        engine
            .expect_extract_entry()
            .returning(|_| Err(EngineError::Rejected("locked".into())));

        let outcome = execute(&engine, Task::ExtractEntry { internal_path: "a.txt".into() }).await;
        assert_matches!(outcome, TaskOutcome::Failed { message } if message.contains("locked"));
    }

    #[tokio::test]
    async fn test_worker_round_trip() {
        let mut engine = MockArchiveEngine::new();
        engine.expect_remove_entry().returning(|request| {
            assert_eq!(request.internal_path, "a");
            Ok(Some(PathSetResponse {
                status_text: "Removed".into(),
                path_set: PathSet::from_paths(["d.txt"]),
            }))
        });

        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(Arc::new(engine), task_rx, result_tx));

        task_tx
            .send(TaskEnvelope {
                id: 7,
                token: None,
                task: Task::RemoveEntry(RemoveRequest { internal_path: "a".into() }),
            })
            .unwrap();

        let result = result_rx.recv().await.unwrap();
        assert_eq!(result.id, 7);
        assert_matches!(result.outcome, TaskOutcome::Mutated(Some(response)) if response.path_set.paths == vec!["d.txt".to_string()]);
    }
}
