//! Client side of archive mutations.
//!
//! Requests are validated against the current listing before anything is
//! sent. Requests that replace the listing must also take the single-flight
//! guard. The dispatcher never touches the listing itself: the answer is
//! applied by whoever drains the result channel.

use crate::async_task::{RequestId, Task, TaskEnvelope};
use crate::dialogs::{FilePicker, PickPurpose};
use crate::error::{DispatchError, ValidationError};
use crate::guard::{FlightToken, SingleFlight};
use crate::navigator::TreeState;
use crate::path_set;
use crate::remote::{AddRecursiveRequest, AddRequest, RemoveRequest, RenameRequest, ReplaceRequest};
use std::path::Path;
use tokio::sync::mpsc;

pub struct MutationDispatcher {
    guard: SingleFlight,
    next_id: RequestId,
    sender: mpsc::UnboundedSender<TaskEnvelope>,
}

impl MutationDispatcher {
    pub fn new(sender: mpsc::UnboundedSender<TaskEnvelope>, guard: SingleFlight) -> Self {
        Self {
            guard,
            next_id: 1,
            sender,
        }
    }

    pub fn guard(&self) -> &SingleFlight {
        &self.guard
    }

    /// Send `task` to the worker, taking the guard when it replaces the listing
    pub fn submit(&mut self, task: Task) -> Result<RequestId, DispatchError> {
        let token = if task.replaces_listing() {
            Some(self.guard.try_acquire()?)
        } else {
            None
        };

        let id = self.next_id;
        self.next_id += 1;
        let name = task.name();
        if self.sender.send(TaskEnvelope { id, token, task }).is_err() {
            if let Some(token) = token {
                self.guard.complete(token);
                self.guard.reset();
            }
            return Err(DispatchError::ChannelClosed);
        }

        log::info!("📤 dispatched request {} ({})", id, name);
        Ok(id)
    }

    /// Hand the guard back once the answer for `token` arrived
    pub fn complete(&self, token: FlightToken) -> bool {
        self.guard.complete(token)
    }

    pub fn add(
        &mut self,
        tree: &TreeState,
        internal_path: &str,
        source_path: &Path,
        overwrite: bool,
    ) -> Result<RequestId, DispatchError> {
        let internal_path = path_set::normalize(internal_path);
        let checked = if internal_path.is_empty() {
            Err(ValidationError::EmptyInternalPath)
        } else if !path_set::has_extension(&internal_path) {
            Err(ValidationError::MissingExtension(internal_path.clone()))
        } else if source_path.as_os_str().is_empty() {
            Err(ValidationError::EmptySourcePath)
        } else if !overwrite && tree.contains(&internal_path) {
            Err(ValidationError::TargetExists(internal_path.clone()))
        } else {
            Ok(())
        };
        reject_invalid(checked)?;

        self.submit(Task::AddEntry(AddRequest {
            internal_path,
            source_path: source_path.to_path_buf(),
            overwrite,
        }))
    }

    /// Remove a file or a whole directory. Whether the path exists is the
    /// engine's call.
    pub fn remove(&mut self, internal_path: &str) -> Result<RequestId, DispatchError> {
        let internal_path = path_set::normalize(internal_path);
        if internal_path.is_empty() {
            reject_invalid(Err(ValidationError::EmptyInternalPath))?;
        }
        self.submit(Task::RemoveEntry(RemoveRequest { internal_path }))
    }

    pub fn rename(&mut self, internal_path: &str, new_internal_path: &str) -> Result<RequestId, DispatchError> {
        let internal_path = path_set::normalize(internal_path);
        let new_internal_path = path_set::normalize(new_internal_path);
        let checked = if internal_path.is_empty() {
            Err(ValidationError::EmptyInternalPath)
        } else if new_internal_path.is_empty() {
            Err(ValidationError::EmptyNewName)
        } else {
            Ok(())
        };
        reject_invalid(checked)?;

        self.submit(Task::RenameEntry(RenameRequest {
            internal_path,
            new_internal_path,
        }))
    }

    /// Replace the content of an existing file with one picked by the user.
    ///
    /// `Ok(None)` when the picker was cancelled; nothing is sent then.
    pub fn replace_content(
        &mut self,
        tree: &TreeState,
        internal_path: &str,
        picker: &dyn FilePicker,
    ) -> Result<Option<RequestId>, DispatchError> {
        let checked = if internal_path.is_empty() {
            Err(ValidationError::EmptyInternalPath)
        } else if tree.is_dir(internal_path) {
            Err(ValidationError::NotAFile(internal_path.to_string()))
        } else if !tree.is_file(internal_path) {
            Err(ValidationError::NotFound(internal_path.to_string()))
        } else {
            Ok(())
        };
        reject_invalid(checked)?;

        let source_path = match picker.pick_file(PickPurpose::ReplaceContent) {
            Some(path) => path,
            None => {
                log::debug!("replace of '{}' cancelled in picker", internal_path);
                return Ok(None);
            }
        };
        self.submit(Task::ReplaceEntry(ReplaceRequest::new(internal_path, source_path)))
            .map(Some)
    }

    pub fn add_recursive(&mut self, base_internal_path: &str, source_dir: &Path) -> Result<RequestId, DispatchError> {
        if source_dir.as_os_str().is_empty() {
            reject_invalid(Err(ValidationError::EmptySourcePath))?;
        }
        self.submit(Task::AddEntriesRecursively(AddRecursiveRequest {
            internal_path: path_set::normalize(base_internal_path),
            source_dir: source_dir.to_path_buf(),
        }))
    }

    /// Add a picked file into `directory`, keeping its file name
    pub fn add_to_directory(
        &mut self,
        tree: &TreeState,
        directory: &str,
        picker: &dyn FilePicker,
    ) -> Result<Option<RequestId>, DispatchError> {
        if !tree.is_dir(directory) {
            reject_invalid(Err(ValidationError::NotADirectory(directory.to_string())))?;
        }

        let source_path = match picker.pick_file(PickPurpose::AddToDirectory) {
            Some(path) => path,
            None => return Ok(None),
        };
        let file_name = source_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let internal_path = path_set::join(directory, &file_name);
        self.add(tree, &internal_path, &source_path, false).map(Some)
    }

    /// Open a dropped file. Duplicate drop signals hit the guard and are
    /// suppressed.
    pub fn open_dropped(&mut self, path: &Path) -> Result<RequestId, DispatchError> {
        if path.as_os_str().is_empty() {
            reject_invalid(Err(ValidationError::EmptySourcePath))?;
        }
        self.submit(Task::OpenPath { path: path.to_path_buf() })
    }
}

fn reject_invalid(checked: Result<(), ValidationError>) -> Result<(), DispatchError> {
    checked.map_err(|e| {
        log::warn!("🚫 request rejected before dispatch: {}", e);
        DispatchError::Validation(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogs::QueuedPicker;
    use crate::path_set::PathSet;
    use assert_matches::assert_matches;
    use std::path::PathBuf;
    use std::time::Duration;

    fn setup() -> (MutationDispatcher, mpsc::UnboundedReceiver<TaskEnvelope>, TreeState) {
        let (tx, rx) = mpsc::unbounded_channel();
        let guard = SingleFlight::new(Duration::from_millis(700), Duration::from_secs(10));
        let mut tree = TreeState::new();
        tree.replace_path_set(PathSet::from_paths(["a/b.txt", "a/c.txt", "d.txt", "x/y"]));
        (MutationDispatcher::new(tx, guard), rx, tree)
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_existing_without_overwrite_is_rejected() {
        let (mut dispatcher, mut rx, tree) = setup();
        let result = dispatcher.add(&tree, "x/y", Path::new("/tmp/y"), false);
        assert_matches!(result, Err(DispatchError::Validation(ValidationError::MissingExtension(_))));

        let result = dispatcher.add(&tree, "a/b.txt", Path::new("/tmp/b.txt"), false);
        assert_eq!(
            result,
            Err(DispatchError::Validation(ValidationError::TargetExists("a/b.txt".into())))
        );
        assert!(rx.try_recv().is_err());
        assert!(dispatcher.guard().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_with_overwrite_is_sent() {
        let (mut dispatcher, mut rx, tree) = setup();
        let id = dispatcher.add(&tree, "a\\b.txt", Path::new("/tmp/b.txt"), true).unwrap();

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.id, id);
        assert!(envelope.token.is_some());
        assert_matches!(envelope.task, Task::AddEntry(request) if request.internal_path == "a/b.txt" && request.overwrite);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_validation_messages() {
        let (mut dispatcher, _rx, tree) = setup();
        assert_eq!(
            dispatcher.add(&tree, "", Path::new("/tmp/b.txt"), false),
            Err(DispatchError::Validation(ValidationError::EmptyInternalPath))
        );
        assert_eq!(
            dispatcher.add(&tree, "new.txt", Path::new(""), false),
            Err(DispatchError::Validation(ValidationError::EmptySourcePath))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_mutation_while_in_flight_is_busy() {
        let (mut dispatcher, mut rx, _tree) = setup();
        assert!(dispatcher.remove("a").is_ok());
        assert_eq!(dispatcher.remove("d.txt"), Err(DispatchError::Busy));

        let envelope = rx.try_recv().unwrap();
        assert!(rx.try_recv().is_err());
        dispatcher.complete(envelope.token.unwrap());

        tokio::time::sleep(Duration::from_millis(701)).await;
        assert!(dispatcher.remove("d.txt").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unguarded_tasks_ignore_guard() {
        let (mut dispatcher, mut rx, _tree) = setup();
        dispatcher.remove("a").unwrap();
        let id = dispatcher.submit(Task::SearchEntries { query: "foo".into() }).unwrap();
        assert_eq!(id, 2);
        rx.try_recv().unwrap();
        assert!(rx.try_recv().unwrap().token.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rename_requires_new_name() {
        let (mut dispatcher, mut rx, _tree) = setup();
        assert_eq!(
            dispatcher.rename("d.txt", "  ".trim()),
            Err(DispatchError::Validation(ValidationError::EmptyNewName))
        );
        assert!(rx.try_recv().is_err());

        dispatcher.rename("d.txt", "e/d.txt").unwrap();
        assert_matches!(rx.try_recv().unwrap().task, Task::RenameEntry(r) if r.new_internal_path == "e/d.txt");
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_cancelled_picker_sends_nothing() {
        let (mut dispatcher, mut rx, tree) = setup();
        let picker = QueuedPicker::new();
        picker.push(None);

        assert_eq!(dispatcher.replace_content(&tree, "d.txt", &picker), Ok(None));
        assert!(rx.try_recv().is_err());
        assert!(dispatcher.guard().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_requires_existing_file() {
        let (mut dispatcher, _rx, tree) = setup();
        let picker = QueuedPicker::new();
        assert_eq!(
            dispatcher.replace_content(&tree, "a", &picker),
            Err(DispatchError::Validation(ValidationError::NotAFile("a".into())))
        );
        assert_eq!(
            dispatcher.replace_content(&tree, "zzz.txt", &picker),
            Err(DispatchError::Validation(ValidationError::NotFound("zzz.txt".into())))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_sends_overwrite() {
        let (mut dispatcher, mut rx, tree) = setup();
        let picker = QueuedPicker::new();
        picker.push(Some(PathBuf::from("/tmp/new.txt")));

        assert!(dispatcher.replace_content(&tree, "d.txt", &picker).unwrap().is_some());
        assert_matches!(
            rx.try_recv().unwrap().task,
            Task::ReplaceEntry(r) if r.overwrite && r.source_path == PathBuf::from("/tmp/new.txt")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_to_directory_uses_file_name() {
        let (mut dispatcher, mut rx, tree) = setup();
        let picker = QueuedPicker::new();
        picker.push(Some(PathBuf::from("/some/where/new.bin")));

        dispatcher.add_to_directory(&tree, "a", &picker).unwrap();
        assert_matches!(
            rx.try_recv().unwrap().task,
            Task::AddEntry(r) if r.internal_path == "a/new.bin" && !r.overwrite
        );

        assert_eq!(
            dispatcher.add_to_directory(&tree, "d.txt", &picker),
            Err(DispatchError::Validation(ValidationError::NotADirectory("d.txt".into())))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_releases_guard() {
        let (mut dispatcher, rx, _tree) = setup();
        drop(rx);
        assert_eq!(dispatcher.remove("a"), Err(DispatchError::ChannelClosed));
        assert!(dispatcher.guard().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_drops_are_suppressed() {
        let (mut dispatcher, mut rx, _tree) = setup();
        assert!(dispatcher.open_dropped(Path::new("/tmp/a.pack")).is_ok());
        assert_eq!(dispatcher.open_dropped(Path::new("/tmp/a.pack")), Err(DispatchError::Busy));
        assert_matches!(rx.try_recv().unwrap().task, Task::OpenPath { .. });
        assert!(rx.try_recv().is_err());
    }
}
