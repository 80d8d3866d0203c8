//! Request/response contract of the archive engine.
//!
//! The engine owns the archive. Every call that changes or filters the
//! listing answers with a complete `PathSet`; a `None` answer means the
//! user cancelled or nothing happened.

use crate::path_set::{ArchivePath, PathSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// A call the engine refused outright, as opposed to an error status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("io failure: {0}")]
    Io(String),
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::Io(error.to_string())
    }
}

/// Responses signal failure in-band with an `error:` prefixed status
pub fn is_error_status(status_text: &str) -> bool {
    status_text.trim_start().to_lowercase().starts_with("error:")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenedKind {
    Archive,
    Document,
    Error,
}

/// What the editor holds when a document is saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Archive,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenResponse {
    pub status_text: String,
    pub kind: OpenedKind,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub path_set: Option<PathSet>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "lang")]
    pub language: Option<String>,
}

/// Answer to every call that ships a new listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSetResponse {
    pub status_text: String,
    #[serde(default)]
    pub path_set: PathSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status_text: String,
}

/// One document of a comparison as the engine resolved it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareSide {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub full_path: String,
    #[serde(default)]
    pub is_internal: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparePair {
    pub file1: CompareSide,
    pub file2: CompareSide,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    pub status_text: String,
    #[serde(default)]
    pub compare_data: Option<ComparePair>,
    #[serde(default, alias = "lang")]
    pub language: Option<String>,
    #[serde(default)]
    pub file_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseResponse {
    pub status_text: String,
    #[serde(default)]
    pub path_set: PathSet,
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "lang")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest {
    pub internal_path: ArchivePath,
    pub source_path: PathBuf,
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub internal_path: ArchivePath,
    pub new_internal_path: ArchivePath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    pub internal_path: ArchivePath,
}

/// Content replacement always overwrites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceRequest {
    pub internal_path: ArchivePath,
    pub source_path: PathBuf,
    pub overwrite: bool,
}

impl ReplaceRequest {
    pub fn new(internal_path: impl Into<ArchivePath>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            internal_path: internal_path.into(),
            source_path: source_path.into(),
            overwrite: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRecursiveRequest {
    pub internal_path: ArchivePath,
    pub source_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub kind: DocumentKind,
    pub text: String,
}

/// The archive engine as seen from the client.
///
/// Methods mirror the engine's commands one to one. Implementations must be
/// shareable across the request worker's tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArchiveEngine: Send + Sync {
    /// Ask the user for an archive or document and open it
    async fn open_archive_or_file(&self) -> EngineResult<OpenResponse>;

    /// Open a known path, e.g. a dropped file
    async fn open_path(&self, path: PathBuf) -> EngineResult<OpenResponse>;

    async fn open_internal_entry(&self, internal_path: ArchivePath) -> EngineResult<Option<OpenResponse>>;

    async fn add_entry(&self, request: AddRequest) -> EngineResult<Option<PathSetResponse>>;

    async fn rename_entry(&self, request: RenameRequest) -> EngineResult<Option<PathSetResponse>>;

    async fn remove_entry(&self, request: RemoveRequest) -> EngineResult<Option<PathSetResponse>>;

    async fn replace_entry(&self, request: ReplaceRequest) -> EngineResult<Option<PathSetResponse>>;

    async fn add_entries_recursively(&self, request: AddRecursiveRequest) -> EngineResult<Option<PathSetResponse>>;

    async fn extract_entry(&self, internal_path: ArchivePath) -> EngineResult<StatusResponse>;

    /// Filter the listing by entry content. An empty listing means no match.
    async fn search_entries(&self, query: String) -> EngineResult<PathSetResponse>;

    async fn clear_entry_search(&self) -> EngineResult<PathSetResponse>;

    /// Fetch an entry and its reference counterpart in one round trip.
    ///
    /// With `from_archive` false the engine resolves the counterpart of the
    /// document currently open in the editor and leaves `file1.text` empty.
    async fn compare_entry_with_reference(
        &self,
        internal_path: ArchivePath,
        from_archive: bool,
    ) -> EngineResult<Option<CompareResponse>>;

    /// Let the user pick files to compare. With `from_disk` false only the
    /// right-hand document is picked and the left one is the live buffer.
    async fn compare_arbitrary_files(&self, from_disk: bool) -> EngineResult<Option<CompareResponse>>;

    async fn save_document(&self, request: SaveRequest) -> EngineResult<PathSetResponse>;

    /// Ask the user for a target and save there. `None` when the dialog was
    /// cancelled.
    async fn save_document_as(&self, request: SaveRequest) -> EngineResult<Option<PathSetResponse>>;

    async fn close_all_documents(&self) -> EngineResult<CloseResponse>;
}
