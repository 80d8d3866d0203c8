//! An `ArchiveEngine` that treats a directory as the archive.
//!
//! Entries are read into memory on open and mutated there until the archive
//! is saved back. An optional reference directory plays the unmodified
//! counterpart; without one the archive as opened is the baseline.

use crate::dialogs::{FilePicker, PickPurpose};
use crate::path_set::{self, ArchivePath, PathSet};
use crate::remote::{
    AddRecursiveRequest, AddRequest, ArchiveEngine, CloseResponse, ComparePair, CompareResponse, CompareSide,
    DocumentKind, EngineError, EngineResult, OpenResponse, OpenedKind, PathSetResponse, RemoveRequest,
    RenameRequest, ReplaceRequest, SaveRequest, StatusResponse,
};
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
pub struct LocalEngineConfig {
    /// Directory holding the unmodified counterparts of the entries
    pub reference_dir: Option<PathBuf>,
    /// Where extracted entries go; defaults to `<archive>_extracted` next to it
    pub extract_dir: Option<PathBuf>,
}

#[derive(Debug)]
struct OpenedArchive {
    root: PathBuf,
    label: String,
    entries: BTreeMap<ArchivePath, Vec<u8>>,
    baseline: BTreeMap<ArchivePath, Vec<u8>>,
    /// Keys present under `root` as of the last open or save
    on_disk: BTreeSet<ArchivePath>,
    search_hits: Option<BTreeSet<ArchivePath>>,
}

impl OpenedArchive {
    fn listing(&self) -> PathSet {
        let visible = |path: &&ArchivePath| self.search_hits.as_ref().map_or(true, |hits| hits.contains(*path));
        let paths: Vec<ArchivePath> = self.entries.keys().filter(visible).cloned().collect();
        let added_paths = paths
            .iter()
            .filter(|p| !self.baseline.contains_key(*p))
            .cloned()
            .collect();
        let modified_paths = paths
            .iter()
            .filter(|p| matches!(self.baseline.get(*p), Some(base) if Some(base) != self.entries.get(*p)))
            .cloned()
            .collect();
        PathSet::new(paths, added_paths, modified_paths)
    }

    /// Entry keys equal to `path` or below it
    fn keys_under(&self, path: &str) -> Vec<ArchivePath> {
        let prefix = format!("{}/", path);
        self.entries
            .keys()
            .filter(|k| k.as_str() == path || k.starts_with(&prefix))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone)]
enum OpenedDocument {
    Entry { internal_path: ArchivePath },
    Disk { path: PathBuf },
}

#[derive(Debug, Default)]
struct EngineState {
    archive: Option<OpenedArchive>,
    document: Option<OpenedDocument>,
}

pub struct LocalEngine {
    state: Mutex<EngineState>,
    picker: Arc<dyn FilePicker>,
    config: LocalEngineConfig,
}

impl LocalEngine {
    pub fn new(config: LocalEngineConfig, picker: Arc<dyn FilePicker>) -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            picker,
            config,
        }
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_directory(&self, root: &Path) -> EngineResult<OpenResponse> {
        let entries = read_entries(root)?;
        let baseline = match &self.config.reference_dir {
            Some(reference) => read_entries(reference)?,
            None => entries.clone(),
        };
        let label = label_of(root);
        let archive = OpenedArchive {
            root: root.to_path_buf(),
            label: label.clone(),
            on_disk: entries.keys().cloned().collect(),
            entries,
            baseline,
            search_hits: None,
        };
        let path_set = archive.listing();
        log::info!("📦 LocalEngine: opened {} with {} entries", root.display(), path_set.len());

        let mut state = self.state();
        state.archive = Some(archive);
        state.document = None;
        Ok(OpenResponse {
            status_text: format!("Opened archive {} ({} entries)", label, path_set.len()),
            kind: OpenedKind::Archive,
            label,
            path_set: Some(path_set),
            text: Some(String::new()),
            language: None,
        })
    }

    fn open_disk_document(&self, path: &Path) -> EngineResult<OpenResponse> {
        let bytes = fs::read(path)?;
        let label = path.display().to_string();
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => return Ok(unsupported(label)),
        };
        self.state().document = Some(OpenedDocument::Disk { path: path.to_path_buf() });
        Ok(OpenResponse {
            status_text: format!("Opened file: {}", label),
            kind: OpenedKind::Document,
            language: Some(language_for(&label).to_string()),
            label,
            path_set: None,
            text: Some(text),
        })
    }

    fn mutate<F>(&self, apply: F) -> EngineResult<Option<PathSetResponse>>
    where
        F: FnOnce(&mut OpenedArchive) -> EngineResult<String>,
    {
        let mut state = self.state();
        let archive = match state.archive.as_mut() {
            Some(archive) => archive,
            None => return Ok(None),
        };
        let status_text = apply(archive)?;
        archive.search_hits = None;
        Ok(Some(PathSetResponse {
            status_text,
            path_set: archive.listing(),
        }))
    }

    fn current_listing(&self) -> PathSet {
        self.state().archive.as_ref().map(OpenedArchive::listing).unwrap_or_default()
    }

    /// Text of the reference counterpart of `internal_path`
    fn reference_side(&self, archive: &OpenedArchive, internal_path: &str) -> Result<CompareSide, String> {
        let (bytes, full_path) = match &self.config.reference_dir {
            Some(dir) => {
                let path = host_path(dir, internal_path).map_err(|e| format!("Error: {}", e))?;
                let bytes = fs::read(&path).map_err(|_| format!("Error: no reference for {}", internal_path))?;
                (bytes, path.display().to_string())
            }
            None => {
                let bytes = archive
                    .baseline
                    .get(internal_path)
                    .cloned()
                    .ok_or_else(|| format!("Error: no reference for {}", internal_path))?;
                (bytes, format!("{}/{}", archive.root.display(), internal_path))
            }
        };
        let text = String::from_utf8(bytes).map_err(|_| format!("Error: {} is not a text file", internal_path))?;
        Ok(CompareSide {
            text: Some(text),
            label: "Reference".to_string(),
            full_path,
            is_internal: false,
        })
    }

    /// Write every entry below `root` and make it the archive's home.
    ///
    /// Files removed since the last open or save are deleted when `root`
    /// is the directory they were read from.
    fn write_archive(&self, archive: &mut OpenedArchive, root: &Path) -> EngineResult<String> {
        let previous = if root == archive.root {
            archive.on_disk.clone()
        } else {
            BTreeSet::new()
        };
        write_entries(root, &archive.entries, &previous)?;
        archive.root = root.to_path_buf();
        archive.on_disk = archive.entries.keys().cloned().collect();
        if self.config.reference_dir.is_none() {
            archive.baseline = archive.entries.clone();
        }
        Ok(format!("Saved {} entries to {}", archive.entries.len(), root.display()))
    }
}

#[async_trait]
impl ArchiveEngine for LocalEngine {
    async fn open_archive_or_file(&self) -> EngineResult<OpenResponse> {
        match self.picker.pick_file(PickPurpose::OpenArchive) {
            Some(path) => self.open_path(path).await,
            None => Ok(OpenResponse {
                status_text: "No file selected".to_string(),
                kind: OpenedKind::Error,
                label: String::new(),
                path_set: None,
                text: None,
                language: None,
            }),
        }
    }

    async fn open_path(&self, path: PathBuf) -> EngineResult<OpenResponse> {
        if path.is_dir() {
            self.open_directory(&path)
        } else {
            self.open_disk_document(&path)
        }
    }

    async fn open_internal_entry(&self, internal_path: ArchivePath) -> EngineResult<Option<OpenResponse>> {
        let mut state = self.state();
        let bytes = match state.archive.as_ref().and_then(|a| a.entries.get(&internal_path)) {
            Some(bytes) => bytes.clone(),
            None => return Ok(None),
        };
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => return Ok(Some(unsupported(internal_path))),
        };
        state.document = Some(OpenedDocument::Entry {
            internal_path: internal_path.clone(),
        });
        Ok(Some(OpenResponse {
            status_text: format!("Opened file: {}", internal_path),
            kind: OpenedKind::Document,
            language: Some(language_for(&internal_path).to_string()),
            label: internal_path,
            path_set: None,
            text: Some(text),
        }))
    }

    async fn add_entry(&self, request: AddRequest) -> EngineResult<Option<PathSetResponse>> {
        let bytes = match fs::read(&request.source_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(Some(PathSetResponse {
                    status_text: format!("Error: cannot read {}: {}", request.source_path.display(), e),
                    path_set: self.current_listing(),
                }))
            }
        };
        self.mutate(|archive| {
            if path_set::escapes_root(&request.internal_path) {
                return Ok(format!("Error: invalid internal path {}", request.internal_path));
            }
            if !request.overwrite && archive.entries.contains_key(&request.internal_path) {
                return Ok(format!("Error: {} already exists", request.internal_path));
            }
            archive.entries.insert(request.internal_path.clone(), bytes);
            Ok(format!("Added {}", request.internal_path))
        })
    }

    async fn rename_entry(&self, request: RenameRequest) -> EngineResult<Option<PathSetResponse>> {
        self.mutate(|archive| {
            if path_set::escapes_root(&request.new_internal_path) {
                return Ok(format!("Error: invalid internal path {}", request.new_internal_path));
            }
            let moved = archive.keys_under(&request.internal_path);
            if moved.is_empty() {
                return Ok(format!("Error: {} not found", request.internal_path));
            }
            for old in moved {
                let suffix = &old[request.internal_path.len()..];
                let new = format!("{}{}", request.new_internal_path, suffix);
                if let Some(bytes) = archive.entries.remove(&old) {
                    archive.entries.insert(new, bytes);
                }
            }
            Ok(format!("Renamed {} to {}", request.internal_path, request.new_internal_path))
        })
    }

    async fn remove_entry(&self, request: RemoveRequest) -> EngineResult<Option<PathSetResponse>> {
        self.mutate(|archive| {
            let removed = archive.keys_under(&request.internal_path);
            for key in &removed {
                archive.entries.remove(key);
            }
            Ok(format!("Removed {} ({} entries)", request.internal_path, removed.len()))
        })
    }

    async fn replace_entry(&self, request: ReplaceRequest) -> EngineResult<Option<PathSetResponse>> {
        self.add_entry(AddRequest {
            internal_path: request.internal_path,
            source_path: request.source_path,
            overwrite: true,
        })
        .await
    }

    async fn add_entries_recursively(&self, request: AddRecursiveRequest) -> EngineResult<Option<PathSetResponse>> {
        let files = read_entries(&request.source_dir)?;
        self.mutate(|archive| {
            let count = files.len();
            for (relative, bytes) in files {
                archive
                    .entries
                    .insert(path_set::normalize(&path_set::join(&request.internal_path, &relative)), bytes);
            }
            Ok(format!("Added {} files from {}", count, request.source_dir.display()))
        })
    }

    async fn extract_entry(&self, internal_path: ArchivePath) -> EngineResult<StatusResponse> {
        let state = self.state();
        let archive = match state.archive.as_ref() {
            Some(archive) => archive,
            None => {
                return Ok(StatusResponse {
                    status_text: "Error: no archive opened".to_string(),
                })
            }
        };
        let bytes = match archive.entries.get(&internal_path) {
            Some(bytes) => bytes,
            None => {
                return Ok(StatusResponse {
                    status_text: format!("Error: {} not found", internal_path),
                })
            }
        };
        let target_dir = self.config.extract_dir.clone().unwrap_or_else(|| {
            let mut name = archive.root.as_os_str().to_owned();
            name.push("_extracted");
            PathBuf::from(name)
        });
        let target = match host_path(&target_dir, &internal_path) {
            Ok(target) => target,
            Err(e) => {
                return Ok(StatusResponse {
                    status_text: format!("Error: {}", e),
                })
            }
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes)?;
        Ok(StatusResponse {
            status_text: format!("Extracted {} to {}", internal_path, target.display()),
        })
    }

    async fn search_entries(&self, query: String) -> EngineResult<PathSetResponse> {
        let mut state = self.state();
        let archive = match state.archive.as_mut() {
            Some(archive) => archive,
            None => {
                return Ok(PathSetResponse {
                    status_text: "Error: no archive opened".to_string(),
                    path_set: PathSet::default(),
                })
            }
        };
        let needle = query.to_lowercase();
        let hits: BTreeSet<ArchivePath> = archive
            .entries
            .iter()
            .filter(|(_, bytes)| String::from_utf8_lossy(bytes).to_lowercase().contains(&needle))
            .map(|(path, _)| path.clone())
            .collect();
        if hits.is_empty() {
            return Ok(PathSetResponse {
                status_text: format!("No matches found: {}", query),
                path_set: PathSet::default(),
            });
        }
        let count = hits.len();
        archive.search_hits = Some(hits);
        Ok(PathSetResponse {
            status_text: format!("Found {} entries containing '{}'", count, query),
            path_set: archive.listing(),
        })
    }

    async fn clear_entry_search(&self) -> EngineResult<PathSetResponse> {
        let mut state = self.state();
        let path_set = match state.archive.as_mut() {
            Some(archive) => {
                archive.search_hits = None;
                archive.listing()
            }
            None => PathSet::default(),
        };
        Ok(PathSetResponse {
            status_text: "Search cleared".to_string(),
            path_set,
        })
    }

    async fn compare_entry_with_reference(
        &self,
        internal_path: ArchivePath,
        from_archive: bool,
    ) -> EngineResult<Option<CompareResponse>> {
        let state = self.state();
        let archive = match state.archive.as_ref() {
            Some(archive) => archive,
            None => return Ok(Some(error_compare("Error: no archive opened"))),
        };

        let internal_path = if from_archive {
            internal_path
        } else {
            match &state.document {
                Some(OpenedDocument::Entry { internal_path }) => internal_path.clone(),
                _ => return Ok(Some(error_compare("Error: the open document is not an archive entry"))),
            }
        };

        let file1_text = if from_archive {
            match archive.entries.get(&internal_path).map(|b| String::from_utf8(b.clone())) {
                Some(Ok(text)) => Some(text),
                Some(Err(_)) => {
                    return Ok(Some(error_compare(&format!("Error: {} is not a text file", internal_path))))
                }
                None => return Ok(Some(error_compare(&format!("Error: {} not found", internal_path)))),
            }
        } else {
            None
        };

        let file2 = match self.reference_side(archive, &internal_path) {
            Ok(side) => side,
            Err(status) => return Ok(Some(error_compare(&status))),
        };
        let file1 = CompareSide {
            text: file1_text,
            label: String::new(),
            full_path: format!("{}/{}", archive.label, internal_path),
            is_internal: true,
        };
        Ok(Some(CompareResponse {
            status_text: format!("Comparing {} with reference", internal_path),
            file_label: Some(format!("{} vs {}", file1.full_path, file2.full_path)),
            compare_data: Some(ComparePair { file1, file2 }),
            language: Some(language_for(&internal_path).to_string()),
        }))
    }

    async fn compare_arbitrary_files(&self, from_disk: bool) -> EngineResult<Option<CompareResponse>> {
        let file1 = if from_disk {
            let left = match self.picker.pick_file(PickPurpose::CompareLeft) {
                Some(path) => path,
                None => return Ok(None),
            };
            match read_side(&left) {
                Ok(side) => side,
                Err(status) => return Ok(Some(error_compare(&status))),
            }
        } else {
            let full_path = match &self.state().document {
                Some(OpenedDocument::Disk { path }) => path.display().to_string(),
                Some(OpenedDocument::Entry { internal_path }) => internal_path.clone(),
                None => "editor".to_string(),
            };
            CompareSide {
                text: None,
                label: String::new(),
                full_path,
                is_internal: false,
            }
        };

        let right = match self.picker.pick_file(PickPurpose::CompareRight) {
            Some(path) => path,
            None => return Ok(None),
        };
        let file2 = match read_side(&right) {
            Ok(side) => side,
            Err(status) => return Ok(Some(error_compare(&status))),
        };
        Ok(Some(CompareResponse {
            status_text: format!("Comparing {} with {}", file1.full_path, file2.full_path),
            language: Some(language_for(&file2.full_path).to_string()),
            file_label: Some(format!("{} vs {}", file1.full_path, file2.full_path)),
            compare_data: Some(ComparePair { file1, file2 }),
        }))
    }

    async fn save_document(&self, request: SaveRequest) -> EngineResult<PathSetResponse> {
        let mut state = self.state();
        let status_text = match request.kind {
            DocumentKind::Archive => match state.archive.as_mut() {
                Some(archive) => {
                    let root = archive.root.clone();
                    self.write_archive(archive, &root)?
                }
                None => "Error: no archive opened".to_string(),
            },
            DocumentKind::Document => match state.document.clone() {
                Some(OpenedDocument::Entry { internal_path }) => match state.archive.as_mut() {
                    Some(archive) => {
                        archive.entries.insert(internal_path.clone(), request.text.into_bytes());
                        format!("Saved {} into the archive", internal_path)
                    }
                    None => "Error: no archive opened".to_string(),
                },
                Some(OpenedDocument::Disk { path }) => {
                    fs::write(&path, request.text)?;
                    format!("Saved {}", path.display())
                }
                None => "Error: nothing to save".to_string(),
            },
        };
        let path_set = state.archive.as_ref().map(OpenedArchive::listing).unwrap_or_default();
        Ok(PathSetResponse { status_text, path_set })
    }

    async fn save_document_as(&self, request: SaveRequest) -> EngineResult<Option<PathSetResponse>> {
        let target = match self.picker.pick_file(PickPurpose::SaveAs) {
            Some(target) => target,
            None => return Ok(None),
        };
        let mut state = self.state();
        let status_text = match request.kind {
            DocumentKind::Archive => match state.archive.as_mut() {
                Some(archive) => {
                    let status = self.write_archive(archive, &target)?;
                    archive.label = label_of(&target);
                    status
                }
                None => "Error: no archive opened".to_string(),
            },
            DocumentKind::Document => {
                fs::write(&target, request.text)?;
                state.document = Some(OpenedDocument::Disk { path: target.clone() });
                format!("Saved as {}", target.display())
            }
        };
        log::info!("💾 LocalEngine: {}", status_text);
        let path_set = state.archive.as_ref().map(OpenedArchive::listing).unwrap_or_default();
        Ok(Some(PathSetResponse { status_text, path_set }))
    }

    async fn close_all_documents(&self) -> EngineResult<CloseResponse> {
        let mut state = self.state();
        state.archive = None;
        state.document = None;
        Ok(CloseResponse {
            status_text: "Closed all files".to_string(),
            path_set: PathSet::default(),
            text: String::new(),
            language: None,
        })
    }
}

/// All files below `root` as `/`-separated relative paths
fn read_entries(root: &Path) -> EngineResult<BTreeMap<ArchivePath, Vec<u8>>> {
    if !root.is_dir() {
        return Err(EngineError::Rejected(format!("{} is not a directory", root.display())));
    }
    let walk = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .build();

    let mut entries = BTreeMap::new();
    for result in walk {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Error walking directory: {}", err);
                continue;
            }
        };
        if !entry.file_type().map_or(false, |t| t.is_file()) {
            continue;
        }
        let relative = match entry.path().strip_prefix(root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let key = path_set::normalize(&relative.to_string_lossy());
        entries.insert(key, fs::read(entry.path())?);
    }
    Ok(entries)
}

/// Write `entries` under `root` and delete files of `previous` that are gone
fn write_entries(
    root: &Path,
    entries: &BTreeMap<ArchivePath, Vec<u8>>,
    previous: &BTreeSet<ArchivePath>,
) -> EngineResult<()> {
    for stale in previous.iter().filter(|k| !entries.contains_key(*k)) {
        let path = host_path(root, stale)?;
        if path.is_file() {
            fs::remove_file(path)?;
        }
    }
    for (key, bytes) in entries {
        let path = host_path(root, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
    }
    Ok(())
}

/// `internal_path` below `dir`, refusing paths that would leave it
fn host_path(dir: &Path, internal_path: &str) -> EngineResult<PathBuf> {
    if path_set::escapes_root(internal_path) {
        return Err(EngineError::Rejected(format!("invalid internal path {}", internal_path)));
    }
    Ok(dir.join(path_set::normalize(internal_path)))
}

fn label_of(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root.display().to_string())
}

fn read_side(path: &Path) -> Result<CompareSide, String> {
    let bytes = fs::read(path).map_err(|e| format!("Error: cannot read {}: {}", path.display(), e))?;
    let text = String::from_utf8(bytes).map_err(|_| format!("Error: {} is not a text file", path.display()))?;
    Ok(CompareSide {
        text: Some(text),
        label: String::new(),
        full_path: path.display().to_string(),
        is_internal: false,
    })
}

fn error_compare(status: &str) -> CompareResponse {
    CompareResponse {
        status_text: status.to_string(),
        compare_data: None,
        language: None,
        file_label: None,
    }
}

fn unsupported(label: String) -> OpenResponse {
    OpenResponse {
        status_text: "Unsupported file type".to_string(),
        kind: OpenedKind::Error,
        label,
        path_set: None,
        text: None,
        language: None,
    }
}

/// Editor language for a file name
pub fn language_for(path: &str) -> &'static str {
    let extension = path_set::file_name(path)
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "json" => "json",
        "xml" => "xml",
        "toml" => "toml",
        "rs" => "rust",
        "txt" | "md" | "log" => "plaintext",
        _ => "yaml",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_for() {
        assert_eq!(language_for("a/b.JSON"), "json");
        assert_eq!(language_for("notes.txt"), "plaintext");
        assert_eq!(language_for("Actor/Unit.byml"), "yaml");
        assert_eq!(language_for("dir.d/noext"), "yaml");
    }

    #[test]
    fn test_listing_markers() {
        let mut archive = OpenedArchive {
            root: PathBuf::from("/a"),
            label: "a".into(),
            entries: BTreeMap::new(),
            baseline: BTreeMap::new(),
            on_disk: BTreeSet::new(),
            search_hits: None,
        };
        archive.baseline.insert("same.txt".into(), b"x".to_vec());
        archive.baseline.insert("changed.txt".into(), b"x".to_vec());
        archive.entries.insert("same.txt".into(), b"x".to_vec());
        archive.entries.insert("changed.txt".into(), b"y".to_vec());
        archive.entries.insert("new.txt".into(), b"z".to_vec());

        let listing = archive.listing();
        assert_eq!(listing.paths, vec!["changed.txt", "new.txt", "same.txt"]);
        assert_eq!(listing.added_paths, vec!["new.txt"]);
        assert_eq!(listing.modified_paths, vec!["changed.txt"]);

        archive.search_hits = Some(["new.txt".to_string()].into_iter().collect());
        assert_eq!(archive.listing().paths, vec!["new.txt"]);
    }

    #[test]
    fn test_host_path_stays_below_dir() {
        let dir = Path::new("/out");
        assert_eq!(host_path(dir, "a//b.txt").unwrap(), PathBuf::from("/out/a/b.txt"));
        assert_eq!(host_path(dir, "/abs.txt").unwrap(), PathBuf::from("/out/abs.txt"));
        assert!(host_path(dir, "../etc/passwd").is_err());
        assert!(host_path(dir, "a\\..\\..\\x").is_err());
    }

    #[test]
    fn test_keys_under_respects_segments() {
        let mut archive = OpenedArchive {
            root: PathBuf::from("/a"),
            label: "a".into(),
            entries: BTreeMap::new(),
            baseline: BTreeMap::new(),
            on_disk: BTreeSet::new(),
            search_hits: None,
        };
        for key in ["a/b.txt", "a/c/d.txt", "ab.txt"] {
            archive.entries.insert(key.into(), Vec::new());
        }
        assert_eq!(archive.keys_under("a"), vec!["a/b.txt", "a/c/d.txt"]);
        assert_eq!(archive.keys_under("ab.txt"), vec!["ab.txt"]);
    }
}
