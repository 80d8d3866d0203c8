//! Comparison sessions.
//!
//! Four request shapes are funnelled into one `CompareDataset`. A response
//! goes through the same steps whatever its mode: error statuses stop it,
//! identical documents stop it, everything else is normalised and published
//! together with a fresh `DiffNavigator`.

use crate::async_task::{RequestId, Task};
use crate::config::CompareConfig;
use crate::diff_ranges::{compute_ranges, DiffNavigator};
use crate::error::ValidationError;
use crate::remote::{is_error_status, CompareResponse, CompareSide};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const IDENTICAL_STATUS: &str = "Files are identical! Skipping comparison.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareMode {
    /// An archive entry against its reference counterpart
    InternalVsReference { internal_path: String },
    /// The editor buffer against the reference of the open document
    LiveBufferVsReference { buffer: String },
    /// Two files picked from disk
    DiskVsDisk,
    /// The editor buffer against a file picked from disk
    LiveBufferVsDisk { buffer: String },
}

impl CompareMode {
    pub fn live_buffer(&self) -> Option<&str> {
        match self {
            CompareMode::LiveBufferVsReference { buffer } | CompareMode::LiveBufferVsDisk { buffer } => Some(buffer),
            _ => None,
        }
    }

    pub fn is_tied_to_live_editor(&self) -> bool {
        self.live_buffer().is_some()
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompareMode::InternalVsReference { .. } => "internal-vs-reference",
            CompareMode::LiveBufferVsReference { .. } => "buffer-vs-reference",
            CompareMode::DiskVsDisk => "disk-vs-disk",
            CompareMode::LiveBufferVsDisk { .. } => "buffer-vs-disk",
        }
    }
}

/// Two normalised documents ready for a diff viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareDataset {
    pub content1: String,
    pub content2: String,
    pub label1: String,
    pub label2: String,
    pub filepath1: String,
    pub filepath2: String,
    pub is_internal: bool,
    pub is_tied_to_live_editor: bool,
    pub language: String,
    pub is_small_pair: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareOutcome {
    /// Nothing came back; state is untouched
    Cancelled,
    Failed { status: String },
    Identical { status: String },
    Published { status: String, ranges: usize },
}

impl CompareOutcome {
    pub fn status(&self) -> Option<&str> {
        match self {
            CompareOutcome::Cancelled => None,
            CompareOutcome::Failed { status }
            | CompareOutcome::Identical { status }
            | CompareOutcome::Published { status, .. } => Some(status),
        }
    }
}

#[derive(Debug, Default)]
pub struct CompareEngine {
    config: CompareConfig,
    dataset: Option<CompareDataset>,
    navigator: DiffNavigator,
    pending: HashMap<RequestId, CompareMode>,
}

impl CompareEngine {
    pub fn new(config: CompareConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Validate `mode` and turn it into an engine task
    pub fn prepare(&self, mode: &CompareMode) -> Result<Task, ValidationError> {
        if let Some(buffer) = mode.live_buffer() {
            if buffer.is_empty() {
                return Err(ValidationError::EmptyBuffer);
            }
            if buffer.len() > self.config.max_buffer_size {
                return Err(ValidationError::buffer_too_large(buffer.len(), self.config.max_buffer_size));
            }
        }

        Ok(match mode {
            CompareMode::InternalVsReference { internal_path } => {
                if internal_path.is_empty() {
                    return Err(ValidationError::NothingToCompare);
                }
                Task::CompareEntryWithReference {
                    internal_path: internal_path.clone(),
                    from_archive: true,
                }
            }
            CompareMode::LiveBufferVsReference { .. } => Task::CompareEntryWithReference {
                internal_path: String::new(),
                from_archive: false,
            },
            CompareMode::DiskVsDisk => Task::CompareArbitraryFiles { from_disk: true },
            CompareMode::LiveBufferVsDisk { .. } => Task::CompareArbitraryFiles { from_disk: false },
        })
    }

    /// Remember which mode request `id` was sent for
    pub fn begin(&mut self, id: RequestId, mode: CompareMode) {
        log::info!("🔀 compare request {} ({})", id, mode.name());
        self.pending.insert(id, mode);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Process the answer to request `id`
    pub fn apply(&mut self, id: RequestId, response: Option<CompareResponse>) -> CompareOutcome {
        let mode = match self.pending.remove(&id) {
            Some(mode) => mode,
            None => {
                log::warn!("compare answer {} has no pending request, ignored", id);
                return CompareOutcome::Cancelled;
            }
        };
        let response = match response {
            Some(response) => response,
            None => {
                log::debug!("compare request {} returned nothing", id);
                return CompareOutcome::Cancelled;
            }
        };

        if is_error_status(&response.status_text) {
            log::error!("❌ compare failed: {}", response.status_text);
            return CompareOutcome::Failed {
                status: response.status_text,
            };
        }
        let pair = match response.compare_data {
            Some(pair) => pair,
            None => {
                return CompareOutcome::Failed {
                    status: response.status_text,
                }
            }
        };

        let content1 = match mode.live_buffer() {
            Some(buffer) => buffer.to_string(),
            None => pair.file1.text.clone().unwrap_or_default(),
        };
        let content2 = pair.file2.text.clone().unwrap_or_default();
        if content1 == content2 {
            log::info!("compare request {}: documents are identical", id);
            return CompareOutcome::Identical {
                status: IDENTICAL_STATUS.to_string(),
            };
        }

        let (label1, filepath1) = label_and_path(&pair.file1);
        let (label2, filepath2) = label_and_path(&pair.file2);
        let threshold = self.config.small_pair_threshold;
        let is_small_pair = content1.len() < threshold && content2.len() < threshold;

        let deadline = (!is_small_pair).then(|| self.config.large_diff_timeout());
        let ranges = compute_ranges(&content1, &content2, deadline);
        let total = ranges.len();
        self.navigator = DiffNavigator::new(ranges, self.config.wrap_backward);

        self.dataset = Some(CompareDataset {
            content1,
            content2,
            label1,
            label2,
            filepath1,
            filepath2,
            is_internal: pair.file1.is_internal,
            is_tied_to_live_editor: mode.is_tied_to_live_editor(),
            language: response
                .language
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| self.config.default_language.clone()),
            is_small_pair,
            title: response.file_label.map(|label| normalize_path(&label)),
        });
        log::info!("🔀 compare request {} published with {} ranges", id, total);

        CompareOutcome::Published {
            status: response.status_text,
            ranges: total,
        }
    }

    pub fn clear(&mut self) {
        self.dataset = None;
        self.navigator = DiffNavigator::default();
    }

    pub fn dataset(&self) -> Option<&CompareDataset> {
        self.dataset.as_ref()
    }

    pub fn navigator(&self) -> &DiffNavigator {
        &self.navigator
    }

    pub fn next_difference(&mut self) -> Option<usize> {
        self.navigator.next()
    }

    pub fn previous_difference(&mut self) -> Option<usize> {
        self.navigator.previous()
    }
}

fn label_and_path(side: &CompareSide) -> (String, String) {
    let path = normalize_path(&side.full_path);
    let label = if side.label.is_empty() { path.clone() } else { side.label.clone() };
    (label, path)
}

fn normalize_path(path: &str) -> String {
    let mut out = path.replace('\\', "/");
    while out.contains("//") {
        out = out.replace("//", "/");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ComparePair;
    use assert_matches::assert_matches;

    fn side(text: &str, label: &str, full_path: &str, is_internal: bool) -> CompareSide {
        CompareSide {
            text: Some(text.to_string()),
            label: label.to_string(),
            full_path: full_path.to_string(),
            is_internal,
        }
    }

    fn response(file1: CompareSide, file2: CompareSide) -> Option<CompareResponse> {
        Some(CompareResponse {
            status_text: "Compared".into(),
            compare_data: Some(ComparePair { file1, file2 }),
            language: None,
            file_label: None,
        })
    }

    #[test]
    fn test_prepare_validations() {
        let engine = CompareEngine::new(CompareConfig {
            max_buffer_size: 4,
            ..CompareConfig::default()
        });
        assert_eq!(
            engine.prepare(&CompareMode::InternalVsReference { internal_path: String::new() }),
            Err(ValidationError::NothingToCompare)
        );
        assert_eq!(
            engine.prepare(&CompareMode::LiveBufferVsDisk { buffer: String::new() }),
            Err(ValidationError::EmptyBuffer)
        );
        assert_matches!(
            engine.prepare(&CompareMode::LiveBufferVsReference { buffer: "12345".into() }),
            Err(ValidationError::BufferTooLarge { .. })
        );
    }

    #[test]
    fn test_prepare_task_mapping() {
        let engine = CompareEngine::default();
        assert_eq!(
            engine.prepare(&CompareMode::InternalVsReference { internal_path: "a/b.txt".into() }),
            Ok(Task::CompareEntryWithReference {
                internal_path: "a/b.txt".into(),
                from_archive: true
            })
        );
        assert_eq!(
            engine.prepare(&CompareMode::LiveBufferVsReference { buffer: "x".into() }),
            Ok(Task::CompareEntryWithReference {
                internal_path: String::new(),
                from_archive: false
            })
        );
        assert_eq!(engine.prepare(&CompareMode::DiskVsDisk), Ok(Task::CompareArbitraryFiles { from_disk: true }));
        assert_eq!(
            engine.prepare(&CompareMode::LiveBufferVsDisk { buffer: "x".into() }),
            Ok(Task::CompareArbitraryFiles { from_disk: false })
        );
    }

    #[test]
    fn test_identical_documents_short_circuit() {
        let mut engine = CompareEngine::new(CompareConfig::default());
        engine.begin(1, CompareMode::InternalVsReference { internal_path: "a.txt".into() });
        let outcome = engine.apply(1, response(side("same\n", "", "a.txt", true), side("same\n", "", "ref/a.txt", false)));

        assert_eq!(outcome, CompareOutcome::Identical { status: IDENTICAL_STATUS.into() });
        assert!(engine.dataset().is_none());
    }

    #[test]
    fn test_error_status_stops_processing() {
        let mut engine = CompareEngine::default();
        engine.begin(1, CompareMode::DiskVsDisk);
        let outcome = engine.apply(
            1,
            Some(CompareResponse {
                status_text: "Error: no reference".into(),
                compare_data: Some(ComparePair::default()),
                language: None,
                file_label: None,
            }),
        );
        assert_matches!(outcome, CompareOutcome::Failed { .. });
        assert!(engine.dataset().is_none());
    }

    #[test]
    fn test_null_response_is_cancelled() {
        let mut engine = CompareEngine::default();
        engine.begin(4, CompareMode::DiskVsDisk);
        assert_eq!(engine.apply(4, None), CompareOutcome::Cancelled);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn test_published_dataset_normalisation() {
        let mut engine = CompareEngine::new(CompareConfig::default());
        engine.begin(2, CompareMode::InternalVsReference { internal_path: "a/b.txt".into() });
        let outcome = engine.apply(
            2,
            response(
                side("one\ntwo\n", "", "Pack\\a//b.txt", true),
                side("one\nTWO\n", "Reference", "ref\\a\\b.txt", false),
            ),
        );

        assert_eq!(outcome, CompareOutcome::Published { status: "Compared".into(), ranges: 1 });
        let dataset = engine.dataset().unwrap();
        assert_eq!(dataset.label1, "Pack/a/b.txt");
        assert_eq!(dataset.filepath1, "Pack/a/b.txt");
        assert_eq!(dataset.label2, "Reference");
        assert_eq!(dataset.filepath2, "ref/a/b.txt");
        assert!(dataset.is_internal);
        assert!(!dataset.is_tied_to_live_editor);
        assert!(dataset.is_small_pair);
        assert_eq!(dataset.language, "yaml");
        assert_eq!(engine.navigator().total(), 1);
    }

    #[test]
    fn test_live_buffer_is_document_one() {
        let mut engine = CompareEngine::default();
        engine.begin(3, CompareMode::LiveBufferVsDisk { buffer: "edited\n".into() });
        let mut file1 = side("", "", "", false);
        file1.text = None;
        engine.apply(3, response(file1, side("original\n", "", "/disk/x.txt", false)));

        let dataset = engine.dataset().unwrap();
        assert_eq!(dataset.content1, "edited\n");
        assert!(dataset.is_tied_to_live_editor);
    }

    #[test]
    fn test_small_pair_threshold_is_strict() {
        let mut engine = CompareEngine::new(CompareConfig {
            small_pair_threshold: 4,
            ..CompareConfig::default()
        });
        engine.begin(1, CompareMode::DiskVsDisk);
        engine.apply(1, response(side("abc", "", "l", false), side("abcd", "", "r", false)));
        assert!(!engine.dataset().unwrap().is_small_pair);
    }

    #[test]
    fn test_navigation_and_clear() {
        let mut engine = CompareEngine::default();
        engine.begin(1, CompareMode::DiskVsDisk);
        engine.apply(
            1,
            response(side("a\nb\nc\nd\n", "", "l", false), side("A\nb\nc\nD\n", "", "r", false)),
        );
        assert_eq!(engine.navigator().total(), 2);
        assert_eq!(engine.previous_difference(), Some(0));
        assert_eq!(engine.next_difference(), Some(1));
        assert_eq!(engine.next_difference(), Some(0));

        engine.clear();
        assert!(engine.dataset().is_none());
        assert_eq!(engine.next_difference(), None);
    }

    #[test]
    fn test_language_and_title_from_response() {
        let mut engine = CompareEngine::default();
        engine.begin(1, CompareMode::DiskVsDisk);
        engine.apply(
            1,
            Some(CompareResponse {
                status_text: "ok".into(),
                compare_data: Some(ComparePair {
                    file1: side("x", "", "l", false),
                    file2: side("y", "", "r", false),
                }),
                language: Some("json".into()),
                file_label: Some("l//r".into()),
            }),
        );
        let dataset = engine.dataset().unwrap();
        assert_eq!(dataset.language, "json");
        assert_eq!(dataset.title.as_deref(), Some("l/r"));
    }
}
