//! Headless script runner
//!
//! A script is a text file with one command per line:
//! - `# comment` lines and blank lines are ignored
//! - `select a/b.txt`, `remove`, `compare`... drive the session
//! - `pick <path>` / `pick cancel` queue the answer of the next file dialog
//! - `settle` waits for every outstanding answer, `wait <ms>` sleeps
//! - `assert <property> <value>` checks the session state
//!
//! Every command that sends a request is settled before the next line runs,
//! so assertions always see the answer applied.
//!
//! ```text
//! open /tmp/pack
//! select a
//! remove
//! assert paths d.txt
//! ```

use crate::async_task::TaskResult;
use crate::command::Command;
use crate::config::Config;
use crate::dialogs::QueuedPicker;
use crate::error::{LensError, Result};
use crate::navigator::{Direction, NavigatorEvent};
use crate::path_set::EntryMarker;
use crate::remote::ArchiveEngine;
use crate::session::{ActiveView, Session};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub line: usize,
    pub command: Command,
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub lines: Vec<ScriptLine>,
}

impl Script {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_string(&content)
    }

    pub fn from_string(content: &str) -> Result<Self> {
        let mut lines = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let command = Command::from_string(line).map_err(|message| LensError::Script {
                line: index + 1,
                message,
            })?;
            lines.push(ScriptLine {
                line: index + 1,
                command,
            });
        }
        Ok(Self { lines })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptReport {
    pub commands_run: usize,
    pub assertions_passed: usize,
    pub assertions_failed: usize,
    pub errors: Vec<String>,
    pub duration: Duration,
}

impl ScriptReport {
    pub fn success(&self) -> bool {
        self.assertions_failed == 0 && self.errors.is_empty()
    }

    pub fn print_summary(&self) {
        println!("🧪 Script results:");
        println!("   Commands run: {}", self.commands_run);
        println!("   Assertions passed: {}", self.assertions_passed);
        println!("   Assertions failed: {}", self.assertions_failed);
        println!("   Duration: {:?}", self.duration);
        for error in &self.errors {
            println!("   ❌ {}", error);
        }
        if self.success() {
            println!("✅ Script passed");
        } else {
            println!("❌ Script failed");
        }
    }
}

/// Drives a session from script commands and settles its requests
pub struct Executor {
    session: Session,
    results: mpsc::UnboundedReceiver<TaskResult>,
    picker: QueuedPicker,
    transcript: String,
    pub max_settle_time: Duration,
}

impl Executor {
    /// Spawn a worker for `engine` and a session on top of it.
    ///
    /// `picker` must be the one the engine answers its own dialogs with, so
    /// `pick` lines reach both.
    pub fn start(engine: Arc<dyn ArchiveEngine>, config: Config, picker: QueuedPicker) -> Self {
        let (session, results) = Session::connect(engine, config, Arc::new(picker.clone()));
        Self {
            session,
            results,
            picker,
            transcript: String::new(),
            max_settle_time: Duration::from_secs(5),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Output of `print` lines so far
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub async fn run(&mut self, script: &Script) -> ScriptReport {
        let start = Instant::now();
        let mut report = ScriptReport::default();
        log::info!("🧪 Running script with {} commands", script.lines.len());

        for ScriptLine { line, command } in &script.lines {
            log::debug!("🧪 line {}: {}", line, command);
            let executed = self.execute(command).await;
            report.commands_run += 1;

            match (command, executed) {
                (Command::Assert { .. }, Ok(())) => report.assertions_passed += 1,
                (Command::Assert { .. }, Err(message)) => {
                    log::warn!("🧪 line {}: assertion failed: {}", line, message);
                    report.assertions_failed += 1;
                    report.errors.push(format!("line {}: {}", line, message));
                }
                (_, Ok(())) => {}
                (_, Err(message)) => report.errors.push(format!("line {}: {}", line, message)),
            }
        }

        report.duration = start.elapsed();
        report
    }

    /// Run one command, settling any request it sent
    pub async fn execute(&mut self, command: &Command) -> std::result::Result<(), String> {
        match command {
            Command::Open => {
                self.session.open();
            }
            Command::OpenPath(path) => {
                self.session.open_path(path);
            }
            Command::Pick(answer) => self.picker.push(answer.clone()),
            Command::CloseAll => {
                self.session.close_all();
            }

            Command::Select(path) => {
                if !self.session.select(path) {
                    return Err(self.session.status_message().to_string());
                }
            }
            Command::Deselect => self.session.clear_selection(),
            Command::Up => {
                self.session.step(Direction::Up);
            }
            Command::Down => {
                self.session.step(Direction::Down);
            }
            Command::Toggle(path) => {
                self.session.navigate(NavigatorEvent::ToggleExpanded(path.clone()));
            }
            Command::Expand(path) => {
                self.session.navigate(NavigatorEvent::Expand(path.clone()));
            }
            Command::Collapse(path) => {
                self.session.navigate(NavigatorEvent::Collapse(path.clone()));
            }
            Command::ExpandAll => {
                self.session.navigate(NavigatorEvent::ExpandAll);
            }
            Command::Filter(query) => {
                self.session.set_filter(query);
            }
            Command::ClearFilter => {
                self.session.clear_filter();
            }

            Command::Add {
                internal_path,
                source_path,
                overwrite,
            } => {
                self.session.add(internal_path, source_path, *overwrite);
            }
            Command::AddRecursive {
                internal_path,
                source_dir,
            } => {
                self.session.add_recursive(internal_path, source_dir);
            }
            Command::AddToDirectory => {
                self.session.add_to_selected_directory();
            }
            Command::Remove => {
                self.session.remove_selected();
            }
            Command::Rename(new_path) => {
                self.session.rename_selected(new_path);
            }
            Command::Replace => {
                self.session.replace_selected();
            }
            Command::Extract => {
                self.session.extract_selected();
            }
            Command::Edit => {
                self.session.edit_selected();
            }
            Command::CopyPath => {
                self.session.copy_selected_path();
            }
            Command::Search(query) => {
                self.session.search_entries(query);
            }
            Command::ClearSearch => {
                self.session.clear_entry_search();
            }

            Command::Type(text) => self.session.set_buffer(text.clone()),
            Command::Save(kind) => {
                self.session.save(*kind);
            }
            Command::SaveAs(kind) => {
                self.session.save_as(*kind);
            }

            Command::CompareReference => {
                self.session.compare_selected();
            }
            Command::CompareBufferReference => {
                self.session.compare_buffer_with_reference();
            }
            Command::CompareFiles => {
                self.session.compare_disk_files();
            }
            Command::CompareBufferDisk => {
                self.session.compare_buffer_with_disk();
            }
            Command::NextDiff => {
                self.session.next_difference();
            }
            Command::PreviousDiff => {
                self.session.previous_difference();
            }
            Command::CloseCompare => self.session.close_compare(),

            Command::Settle => self.settle().await?,
            Command::Wait(ms) => tokio::time::sleep(Duration::from_millis(*ms)).await,
            Command::Print => {
                let rendered = self.session.render_tree();
                self.transcript.push_str(&rendered);
            }
            Command::Assert { property, expected } => return check(&self.session, property, expected),
        }

        if command.dispatches() {
            self.settle().await?;
        }
        Ok(())
    }

    /// Apply answers until nothing is outstanding and the guard is idle
    pub async fn settle(&mut self) -> std::result::Result<(), String> {
        let deadline = Instant::now() + self.max_settle_time;

        while !self.session.is_settled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match timeout(remaining, self.results.recv()).await {
                Ok(Some(result)) => self.session.handle_task_result(result),
                Ok(None) => return Err("request worker stopped".to_string()),
                Err(_) => {
                    return Err(format!(
                        "{} requests still pending after {:?}",
                        self.session.pending_requests(),
                        self.max_settle_time
                    ))
                }
            }
        }

        let guard = self.session.guard().clone();
        let remaining = deadline.saturating_duration_since(Instant::now());
        timeout(remaining, guard.wait_idle())
            .await
            .map_err(|_| "single-flight guard did not release in time".to_string())
    }
}

/// Check one `assert` line against the session
pub fn check(session: &Session, property: &str, expected: &str) -> std::result::Result<(), String> {
    let (subject, value) = match expected.split_once(char::is_whitespace) {
        Some((subject, value)) => (subject, value.trim()),
        None => (expected, ""),
    };

    let (actual, wanted): (String, String) = match property {
        "status" => (session.status_message().to_string(), expected.to_string()),
        "status_contains" => {
            return if session.status_message().contains(expected) {
                Ok(())
            } else {
                Err(format!("status '{}' does not contain '{}'", session.status_message(), expected))
            };
        }
        "view" => {
            let view = match session.view() {
                ActiveView::Archive => "archive",
                ActiveView::Editor => "editor",
                ActiveView::Comparer => "comparer",
            };
            (view.to_string(), expected.to_lowercase())
        }
        "selection" => {
            let selection = session.selection();
            let actual = if selection.is_empty() { "none" } else { selection.path.as_str() };
            (actual.to_string(), expected.to_string())
        }
        "paths" => {
            let mut actual = session.tree_state().path_set().paths.clone();
            actual.sort();
            let mut wanted: Vec<String> = expected
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            wanted.sort();
            (actual.join(","), wanted.join(","))
        }
        "contains" => (session.tree_state().contains(expected).to_string(), "true".to_string()),
        "missing" => (session.tree_state().contains(expected).to_string(), "false".to_string()),
        "marker" => {
            let marker = match session.tree_state().marker(subject) {
                Some(EntryMarker::Added) => "added",
                Some(EntryMarker::Modified) => "modified",
                None => "none",
            };
            (marker.to_string(), value.to_lowercase())
        }
        "expanded" => (
            session.tree_state().collapse_store().is_expanded(expected).to_string(),
            "true".to_string(),
        ),
        "collapsed" => (
            session.tree_state().collapse_store().is_expanded(expected).to_string(),
            "false".to_string(),
        ),
        "visible" => (session.view_model().items.len().to_string(), expected.to_string()),
        "tree_line" => {
            let rendered = session.render_tree();
            return if rendered.lines().any(|line| line.trim() == expected.trim()) {
                Ok(())
            } else {
                Err(format!("no tree line '{}' in:\n{}", expected, rendered))
            };
        }
        "diff_total" => (session.compare().navigator().total().to_string(), expected.to_string()),
        "diff_index" => (
            session.compare().navigator().current_index().to_string(),
            expected.to_string(),
        ),
        "compare" => {
            let present = if session.compare().dataset().is_some() { "present" } else { "none" };
            (present.to_string(), expected.to_lowercase())
        }
        "editor" => (session.editor().text.clone(), expected.to_string()),
        "language" => (session.editor().language.clone(), expected.to_string()),
        "pending" => (session.pending_requests().to_string(), expected.to_string()),
        _ => return Err(format!("Unknown assertion property: {}", property)),
    };

    if actual == wanted {
        Ok(())
    } else {
        Err(format!("{}: expected '{}', got '{}'", property, wanted, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = Script::from_string(
            r#"
# open and look around
open /tmp/pack

select a/b.txt
assert selection a/b.txt
"#,
        )
        .unwrap();
        assert_eq!(script.lines.len(), 3);
        assert_eq!(script.lines[0].line, 3);
        assert_eq!(script.lines[1].command, Command::Select("a/b.txt".into()));
        assert_eq!(script.lines[2].line, 6);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = Script::from_string("open\nfrobnicate\n").unwrap_err();
        match err {
            LensError::Script { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("frobnicate"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_report_success() {
        let mut report = ScriptReport::default();
        assert!(report.success());
        report.assertions_failed = 1;
        assert!(!report.success());
    }
}
