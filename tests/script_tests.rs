use archive_lens::config::Config;
use archive_lens::dialogs::QueuedPicker;
use archive_lens::executor::{Executor, Script, ScriptReport};
use archive_lens::local_engine::{LocalEngine, LocalEngineConfig};
use archive_lens::session::ActiveView;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Runs session scripts against a directory archive in a temp dir.
///
/// Scripts may use `$ARCHIVE`, `$REFERENCE` and `$OUTSIDE` placeholders.
struct ScriptTestDriver {
    dir: TempDir,
}

impl ScriptTestDriver {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let write = |path: PathBuf, content: &str| {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        };
        let root = dir.path();
        write(root.join("pack/a/b.txt"), "b\n");
        write(root.join("pack/a/c.txt"), "c changed\nsecond\n");
        write(root.join("pack/d.txt"), "d\n");
        write(root.join("vanilla/a/b.txt"), "b\n");
        write(root.join("vanilla/a/c.txt"), "c\nsecond\n");
        write(root.join("vanilla/d.txt"), "d\n");
        write(root.join("outside/new.txt"), "new\n");
        write(root.join("outside/left.txt"), "one\ntwo\nthree\n");
        write(root.join("outside/right.txt"), "one\n2\nthree\nfour\n");
        Self { dir }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn executor(&self) -> Executor {
        let mut config = Config::default();
        config.guard.cooldown_ms = 0;
        let picker = QueuedPicker::new();
        let engine = LocalEngine::new(
            LocalEngineConfig {
                reference_dir: Some(self.path("vanilla")),
                extract_dir: Some(self.path("extracted")),
            },
            Arc::new(picker.clone()),
        );
        Executor::start(Arc::new(engine), config, picker)
    }

    fn script(&self, text: &str) -> Script {
        let text = text
            .replace("$ARCHIVE", &self.path("pack").display().to_string())
            .replace("$REFERENCE", &self.path("vanilla").display().to_string())
            .replace("$OUTSIDE", &self.path("outside").display().to_string());
        Script::from_string(&text).unwrap()
    }

    async fn run(&self, text: &str) -> (ScriptReport, Executor) {
        let mut executor = self.executor();
        let report = executor.run(&self.script(text)).await;
        (report, executor)
    }
}

fn assert_passed(report: &ScriptReport) {
    assert!(report.success(), "script failed: {:?}", report.errors);
}

#[tokio::test]
async fn open_shows_markers() {
    let driver = ScriptTestDriver::new();
    let (report, _) = driver
        .run(
            r#"
open $ARCHIVE
assert status_contains Opened archive pack
assert paths a/b.txt,a/c.txt,d.txt
assert marker a/c.txt modified
assert marker a/b.txt none
expand a
assert tree_line  ▾ a
assert tree_line      c.txt [*]
assert visible 4
"#,
        )
        .await;
    assert_passed(&report);
    assert_eq!(report.assertions_passed, 7);
}

#[tokio::test]
async fn expand_state_survives_mutations() {
    let driver = ScriptTestDriver::new();
    let (report, _) = driver
        .run(
            r#"
open $ARCHIVE
expand a
add x/new.txt $OUTSIDE/new.txt
assert contains x/new.txt
assert marker x/new.txt added
assert expanded a
assert collapsed x
"#,
        )
        .await;
    assert_passed(&report);
}

#[tokio::test]
async fn add_existing_without_overwrite_is_rejected_locally() {
    let driver = ScriptTestDriver::new();
    let (report, executor) = driver
        .run(
            r#"
open $ARCHIVE
add a/b.txt $OUTSIDE/new.txt
assert status 'a/b.txt' already exists in the archive
assert pending 0
add a/b.txt $OUTSIDE/new.txt overwrite
assert marker a/b.txt modified
"#,
        )
        .await;
    assert_passed(&report);
    assert_eq!(executor.session().tree_state().path_set().len(), 3);
}

#[tokio::test]
async fn remove_directory_reconciles_listing() {
    let driver = ScriptTestDriver::new();
    let (report, executor) = driver
        .run(
            r#"
open $ARCHIVE
select a
remove
assert paths d.txt
assert selection none
assert missing a/b.txt
"#,
        )
        .await;
    assert_passed(&report);
    assert!(executor.session().tree_state().tree().find("a").is_none());
}

#[tokio::test]
async fn rename_and_replace_selected() {
    let driver = ScriptTestDriver::new();
    let (report, _) = driver
        .run(
            r#"
open $ARCHIVE
select d.txt
rename e/d.txt
assert paths a/b.txt,a/c.txt,e/d.txt
assert selection none
select a/b.txt
pick cancel
replace
assert marker a/b.txt none
pick $OUTSIDE/new.txt
replace
assert marker a/b.txt modified
"#,
        )
        .await;
    assert_passed(&report);
}

#[tokio::test]
async fn add_to_selected_directory_uses_file_name() {
    let driver = ScriptTestDriver::new();
    let (report, _) = driver
        .run(
            r#"
open $ARCHIVE
select d.txt
add_to_dir
assert status 'd.txt' is not a directory
select a
pick $OUTSIDE/new.txt
add_to_dir
assert contains a/new.txt
"#,
        )
        .await;
    assert_passed(&report);
}

#[tokio::test]
async fn compare_with_reference_and_navigate() {
    let driver = ScriptTestDriver::new();
    let (report, executor) = driver
        .run(
            r#"
open $ARCHIVE
compare
assert status Select some file to compare first!
select a/b.txt
compare
assert status Files are identical! Skipping comparison.
assert compare none
select a/c.txt
compare
assert view comparer
assert diff_total 1
next_diff
assert diff_index 0
prev_diff
assert diff_index 0
close_compare
assert view archive
"#,
        )
        .await;
    assert_passed(&report);
    assert_eq!(executor.session().view(), ActiveView::Archive);
}

#[tokio::test]
async fn compare_disk_files_with_wrapping_navigation() {
    let driver = ScriptTestDriver::new();
    let (report, executor) = driver
        .run(
            r#"
pick $OUTSIDE/left.txt
pick $OUTSIDE/right.txt
compare_files
assert view comparer
assert diff_total 2
next_diff
assert diff_index 1
next_diff
assert diff_index 0
"#,
        )
        .await;
    assert_passed(&report);
    let dataset = executor.session().compare().dataset().unwrap();
    assert!(dataset.is_small_pair);
    assert!(!dataset.is_tied_to_live_editor);
    assert_eq!(dataset.language, "plaintext");
}

#[tokio::test]
async fn edit_save_and_compare_buffer() {
    let driver = ScriptTestDriver::new();
    let (report, executor) = driver
        .run(
            r#"
open $ARCHIVE
select a/c.txt
edit
assert view editor
assert status Opened file: a/c.txt
assert language plaintext
compare_buffer
assert diff_total 1
close_compare
assert view editor
type c\nsecond\n
compare_buffer
assert status Files are identical! Skipping comparison.
save document
assert marker a/c.txt none
"#,
        )
        .await;
    assert_passed(&report);
    assert_eq!(executor.session().editor().text, "c\nsecond\n");
}

#[tokio::test]
async fn buffer_compare_needs_content() {
    let driver = ScriptTestDriver::new();
    let (report, _) = driver
        .run(
            r#"
compare_buffer
assert status No content in editor!
compare_buffer_disk
assert status No content in editor!
assert pending 0
"#,
        )
        .await;
    assert_passed(&report);
}

#[tokio::test]
async fn entry_search_keeps_listing_without_hits() {
    let driver = ScriptTestDriver::new();
    let (report, _) = driver
        .run(
            r#"
open $ARCHIVE
search nothing-like-this
assert status No matches found: nothing-like-this
assert paths a/b.txt,a/c.txt,d.txt
search changed
assert paths a/c.txt
clear_search
assert paths a/b.txt,a/c.txt,d.txt
"#,
        )
        .await;
    assert_passed(&report);
}

#[tokio::test]
async fn filter_reveals_without_touching_expand_state() {
    let driver = ScriptTestDriver::new();
    let (report, _) = driver
        .run(
            r#"
open $ARCHIVE
filter C.TXT
assert visible 2
assert collapsed a
clear_filter
assert visible 2
"#,
        )
        .await;
    assert_passed(&report);
}

#[tokio::test]
async fn extract_and_close_all() {
    let driver = ScriptTestDriver::new();
    let (report, executor) = driver
        .run(
            r#"
open $ARCHIVE
select a/b.txt
extract
assert status_contains Extracted a/b.txt
close_all
assert paths
assert selection none
assert editor
"#,
        )
        .await;
    assert_passed(&report);
    assert_eq!(
        fs::read_to_string(driver.path("extracted").join("a/b.txt")).unwrap(),
        "b\n"
    );
    assert!(executor.session().archive_label().is_none());
}

#[tokio::test]
async fn save_as_cancel_then_copy() {
    let driver = ScriptTestDriver::new();
    let (report, _) = driver
        .run(
            r#"
open $ARCHIVE
pick cancel
save_as archive
assert status_contains Opened archive pack
pick $OUTSIDE/copy
save_as archive
assert status_contains Saved 3 entries
assert paths a/b.txt,a/c.txt,d.txt
assert marker a/c.txt modified
"#,
        )
        .await;
    assert_passed(&report);
    assert_eq!(fs::read_to_string(driver.path("outside/copy/a/c.txt")).unwrap(), "c changed\nsecond\n");
}

#[tokio::test]
async fn filter_clears_hidden_selection() {
    let driver = ScriptTestDriver::new();
    let (report, _) = driver
        .run(
            r#"
open $ARCHIVE
select a
filter d.txt
assert selection none
remove
assert status Select some file first!
assert paths a/b.txt,a/c.txt,d.txt
"#,
        )
        .await;
    assert_passed(&report);
}

#[tokio::test]
async fn failed_assertions_are_counted() {
    let driver = ScriptTestDriver::new();
    let (report, _) = driver
        .run(
            r#"
open $ARCHIVE
assert paths nothing.txt
assert view editor
assert frobnicate x
"#,
        )
        .await;
    assert!(!report.success());
    assert_eq!(report.assertions_failed, 3);
    assert_eq!(report.errors.len(), 3);
    assert!(report.errors[0].starts_with("line 3:"));
}

#[test]
fn script_files_parse() {
    let dir = TempDir::new().unwrap();
    let path: &Path = &dir.path().join("smoke.lens");
    fs::write(path, "# smoke\nopen\nsettle\nprint\n").unwrap();
    let script = Script::from_file(path).unwrap();
    assert_eq!(script.lines.len(), 3);
}
