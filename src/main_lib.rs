// Command handlers behind the binary, kept in the library for testing

use crate::config::Config;
use crate::dialogs::QueuedPicker;
use crate::diff_ranges;
use crate::error::{LensError, Result};
use crate::executor::{Executor, Script};
use crate::local_engine::{LocalEngine, LocalEngineConfig};
use crate::navigator::NavigatorEvent;
use crate::session::SessionSnapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn start_executor(config: Config, engine_config: LocalEngineConfig) -> (Executor, QueuedPicker) {
    let picker = QueuedPicker::new();
    let engine = Arc::new(LocalEngine::new(engine_config, Arc::new(picker.clone())));
    (Executor::start(engine, config, picker.clone()), picker)
}

/// Open `archive` and render its tree, or the whole session as JSON
pub async fn print_tree(
    config: Config,
    archive: &Path,
    reference: Option<PathBuf>,
    filter: Option<&str>,
    expand_all: bool,
    json: bool,
) -> Result<String> {
    let engine_config = LocalEngineConfig {
        reference_dir: reference,
        extract_dir: None,
    };
    let (mut executor, _) = start_executor(config, engine_config);

    executor.session_mut().open_path(archive);
    executor.settle().await.map_err(LensError::Generic)?;
    if executor.session().archive_label().is_none() {
        return Err(LensError::Generic(executor.session().status_message().to_string()));
    }

    let session = executor.session_mut();
    if expand_all {
        session.navigate(NavigatorEvent::ExpandAll);
    }
    if let Some(query) = filter {
        session.set_filter(query);
    }

    if json {
        Ok(serde_json::to_string_pretty(&session.snapshot())?)
    } else {
        Ok(session.render_tree())
    }
}

/// Unified diff of two files with their difference ranges, or the
/// identical-files notice
pub async fn diff_files(config: Config, left: &Path, right: &Path) -> Result<String> {
    let (mut executor, picker) = start_executor(config, LocalEngineConfig::default());
    picker.push(Some(left.to_path_buf()));
    picker.push(Some(right.to_path_buf()));

    executor.session_mut().compare_disk_files();
    executor.settle().await.map_err(LensError::Generic)?;

    let session = executor.session();
    let dataset = match session.compare().dataset() {
        Some(dataset) => dataset,
        None => return Ok(format!("{}\n", session.status_message())),
    };

    let mut out = diff_ranges::unified(&dataset.content1, &dataset.content2, &dataset.filepath1, &dataset.filepath2);
    let ranges = session.compare().navigator().ranges();
    out.push_str(&format!("{} differences\n", ranges.len()));
    for (index, range) in ranges.iter().enumerate() {
        out.push_str(&format!(
            "  #{} left {}..{} right {}..{}\n",
            index + 1,
            range.old.start + 1,
            range.old.end,
            range.new.start + 1,
            range.new.end
        ));
    }
    Ok(out)
}

/// Run a script file; the final session state comes back with the report
pub async fn run_script(
    config: Config,
    script_path: &Path,
    engine_config: LocalEngineConfig,
) -> Result<(crate::executor::ScriptReport, SessionSnapshot, String)> {
    let script = Script::from_file(script_path)?;
    let (mut executor, _) = start_executor(config, engine_config);

    log::info!("🧪 Script: {}", script_path.display());
    let report = executor.run(&script).await;
    Ok((report, executor.session().snapshot(), executor.transcript().to_string()))
}
