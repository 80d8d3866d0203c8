use archive_lens::cli::{Cli, Commands};
use archive_lens::config::Config;
use archive_lens::error::{LensError, Result};
use archive_lens::local_engine::LocalEngineConfig;
use archive_lens::main_lib;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Tree {
            archive,
            reference,
            filter,
            expand_all,
            json,
        } => {
            let out = main_lib::print_tree(config, &archive, reference, filter.as_deref(), expand_all, json).await?;
            print!("{}", out);
            Ok(())
        }
        Commands::Diff { left, right } => {
            let out = main_lib::diff_files(config, &left, &right).await?;
            print!("{}", out);
            Ok(())
        }
        Commands::Run {
            script,
            reference,
            extract_dir,
            json,
        } => {
            let engine_config = LocalEngineConfig {
                reference_dir: reference,
                extract_dir,
            };
            let (report, snapshot, transcript) = main_lib::run_script(config, &script, engine_config).await?;
            print!("{}", transcript);
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            report.print_summary();

            if report.success() {
                log::info!("🧪 Script completed successfully");
                Ok(())
            } else {
                log::error!("🧪 Script failed");
                Err(LensError::from("Script failed"))
            }
        }
    }
}

/// Append debug logs to `ARCHIVE_LENS_LOG` when set, else to stderr with
/// `--verbose`
fn init_logging(verbose: bool) -> Result<()> {
    if let Ok(log_file) = std::env::var("ARCHIVE_LENS_LOG") {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?;
        env_logger::Builder::new()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .filter_level(log::LevelFilter::Debug)
            .init();
        log::info!("Archive Lens starting up");
    } else if verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }
    Ok(())
}
