use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "archive-lens")]
#[command(about = "Browse, edit and compare the entries of an archive")]
pub struct Cli {
    /// Log at debug level to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the entry tree of a directory archive
    Tree {
        /// Directory acting as the archive
        archive: PathBuf,
        /// Directory with the unmodified counterparts of the entries
        #[arg(short, long)]
        reference: Option<PathBuf>,
        /// Only show entries whose path contains this text
        #[arg(short, long)]
        filter: Option<String>,
        /// Expand every directory
        #[arg(long)]
        expand_all: bool,
        /// Print the session state as JSON instead of the tree
        #[arg(long)]
        json: bool,
    },
    /// Compare two files and print their differences
    Diff {
        left: PathBuf,
        right: PathBuf,
    },
    /// Run a headless session script
    Run {
        /// Script file, one command per line
        script: PathBuf,
        /// Directory with the unmodified counterparts of the entries
        #[arg(short, long)]
        reference: Option<PathBuf>,
        /// Where extracted entries are written
        #[arg(long)]
        extract_dir: Option<PathBuf>,
        /// Print the final session state as JSON
        #[arg(long)]
        json: bool,
    },
}
