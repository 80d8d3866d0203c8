use crate::remote::DocumentKind;
use std::fmt;
use std::path::PathBuf;

/// All commands the headless session understands, one per script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Opening
    Open,
    OpenPath(PathBuf),
    Pick(Option<PathBuf>),
    CloseAll,

    // Tree view
    Select(String),
    Deselect,
    Up,
    Down,
    Toggle(String),
    Expand(String),
    Collapse(String),
    ExpandAll,
    Filter(String),
    ClearFilter,

    // Entry actions
    Add {
        internal_path: String,
        source_path: PathBuf,
        overwrite: bool,
    },
    AddRecursive {
        internal_path: String,
        source_dir: PathBuf,
    },
    AddToDirectory,
    Remove,
    Rename(String),
    Replace,
    Extract,
    Edit,
    CopyPath,
    Search(String),
    ClearSearch,

    // Editor
    Type(String),
    Save(DocumentKind),
    SaveAs(DocumentKind),

    // Comparison
    CompareReference,
    CompareBufferReference,
    CompareFiles,
    CompareBufferDisk,
    NextDiff,
    PreviousDiff,
    CloseCompare,

    // Script control
    Settle,
    Wait(u64),
    Print,
    Assert { property: String, expected: String },
}

impl Command {
    /// Parse one script line: a command name, then its arguments
    pub fn from_string(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let (name, rest) = match s.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (s, ""),
        };

        let command = match name.to_lowercase().as_str() {
            "open" if rest.is_empty() => Command::Open,
            "open" => Command::OpenPath(PathBuf::from(rest)),
            "drop" => Command::OpenPath(PathBuf::from(required(name, rest)?)),
            "pick" => match rest {
                "" => return Err("pick needs a path or 'cancel'".to_string()),
                "cancel" => Command::Pick(None),
                path => Command::Pick(Some(PathBuf::from(path))),
            },
            "close_all" => Command::CloseAll,

            "select" => Command::Select(required(name, rest)?),
            "deselect" => Command::Deselect,
            "up" => Command::Up,
            "down" => Command::Down,
            "toggle" => Command::Toggle(required(name, rest)?),
            "expand" => Command::Expand(required(name, rest)?),
            "collapse" => Command::Collapse(required(name, rest)?),
            "expand_all" => Command::ExpandAll,
            "filter" => Command::Filter(rest.to_string()),
            "clear_filter" => Command::ClearFilter,

            "add" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                match args.as_slice() {
                    [internal_path, source_path] => Command::Add {
                        internal_path: internal_path.to_string(),
                        source_path: PathBuf::from(source_path),
                        overwrite: false,
                    },
                    [internal_path, source_path, "overwrite"] => Command::Add {
                        internal_path: internal_path.to_string(),
                        source_path: PathBuf::from(source_path),
                        overwrite: true,
                    },
                    _ => return Err(format!("Usage: add <internal path> <source path> [overwrite], got '{}'", s)),
                }
            }
            "add_recursive" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                match args.as_slice() {
                    [source_dir] => Command::AddRecursive {
                        internal_path: String::new(),
                        source_dir: PathBuf::from(source_dir),
                    },
                    [internal_path, source_dir] => Command::AddRecursive {
                        internal_path: internal_path.to_string(),
                        source_dir: PathBuf::from(source_dir),
                    },
                    _ => return Err(format!("Usage: add_recursive [internal path] <source dir>, got '{}'", s)),
                }
            }
            "add_to_dir" => Command::AddToDirectory,
            "remove" => Command::Remove,
            "rename" => Command::Rename(required(name, rest)?),
            "replace" => Command::Replace,
            "extract" => Command::Extract,
            "edit" => Command::Edit,
            "copy_path" => Command::CopyPath,
            "search" => Command::Search(rest.to_string()),
            "clear_search" => Command::ClearSearch,

            "type" => Command::Type(unescape(rest)),
            "save" => match rest {
                "" | "document" => Command::Save(DocumentKind::Document),
                "archive" => Command::Save(DocumentKind::Archive),
                other => return Err(format!("Unknown save target: {}", other)),
            },
            "save_as" => match rest {
                "" | "document" => Command::SaveAs(DocumentKind::Document),
                "archive" => Command::SaveAs(DocumentKind::Archive),
                other => return Err(format!("Unknown save target: {}", other)),
            },

            "compare" | "compare_reference" => Command::CompareReference,
            "compare_buffer" => Command::CompareBufferReference,
            "compare_files" => Command::CompareFiles,
            "compare_buffer_disk" => Command::CompareBufferDisk,
            "next_diff" | "n" => Command::NextDiff,
            "prev_diff" | "p" => Command::PreviousDiff,
            "close_compare" => Command::CloseCompare,

            "settle" => Command::Settle,
            "wait" if rest.is_empty() => Command::Settle,
            "wait" => Command::Wait(
                rest.parse()
                    .map_err(|_| format!("Invalid wait duration: {}", rest))?,
            ),
            "print" => Command::Print,
            "assert" => {
                let (property, expected) = match rest.split_once(char::is_whitespace) {
                    Some((property, expected)) => (property, expected.trim()),
                    None => (rest, ""),
                };
                if property.is_empty() {
                    return Err("assert needs a property".to_string());
                }
                Command::Assert {
                    property: property.to_string(),
                    expected: unescape(expected),
                }
            }

            _ => return Err(format!("Unknown command: {}", s)),
        };
        Ok(command)
    }

    /// Commands that may leave a request in flight
    pub fn dispatches(&self) -> bool {
        !matches!(
            self,
            Command::Pick(_)
                | Command::Select(_)
                | Command::Deselect
                | Command::Up
                | Command::Down
                | Command::Toggle(_)
                | Command::Expand(_)
                | Command::Collapse(_)
                | Command::ExpandAll
                | Command::Filter(_)
                | Command::ClearFilter
                | Command::CopyPath
                | Command::Type(_)
                | Command::NextDiff
                | Command::PreviousDiff
                | Command::CloseCompare
                | Command::Settle
                | Command::Wait(_)
                | Command::Print
                | Command::Assert { .. }
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Open => write!(f, "open"),
            Command::OpenPath(path) => write!(f, "open {}", path.display()),
            Command::Pick(Some(path)) => write!(f, "pick {}", path.display()),
            Command::Pick(None) => write!(f, "pick cancel"),
            Command::CloseAll => write!(f, "close_all"),
            Command::Select(path) => write!(f, "select {}", path),
            Command::Deselect => write!(f, "deselect"),
            Command::Up => write!(f, "up"),
            Command::Down => write!(f, "down"),
            Command::Toggle(path) => write!(f, "toggle {}", path),
            Command::Expand(path) => write!(f, "expand {}", path),
            Command::Collapse(path) => write!(f, "collapse {}", path),
            Command::ExpandAll => write!(f, "expand_all"),
            Command::Filter(query) => write!(f, "filter {}", query),
            Command::ClearFilter => write!(f, "clear_filter"),
            Command::Add {
                internal_path,
                source_path,
                overwrite,
            } => {
                write!(f, "add {} {}", internal_path, source_path.display())?;
                if *overwrite {
                    write!(f, " overwrite")?;
                }
                Ok(())
            }
            Command::AddRecursive {
                internal_path,
                source_dir,
            } => write!(f, "add_recursive {} {}", internal_path, source_dir.display()),
            Command::AddToDirectory => write!(f, "add_to_dir"),
            Command::Remove => write!(f, "remove"),
            Command::Rename(new_path) => write!(f, "rename {}", new_path),
            Command::Replace => write!(f, "replace"),
            Command::Extract => write!(f, "extract"),
            Command::Edit => write!(f, "edit"),
            Command::CopyPath => write!(f, "copy_path"),
            Command::Search(query) => write!(f, "search {}", query),
            Command::ClearSearch => write!(f, "clear_search"),
            Command::Type(text) => write!(f, "type {}", text.replace('\n', "\\n")),
            Command::Save(DocumentKind::Archive) => write!(f, "save archive"),
            Command::Save(DocumentKind::Document) => write!(f, "save document"),
            Command::SaveAs(DocumentKind::Archive) => write!(f, "save_as archive"),
            Command::SaveAs(DocumentKind::Document) => write!(f, "save_as document"),
            Command::CompareReference => write!(f, "compare"),
            Command::CompareBufferReference => write!(f, "compare_buffer"),
            Command::CompareFiles => write!(f, "compare_files"),
            Command::CompareBufferDisk => write!(f, "compare_buffer_disk"),
            Command::NextDiff => write!(f, "next_diff"),
            Command::PreviousDiff => write!(f, "prev_diff"),
            Command::CloseCompare => write!(f, "close_compare"),
            Command::Settle => write!(f, "settle"),
            Command::Wait(ms) => write!(f, "wait {}", ms),
            Command::Print => write!(f, "print"),
            Command::Assert { property, expected } => write!(f, "assert {} {}", property, expected),
        }
    }
}

fn required(name: &str, rest: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("{} needs an argument", name))
    } else {
        Ok(rest.to_string())
    }
}

/// `\n` and `\t` escapes for single-line script arguments
fn unescape(s: &str) -> String {
    s.replace("\\n", "\n").replace("\\t", "\t")
}
