use thiserror::Error;

pub type Result<T> = std::result::Result<T, LensError>;

#[derive(Debug, Error)]
pub enum LensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] crate::remote::EngineError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Dispatch(#[from] DispatchError),

    #[error("Script error on line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("Error: {0}")]
    Generic(String),
}

impl From<String> for LensError {
    fn from(error: String) -> Self {
        LensError::Generic(error)
    }
}

impl From<&str> for LensError {
    fn from(error: &str) -> Self {
        LensError::Generic(error.to_string())
    }
}

/// Client-side rejections raised before anything is sent to the engine.
///
/// The messages are the one-line status texts shown to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Select some file first!")]
    NoSelection,

    #[error("'{0}' is not a file")]
    NotAFile(String),

    #[error("'{0}' is not a directory")]
    NotADirectory(String),

    #[error("Internal path is empty")]
    EmptyInternalPath,

    #[error("Internal path must contain \".\" in its base name: {0}")]
    MissingExtension(String),

    #[error("'{0}' already exists in the archive")]
    TargetExists(String),

    #[error("Path to source file is empty")]
    EmptySourcePath,

    #[error("New name is empty")]
    EmptyNewName,

    #[error("'{0}' does not exist in the archive")]
    NotFound(String),

    #[error("Select some file to compare first!")]
    NothingToCompare,

    #[error("Search query is empty!")]
    EmptyQuery,

    #[error("No content in editor!")]
    EmptyBuffer,

    #[error("Text size: {size_mb:.2} MB exceeds the limit: {limit_mb} MB!")]
    BufferTooLarge { size_mb: f64, limit_mb: usize },
}

impl ValidationError {
    pub fn buffer_too_large(size: usize, limit: usize) -> Self {
        ValidationError::BufferTooLarge {
            size_mb: size as f64 / 1024.0 / 1024.0,
            limit_mb: limit / 1024 / 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Another operation is still in progress")]
    Busy,

    #[error("Request worker is not running")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_status_lines() {
        assert_eq!(ValidationError::NoSelection.to_string(), "Select some file first!");
        assert_eq!(ValidationError::EmptyBuffer.to_string(), "No content in editor!");
        assert_eq!(
            ValidationError::buffer_too_large(3 * 1024 * 1024, 2 * 1024 * 1024).to_string(),
            "Text size: 3.00 MB exceeds the limit: 2 MB!"
        );
    }

    #[test]
    fn test_dispatch_error_wraps_validation() {
        let err: DispatchError = ValidationError::EmptyNewName.into();
        assert_eq!(err.to_string(), "New name is empty");

        let lens: LensError = err.into();
        assert!(matches!(lens, LensError::Dispatch(DispatchError::Validation(_))));
    }
}
