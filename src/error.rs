use thiserror::Error;

/// Everything that can go wrong inside the shell engine.
///
/// Command leaves never let these escape: they render the error as their
/// reply text. Host failures (storage, clipboard, scheduler) are logged and
/// swallowed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShellError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Unsupported file type.")]
    UnsupportedType(String),

    #[error("Error: {0}")]
    Evaluation(String),

    #[error("Error: script nesting exceeds {0} levels")]
    ScriptDepth(usize),

    #[error("storage unavailable: {0}")]
    Storage(String),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("scheduler unavailable: {0}")]
    Scheduler(String),

    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    #[error("invalid config: {0}")]
    Config(String),
}

impl ShellError {
    /// Host-side failures that are logged instead of shown to the user.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ShellError::Storage(_) | ShellError::Clipboard(_) | ShellError::Scheduler(_)
        )
    }
}

impl From<serde_json::Error> for ShellError {
    fn from(err: serde_json::Error) -> Self {
        ShellError::Snapshot(err.to_string())
    }
}
