use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A documentation file could not be fully scanned.
///
/// Extraction errors are recovered: the offending document stops yielding
/// samples, the error is logged and recorded, and the scan moves on.
#[derive(Debug, Clone, Error)]
#[error("{}:{}: {}", .file.display(), .line, .message)]
pub struct ExtractionError {
    pub file: PathBuf,
    /// Approximate 1-based line of the problem.
    pub line: usize,
    pub message: String,
}

impl ExtractionError {
    pub fn new(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

/// A sample could not be turned into a standalone program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// The sample mixes top-level declarations with top-level statements and
    /// the language cannot host declarations inside its entry construct.
    #[error("ambiguous sample shape: top-level declaration `{construct}` mixed with statements")]
    AmbiguousShape { construct: String },

    /// The sample declares more than one program entry point.
    #[error("unsupported construct: multiple entry points (`{construct}`)")]
    UnsupportedConstruct { construct: String },

    /// No wrapping template is configured for the detected shape.
    #[error("no `{template}` template configured for language '{language}'")]
    MissingTemplate { language: String, template: String },
}

/// A validation rule could not be evaluated.
#[derive(Debug, Clone, Error)]
pub enum RuleError {
    #[error("ValidationError: rule '{rule}' has an invalid pattern: {message}")]
    InvalidPattern { rule: String, message: String },
}

/// Why an execution attempt did not succeed.
///
/// The `Display` output is what ends up in `ExecutionResult::error_message`.
#[derive(Debug, Error)]
pub enum ExecutionFailure {
    #[error("execution timed out after {}s; process group killed", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {}", .code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    NonZeroExit { command: String, code: Option<i32> },

    #[error("sample raised an error (failure marker `{marker}` on stdout)")]
    FailureMarker { marker: String },

    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),
}
