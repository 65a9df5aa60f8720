//! Error types for this crate.
//!
//! All fallible operations return [`Result<T>`] which uses [`PipelineError`] as the error type.

use thiserror::Error;

/// A [`Result`](std::result::Result) alias using [`PipelineError`] as the error type.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The unified error type for all crate errors.
///
/// # Example
///
/// ```rust,no_run
/// use indobert_sentiment::error::PipelineError;
///
/// fn handle_error(e: PipelineError) {
///     match &e {
///         PipelineError::Load(_) => {
///             // Missing or broken model files - abort the session
///         }
///         PipelineError::InvalidInput(_) => {
///             // Empty text - ask the user again
///         }
///         PipelineError::Device(_) => {
///             // Requested GPU unavailable - rebuild on CPU
///         }
///         PipelineError::Tokenization(_) | PipelineError::Unexpected(_) => {
///             // This request failed - report it
///             eprintln!("Prediction failed: {e}");
///         }
///         _ => {
///             // Future error variants
///         }
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// Tokenizer or checkpoint files are missing, corrupt, or incompatible.
    #[error("{0}")]
    Load(String),

    /// Input text is empty or whitespace only. Ask for new input.
    #[error("{0}")]
    InvalidInput(String),

    /// Tokenization failure on a particular input.
    #[error("{0}")]
    Tokenization(String),

    /// Requested device could not be initialized, or does not hold the model.
    #[error("{0}")]
    Device(String),

    /// Internal or numeric failure during inference.
    #[error("{0}")]
    Unexpected(String),
}

impl PipelineError {
    /// `true` when the session cannot continue without operator intervention.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Load(_) | PipelineError::Device(_))
    }

    /// `true` when the caller should fix the input and try again.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, PipelineError::InvalidInput(_))
    }
}

impl From<candle_core::Error> for PipelineError {
    fn from(value: candle_core::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(value: serde_json::Error) -> Self {
        PipelineError::Unexpected(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineError;

    #[test]
    fn classifies_error_kinds() {
        assert!(PipelineError::Load("gone".into()).is_fatal());
        assert!(PipelineError::Device("no gpu".into()).is_fatal());
        assert!(!PipelineError::InvalidInput("empty".into()).is_fatal());
        assert!(PipelineError::InvalidInput("empty".into()).is_user_correctable());
        assert!(!PipelineError::Unexpected("nan".into()).is_user_correctable());
    }

    #[test]
    fn message_is_passed_through() {
        let err = PipelineError::Load("Checkpoint directory not found: x".into());
        assert_eq!(err.to_string(), "Checkpoint directory not found: x");
    }
}
