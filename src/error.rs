use thiserror::Error;

/// Main error type for searcheval
#[derive(Error, Debug)]
pub enum EvalError {
    /// Judge service unreachable or overloaded (transient, eligible for retry)
    #[error("Judge unavailable: {0}")]
    JudgeUnavailable(String),

    /// Judge returned a malformed or out-of-scale response (permanent, not retried)
    #[error("Judge response invalid: {0}")]
    JudgeResponseInvalid(String),

    /// Judgment count differs from hit count (protocol violation, fatal to the query)
    #[error("Judgment count mismatch: expected {expected}, got {actual}")]
    JudgmentCountMismatch { expected: usize, actual: usize },

    /// Input rejected before metric computation (empty score list, out-of-scale value)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Summaries being compared do not share the same ordered query set
    #[error("Query set mismatch: {0}")]
    QuerySetMismatch(String),

    /// The search backend failed for a query
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// Evaluation cancelled before this query completed
    #[error("Evaluation cancelled")]
    Cancelled,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parse errors (queries/hits files, judge payloads)
    #[error("Parse error: {0}")]
    Parse(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    /// Transient errors are retried with backoff; everything else propagates immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, EvalError::JudgeUnavailable(_))
    }
}

/// Convenient Result type using EvalError
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EvalError::JudgmentCountMismatch {
            expected: 3,
            actual: 2,
        };
        assert!(err.to_string().contains("expected 3"));
        assert!(err.to_string().contains("got 2"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let eval_err: EvalError = io_err.into();
        assert!(matches!(eval_err, EvalError::Io(_)));
    }

    #[test]
    fn test_transient_classification() {
        assert!(EvalError::JudgeUnavailable("503".to_string()).is_transient());
        assert!(!EvalError::JudgeResponseInvalid("bad score".to_string()).is_transient());
        assert!(!EvalError::Cancelled.is_transient());
    }
}
