use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons an encoding, an oracle call or a search may fail.
#[derive(Debug, Error)]
pub enum Error {
    /// The problem instance or a parsed text was rejected before any clause was generated.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The oracle executable could not be run, or exited without producing a verdict.
    #[error("could not invoke SAT solver {}: {reason}", solver.display())]
    OracleInvocation {
        /// Path of the executable which was invoked.
        solver: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The oracle stopped without deciding, because it hit its time limit or reported an indeterminate result.
    /// Carries the time the call took.
    #[error("SAT solver stopped without a verdict after {0:?}")]
    OracleTimeout(Duration),

    /// The oracle answered with text that is neither a complete model nor an unsatisfiability marker.
    #[error("malformed SAT solver output: {0}")]
    MalformedOracleOutput(String),
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedOracleOutput(reason.into())
    }
}
