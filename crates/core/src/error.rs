//! Unified error taxonomy for the pathway-index-core crate.
//!
//! Every fallible operation in this crate returns [`CoreError`].
//! `BadInput` and `SchemaMismatch` are fatal to the calling process,
//! `NotFound` and `FetchExhausted` are recoverable at pathway
//! granularity, `Parse` errors cause the offending pathway to be
//! skipped, and `InternalInvariant` should never occur in well-formed
//! code.

use thiserror::Error;

/// Top-level error type for the pathway-index-core crate.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed CLI flags, missing required arguments or columns, or a
    /// file that does not exist. Fatal; callers should exit with code 2.
    #[error("bad input: {0}")]
    BadInput(String),

    /// The remote source reports that a pathway no longer exists.
    /// Non-fatal: the caller records this against the affected pathway
    /// id and continues building the rest of the index.
    #[error("pathway not found: {0}")]
    NotFound(String),

    /// Retries were exhausted fetching a remote resource.
    #[error("fetch exhausted for {url}: {cause}")]
    FetchExhausted {
        /// The URL that could not be fetched.
        url: String,
        /// The last transport error encountered.
        cause: String,
    },

    /// A document parses syntactically but violates a structural rule
    /// (missing required attribute, unresolvable group cycle, an edge
    /// endpoint referencing a non-existent node, ...). Non-fatal: the
    /// owning pathway is skipped.
    #[error("parse error in {unit}: {message}")]
    Parse {
        /// The smallest affected unit (pathway id, file path, ...).
        unit: String,
        /// Human-readable description of the violation.
        message: String,
    },

    /// The on-disk index's `schema_version` does not match the version
    /// this binary understands. Fatal; callers should exit with code 3.
    #[error("schema mismatch: index is version {found}, expected {expected}")]
    SchemaMismatch {
        /// Version found in the document.
        found: i64,
        /// Version this build of the crate understands.
        expected: i64,
    },

    /// A post-condition failed that should be impossible in correct
    /// code (e.g. a node id referenced by a pathway disappeared between
    /// parse and validate). Fatal; callers should exit with code 1.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV/TSV tabular file failure.
    #[error("tabular file error: {0}")]
    Csv(#[from] csv::Error),

    /// Cancellation via an external signal or deadline.
    #[error("operation cancelled")]
    Cancelled(#[from] crate::worker::CancelledError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// The identifier of the smallest affected unit this error carries,
    /// when one is available. Used for user-visible messages that name
    /// a URL, pathway id, or column, per the error reporting contract.
    pub fn affected_unit(&self) -> Option<&str> {
        match self {
            CoreError::NotFound(u) => Some(u),
            CoreError::FetchExhausted { url, .. } => Some(url),
            CoreError::Parse { unit, .. } => Some(unit),
            _ => None,
        }
    }

    /// Whether this error is recoverable at pathway/resource granularity
    /// (the caller can skip the affected unit and continue), as opposed
    /// to fatal to the whole process.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound(_) | CoreError::FetchExhausted { .. } | CoreError::Parse { .. }
        )
    }

    /// The process exit code this error maps to, per the CLI contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::BadInput(_) => 2,
            CoreError::SchemaMismatch { .. } => 3,
            _ => 1,
        }
    }
}
