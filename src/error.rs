//! Crate-wide error type (replaces the scattered `errno`/`goto END` error
//! handling of the original C core).
//!
//! Every fallible operation in this crate returns `Result<T, CoreError>` (or
//! the narrower `CoreResult<T>` alias) so callers observe one consistent set
//! of failure kinds instead of each module inventing its own.

use std::io;

/// The six language-neutral error kinds the connection-dispatch core can
/// produce.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed arguments, oversized fields, or a null/empty value where one
    /// is forbidden.
    #[error("bad input: {0}")]
    BadInput(String),

    /// A bounded queue, registry, or table is at capacity.
    #[error("at capacity")]
    Full,

    /// A session, auth, or storage lookup missed.
    #[error("not found")]
    NotFound,

    /// Operation attempted on a queue or pool that has been shut down.
    #[error("closed")]
    Closed,

    /// Wrapped OS error from `accept`/`poll`/`read`/`write`/`open`/etc.
    #[error("system I/O error: {0}")]
    SystemIO(#[from] io::Error),

    /// Allocation failure or invariant violation — should not normally be
    /// observable; indicates a bug if it is.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;
