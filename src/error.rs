//! Structured errors for map operations.

/// Errors surfaced by map operations.
///
/// Failures are detected before any caller-visible mutation: persistent
/// maps are never modified, and a transient rejected for ownership
/// reasons is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A merge saw two differing values for the same key and no meet
    /// function was supplied to choose between them. Recoverable by
    /// retrying with one of the `*_with` operations.
    #[error("conflicting bindings for key {0}")]
    ConflictingValues(u64),
    /// A transient map was accessed from a thread that does not own its
    /// edit cell. This is a caller bug, not a recoverable condition.
    #[error("transient map accessed from a thread that does not own it")]
    OwnershipViolation,
}

/// Unwraps results whose only failure source is a meet that cannot fail.
pub(crate) fn infallible<T>(result: Result<T, Error>) -> T {
    result.unwrap_or_else(|_| unreachable!("meet does not fail"))
}
