use thiserror::Error;

/// Error returned when committing more bytes than the last region offered.
///
/// Returned by [`Producer::commit_push`](crate::Producer::commit_push),
/// [`Consumer::commit_pop`](crate::Consumer::commit_pop) and the `try_*`
/// methods of the region guards. The ring state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot commit {attempted} bytes, only {available} available in the last region")]
pub struct CommitError {
    /// Number of bytes the caller tried to commit.
    pub attempted: usize,
    /// Bytes still uncommitted in the most recently requested region.
    pub available: usize,
}
