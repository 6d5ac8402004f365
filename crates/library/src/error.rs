//! Library Error Types
//!
//! Resolution itself never fails: per-entry catalog failures degrade to an
//! empty contribution (see [`Resolver`](crate::Resolver)). What remains are
//! failures of the raw-entry collaborator and of interactive search, which
//! the caller has to see.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The raw-entry store could not be read or written.
    #[display("raw entry store failed")]
    Entries,
    #[display("no raw entry at index {_0}")]
    EntryNotFound(#[error(not(source))] usize),
    /// Client ids double as file names, so they are restricted to a safe
    /// character set.
    #[display("invalid client id: {_0}")]
    InvalidClient(#[error(not(source))] String),
    /// Stored raw entries are not valid JSON of the expected shape.
    #[display("invalid raw entries")]
    InvalidEntries,
    /// A catalog call failed where degrading to an empty result is not an
    /// option (interactive search).
    #[display("catalog request failed")]
    Catalog,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Entries | Self::Catalog)
    }
}
