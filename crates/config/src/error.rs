//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A layer could not be read or did not match the expected shape.
    #[display("could not load configuration")]
    Load,
    #[display("configuration file not found: {}", _0.display())]
    Missing(#[error(not(source))] PathBuf),
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    #[display("could not determine the user configuration directory")]
    NoConfigDirectory,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
