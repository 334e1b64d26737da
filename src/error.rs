use thiserror::Error;

/// Errors raised when converting wider integers into index ids.
///
/// Lookups and updates on a [`SparseSortedIndex`](crate::SparseSortedIndex) never fail; a
/// missing id is reported through `Option`/`bool` return values instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("id {0} is outside the 32-bit id space")]
    IdOutOfRange(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
