use core::fmt;

/// Errors returned by the fallible operations of [`WavlMap`](crate::WavlMap).
///
/// None of these leave the map modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An entry with the key is already present.
    DuplicateKey,
    /// No entry with the key is present.
    KeyNotFound,
    /// The map has no entries.
    Empty,
    /// A 1-based order-statistic index lies outside `1..=len`.
    IndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DuplicateKey => write!(f, "duplicate key"),
            Error::KeyNotFound => write!(f, "key not found"),
            Error::Empty => write!(f, "map is empty"),
            Error::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for map of length {len}")
            }
        }
    }
}

impl core::error::Error for Error {}
