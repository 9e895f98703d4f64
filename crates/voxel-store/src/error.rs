use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store was opened in `PersistenceMode::ReadOnly`.
    ReadOnly,
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },
    ChannelMismatch { expected: u32, actual: u32 },
    NotOpen,
    Io(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            StoreError::ReadOnly => write!(f, "store is read-only"),
            StoreError::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected:?}, got {actual:?}")
            }
            StoreError::ChannelMismatch { expected, actual } => {
                write!(f, "channel mismatch: expected {expected}, got {actual}")
            }
            StoreError::NotOpen => write!(f, "store is not open"),
            StoreError::Io(message) => write!(f, "i/o error: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}
