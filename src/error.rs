// Errors reported to the host.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum APUError {
    #[error("image is {actual} bytes, expected {expected}")]
    InvalidImageSize {
        expected:   usize,
        actual:     usize,
    },

    #[error("invalid image: {0}")]
    InvalidImageFormat(String),

    #[error("incompatible snapshot: {0}")]
    IncompatibleSnapshot(String),

    #[error("could not encode snapshot: {0}")]
    SnapshotEncode(String),
}

pub type Result<T> = std::result::Result<T, APUError>;
