use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiskError>;

/// Errors raised by the host-side storage layer.
///
/// These never reach the guest directly. ATA drivers translate them into
/// register state (Device Fault, ABRT) and log the underlying cause.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("out of bounds: offset={offset} len={len} capacity={capacity}")]
    OutOfBounds {
        offset: u64,
        len: usize,
        capacity: u64,
    },

    #[error("integer overflow while computing byte offsets")]
    OffsetOverflow,

    #[error("no medium present")]
    NoMedium,

    /// Generic I/O failure.
    ///
    /// Stored as a string so backends that do not originate from `std::fs` can
    /// report failures without a platform-specific error type.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DiskError {
    fn from(err: std::io::Error) -> Self {
        DiskError::Io(err.to_string())
    }
}
