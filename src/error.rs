//! Error types for ferroblacs

use thiserror::Error;

/// Result type for BLACS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for BLACS operations.
///
/// Failures inside the native library are not reported here: BLACS aborts the
/// job (or lets MPI do so) on a transport error. These variants cover the
/// checks done on the Rust side before a call is dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// BLACS has already been initialized by this process
    #[error("BLACS has already been initialized")]
    AlreadyInitialized,

    /// Matrix shape is not a valid column-major description
    #[error("Invalid shape: {rows}x{cols} with leading dimension {lda}")]
    InvalidShape {
        /// Number of rows
        rows: i32,
        /// Number of columns
        cols: i32,
        /// Leading dimension
        lda: i32,
    },

    /// Buffer holds fewer elements than the shape addresses
    #[error("Buffer too small: shape needs {required} elements, buffer has {actual}")]
    BufferTooSmall {
        /// Elements addressed by the shape
        required: usize,
        /// Elements in the buffer
        actual: usize,
    },

    /// Buffer length does not fit in a BLACS integer
    #[error("Buffer length {0} exceeds the BLACS integer range")]
    LengthOverflow(usize),

    /// Requested grid shape cannot be built from the available processes
    #[error("Invalid grid shape {nprow}x{npcol} for {nprocs} processes")]
    InvalidGridShape {
        /// Requested process rows
        nprow: i32,
        /// Requested process columns
        npcol: i32,
        /// Processes available
        nprocs: i32,
    },

    /// Calling process is not part of the grid it tried to create
    #[error("Process {0} is not part of the grid")]
    NotInGrid(i32),

    /// Process number outside the grid
    #[error("Invalid process number: {0}")]
    InvalidRank(i32),

    /// Grid coordinate outside the grid
    #[error("Invalid grid coordinate ({row}, {col})")]
    InvalidCoord {
        /// Process row
        row: i32,
        /// Process column
        col: i32,
    },

    /// Tree topology width outside 1..=9
    #[error("Invalid tree width: {0} (expected 1..=9)")]
    InvalidTreeWidth(u8),

    /// Loopback transport failure (mismatched message, timeout, poisoned hub)
    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Build a coordinate error.
    pub(crate) fn coord(row: i32, col: i32) -> Self {
        Error::InvalidCoord { row, col }
    }
}
