use std::{io, path::PathBuf};

use thiserror::Error;

/// Reasons a texture could not be saved.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Output extension is neither `ktx` nor `dds`.
    #[error("Unsupported texture container {0}!")]
    UnsupportedFormat(String),

    /// Output path could not be opened for writing.
    #[error("Failed creating file {}!", path.display())]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing, flushing or closing the output failed. The file on disk is
    /// incomplete.
    #[error("Failed writing to file {}!", path.display())]
    CloseFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{width}x{height} needs {expected} BC7 blocks, got {actual}")]
    BlockCountMismatch {
        width: u32,
        height: u32,
        expected: u64,
        actual: u64,
    },

    #[error("{width}x{height} does not fit a 32-bit image size")]
    ImageTooLarge { width: u32, height: u32 },
}
