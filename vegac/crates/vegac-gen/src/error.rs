//! Error types for bytecode emission and artifact handling.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for the emitter's infrastructure failures.
///
/// Source-level problems (break outside a loop, oversized literals) are
/// reported as diagnostics; this enum covers I/O and artifact decoding.
#[derive(Debug, Error)]
pub enum EmitError {
    /// Writing the artifact failed
    #[error("Cannot write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact bytes do not follow the expected layout
    #[error("Malformed artifact: {0}")]
    Malformed(String),

    /// The code section contains a byte that is not an opcode
    #[error("Unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),
}

/// Result type alias for emission operations.
pub type Result<T> = std::result::Result<T, EmitError>;
