//! Error types for taskmon

use std::io;
use thiserror::Error;

/// Result type alias for taskmon operations
pub type Result<T> = std::result::Result<T, TaskmonError>;

/// Error taxonomy for sampling and lifecycle control.
///
/// Per-record failures during a scan (vanished processes, permission denials
/// on attribute reads) are absorbed inside the sampler and never reach
/// callers; only the variants below escape.
#[derive(Error, Debug)]
pub enum TaskmonError {
    /// Process exited between enumeration and attribute read
    #[error("process {0} vanished during scan")]
    ProcessVanished(u32),

    /// Target process does not exist
    #[error("no such process: {0}")]
    ProcessNotFound(u32),

    /// Caller lacks the rights to signal the target process
    #[error("permission denied signaling process {0}")]
    PermissionDenied(u32),

    /// Forced termination failed after the graceful phase timed out
    #[error("forced termination of process {pid} failed: {cause}")]
    EscalationFailed { pid: u32, cause: String },

    /// System memory statistics could not be read this tick
    #[error("memory statistics unavailable: {0}")]
    MemoryRead(String),

    /// The process-introspection interface itself is unreachable
    #[error("process table unavailable: {0}")]
    ScanUnavailable(String),

    /// Malformed data from a proc file
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Signal delivery error (Unix)
    #[cfg(unix)]
    #[error("signal error: {0}")]
    Nix(#[from] nix::Error),
}
