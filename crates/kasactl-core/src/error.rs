// ── Core error types ──
//
// User-facing errors from kasactl-core. Backend errors are wrapped at
// the bridge boundary -- consumers never see the transport taxonomy,
// only whether an operation failed, timed out, or was refused.

use std::time::Duration;

use thiserror::Error;

use kasactl_backend::BackendError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Backend failures ─────────────────────────────────────────────
    /// The backend raised an error while running an operation.
    #[error("backend failure during {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    /// The operation exceeded its bounded wait. Deliberately distinct
    /// from [`Backend`](Self::Backend): a timeout tells the caller
    /// nothing about whether the command reached the device.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    // ── Caller errors ────────────────────────────────────────────────
    /// A read or write was attempted while disconnected.
    #[error("controller is not connected")]
    NotConnected,

    /// A channel index outside `0..channel_count()`.
    #[error("channel index {index} out of range (fleet has {count} channels)")]
    OutOfRange { index: i64, count: usize },

    /// No channel matches the given name.
    #[error("no channel named '{name}'")]
    NotFound { name: String },

    /// A write was attempted on an indicator or gauge channel.
    #[error("channel '{name}' is read-only")]
    ReadOnly { name: String },

    // ── Write convergence ────────────────────────────────────────────
    /// The write retry budget ran out without the device reflecting the
    /// requested state.
    #[error(
        "channel '{name}' did not reach the requested state after {attempts} attempts \
         (wanted {desired}, last observed {observed})"
    )]
    StateMismatch {
        name: String,
        desired: bool,
        observed: bool,
        attempts: u32,
    },
}

impl CoreError {
    /// Wrap a backend error, tagging it with the operation that raised it.
    pub(crate) fn backend(operation: &'static str, err: &BackendError) -> Self {
        Self::Backend {
            operation,
            message: err.to_string(),
        }
    }
}
