// ── Backend error type ──
//
// Transport-layer failures. The core crate wraps these into its own
// taxonomy at the bridge boundary; consumers of kasactl-core never see
// this type directly.

use thiserror::Error;

/// Errors raised by the device-control backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The discovery pass itself failed (broadcast error, no interface).
    #[error("discovery failed: {reason}")]
    Discovery { reason: String },

    /// A specific device did not answer.
    #[error("device {host} unreachable: {reason}")]
    Unreachable { host: String, reason: String },

    /// The device answered with something unparseable or refused the
    /// command.
    #[error("protocol error from {host}: {reason}")]
    Protocol { host: String, reason: String },

    /// A command addressed a child outlet the device does not have.
    #[error("device {host} has no outlet {outlet}")]
    NoSuchOutlet { host: String, outlet: usize },
}
