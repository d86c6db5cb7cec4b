//! Device controller for the kasactl workspace.
//!
//! Exposes a fleet of networked smart plugs (including multi-outlet
//! strips) as a flat, densely indexed set of switch and metering
//! channels behind a synchronous API:
//!
//! - **[`PlugController`]** — Central facade.
//!   [`connect()`](PlugController::connect) discovers the fleet through
//!   the backend, probes capabilities once per device, and publishes the
//!   channel table; reads and verified writes then resolve against that
//!   table for the lifetime of the session.
//!
//! - **[`Channel`]** — One externally addressable unit: a switch backed
//!   by a device or child outlet, a read-only power or cloud indicator,
//!   or a per-metric meter gauge. A single tagged enum, not parallel
//!   lookup tables.
//!
//! - **Async bridge** (internal) — Backend calls are async and not
//!   assumed reentrant; a dedicated single-threaded execution context
//!   runs them in submission order while callers block on their own
//!   operation only.
//!
//! - **[`CoreError`]** — The full failure taxonomy callers dispatch on:
//!   backend failures, timeouts (distinct), bad identifiers, read-only
//!   refusals, and write-verification exhaustion.

pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod registry;

mod bridge;

// ── Primary re-exports ──────────────────────────────────────────────
pub use channel::{Channel, ChannelId, ChannelKind, Metric, UnitRef};
pub use config::ControllerConfig;
pub use controller::PlugController;
pub use error::CoreError;
pub use registry::{DeviceCaps, DeviceRecord, DeviceSummary};

// ── Driver identity ─────────────────────────────────────────────────

/// Driver display name.
pub const DRIVER_NAME: &str = "kasactl";
/// One-line driver description.
pub const DRIVER_DESCRIPTION: &str = "Kasa smart-plug fleet controller";
/// Version of the channel surface exposed to consumers.
pub const INTERFACE_VERSION: u32 = 1;
