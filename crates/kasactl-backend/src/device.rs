// ── Device capability traits and telemetry snapshots ──
//
// The outbound contract the controller depends on. Everything the vendor
// library would provide is reduced to: discover a set of device handles,
// refresh one for fresh telemetry, and issue an on/off command at a
// device or child-outlet target.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

// ── Telemetry snapshots ─────────────────────────────────────────────

/// Instantaneous energy readings from a metering-capable unit.
///
/// Every field is optional: hardware revisions differ in which metrics
/// they report, and a reachable device may still omit a value on any
/// given poll. A missing field means "not reported right now", not zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmeterReading {
    /// Instantaneous power draw in watts.
    pub power_w: Option<f64>,
    /// Line voltage in volts.
    pub voltage_v: Option<f64>,
    /// Line current in amperes.
    pub current_a: Option<f64>,
}

impl EmeterReading {
    /// True when no metric carries a value.
    pub fn is_empty(&self) -> bool {
        self.power_w.is_none() && self.voltage_v.is_none() && self.current_a.is_none()
    }
}

/// Telemetry for one child outlet of a multi-outlet strip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutletSnapshot {
    /// User-assigned outlet alias.
    pub alias: String,
    /// Relay state.
    pub is_on: bool,
    /// Per-outlet energy readings, when the outlet meters independently.
    pub emeter: Option<EmeterReading>,
}

/// Full telemetry for one device, as returned by a refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlugSnapshot {
    /// User-assigned device alias.
    pub alias: String,
    /// Relay state. For strips this is the aggregate "any outlet on" flag
    /// the firmware reports.
    pub is_on: bool,
    /// Cloud session state: `Some(flag)` when the device has a cloud
    /// module, `None` when it has no cloud capability at all.
    pub cloud_connected: Option<bool>,
    /// When the device last transitioned to powered, if the firmware
    /// tracks it.
    pub on_since: Option<DateTime<Utc>>,
    /// Device-level energy readings.
    pub emeter: Option<EmeterReading>,
    /// Child outlets, in firmware order. Empty for single-socket plugs.
    pub children: Vec<OutletSnapshot>,
}

impl PlugSnapshot {
    /// Relay state of the addressed unit.
    pub fn is_on_at(&self, target: PowerTarget) -> Option<bool> {
        match target {
            PowerTarget::Device => Some(self.is_on),
            PowerTarget::Outlet(idx) => self.children.get(idx).map(|c| c.is_on),
        }
    }

    /// Energy readings of the addressed unit, if it meters.
    pub fn emeter_at(&self, target: PowerTarget) -> Option<EmeterReading> {
        match target {
            PowerTarget::Device => self.emeter,
            PowerTarget::Outlet(idx) => self.children.get(idx).and_then(|c| c.emeter),
        }
    }
}

// ── Command addressing ──────────────────────────────────────────────

/// Addresses a switchable unit within one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTarget {
    /// The device's own relay.
    Device,
    /// A child outlet, by firmware index.
    Outlet(usize),
}

// ── Capability traits ───────────────────────────────────────────────

/// One reachable smart-plug device.
///
/// `refresh` and `set_power` are the only network operations; everything
/// else the controller needs comes out of the returned [`PlugSnapshot`].
#[async_trait]
pub trait PlugDevice: Send + Sync {
    /// Stable network address (IP or hostname) of the device.
    fn host(&self) -> &str;

    /// Fetch fresh telemetry from the device.
    async fn refresh(&self) -> BackendResult<PlugSnapshot>;

    /// Issue an on/off command at the given target.
    ///
    /// The protocol is fire-and-forget: an `Ok` here means the command was
    /// sent, not that the relay actually switched. Callers that care must
    /// refresh and compare afterwards.
    async fn set_power(&self, target: PowerTarget, on: bool) -> BackendResult<()>;
}

/// Discovery over the local network.
#[async_trait]
pub trait PlugBackend: Send + Sync {
    /// Enumerate reachable devices.
    ///
    /// Returns handles in a stable order for the lifetime of the backend;
    /// the controller's channel indices are derived from this order.
    async fn discover(&self) -> BackendResult<Vec<Arc<dyn PlugDevice>>>;
}
