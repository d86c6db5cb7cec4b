//! Simulated plug fleet.
//!
//! A deterministic, in-process implementation of [`PlugBackend`] /
//! [`PlugDevice`]. Two consumers: the test suites (which need op counters
//! and failure knobs to pin down controller behavior) and the CLI's
//! `--fleet` mode (which builds a fleet from a declarative TOML spec so
//! the whole stack can be driven without vendor hardware).
//!
//! Commands are *modeled* as unreliable: a [`CommandBehavior`] decides
//! whether each `set_power` actually lands, which is exactly the property
//! the controller's verify-and-retry policy exists to absorb.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use crate::device::{
    BackendResult, EmeterReading, OutletSnapshot, PlugBackend, PlugDevice, PlugSnapshot,
    PowerTarget,
};
use crate::error::BackendError;

// ── Command behavior ────────────────────────────────────────────────

/// How a simulated device reacts to power commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandBehavior {
    /// Every command lands.
    #[default]
    Apply,
    /// Commands are silently dropped, as a congested network would.
    Drop,
    /// Commands are dropped until the nth one (1-based) arrives.
    ApplyAfter(usize),
}

// ── SimDevice ───────────────────────────────────────────────────────

struct SimState {
    snapshot: PlugSnapshot,
    behavior: CommandBehavior,
    refresh_error: Option<String>,
    refresh_delay: Option<Duration>,
}

/// One simulated device.
///
/// Construct through [`SimDevice::builder`]. Counters record every backend
/// touch so tests can assert which operations reached the device.
pub struct SimDevice {
    host: String,
    state: Mutex<SimState>,
    refreshes: AtomicUsize,
    commands: AtomicUsize,
}

impl SimDevice {
    /// Start building a device with the given alias.
    pub fn builder(alias: impl Into<String>) -> SimDeviceBuilder {
        SimDeviceBuilder::new(alias)
    }

    /// Number of refreshes this device has served.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Number of power commands this device has received.
    pub fn command_count(&self) -> usize {
        self.commands.load(Ordering::SeqCst)
    }

    /// Current relay state of the addressed unit, bypassing the network.
    pub fn relay_state(&self, target: PowerTarget) -> Option<bool> {
        self.state.lock().snapshot.is_on_at(target)
    }

    /// Arm or clear a refresh failure.
    pub fn set_refresh_error(&self, reason: Option<&str>) {
        self.state.lock().refresh_error = reason.map(str::to_owned);
    }

    /// Change command behavior mid-test.
    pub fn set_behavior(&self, behavior: CommandBehavior) {
        self.state.lock().behavior = behavior;
    }

    /// Arm or clear a refresh latency.
    pub fn set_refresh_delay(&self, delay: Option<Duration>) {
        self.state.lock().refresh_delay = delay;
    }

    /// Replace the emeter reading of the addressed unit.
    pub fn set_emeter(&self, target: PowerTarget, reading: Option<EmeterReading>) {
        let mut state = self.state.lock();
        match target {
            PowerTarget::Device => state.snapshot.emeter = reading,
            PowerTarget::Outlet(idx) => {
                if let Some(child) = state.snapshot.children.get_mut(idx) {
                    child.emeter = reading;
                }
            }
        }
    }
}

#[async_trait]
impl PlugDevice for SimDevice {
    fn host(&self) -> &str {
        &self.host
    }

    async fn refresh(&self) -> BackendResult<PlugSnapshot> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);

        let delay = self.state.lock().refresh_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        if let Some(ref reason) = state.refresh_error {
            return Err(BackendError::Unreachable {
                host: self.host.clone(),
                reason: reason.clone(),
            });
        }
        Ok(state.snapshot.clone())
    }

    async fn set_power(&self, target: PowerTarget, on: bool) -> BackendResult<()> {
        let seen = self.commands.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.lock();

        if let PowerTarget::Outlet(idx) = target {
            if idx >= state.snapshot.children.len() {
                return Err(BackendError::NoSuchOutlet {
                    host: self.host.clone(),
                    outlet: idx,
                });
            }
        }

        let lands = match state.behavior {
            CommandBehavior::Apply => true,
            CommandBehavior::Drop => false,
            CommandBehavior::ApplyAfter(n) => seen >= n,
        };
        debug!(host = %self.host, ?target, on, lands, "sim power command");
        if !lands {
            return Ok(());
        }

        match target {
            PowerTarget::Device => {
                state.snapshot.is_on = on;
                state.snapshot.on_since = if on {
                    state.snapshot.on_since.or_else(|| Some(Utc::now()))
                } else {
                    None
                };
            }
            PowerTarget::Outlet(idx) => {
                if let Some(child) = state.snapshot.children.get_mut(idx) {
                    child.is_on = on;
                }
                // Strip firmware keeps the aggregate flag in sync.
                state.snapshot.is_on = state.snapshot.children.iter().any(|c| c.is_on);
            }
        }
        Ok(())
    }
}

// ── SimDeviceBuilder ────────────────────────────────────────────────

/// Builder for [`SimDevice`].
pub struct SimDeviceBuilder {
    snapshot: PlugSnapshot,
    host: Option<String>,
    behavior: CommandBehavior,
    refresh_delay: Option<Duration>,
}

impl SimDeviceBuilder {
    fn new(alias: impl Into<String>) -> Self {
        Self {
            snapshot: PlugSnapshot {
                alias: alias.into(),
                is_on: false,
                cloud_connected: None,
                on_since: None,
                emeter: None,
                children: Vec::new(),
            },
            host: None,
            behavior: CommandBehavior::Apply,
            refresh_delay: None,
        }
    }

    /// Network address. Defaults to a host derived from the alias.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Initial relay state.
    pub fn on(mut self, on: bool) -> Self {
        self.snapshot.is_on = on;
        if on {
            self.snapshot.on_since = Some(Utc::now());
        }
        self
    }

    /// Give the device a cloud module with the given session state.
    pub fn cloud(mut self, connected: bool) -> Self {
        self.snapshot.cloud_connected = Some(connected);
        self
    }

    /// Device-level energy metering.
    pub fn emeter(mut self, reading: EmeterReading) -> Self {
        self.snapshot.emeter = Some(reading);
        self
    }

    /// Append a child outlet.
    pub fn outlet(mut self, alias: impl Into<String>, on: bool) -> Self {
        self.snapshot.children.push(OutletSnapshot {
            alias: alias.into(),
            is_on: on,
            emeter: None,
        });
        self
    }

    /// Append a child outlet that meters independently.
    pub fn metered_outlet(
        mut self,
        alias: impl Into<String>,
        on: bool,
        reading: EmeterReading,
    ) -> Self {
        self.snapshot.children.push(OutletSnapshot {
            alias: alias.into(),
            is_on: on,
            emeter: Some(reading),
        });
        self
    }

    /// Command reliability model.
    pub fn behavior(mut self, behavior: CommandBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Make every refresh take this long before answering.
    pub fn refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = Some(delay);
        self
    }

    /// Finish the device.
    pub fn build(self) -> Arc<SimDevice> {
        let host = self
            .host
            .unwrap_or_else(|| format!("sim://{}", self.snapshot.alias.to_lowercase().replace(' ', "-")));
        let mut snapshot = self.snapshot;
        if !snapshot.children.is_empty() {
            snapshot.is_on = snapshot.is_on || snapshot.children.iter().any(|c| c.is_on);
        }
        Arc::new(SimDevice {
            host,
            state: Mutex::new(SimState {
                snapshot,
                behavior: self.behavior,
                refresh_error: None,
                refresh_delay: self.refresh_delay,
            }),
            refreshes: AtomicUsize::new(0),
            commands: AtomicUsize::new(0),
        })
    }
}

// ── SimBackend ──────────────────────────────────────────────────────

/// A fixed fleet of simulated devices.
pub struct SimBackend {
    devices: Vec<Arc<SimDevice>>,
    discovery_error: Mutex<Option<String>>,
}

impl SimBackend {
    /// Build a backend over the given devices; discovery returns them in
    /// this order.
    pub fn new(devices: Vec<Arc<SimDevice>>) -> Self {
        Self {
            devices,
            discovery_error: Mutex::new(None),
        }
    }

    /// Build a fleet from a declarative spec.
    pub fn from_spec(spec: &FleetSpec) -> Self {
        let devices = spec.device.iter().map(DeviceSpec::build).collect();
        Self::new(devices)
    }

    /// Arm or clear a total discovery failure.
    pub fn set_discovery_error(&self, reason: Option<&str>) {
        *self.discovery_error.lock() = reason.map(str::to_owned);
    }

    /// Direct handle to a device, bypassing discovery. Test hook.
    pub fn device(&self, index: usize) -> &Arc<SimDevice> {
        &self.devices[index]
    }
}

#[async_trait]
impl PlugBackend for SimBackend {
    async fn discover(&self) -> BackendResult<Vec<Arc<dyn PlugDevice>>> {
        if let Some(reason) = self.discovery_error.lock().clone() {
            return Err(BackendError::Discovery { reason });
        }
        Ok(self
            .devices
            .iter()
            .map(|d| Arc::clone(d) as Arc<dyn PlugDevice>)
            .collect())
    }
}

// ── Fleet specs ─────────────────────────────────────────────────────

/// Declarative fleet description, deserialized from TOML.
///
/// ```toml
/// [[device]]
/// alias = "Desk Lamp"
/// host = "10.0.0.11"
/// on = true
/// cloud = true
///
/// [device.emeter]
/// power = 12.4
/// voltage = 229.8
///
/// [[device]]
/// alias = "Bench Strip"
/// host = "10.0.0.12"
///
/// [[device.outlet]]
/// alias = "Soldering Iron"
/// on = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FleetSpec {
    /// Devices, in discovery order.
    #[serde(default)]
    pub device: Vec<DeviceSpec>,
}

/// One device in a fleet spec.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSpec {
    pub alias: String,
    pub host: Option<String>,
    #[serde(default)]
    pub on: bool,
    /// Cloud session state; omit for devices without a cloud module.
    pub cloud: Option<bool>,
    pub emeter: Option<EmeterSpec>,
    #[serde(default)]
    pub outlet: Vec<OutletSpec>,
}

/// One child outlet in a fleet spec.
#[derive(Debug, Clone, Deserialize)]
pub struct OutletSpec {
    pub alias: String,
    #[serde(default)]
    pub on: bool,
    pub emeter: Option<EmeterSpec>,
}

/// Energy readings in a fleet spec.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EmeterSpec {
    pub power: Option<f64>,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
}

impl From<EmeterSpec> for EmeterReading {
    fn from(spec: EmeterSpec) -> Self {
        Self {
            power_w: spec.power,
            voltage_v: spec.voltage,
            current_a: spec.current,
        }
    }
}

impl DeviceSpec {
    fn build(&self) -> Arc<SimDevice> {
        let mut builder = SimDevice::builder(&self.alias).on(self.on);
        if let Some(ref host) = self.host {
            builder = builder.host(host);
        }
        if let Some(connected) = self.cloud {
            builder = builder.cloud(connected);
        }
        if let Some(emeter) = self.emeter {
            builder = builder.emeter(emeter.into());
        }
        for outlet in &self.outlet {
            builder = match outlet.emeter {
                Some(emeter) => builder.metered_outlet(&outlet.alias, outlet.on, emeter.into()),
                None => builder.outlet(&outlet.alias, outlet.on),
            };
        }
        builder.build()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn refresh_returns_built_snapshot() {
        let dev = SimDevice::builder("Desk Lamp")
            .host("10.0.0.11")
            .on(true)
            .cloud(true)
            .emeter(EmeterReading {
                power_w: Some(12.4),
                ..EmeterReading::default()
            })
            .build();

        let snap = dev.refresh().await.unwrap();
        assert_eq!(snap.alias, "Desk Lamp");
        assert!(snap.is_on);
        assert_eq!(snap.cloud_connected, Some(true));
        assert_eq!(snap.emeter.unwrap().power_w, Some(12.4));
        assert_eq!(dev.refresh_count(), 1);
    }

    #[tokio::test]
    async fn dropped_commands_never_change_state() {
        let dev = SimDevice::builder("Flaky")
            .behavior(CommandBehavior::Drop)
            .build();

        dev.set_power(PowerTarget::Device, true).await.unwrap();
        dev.set_power(PowerTarget::Device, true).await.unwrap();

        assert_eq!(dev.command_count(), 2);
        assert_eq!(dev.relay_state(PowerTarget::Device), Some(false));
    }

    #[tokio::test]
    async fn apply_after_lands_on_nth_command() {
        let dev = SimDevice::builder("Sticky")
            .behavior(CommandBehavior::ApplyAfter(2))
            .build();

        dev.set_power(PowerTarget::Device, true).await.unwrap();
        assert_eq!(dev.relay_state(PowerTarget::Device), Some(false));

        dev.set_power(PowerTarget::Device, true).await.unwrap();
        assert_eq!(dev.relay_state(PowerTarget::Device), Some(true));
    }

    #[tokio::test]
    async fn outlet_commands_update_aggregate_flag() {
        let dev = SimDevice::builder("Strip")
            .outlet("A", false)
            .outlet("B", false)
            .build();

        dev.set_power(PowerTarget::Outlet(1), true).await.unwrap();
        let snap = dev.refresh().await.unwrap();
        assert!(!snap.children[0].is_on);
        assert!(snap.children[1].is_on);
        assert!(snap.is_on);
    }

    #[tokio::test]
    async fn unknown_outlet_is_a_protocol_error() {
        let dev = SimDevice::builder("Plug").build();
        let err = dev.set_power(PowerTarget::Outlet(3), true).await.unwrap_err();
        assert!(matches!(err, BackendError::NoSuchOutlet { outlet: 3, .. }));
    }

    #[tokio::test]
    async fn armed_discovery_failure_propagates() {
        let backend = SimBackend::new(vec![SimDevice::builder("Lamp").build()]);
        backend.set_discovery_error(Some("no interface"));
        let Err(err) = backend.discover().await else {
            panic!("expected discovery error");
        };
        assert!(matches!(err, BackendError::Discovery { .. }));

        backend.set_discovery_error(None);
        assert_eq!(backend.discover().await.unwrap().len(), 1);
    }

    #[test]
    fn fleet_spec_round_trips_from_toml() {
        let spec: FleetSpec = toml::from_str(
            r#"
            [[device]]
            alias = "Desk Lamp"
            host = "10.0.0.11"
            on = true
            cloud = true

            [device.emeter]
            power = 12.4
            voltage = 229.8

            [[device]]
            alias = "Bench Strip"

            [[device.outlet]]
            alias = "Soldering Iron"
            on = true
            "#,
        )
        .unwrap();

        let backend = SimBackend::from_spec(&spec);
        assert_eq!(backend.device(0).host(), "10.0.0.11");
        assert_eq!(backend.device(1).host(), "sim://bench-strip");
        assert_eq!(backend.device(1).relay_state(PowerTarget::Outlet(0)), Some(true));
    }
}
