// ── Controller abstraction ──
//
// The synchronous facade over the fleet. Owns the bridge, the backend
// handle, and the published registry; every inbound operation resolves
// against the current table and dispatches backend work through the
// bridge. Explicitly constructed and injectable -- there is no shared
// module-level instance.

use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use kasactl_backend::{PlugBackend, PlugSnapshot, PowerTarget};

use crate::bridge::Bridge;
use crate::channel::{Channel, ChannelId, ChannelKind};
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::registry::{ChannelTable, DeviceSummary, Registry};

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. All methods are
/// synchronous and may be called from any thread; backend work is
/// serialized through the internal bridge, so callers block only for
/// their own operation plus whatever is queued ahead of it.
#[derive(Clone)]
pub struct PlugController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    backend: Arc<dyn PlugBackend>,
    bridge: Bridge,
    registry: Registry,
    /// Serializes connect/disconnect; read paths never take it.
    lifecycle: Mutex<()>,
}

impl PlugController {
    /// Create a controller over the given backend. Does NOT connect --
    /// call [`connect()`](Self::connect) to discover the fleet.
    pub fn new(backend: Arc<dyn PlugBackend>, config: ControllerConfig) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                config,
                backend,
                bridge: Bridge::new(),
                registry: Registry::new(),
                lifecycle: Mutex::new(()),
            }),
        }
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Discover the fleet and publish a fresh channel table.
    ///
    /// Devices whose initial telemetry refresh fails are logged and
    /// excluded; a failed discovery pass aborts the whole connect and
    /// leaves the controller disconnected with an empty table. Safe to
    /// call while connected: the table is rebuilt wholesale.
    pub fn connect(&self) -> Result<(), CoreError> {
        let _guard = self.inner.lifecycle.lock().expect("lifecycle lock poisoned");

        let backend = Arc::clone(&self.inner.backend);
        let op_timeout = self.inner.config.op_timeout();
        let discovered = self.inner.bridge.run(
            "discover",
            self.inner.config.discover_timeout(),
            async move {
                let handles = backend.discover().await?;
                let mut discovered = Vec::with_capacity(handles.len());
                for handle in handles {
                    match tokio::time::timeout(op_timeout, handle.refresh()).await {
                        Ok(Ok(snapshot)) => discovered.push((handle, snapshot)),
                        Ok(Err(err)) => {
                            warn!(host = handle.host(), error = %err, "device excluded: refresh failed");
                        }
                        Err(_) => {
                            warn!(host = handle.host(), "device excluded: refresh timed out");
                        }
                    }
                }
                Ok(discovered)
            },
        );

        match discovered {
            Ok(discovered) => {
                let table = ChannelTable::build(discovered);
                info!(
                    devices = table.device_count(),
                    channels = table.len(),
                    "fleet connected"
                );
                self.inner.registry.publish(table);
                Ok(())
            }
            Err(err) => {
                self.inner.registry.clear();
                error!(error = %err, "connect failed");
                Err(err)
            }
        }
    }

    /// Drop the channel table and tear down the bridge context.
    ///
    /// Idempotent, in-process only. Teardown is best-effort; the next
    /// connect recreates an idle context.
    pub fn disconnect(&self) {
        let _guard = self.inner.lifecycle.lock().expect("lifecycle lock poisoned");
        self.inner.registry.clear();
        self.inner.bridge.shutdown();
        debug!("disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.inner.registry.is_connected()
    }

    // ── Channel table access ─────────────────────────────────────

    /// Number of channels in the current table; 0 while disconnected.
    pub fn channel_count(&self) -> usize {
        self.inner.registry.table().len()
    }

    /// Number of discovered devices; 0 while disconnected.
    pub fn device_count(&self) -> usize {
        self.inner.registry.table().device_count()
    }

    /// Snapshot of the current channel table.
    pub fn channels(&self) -> Vec<Channel> {
        self.inner.registry.table().channels().to_vec()
    }

    /// Connect-time identity and capabilities of each discovered device.
    pub fn devices(&self) -> Vec<DeviceSummary> {
        self.inner.registry.table().device_summaries()
    }

    /// Map an index or case-insensitive name to its channel.
    pub fn resolve(&self, id: &ChannelId) -> Result<Channel, CoreError> {
        self.inner.registry.table().resolve(id).cloned()
    }

    /// Whether `write` is accepted on the channel.
    pub fn can_write(&self, channel: &Channel) -> bool {
        channel.is_writable()
    }

    // ── State access ─────────────────────────────────────────────

    /// Read the boolean state of a channel.
    ///
    /// Switches report their relay after a fresh refresh; power
    /// indicators are `true` by definition while the fleet is connected;
    /// cloud links report the device's session flag (`false` when the
    /// capability is absent); gauges report whether their metric
    /// currently carries a value.
    pub fn read(&self, channel: &Channel) -> Result<bool, CoreError> {
        self.ensure_connected()?;
        match channel.kind {
            // Presence is power: the device was reachable at connect.
            ChannelKind::PowerIndicator { .. } => Ok(true),
            ChannelKind::Switch { unit } => {
                let snapshot = self.refresh_device(unit.device_index())?;
                snapshot
                    .is_on_at(unit.power_target())
                    .ok_or_else(|| Self::unit_vanished(&snapshot))
            }
            ChannelKind::CloudLink { device } => {
                let snapshot = self.refresh_device(device)?;
                Ok(snapshot.cloud_connected.unwrap_or(false))
            }
            ChannelKind::MeterGauge { unit, metric } => {
                let snapshot = self.refresh_device(unit.device_index())?;
                Ok(snapshot
                    .emeter_at(unit.power_target())
                    .is_some_and(|r| metric.extract(&r).is_some()))
            }
        }
    }

    /// Drive a switch channel to the desired state, with verification.
    ///
    /// The command protocol is fire-and-forget, so each attempt is
    /// command, settle delay, refresh, compare -- up to the configured
    /// attempt budget. Read-only channels are refused before any backend
    /// contact.
    pub fn write(&self, channel: &Channel, desired: bool) -> Result<(), CoreError> {
        self.ensure_connected()?;
        let ChannelKind::Switch { unit } = channel.kind else {
            return Err(CoreError::ReadOnly {
                name: channel.name.clone(),
            });
        };

        let attempts = self.inner.config.write_attempts.max(1);
        let settle = self.inner.config.settle_delay();
        let op_timeout = self.inner.config.op_timeout() + settle;
        let target = unit.power_target();
        let mut observed = !desired;

        for attempt in 1..=attempts {
            let handle = {
                let table = self.inner.registry.table();
                let record = table
                    .device(unit.device_index())
                    .ok_or(CoreError::NotConnected)?;
                Arc::clone(&record.handle)
            };
            let snapshot = self.inner.bridge.run("set-state", op_timeout, async move {
                handle.set_power(target, desired).await?;
                tokio::time::sleep(settle).await;
                handle.refresh().await
            })?;

            match snapshot.is_on_at(target) {
                Some(state) if state == desired => {
                    debug!(channel = %channel.name, attempt, desired, "write settled");
                    return Ok(());
                }
                Some(state) => {
                    observed = state;
                    warn!(
                        channel = %channel.name,
                        attempt, desired, observed,
                        "state did not settle, retrying"
                    );
                }
                None => return Err(Self::unit_vanished(&snapshot)),
            }
        }

        Err(CoreError::StateMismatch {
            name: channel.name.clone(),
            desired,
            observed,
            attempts,
        })
    }

    // ── Metering ─────────────────────────────────────────────────

    /// Read the numeric value of a channel.
    ///
    /// Gauges report their metric, or `None` when the backend snapshot
    /// currently lacks it -- a miss is logged, never an error. Other
    /// channel kinds report their boolean state as 0.0 / 1.0.
    pub fn read_metric(&self, channel: &Channel) -> Result<Option<f64>, CoreError> {
        self.ensure_connected()?;
        match channel.kind {
            ChannelKind::MeterGauge { unit, metric } => {
                let snapshot = self.refresh_device(unit.device_index())?;
                let value = snapshot
                    .emeter_at(unit.power_target())
                    .and_then(|r| metric.extract(&r));
                if value.is_none() {
                    debug!(channel = %channel.name, %metric, "metric not reported by backend");
                }
                Ok(value)
            }
            _ => Ok(Some(if self.read(channel)? { 1.0 } else { 0.0 })),
        }
    }

    /// Human-readable description of a channel's current state.
    pub fn describe(&self, channel: &Channel) -> Result<String, CoreError> {
        self.ensure_connected()?;
        match channel.kind {
            ChannelKind::Switch { .. } => {
                Ok(format!("{} (GUID: {})", channel.name, channel.guid()))
            }
            ChannelKind::PowerIndicator { device } => {
                let snapshot = self.refresh_device(device)?;
                Ok(match snapshot.on_since {
                    Some(since) => {
                        format!("{} powered since {}", snapshot.alias, since.to_rfc3339())
                    }
                    None => format!("{} powered", snapshot.alias),
                })
            }
            ChannelKind::CloudLink { device } => {
                let snapshot = self.refresh_device(device)?;
                let session = if snapshot.cloud_connected.unwrap_or(false) {
                    "active"
                } else {
                    "inactive"
                };
                Ok(format!("{} cloud session {session}", snapshot.alias))
            }
            ChannelKind::MeterGauge { unit, metric } => {
                let snapshot = self.refresh_device(unit.device_index())?;
                let owner = match unit.power_target() {
                    PowerTarget::Device => snapshot.alias.clone(),
                    PowerTarget::Outlet(i) => snapshot
                        .children
                        .get(i)
                        .map_or_else(|| snapshot.alias.clone(), |c| c.alias.clone()),
                };
                let value = snapshot
                    .emeter_at(unit.power_target())
                    .and_then(|r| metric.extract(&r));
                let mut text = match value {
                    Some(v) => format!("{owner} {metric}: {v:.1} {}", metric.unit()),
                    None => format!("{owner} {metric}: unavailable"),
                };
                if let Some(since) = snapshot.on_since {
                    text.push_str(&format!(" (powered since {})", since.to_rfc3339()));
                }
                Ok(text)
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────

    fn ensure_connected(&self) -> Result<(), CoreError> {
        if self.inner.registry.is_connected() {
            Ok(())
        } else {
            Err(CoreError::NotConnected)
        }
    }

    /// Fetch fresh telemetry for the device backing a channel.
    fn refresh_device(&self, device: usize) -> Result<PlugSnapshot, CoreError> {
        let handle = {
            let table = self.inner.registry.table();
            let record = table.device(device).ok_or(CoreError::NotConnected)?;
            Arc::clone(&record.handle)
        };
        self.inner.bridge.run(
            "refresh",
            self.inner.config.op_timeout(),
            async move { handle.refresh().await },
        )
    }

    /// The backing unit disappeared between connect and this request --
    /// the device was reconfigured under us.
    fn unit_vanished(snapshot: &PlugSnapshot) -> CoreError {
        CoreError::Backend {
            operation: "refresh",
            message: format!(
                "unit no longer reported by '{}'; reconnect to re-enumerate",
                snapshot.alias
            ),
        }
    }
}
