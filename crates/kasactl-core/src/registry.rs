// ── Device registry ──
//
// Holds the discovered fleet and the flat channel table derived from it.
// The table is built wholesale during connect, published atomically, and
// destroyed on disconnect; channel indices are never reused within a
// session. Capabilities are probed exactly once here -- nothing later in
// the request path asks a device what it can do.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::debug;

use kasactl_backend::{EmeterReading, PlugDevice, PlugSnapshot};

use crate::channel::{Channel, ChannelId, ChannelKind, Metric, UnitRef};
use crate::error::CoreError;

// ── Capabilities ────────────────────────────────────────────────────

/// What a device can do, decided once at connect time.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DeviceCaps {
    /// Multi-outlet strip with addressable children.
    pub has_children: bool,
    /// Some unit of the device (itself or a child) meters energy.
    pub has_metering: bool,
    /// The device has a cloud module (connected or not).
    pub has_cloud: bool,
}

impl DeviceCaps {
    fn probe(snapshot: &PlugSnapshot) -> Self {
        Self {
            has_children: !snapshot.children.is_empty(),
            has_metering: snapshot.emeter.is_some()
                || snapshot.children.iter().any(|c| c.emeter.is_some()),
            has_cloud: snapshot.cloud_connected.is_some(),
        }
    }
}

// ── Device records ──────────────────────────────────────────────────

/// One discovered device and its connect-time identity.
///
/// Live state (relay, cloud session, readings) is never cached here; it
/// is fetched fresh through the bridge on every read.
pub struct DeviceRecord {
    pub(crate) handle: Arc<dyn PlugDevice>,
    pub host: String,
    pub alias: String,
    pub caps: DeviceCaps,
    pub child_aliases: Vec<String>,
}

impl DeviceRecord {
    /// Handle-free view for listings and serialization.
    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            host: self.host.clone(),
            alias: self.alias.clone(),
            caps: self.caps,
            child_aliases: self.child_aliases.clone(),
        }
    }
}

/// Connect-time identity of one discovered device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub host: String,
    pub alias: String,
    pub caps: DeviceCaps,
    pub child_aliases: Vec<String>,
}

// ── Channel table ───────────────────────────────────────────────────

/// The dense channel table plus the device records it refers to.
pub struct ChannelTable {
    devices: Vec<DeviceRecord>,
    channels: Vec<Channel>,
}

/// Metrics a reading reports, in fixed enumeration order.
fn supported_metrics(reading: Option<&EmeterReading>) -> Vec<Metric> {
    match reading {
        Some(reading) => Metric::iter()
            .filter(|m| m.extract(reading).is_some())
            .collect(),
        None => Vec::new(),
    }
}

impl ChannelTable {
    pub(crate) fn empty() -> Self {
        Self {
            devices: Vec::new(),
            channels: Vec::new(),
        }
    }

    /// Build the table from a discovery pass, in discovery order.
    ///
    /// Per device: power indicator, cloud link (when the device has a
    /// cloud module), then one switch per child outlet -- or one for the
    /// device itself when it has none -- with meter gauges appended per
    /// supported metric right after the unit that meters them. A child
    /// without its own meter falls back to the parent's; parent-backed
    /// gauges on a strip are emitted once, after the children.
    pub(crate) fn build(discovered: Vec<(Arc<dyn PlugDevice>, PlugSnapshot)>) -> Self {
        let mut devices = Vec::with_capacity(discovered.len());
        let mut channels: Vec<Channel> = Vec::new();

        let push = |channels: &mut Vec<Channel>, name: String, kind: ChannelKind| {
            let index = channels.len();
            channels.push(Channel { index, name, kind });
        };

        for (device_index, (handle, snapshot)) in discovered.into_iter().enumerate() {
            let caps = DeviceCaps::probe(&snapshot);
            debug!(
                host = handle.host(),
                alias = %snapshot.alias,
                ?caps,
                "enumerating device"
            );

            push(
                &mut channels,
                format!("{} Powered", snapshot.alias),
                ChannelKind::PowerIndicator {
                    device: device_index,
                },
            );
            if caps.has_cloud {
                push(
                    &mut channels,
                    format!("{} Cloud", snapshot.alias),
                    ChannelKind::CloudLink {
                        device: device_index,
                    },
                );
            }

            if snapshot.children.is_empty() {
                let unit = UnitRef::Device(device_index);
                push(&mut channels, snapshot.alias.clone(), ChannelKind::Switch { unit });
                for metric in supported_metrics(snapshot.emeter.as_ref()) {
                    push(
                        &mut channels,
                        format!("{} {metric}", snapshot.alias),
                        ChannelKind::MeterGauge { unit, metric },
                    );
                }
            } else {
                let mut any_unmetered_child = false;
                for (outlet_index, child) in snapshot.children.iter().enumerate() {
                    let unit = UnitRef::Outlet {
                        device: device_index,
                        outlet: outlet_index,
                    };
                    push(&mut channels, child.alias.clone(), ChannelKind::Switch { unit });
                    if child.emeter.is_some() {
                        for metric in supported_metrics(child.emeter.as_ref()) {
                            push(
                                &mut channels,
                                format!("{} {metric}", child.alias),
                                ChannelKind::MeterGauge { unit, metric },
                            );
                        }
                    } else {
                        any_unmetered_child = true;
                    }
                }
                // Fallback: children without their own meter share the
                // parent's, emitted once per metric.
                if any_unmetered_child {
                    let unit = UnitRef::Device(device_index);
                    for metric in supported_metrics(snapshot.emeter.as_ref()) {
                        push(
                            &mut channels,
                            format!("{} {metric}", snapshot.alias),
                            ChannelKind::MeterGauge { unit, metric },
                        );
                    }
                }
            }

            devices.push(DeviceRecord {
                host: handle.host().to_owned(),
                alias: snapshot.alias.clone(),
                caps,
                child_aliases: snapshot.children.iter().map(|c| c.alias.clone()).collect(),
                handle,
            });
        }

        Self { devices, channels }
    }

    pub(crate) fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub(crate) fn len(&self) -> usize {
        self.channels.len()
    }

    pub(crate) fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub(crate) fn device(&self, index: usize) -> Option<&DeviceRecord> {
        self.devices.get(index)
    }

    pub(crate) fn device_summaries(&self) -> Vec<DeviceSummary> {
        self.devices.iter().map(DeviceRecord::summary).collect()
    }

    /// Map an external identifier to its channel.
    ///
    /// Integer path: dense-range check. Name path: case-insensitive exact
    /// match, lowest index wins; no partial matching.
    pub(crate) fn resolve(&self, id: &ChannelId) -> Result<&Channel, CoreError> {
        match id {
            ChannelId::Index(index) => usize::try_from(*index)
                .ok()
                .and_then(|i| self.channels.get(i))
                .ok_or(CoreError::OutOfRange {
                    index: *index,
                    count: self.channels.len(),
                }),
            ChannelId::Name(name) => self
                .channels
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| CoreError::NotFound { name: name.clone() }),
        }
    }
}

// ── Published store ─────────────────────────────────────────────────

/// Atomically published registry state.
///
/// Reads are lock-free snapshots; only connect/disconnect swap the
/// table. `connected` flips true strictly after a full table is
/// published and false strictly before one is torn down.
pub(crate) struct Registry {
    table: ArcSwap<ChannelTable>,
    connected: AtomicBool,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(ChannelTable::empty()),
            connected: AtomicBool::new(false),
        }
    }

    pub(crate) fn publish(&self, table: ChannelTable) {
        self.table.store(Arc::new(table));
        self.connected.store(true, Ordering::Release);
    }

    pub(crate) fn clear(&self) {
        self.connected.store(false, Ordering::Release);
        self.table.store(Arc::new(ChannelTable::empty()));
    }

    pub(crate) fn table(&self) -> Arc<ChannelTable> {
        self.table.load_full()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kasactl_backend::OutletSnapshot;
    use kasactl_backend::sim::SimDevice;
    use pretty_assertions::assert_eq;

    fn handle(alias: &str) -> Arc<dyn PlugDevice> {
        SimDevice::builder(alias).build()
    }

    fn plain_snapshot(alias: &str) -> PlugSnapshot {
        PlugSnapshot {
            alias: alias.into(),
            is_on: false,
            cloud_connected: None,
            on_since: None,
            emeter: None,
            children: Vec::new(),
        }
    }

    fn power_only() -> EmeterReading {
        EmeterReading {
            power_w: Some(4.2),
            voltage_v: None,
            current_a: None,
        }
    }

    #[test]
    fn enumeration_order_for_strip_and_plain_device() {
        // Device 1: one child outlet, parent-level metering, cloud.
        // Device 2: plain plug with cloud.
        let mut strip = plain_snapshot("Bench Strip");
        strip.cloud_connected = Some(true);
        strip.emeter = Some(power_only());
        strip.children.push(OutletSnapshot {
            alias: "Soldering Iron".into(),
            is_on: false,
            emeter: None,
        });

        let mut lamp = plain_snapshot("Desk Lamp");
        lamp.cloud_connected = Some(false);

        let table = ChannelTable::build(vec![
            (handle("Bench Strip"), strip),
            (handle("Desk Lamp"), lamp),
        ]);

        let names: Vec<&str> = table.channels().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Bench Strip Powered",
                "Bench Strip Cloud",
                "Soldering Iron",
                "Bench Strip Power",
                "Desk Lamp Powered",
                "Desk Lamp Cloud",
                "Desk Lamp",
            ]
        );

        let kinds: Vec<&'static str> =
            table.channels().iter().map(Channel::kind_label).collect();
        assert_eq!(
            kinds,
            vec!["power", "cloud", "switch", "meter", "power", "cloud", "switch"]
        );

        // The fallback gauge is backed by the parent device.
        assert_eq!(
            table.channels()[3].kind,
            ChannelKind::MeterGauge {
                unit: UnitRef::Device(0),
                metric: Metric::Power
            }
        );
    }

    #[test]
    fn indices_are_dense() {
        let mut snap = plain_snapshot("Plug");
        snap.cloud_connected = Some(true);
        snap.emeter = Some(EmeterReading {
            power_w: Some(1.0),
            voltage_v: Some(230.0),
            current_a: Some(0.01),
        });
        let table = ChannelTable::build(vec![(handle("Plug"), snap)]);

        for (i, channel) in table.channels().iter().enumerate() {
            assert_eq!(channel.index, i);
        }
        // Powered, Cloud, switch, three gauges.
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn metered_child_keeps_its_own_gauges() {
        let mut strip = plain_snapshot("Strip");
        strip.emeter = Some(power_only());
        strip.children.push(OutletSnapshot {
            alias: "Heater".into(),
            is_on: true,
            emeter: Some(power_only()),
        });

        let table = ChannelTable::build(vec![(handle("Strip"), strip)]);
        // Every child meters on its own, so no parent fallback gauge.
        let gauges: Vec<_> = table
            .channels()
            .iter()
            .filter(|c| matches!(c.kind, ChannelKind::MeterGauge { .. }))
            .collect();
        assert_eq!(gauges.len(), 1);
        assert_eq!(gauges[0].name, "Heater Power");
        assert_eq!(
            gauges[0].kind,
            ChannelKind::MeterGauge {
                unit: UnitRef::Outlet {
                    device: 0,
                    outlet: 0
                },
                metric: Metric::Power
            }
        );
    }

    #[test]
    fn cloudless_devices_get_no_cloud_link() {
        let table = ChannelTable::build(vec![(handle("Plug"), plain_snapshot("Plug"))]);
        assert!(
            table
                .channels()
                .iter()
                .all(|c| !matches!(c.kind, ChannelKind::CloudLink { .. }))
        );
    }

    #[test]
    fn resolve_rejects_out_of_range_indices() {
        let table = ChannelTable::build(vec![(handle("Plug"), plain_snapshot("Plug"))]);

        let err = table.resolve(&ChannelId::Index(-1)).unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { index: -1, .. }));

        let count = i64::try_from(table.len()).unwrap();
        let err = table.resolve(&ChannelId::Index(count)).unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { .. }));
    }

    #[test]
    fn resolve_matches_names_case_insensitively() {
        let table = ChannelTable::build(vec![(handle("Desk Lamp"), plain_snapshot("Desk Lamp"))]);

        let channel = table.resolve(&ChannelId::Name("desk lamp".into())).unwrap();
        assert!(channel.is_writable());

        let err = table
            .resolve(&ChannelId::Name("desk".into()))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn registry_publish_and_clear() {
        let registry = Registry::new();
        assert!(!registry.is_connected());
        assert_eq!(registry.table().len(), 0);

        registry.publish(ChannelTable::build(vec![(
            handle("Plug"),
            plain_snapshot("Plug"),
        )]));
        assert!(registry.is_connected());
        assert_eq!(registry.table().len(), 2);

        registry.clear();
        assert!(!registry.is_connected());
        assert_eq!(registry.table().len(), 0);
    }
}
