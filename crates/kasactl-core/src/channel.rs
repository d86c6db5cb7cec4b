// ── Channel model ──
//
// One flat, densely indexed space of externally addressable units. A
// single tagged enum carries what the backing unit is and how it may be
// used; there are no side tables to fall out of sync.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use strum::{Display, EnumIter};
use uuid::Uuid;

use kasactl_backend::{EmeterReading, PowerTarget};

// ── Metric ──────────────────────────────────────────────────────────

/// One numeric quantity a metering gauge reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumIter)]
pub enum Metric {
    Power,
    Voltage,
    Current,
}

impl Metric {
    /// SI unit symbol for display.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Power => "W",
            Self::Voltage => "V",
            Self::Current => "A",
        }
    }

    /// Pull this metric out of an energy reading.
    pub fn extract(self, reading: &EmeterReading) -> Option<f64> {
        match self {
            Self::Power => reading.power_w,
            Self::Voltage => reading.voltage_v,
            Self::Current => reading.current_a,
        }
    }
}

// ── UnitRef ─────────────────────────────────────────────────────────

/// Non-owning reference from a channel to its backing unit, by index
/// into the registry's device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitRef {
    /// The device's own relay.
    Device(usize),
    /// A child outlet of a multi-outlet strip.
    Outlet { device: usize, outlet: usize },
}

impl UnitRef {
    /// Index of the backing physical device.
    pub fn device_index(self) -> usize {
        match self {
            Self::Device(device) | Self::Outlet { device, .. } => device,
        }
    }

    /// Where a power command for this unit is addressed.
    pub fn power_target(self) -> PowerTarget {
        match self {
            Self::Device(_) => PowerTarget::Device,
            Self::Outlet { outlet, .. } => PowerTarget::Outlet(outlet),
        }
    }
}

// ── Channel ─────────────────────────────────────────────────────────

/// What a channel is backed by and how it may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelKind {
    /// Read/verified-write on/off state of a device or child outlet.
    Switch { unit: UnitRef },
    /// Read-only; present whenever the device is reachable.
    PowerIndicator { device: usize },
    /// Read-only; reports whether the device's cloud session is up.
    CloudLink { device: usize },
    /// Read-only; one numeric metric of a metering-capable unit.
    MeterGauge { unit: UnitRef, metric: Metric },
}

/// One externally addressable channel.
///
/// Indices are dense `0..channel_count()` and stable for the lifetime of
/// one connected session; the whole table is rebuilt on reconnect.
#[derive(Debug, Clone, Serialize)]
pub struct Channel {
    pub index: usize,
    pub name: String,
    pub kind: ChannelKind,
}

impl Channel {
    /// Whether `write` is accepted on this channel.
    pub fn is_writable(&self) -> bool {
        matches!(self.kind, ChannelKind::Switch { .. })
    }

    /// Stable name-derived identifier (UUID v5 over the DNS namespace).
    pub fn guid(&self) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_DNS, self.name.as_bytes())
    }

    /// Short kind label for listings and logs.
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            ChannelKind::Switch { .. } => "switch",
            ChannelKind::PowerIndicator { .. } => "power",
            ChannelKind::CloudLink { .. } => "cloud",
            ChannelKind::MeterGauge { .. } => "meter",
        }
    }
}

// ── ChannelId ───────────────────────────────────────────────────────

/// External channel identifier: a non-negative integer index or a
/// case-insensitive display name.
///
/// Parsing mirrors how request fields arrive off the wire: anything that
/// parses as an integer is an index, everything else is a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelId {
    Index(i64),
    Name(String),
}

impl ChannelId {
    /// Parse a raw request field: anything integral is an index,
    /// everything else a name. Infallible by construction.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(index) => Self::Index(index),
            Err(_) => Self::Name(trimmed.to_owned()),
        }
    }
}

impl FromStr for ChannelId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(n) => write!(f, "{n}"),
        }
    }
}

impl From<i64> for ChannelId {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<usize> for ChannelId {
    fn from(index: usize) -> Self {
        Self::Index(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

impl From<&str> for ChannelId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn channel_id_parses_integers_as_indices() {
        assert_eq!("3".parse::<ChannelId>().unwrap(), ChannelId::Index(3));
        assert_eq!("-1".parse::<ChannelId>().unwrap(), ChannelId::Index(-1));
        assert_eq!(" 7 ".parse::<ChannelId>().unwrap(), ChannelId::Index(7));
    }

    #[test]
    fn channel_id_parses_everything_else_as_names() {
        assert_eq!(
            "Desk Lamp".parse::<ChannelId>().unwrap(),
            ChannelId::Name("Desk Lamp".into())
        );
    }

    #[test]
    fn metric_extracts_its_own_field() {
        let reading = EmeterReading {
            power_w: Some(12.5),
            voltage_v: None,
            current_a: Some(0.05),
        };
        assert_eq!(Metric::Power.extract(&reading), Some(12.5));
        assert_eq!(Metric::Voltage.extract(&reading), None);
        assert_eq!(Metric::Current.extract(&reading), Some(0.05));
    }

    #[test]
    fn guid_is_stable_for_a_name() {
        let a = Channel {
            index: 0,
            name: "Desk Lamp".into(),
            kind: ChannelKind::Switch {
                unit: UnitRef::Device(0),
            },
        };
        let b = Channel {
            index: 5,
            name: "Desk Lamp".into(),
            kind: ChannelKind::PowerIndicator { device: 0 },
        };
        assert_eq!(a.guid(), b.guid());
    }
}
