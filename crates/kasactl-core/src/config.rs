// ── Controller configuration ──

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the device controller.
///
/// The defaults are the empirically useful values for consumer plug
/// hardware on a home network; deployments with slower links raise the
/// timeouts through their config profile rather than patching constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Bounded wait for a full discovery pass, including the initial
    /// telemetry refresh of every discovered device.
    pub discover_timeout_secs: u64,

    /// Bounded wait for a single refresh or power command.
    pub op_timeout_secs: u64,

    /// Rounds of command / settle / verify before a write gives up.
    pub write_attempts: u32,

    /// Wait between issuing a power command and re-reading state. Plug
    /// firmware needs a beat before its reported state catches up.
    pub settle_delay_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            discover_timeout_secs: 30,
            op_timeout_secs: 5,
            write_attempts: 3,
            settle_delay_ms: 1200,
        }
    }
}

impl ControllerConfig {
    pub fn discover_timeout(&self) -> Duration {
        Duration::from_secs(self.discover_timeout_secs)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
