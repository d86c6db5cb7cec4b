//! Backend boundary for the kasactl workspace.
//!
//! Smart-plug control is inherently asynchronous: discovery is a network
//! broadcast, commands are fire-and-forget datagrams, and telemetry is a
//! fresh round-trip every time. This crate pins that capability down as a
//! pair of traits -- [`PlugBackend`] for discovery, [`PlugDevice`] for one
//! reachable unit -- together with the snapshot types a refresh returns.
//!
//! The vendor protocol itself lives behind these traits and is not
//! implemented here. What IS implemented is [`sim`]: a deterministic
//! in-process fleet used by the test suites and by the CLI's `--fleet`
//! development mode. A real transport slots in beside it by implementing
//! the same two traits.

pub mod device;
pub mod error;
pub mod sim;

pub use device::{
    BackendResult, EmeterReading, OutletSnapshot, PlugBackend, PlugDevice, PlugSnapshot,
    PowerTarget,
};
pub use error::BackendError;
