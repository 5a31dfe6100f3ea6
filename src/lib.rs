//! Network bring-up for ESP32 boards: WiFi station, LAN8720 Ethernet and
//! SNTP time sync.
//!
//! Everything above the port traits is plain `std` and runs on the host
//! against the simulators in [`adapters::sim`]. ESP-IDF code is guarded by
//! `#[cfg(target_os = "espidf")]`.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod network;
pub mod pins;
pub mod ports;
pub mod readiness;
pub mod task;

pub use adapters::ethernet::EthernetAdapter;
pub use adapters::sntp::{SyncState, TimeSync, TimeSyncOutcome};
pub use adapters::wifi::{ConnectionOutcome, WifiCredentials, WifiStation};
pub use config::NetworkConfig;
pub use error::{CredentialsError, DriverError, Error, Result};
pub use events::{EventLoop, NetEvent};
pub use network::Network;
pub use readiness::{ReadinessFlags, ReadinessSignal};
