//! Port traits: the boundary between the bring-up logic and the vendor SDK.
//!
//! ```text
//!   Adapter (wifi / ethernet / sntp) ──▶ Port trait ──▶ ESP-IDF or simulator
//! ```
//!
//! ESP-IDF implementations live in [`crate::adapters::esp`]; host
//! simulations in [`crate::adapters::sim`]. Every driver error carries the
//! vendor code unchanged.
//!
//! PHY power control and settle delays use the `embedded-hal` traits
//! (`OutputPin`, `DelayNs`) directly rather than a port of their own.

use crate::adapters::time::WallTime;
use crate::adapters::wifi::StationConfig;
use crate::config::EthernetConfig;
use crate::error::DriverError;

// ───────────────────────────────────────────────────────────────
// WiFi radio (driven by the join thread and the dispatch thread)
// ───────────────────────────────────────────────────────────────

/// Station-mode radio control.
///
/// Called both from the thread running `join` and from the event-dispatch
/// thread (reconnects), hence `&self` and `Send + Sync`. None of these calls
/// block until association; results arrive later as events.
pub trait WifiRadio: Send + Sync {
    /// Bring the driver up with no mode selected and RAM-only credential
    /// storage.
    fn init(&self) -> Result<(), DriverError>;

    /// Select station mode and apply SSID/passphrase/security settings.
    fn configure_station(&self, config: &StationConfig) -> Result<(), DriverError>;

    fn start(&self) -> Result<(), DriverError>;

    /// Stop the radio. Stopping an already stopped radio succeeds.
    fn stop(&self) -> Result<(), DriverError>;

    /// Request one association attempt.
    fn connect(&self) -> Result<(), DriverError>;
}

// ───────────────────────────────────────────────────────────────
// Ethernet MAC/PHY
// ───────────────────────────────────────────────────────────────

/// EMAC + PHY driver.
pub trait EthernetMac {
    /// Install the MAC/PHY driver with the given SMI pins, PHY address and
    /// RMII clock mode. The PHY is already powered when this is called.
    fn init(&mut self, config: &EthernetConfig) -> Result<(), DriverError>;

    /// Start the MAC/PHY pair; link and address arrive as events.
    fn enable(&mut self) -> Result<(), DriverError>;
}

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// SNTP client in poll mode.
pub trait SntpClient {
    fn start(&mut self, server: &str) -> Result<(), DriverError>;
}

/// System wall clock.
pub trait WallClock {
    /// Whole seconds since the epoch plus a sub-second sample from the
    /// high-resolution timer, read together.
    fn now(&self) -> WallTime;

    /// Make local time equal UTC for this process.
    fn set_timezone_utc(&self);
}
