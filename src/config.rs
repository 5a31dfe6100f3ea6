//! Network bring-up configuration.
//!
//! All tunable parameters for WiFi, Ethernet and SNTP. Defaults match the
//! board this firmware ships on; values can be persisted with
//! [`NetworkConfig::to_bytes`] and restored with [`NetworkConfig::from_bytes`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pins;

/// Minimum PHY power settling time required by the LAN8720 datasheet.
pub const MIN_PHY_SETTLE_US: u32 = 300;

// ---------------------------------------------------------------------------
// WiFi
// ---------------------------------------------------------------------------

/// Weakest access-point security the station will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthThreshold {
    Open,
    WpaPsk,
    Wpa2Psk,
    Wpa3Psk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfig {
    /// Reconnect attempts after a disconnect before the join gives up.
    pub max_retries: u32,
    /// Join timeout used by the firmware entry point.
    pub join_timeout_ms: u32,
    pub auth_threshold: AuthThreshold,
    /// Protected management frames: advertise support.
    pub pmf_capable: bool,
    /// Protected management frames: refuse APs without them.
    pub pmf_required: bool,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            join_timeout_ms: 10_000,
            auth_threshold: AuthThreshold::Wpa2Psk,
            pmf_capable: true,
            pmf_required: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Ethernet
// ---------------------------------------------------------------------------

/// RMII reference clock source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RmiiClockMode {
    /// External 50 MHz oscillator into GPIO0.
    Gpio0In,
    /// ESP32 drives the 50 MHz clock out of GPIO17.
    Gpio17Out,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthernetConfig {
    pub phy_addr: u8,
    pub mdc_gpio: i32,
    pub mdio_gpio: i32,
    pub phy_power_gpio: i32,
    pub clock_mode: RmiiClockMode,
    /// Delay after each PHY power transition, in microseconds.
    pub phy_settle_us: u32,
}

impl Default for EthernetConfig {
    fn default() -> Self {
        Self {
            phy_addr: pins::PHY_ADDR,
            mdc_gpio: pins::SMI_MDC_GPIO,
            mdio_gpio: pins::SMI_MDIO_GPIO,
            phy_power_gpio: pins::PHY_POWER_GPIO,
            clock_mode: RmiiClockMode::Gpio17Out,
            // One FreeRTOS tick at 100 Hz, well above the 300 us minimum.
            phy_settle_us: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// SNTP
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SntpConfig {
    pub server: heapless::String<64>,
    /// Sleep between clock checks while waiting for the first sync.
    pub poll_interval_ms: u32,
    /// Clock checks before `wait_for_sync` gives up.
    pub max_polls: u32,
    /// Readings before 1 January of this year count as "not yet synced".
    pub min_valid_year: i32,
}

impl Default for SntpConfig {
    fn default() -> Self {
        let mut server = heapless::String::new();
        // "pool.ntp.org" always fits in 64 bytes.
        let _ = server.push_str("pool.ntp.org");
        Self {
            server,
            poll_interval_ms: 2_000,
            max_polls: 20,
            min_valid_year: 2017,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub wifi: WifiConfig,
    pub ethernet: EthernetConfig,
    pub sntp: SntpConfig,
}

impl NetworkConfig {
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    pub fn with_ethernet(mut self, ethernet: EthernetConfig) -> Self {
        self.ethernet = ethernet;
        self
    }

    pub fn with_sntp(mut self, sntp: SntpConfig) -> Self {
        self.sntp = sntp;
        self
    }

    /// Reject values the adapters cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.wifi.pmf_required && !self.wifi.pmf_capable {
            return Err(Error::Config("wifi.pmf_required needs pmf_capable"));
        }
        if self.ethernet.phy_settle_us < MIN_PHY_SETTLE_US {
            return Err(Error::Config("ethernet.phy_settle_us below 300 us"));
        }
        if self.ethernet.phy_addr > 31 {
            return Err(Error::Config("ethernet.phy_addr must be 0-31"));
        }
        if self.sntp.server.is_empty() {
            return Err(Error::Config("sntp.server is empty"));
        }
        if self.sntp.poll_interval_ms == 0 {
            return Err(Error::Config("sntp.poll_interval_ms must be > 0"));
        }
        if self.sntp.max_polls == 0 {
            return Err(Error::Config("sntp.max_polls must be > 0"));
        }
        if self.sntp.min_valid_year < 1970 {
            return Err(Error::Config("sntp.min_valid_year before the epoch"));
        }
        Ok(())
    }

    /// Encode for NVS storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("encode failed"))
    }

    /// Decode and validate a blob produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let config: Self =
            postcard::from_bytes(bytes).map_err(|_| Error::Config("stored config corrupted"))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = NetworkConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.wifi.max_retries, 1);
        assert_eq!(c.sntp.server.as_str(), "pool.ntp.org");
        assert_eq!(c.sntp.poll_interval_ms, 2_000);
        assert_eq!(c.sntp.max_polls, 20);
        assert_eq!(c.sntp.min_valid_year, 2017);
        assert_eq!(c.ethernet.mdc_gpio, 23);
        assert_eq!(c.ethernet.mdio_gpio, 18);
        assert_eq!(c.ethernet.phy_power_gpio, 12);
        assert_eq!(c.ethernet.phy_addr, 0);
    }

    #[test]
    fn default_wifi_is_wpa2_with_optional_pmf() {
        let w = WifiConfig::default();
        assert_eq!(w.auth_threshold, AuthThreshold::Wpa2Psk);
        assert!(w.pmf_capable);
        assert!(!w.pmf_required);
    }

    #[test]
    fn rejects_short_phy_settle() {
        let mut c = NetworkConfig::default();
        c.ethernet.phy_settle_us = 100;
        assert!(matches!(c.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_zero_poll_budget() {
        let mut c = NetworkConfig::default();
        c.sntp.max_polls = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_pmf_required_without_capable() {
        let mut c = NetworkConfig::default();
        c.wifi.pmf_capable = false;
        c.wifi.pmf_required = true;
        assert!(c.validate().is_err());
    }

    #[test]
    fn serde_json_roundtrip() {
        let c = NetworkConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: NetworkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn persisted_blob_roundtrip() {
        let mut c = NetworkConfig::default();
        c.wifi.max_retries = 3;
        let bytes = c.to_bytes().unwrap();
        assert_eq!(NetworkConfig::from_bytes(&bytes).unwrap(), c);
    }

    #[test]
    fn corrupted_blob_is_rejected() {
        assert_eq!(
            NetworkConfig::from_bytes(&[0xff, 0xff]),
            Err(Error::Config("stored config corrupted"))
        );
    }
}
