//! Network facade.
//!
//! Owns the readiness signal and the event loop, and hands both to every
//! adapter it builds. The firmware entry point talks to this type only.

use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::info;

use crate::adapters::ethernet::EthernetAdapter;
use crate::adapters::sntp::TimeSync;
use crate::adapters::wifi::WifiStation;
use crate::config::NetworkConfig;
use crate::error::Result;
use crate::events::EventLoop;
use crate::ports::{EthernetMac, SntpClient, WallClock, WifiRadio};
use crate::readiness::{ReadinessFlags, ReadinessSignal};

pub struct Network {
    config: NetworkConfig,
    signal: ReadinessSignal,
    events: EventLoop,
}

impl Network {
    /// Validate `config` and start the event-dispatch thread.
    pub fn start(config: NetworkConfig) -> Result<Self> {
        config.validate()?;
        let events = EventLoop::start()?;
        info!("network: event loop running");
        Ok(Self {
            config,
            signal: ReadinessSignal::new(),
            events,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn signal(&self) -> &ReadinessSignal {
        &self.signal
    }

    pub fn events(&self) -> &EventLoop {
        &self.events
    }

    /// Bring the WiFi driver up idle; join later with [`WifiStation::join`].
    pub fn initialize_wifi<R: WifiRadio + 'static>(&self, radio: R) -> Result<WifiStation<R>> {
        let station = WifiStation::new(radio, self.signal.clone(), self.config.wifi.clone());
        station.initialize(&self.events)?;
        Ok(station)
    }

    /// Power the PHY and start the EMAC. Returns as soon as the driver is
    /// running; the link comes up asynchronously.
    pub fn initialize_ethernet<M, P, D>(
        &self,
        mac: M,
        phy_power: P,
        delay: D,
    ) -> Result<EthernetAdapter<M, P, D>>
    where
        M: EthernetMac,
        P: OutputPin,
        D: DelayNs,
    {
        let mut eth = EthernetAdapter::new(
            mac,
            phy_power,
            delay,
            self.signal.clone(),
            self.config.ethernet.clone(),
        );
        eth.initialize(&self.events)?;
        Ok(eth)
    }

    /// Time sync bound to the configured NTP server. Nothing starts until
    /// [`TimeSync::initialize`] or [`TimeSync::update_time`].
    pub fn time_sync<S, C, D>(&self, sntp: S, clock: C, delay: D) -> TimeSync<S, C, D>
    where
        S: SntpClient,
        C: WallClock,
        D: DelayNs,
    {
        TimeSync::new(sntp, clock, delay, self.config.sntp.clone())
    }

    /// Join timeout from the WiFi configuration.
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.config.wifi.join_timeout_ms))
    }

    pub fn any_network_ready(&self) -> bool {
        self.signal.any_network_ready()
    }

    /// Block until any interface is usable or `timeout` elapses.
    pub fn wait_for_network(&self, timeout: Duration) -> bool {
        self.signal
            .wait_any(ReadinessFlags::ANY_NETWORK, timeout)
            .intersects(ReadinessFlags::ANY_NETWORK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn rejects_invalid_config() {
        let mut config = NetworkConfig::default();
        config.sntp.poll_interval_ms = 0;
        assert!(matches!(Network::start(config), Err(Error::Config(_))));
    }

    #[test]
    fn starts_with_no_network() {
        let net = Network::start(NetworkConfig::default()).unwrap();
        assert!(!net.any_network_ready());
        assert!(!net.wait_for_network(Duration::ZERO));
        assert_eq!(net.join_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn gsm_flag_counts_as_network() {
        let net = Network::start(NetworkConfig::default()).unwrap();
        net.signal().set(ReadinessFlags::GSM_READY);
        assert!(net.any_network_ready());
        assert!(net.wait_for_network(Duration::ZERO));
    }
}
