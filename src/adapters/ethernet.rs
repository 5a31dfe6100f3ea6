//! LAN8720 Ethernet over RMII.
//!
//! Bring-up order:
//!
//! 1. PHY power output low, settle, high, settle.
//! 2. Install the MAC/PHY driver (SMI pins, PHY address, RMII clock).
//! 3. Subscribe the event handler.
//! 4. Enable the MAC/PHY; link state and address arrive as events.
//!
//! There is no blocking join. Callers that need the link use
//! [`EthernetAdapter::wait_for_link`].

use std::sync::Arc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::config::EthernetConfig;
use crate::error::{DriverError, ESP_FAIL, Error, Result};
use crate::events::{EventLoop, EventOutcome, EventSubscriber, NetEvent};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::ports::EthernetMac;
use crate::readiness::{ReadinessFlags, ReadinessSignal};

struct EthernetEventHandler {
    signal: ReadinessSignal,
}

impl EventSubscriber for EthernetEventHandler {
    fn name(&self) -> &'static str {
        "eth"
    }

    fn on_event(&self, event: &NetEvent) -> EventOutcome {
        match *event {
            NetEvent::EthGotIp(ip) => {
                info!("ETH: got ip {}", ip);
                self.signal.set(ReadinessFlags::ETHERNET_READY);
            }
            NetEvent::EthDisconnected => {
                warn!("ETH: link down");
                self.signal.clear(ReadinessFlags::ETHERNET_READY);
            }
            NetEvent::EthStop => {
                info!("ETH: stopped");
                self.signal.clear(ReadinessFlags::ETHERNET_READY);
            }
            _ => return EventOutcome::Ignored,
        }
        EventOutcome::Handled
    }
}

/// Cycle the PHY supply: low, settle, high, settle.
fn power_cycle_phy<P, D>(power: &mut P, delay: &mut D, settle_us: u32) -> Result<()>
where
    P: OutputPin,
    D: DelayNs,
{
    let gpio_err = |_| DriverError::new("phy power gpio", ESP_FAIL);
    power.set_low().map_err(gpio_err)?;
    delay.delay_us(settle_us);
    power.set_high().map_err(gpio_err)?;
    delay.delay_us(settle_us);
    debug!("ETH: PHY powered ({} us settle)", settle_us);
    Ok(())
}

pub struct EthernetAdapter<M, P, D> {
    mac: M,
    power: P,
    delay: D,
    config: EthernetConfig,
    signal: ReadinessSignal,
    subscribed: bool,
    lifecycle: Lifecycle,
}

impl<M, P, D> EthernetAdapter<M, P, D>
where
    M: EthernetMac,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(mac: M, power: P, delay: D, signal: ReadinessSignal, config: EthernetConfig) -> Self {
        Self {
            mac,
            power,
            delay,
            config,
            signal,
            subscribed: false,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Power the PHY, install and enable the MAC/PHY driver.
    ///
    /// Idempotent once successful. A driver error is returned unchanged and
    /// leaves the adapter `Uninitialized`; calling again retries the whole
    /// sequence but never subscribes a second handler.
    pub fn initialize(&mut self, events: &EventLoop) -> Result<()> {
        let Self { mac, power, delay, config, signal, subscribed, lifecycle } = self;

        let first = lifecycle.ensure(|| {
            power_cycle_phy(power, delay, config.phy_settle_us)?;
            mac.init(config)?;
            if !*subscribed {
                events.subscribe(Arc::new(EthernetEventHandler { signal: signal.clone() }));
                *subscribed = true;
            }
            mac.enable()?;
            Ok::<(), Error>(())
        });

        match first {
            Ok(true) => {
                info!(
                    "ETH: started (phy addr {}, mdc {}, mdio {})",
                    config.phy_addr, config.mdc_gpio, config.mdio_gpio
                );
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => {
                warn!("ETH: init failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn is_ready(&self) -> bool {
        self.signal.is_set(ReadinessFlags::ETHERNET_READY)
    }

    /// Block until `ETHERNET_READY` or `timeout`. Returns whether the link is up.
    pub fn wait_for_link(&self, timeout: Duration) -> bool {
        self.signal
            .wait_any(ReadinessFlags::ETHERNET_READY, timeout)
            .contains(ReadinessFlags::ETHERNET_READY)
    }

    pub fn mac(&self) -> &M {
        &self.mac
    }

    pub fn mac_mut(&mut self) -> &mut M {
        &mut self.mac
    }
}
