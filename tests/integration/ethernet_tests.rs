//! Ethernet bring-up through the facade.

use std::time::Duration;

use embedded_hal::digital::PinState;
use netbringup::adapters::sim::{SimClock, SimDelay, SimEthernetMac, SimPin};
use netbringup::config::RmiiClockMode;
use netbringup::lifecycle::LifecycleState;
use netbringup::{DriverError, Error, NetEvent, ReadinessFlags};

use super::support::{ETH_IP, eventually, network};

#[test]
fn link_comes_up_after_initialize() {
    let net = network();
    let clock = SimClock::new();
    let pin = SimPin::new(clock.clone());
    let eth = net
        .initialize_ethernet(
            SimEthernetMac::new(net.events().clone(), ETH_IP),
            pin.clone(),
            SimDelay::new(clock.clone()),
        )
        .unwrap();

    assert_eq!(eth.state(), LifecycleState::Ready);
    assert!(eth.wait_for_link(Duration::from_secs(2)));
    assert!(net.any_network_ready());
    assert!(!net.signal().is_set(ReadinessFlags::WIFI_CONNECTED));

    // PHY held low for one settle period, then released.
    assert_eq!(pin.level(), Some(PinState::High));
    assert_eq!(clock.uptime(), Duration::from_micros(2 * 10_000));

    let installed = eth.mac().installed_config().unwrap();
    assert_eq!(installed.clock_mode, RmiiClockMode::Gpio17Out);
}

#[test]
fn cable_pull_clears_ethernet_ready() {
    let net = network();
    let clock = SimClock::new();
    let mut eth = net
        .initialize_ethernet(
            SimEthernetMac::new(net.events().clone(), ETH_IP),
            SimPin::new(clock.clone()),
            SimDelay::new(clock),
        )
        .unwrap();
    assert!(eth.wait_for_link(Duration::from_secs(2)));

    eth.mac_mut().unplug();
    assert!(eventually(Duration::from_secs(2), || !eth.is_ready()));
    assert!(!net.any_network_ready());
}

#[test]
fn unplugged_cable_never_reports_link() {
    let net = network();
    let clock = SimClock::new();
    let eth = net
        .initialize_ethernet(
            SimEthernetMac::new(net.events().clone(), ETH_IP).unplugged(),
            SimPin::new(clock.clone()),
            SimDelay::new(clock),
        )
        .unwrap();
    assert!(!eth.wait_for_link(Duration::from_millis(100)));
    assert!(eth.mac().is_enabled());
}

#[test]
fn install_failure_keeps_vendor_code() {
    let net = network();
    let clock = SimClock::new();
    let result = net.initialize_ethernet(
        SimEthernetMac::new(net.events().clone(), ETH_IP).failing_init(0x105),
        SimPin::new(clock.clone()),
        SimDelay::new(clock),
    );
    assert_eq!(
        result.err(),
        Some(Error::Driver(DriverError::new("esp_eth_driver_install", 0x105)))
    );
    assert_eq!(net.events().subscriber_count(), 0);
}

#[test]
fn ethernet_handler_leaves_wifi_events_to_others() {
    let net = network();
    let clock = SimClock::new();
    let _eth = net
        .initialize_ethernet(
            SimEthernetMac::new(net.events().clone(), ETH_IP).unplugged(),
            SimPin::new(clock.clone()),
            SimDelay::new(clock),
        )
        .unwrap();
    assert_eq!(net.events().dispatch_now(&NetEvent::WifiStaStart), 0);
    assert_eq!(net.events().dispatch_now(&NetEvent::EthGotIp(ETH_IP)), 1);
    assert!(net.signal().is_set(ReadinessFlags::ETHERNET_READY));
}
