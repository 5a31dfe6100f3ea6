//! Whole bring-up: both interfaces on one readiness signal.

use std::time::Duration;

use netbringup::adapters::sim::{SimClock, SimDelay, SimEthernetMac, SimPin, SimWifiRadio};
use netbringup::{ConnectionOutcome, DriverError, Error, NetworkConfig, ReadinessFlags};

use super::support::{ETH_IP, STA_IP, ScriptedRadio, credentials, network};

#[test]
fn wifi_and_ethernet_share_one_signal() {
    let net = network();
    let clock = SimClock::new();

    let sta = net
        .initialize_wifi(SimWifiRadio::new(net.events().clone(), STA_IP))
        .unwrap();
    let eth = net
        .initialize_ethernet(
            SimEthernetMac::new(net.events().clone(), ETH_IP),
            SimPin::new(clock.clone()),
            SimDelay::new(clock),
        )
        .unwrap();
    assert_eq!(net.events().subscriber_count(), 2);

    assert_eq!(
        sta.join(&credentials(), Duration::from_secs(5)).unwrap(),
        ConnectionOutcome::Connected
    );
    assert!(eth.wait_for_link(Duration::from_secs(2)));

    let flags = net.signal().get();
    assert!(flags.contains(
        ReadinessFlags::STATION_READY | ReadinessFlags::WIFI_CONNECTED | ReadinessFlags::ETHERNET_READY
    ));
    assert!(!flags.intersects(ReadinessFlags::GSM_READY | ReadinessFlags::WIFI_FAILED));
}

#[test]
fn ethernet_covers_for_failed_wifi() {
    let net = network();
    let clock = SimClock::new();

    let sta = net
        .initialize_wifi(SimWifiRadio::new(net.events().clone(), STA_IP).unreachable())
        .unwrap();
    let _eth = net
        .initialize_ethernet(
            SimEthernetMac::new(net.events().clone(), ETH_IP),
            SimPin::new(clock.clone()),
            SimDelay::new(clock),
        )
        .unwrap();

    assert_eq!(
        sta.join(&credentials(), Duration::from_secs(5)).unwrap(),
        ConnectionOutcome::Failed
    );
    assert!(net.wait_for_network(Duration::from_secs(2)));
    assert!(net.signal().is_set(ReadinessFlags::ETHERNET_READY));
}

#[test]
fn wifi_driver_failure_leaves_ethernet_bring_up_intact() {
    let net = network();
    let clock = SimClock::new();

    let wifi = net.initialize_wifi(ScriptedRadio::failing_init(0x101));
    assert!(matches!(
        wifi,
        Err(Error::Driver(DriverError { op: "esp_wifi_init", code: 0x101 }))
    ));
    assert_eq!(net.events().subscriber_count(), 0);

    let eth = net
        .initialize_ethernet(
            SimEthernetMac::new(net.events().clone(), ETH_IP),
            SimPin::new(clock.clone()),
            SimDelay::new(clock),
        )
        .unwrap();
    assert!(eth.wait_for_link(Duration::from_secs(2)));
    assert!(net.wait_for_network(Duration::ZERO));
    assert!(!net.signal().is_set(ReadinessFlags::STATION_READY));
}

#[test]
fn no_interface_means_no_network() {
    let net = network();
    assert!(!net.wait_for_network(Duration::from_millis(50)));
    assert_eq!(net.signal().get(), ReadinessFlags::NONE);
}

#[test]
fn stored_config_drives_the_facade() {
    let mut config = NetworkConfig::default();
    config.wifi.max_retries = 4;
    config.wifi.join_timeout_ms = 2_500;
    let blob = config.to_bytes().unwrap();

    let net = netbringup::Network::start(NetworkConfig::from_bytes(&blob).unwrap()).unwrap();
    assert_eq!(net.config().wifi.max_retries, 4);
    assert_eq!(net.join_timeout(), Duration::from_millis(2_500));
}
