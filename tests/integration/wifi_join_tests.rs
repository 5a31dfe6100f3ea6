//! WiFi join against the simulated access point and the scripted radio.

use std::thread;
use std::time::{Duration, Instant};

use netbringup::adapters::sim::SimWifiRadio;
use netbringup::config::AuthThreshold;
use netbringup::{ConnectionOutcome, DriverError, Error, NetEvent, ReadinessFlags};

use super::support::{RadioCall, STA_IP, ScriptedRadio, credentials, network, network_with_retries};

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn reachable_network_connects() {
    let net = network();
    let radio = SimWifiRadio::new(net.events().clone(), STA_IP);
    let sta = net.initialize_wifi(radio).unwrap();

    let outcome = sta.join(&credentials(), JOIN_TIMEOUT).unwrap();
    assert_eq!(outcome, ConnectionOutcome::Connected);
    assert!(sta.is_connected());
    assert!(net.signal().is_set(ReadinessFlags::STATION_READY));
    assert!(net.any_network_ready());
    assert_eq!(sta.retry_count(), 0);
    assert_eq!(sta.radio().connect_attempts(), 1);

    let station = sta.radio().station().unwrap();
    assert_eq!(station.ssid.as_slice(), b"TestNet");
    assert_eq!(station.password.as_slice(), b"correct horse");
    assert_eq!(station.auth_threshold, AuthThreshold::Wpa2Psk);
}

#[test]
fn unreachable_network_fails_after_one_retry() {
    let net = network();
    let radio = SimWifiRadio::new(net.events().clone(), STA_IP).unreachable();
    let sta = net.initialize_wifi(radio).unwrap();

    let started = Instant::now();
    let outcome = sta.join(&credentials(), JOIN_TIMEOUT).unwrap();
    assert_eq!(outcome, ConnectionOutcome::Failed);
    // Reported as soon as retries run out, well before the deadline.
    assert!(started.elapsed() < JOIN_TIMEOUT);
    assert_eq!(sta.radio().connect_attempts(), 2);
    assert!(!net.signal().is_set(ReadinessFlags::WIFI_CONNECTED));
    assert!(net.signal().is_set(ReadinessFlags::WIFI_FAILED));
}

#[test]
fn retry_bound_limits_attempts() {
    for max_retries in [0, 3] {
        let net = network_with_retries(max_retries);
        let radio = SimWifiRadio::new(net.events().clone(), STA_IP).unreachable();
        let sta = net.initialize_wifi(radio).unwrap();

        assert_eq!(sta.join(&credentials(), JOIN_TIMEOUT).unwrap(), ConnectionOutcome::Failed);
        assert_eq!(sta.radio().connect_attempts(), max_retries + 1);
    }
}

#[test]
fn rejoin_after_failure_starts_fresh() {
    let net = network();
    let radio = SimWifiRadio::new(net.events().clone(), STA_IP).unreachable();
    let sta = net.initialize_wifi(radio).unwrap();
    assert_eq!(sta.join(&credentials(), JOIN_TIMEOUT).unwrap(), ConnectionOutcome::Failed);

    sta.radio().set_reachable(true);
    assert_eq!(sta.join(&credentials(), JOIN_TIMEOUT).unwrap(), ConnectionOutcome::Connected);
    assert!(!net.signal().is_set(ReadinessFlags::WIFI_FAILED));
}

#[test]
fn rejoin_while_connected_ignores_the_old_session() {
    for max_retries in [0, 1] {
        let net = network_with_retries(max_retries);
        let radio = SimWifiRadio::new(net.events().clone(), STA_IP);
        let sta = net.initialize_wifi(radio).unwrap();
        assert_eq!(sta.join(&credentials(), JOIN_TIMEOUT).unwrap(), ConnectionOutcome::Connected);

        // Stopping the associated radio raises a disconnect and a stop that
        // must not count against the new join.
        for round in 0..20 {
            let outcome = sta.join(&credentials(), JOIN_TIMEOUT).unwrap();
            assert_eq!(
                outcome,
                ConnectionOutcome::Connected,
                "max_retries={max_retries} round={round}"
            );
            assert!(!net.signal().is_set(ReadinessFlags::WIFI_FAILED));
        }
        assert_eq!(sta.radio().connect_attempts(), 21);
    }
}

#[test]
fn blocked_join_unblocks_on_address() {
    let net = network();
    let sta = net.initialize_wifi(ScriptedRadio::new()).unwrap();
    let creds = credentials();

    thread::scope(|s| {
        let joiner = s.spawn(|| {
            let started = Instant::now();
            let outcome = sta.join(&creds, Duration::from_secs(10));
            (outcome, started.elapsed())
        });

        // Wait until the join has started the radio, then deliver the address.
        super::support::eventually(Duration::from_secs(2), || {
            sta.radio().calls().contains(&RadioCall::Start)
        });
        thread::sleep(Duration::from_millis(20));
        net.events().post(NetEvent::StaGotIp(STA_IP));

        let (outcome, elapsed) = joiner.join().unwrap();
        assert_eq!(outcome, Ok(ConnectionOutcome::Connected));
        assert!(elapsed < Duration::from_secs(5), "join took {elapsed:?}");
    });
}

#[test]
fn silent_radio_times_out() {
    let net = network();
    let sta = net.initialize_wifi(ScriptedRadio::new()).unwrap();
    let outcome = sta.join(&credentials(), Duration::from_millis(100)).unwrap();
    assert_eq!(outcome, ConnectionOutcome::TimedOut);
    assert!(!sta.is_connected());
}

#[test]
fn join_sequence_reaches_radio_in_order() {
    let net = network();
    let sta = net.initialize_wifi(ScriptedRadio::new()).unwrap();
    let _ = sta.join(&credentials(), Duration::ZERO).unwrap();
    assert_eq!(
        sta.radio().calls(),
        vec![
            RadioCall::Init,
            RadioCall::Stop,
            RadioCall::Configure(b"TestNet".to_vec()),
            RadioCall::Start,
        ]
    );
}

#[test]
fn driver_error_is_returned_unchanged() {
    let net = network();
    let sta = net.initialize_wifi(ScriptedRadio::failing_start(0x3001)).unwrap();
    assert_eq!(
        sta.join(&credentials(), JOIN_TIMEOUT),
        Err(Error::Driver(DriverError::new("esp_wifi_start", 0x3001)))
    );
}

#[test]
fn lost_ip_clears_station_flags() {
    let net = network();
    let radio = SimWifiRadio::new(net.events().clone(), STA_IP);
    let sta = net.initialize_wifi(radio).unwrap();
    assert!(sta.join(&credentials(), JOIN_TIMEOUT).unwrap().is_connected());

    net.events().dispatch_now(&NetEvent::StaLostIp);
    assert!(!sta.is_connected());
    assert!(!net.signal().is_set(ReadinessFlags::STATION_READY));
}
