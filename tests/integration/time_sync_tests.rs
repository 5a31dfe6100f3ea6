//! SNTP poll loop on virtual time.

use std::time::Duration;

use netbringup::adapters::sim::{SimClock, SimDelay, SimSntpClient};
use netbringup::adapters::time::year_start_epoch_secs;
use netbringup::{SyncState, TimeSyncOutcome};

use super::support::network;

/// 2024-06-01T12:00:00Z
const SERVER_TIME: i64 = 1_717_243_200;

#[test]
fn plausible_on_second_poll_takes_two_intervals() {
    let net = network();
    let clock = SimClock::new();
    let sntp = SimSntpClient::new(clock.clone()).syncs_after(Duration::from_millis(2_500), SERVER_TIME);
    let mut time = net.time_sync(sntp, clock.clone(), SimDelay::new(clock.clone()));

    let outcome = time.update_time();
    assert!(matches!(outcome, TimeSyncOutcome::Synchronized { epoch_secs } if epoch_secs >= SERVER_TIME));
    assert_eq!(clock.uptime(), Duration::from_secs(4));
    assert_eq!(time.state(), SyncState::Synchronized);
    assert!(clock.is_utc());
}

#[test]
fn never_plausible_exhausts_budget_without_error() {
    let net = network();
    let clock = SimClock::new();
    let mut time = net.time_sync(
        SimSntpClient::new(clock.clone()),
        clock.clone(),
        SimDelay::new(clock.clone()),
    );

    assert_eq!(time.update_time(), TimeSyncOutcome::Unsynchronized);
    assert_eq!(clock.uptime(), Duration::from_secs(20 * 2));
    assert_eq!(time.state(), SyncState::Polling);
    assert!(clock.is_utc());
    assert!(time.status_string().starts_with("01.01.1970 00:00:40"));
}

#[test]
fn already_valid_clock_returns_after_one_interval() {
    let net = network();
    let clock = SimClock::new();
    clock.set_epoch(year_start_epoch_secs(2017), 0);
    let mut time = net.time_sync(
        SimSntpClient::new(clock.clone()),
        clock.clone(),
        SimDelay::new(clock.clone()),
    );
    assert!(time.update_time().is_synchronized());
    assert_eq!(clock.uptime(), Duration::from_secs(2));
}

#[test]
fn sntp_client_gets_configured_server() {
    let net = network();
    let clock = SimClock::new();
    let mut time = net.time_sync(
        SimSntpClient::new(clock.clone()),
        clock.clone(),
        SimDelay::new(clock),
    );
    time.initialize().unwrap();
    assert_eq!(time.state(), SyncState::Polling);
    assert_eq!(time.sntp().server(), Some("pool.ntp.org"));
}

#[test]
fn micros_combine_seconds_and_fraction() {
    let net = network();
    let clock = SimClock::new();
    clock.set_epoch(SERVER_TIME, 250_000);
    let time = net.time_sync(
        SimSntpClient::new(clock.clone()),
        clock.clone(),
        SimDelay::new(clock),
    );
    assert_eq!(time.current_time_micros(), SERVER_TIME as u64 * 1_000_000 + 250_000);
    assert_eq!(time.status_string(), "01.06.2024 12:00:00 UTC");
}
