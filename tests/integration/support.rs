//! Shared fixtures and a scriptable WiFi radio.

use std::net::Ipv4Addr;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use netbringup::adapters::wifi::StationConfig;
use netbringup::ports::WifiRadio;
use netbringup::{DriverError, Network, NetworkConfig, WifiCredentials};

pub const STA_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 20);
pub const ETH_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 42);

pub fn network() -> Network {
    Network::start(NetworkConfig::default()).expect("event loop")
}

pub fn network_with_retries(max_retries: u32) -> Network {
    let mut config = NetworkConfig::default();
    config.wifi.max_retries = max_retries;
    Network::start(config).expect("event loop")
}

pub fn credentials() -> WifiCredentials {
    WifiCredentials::new("TestNet", Some("correct horse")).expect("valid credentials")
}

/// Poll `cond` every millisecond until it holds or `timeout` passes.
pub fn eventually(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

// ── Scripted radio ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCall {
    Init,
    Configure(Vec<u8>),
    Start,
    Stop,
    Connect,
}

/// Radio that never raises events on its own; tests post them by hand.
#[derive(Default)]
pub struct ScriptedRadio {
    calls: Mutex<Vec<RadioCall>>,
    init_error: Option<i32>,
    start_error: Option<i32>,
}

#[allow(dead_code)]
impl ScriptedRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_init(code: i32) -> Self {
        Self { init_error: Some(code), ..Self::default() }
    }

    pub fn failing_start(code: i32) -> Self {
        Self { start_error: Some(code), ..Self::default() }
    }

    pub fn calls(&self) -> Vec<RadioCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: RadioCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

impl WifiRadio for ScriptedRadio {
    fn init(&self) -> Result<(), DriverError> {
        self.record(RadioCall::Init);
        match self.init_error {
            Some(code) => Err(DriverError::new("esp_wifi_init", code)),
            None => Ok(()),
        }
    }

    fn configure_station(&self, config: &StationConfig) -> Result<(), DriverError> {
        self.record(RadioCall::Configure(config.ssid.to_vec()));
        Ok(())
    }

    fn start(&self) -> Result<(), DriverError> {
        self.record(RadioCall::Start);
        match self.start_error {
            Some(code) => Err(DriverError::new("esp_wifi_start", code)),
            None => Ok(()),
        }
    }

    fn stop(&self) -> Result<(), DriverError> {
        self.record(RadioCall::Stop);
        Ok(())
    }

    fn connect(&self) -> Result<(), DriverError> {
        self.record(RadioCall::Connect);
        Ok(())
    }
}
