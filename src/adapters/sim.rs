//! Host simulations of the ports.
//!
//! The simulated drivers post the same [`NetEvent`] sequences the SDK raises,
//! so adapter logic runs unmodified under `cargo test`. Time is virtual:
//! [`SimDelay`] advances a shared [`SimClock`] instead of sleeping.

use core::convert::Infallible;
use core::sync::atomic::{AtomicU32, Ordering};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin, PinState};

use crate::config::EthernetConfig;
use crate::error::DriverError;
use crate::events::{EventLoop, NetEvent};
use crate::ports::{EthernetMac, SntpClient, WallClock, WifiRadio};

use super::time::{MICROS_PER_SEC, WallTime};
use super::wifi::StationConfig;

/// `ESP_ERR_INVALID_STATE`
pub const ERR_INVALID_STATE: i32 = 0x103;
/// `ESP_ERR_WIFI_NOT_STARTED`
pub const ERR_WIFI_NOT_STARTED: i32 = 0x3007;
/// `WIFI_REASON_NO_AP_FOUND`
pub const REASON_NO_AP_FOUND: u16 = 201;
/// `WIFI_REASON_ASSOC_LEAVE`
pub const REASON_ASSOC_LEAVE: u16 = 8;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// WiFi radio
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct RadioState {
    started: bool,
    associated: bool,
    reachable: bool,
    station: Option<StationConfig>,
}

/// Station radio with a single simulated access point.
///
/// While the AP is reachable every `connect()` yields `StaConnected` then
/// `StaGotIp`; otherwise it yields `StaDisconnected(NO_AP_FOUND)`.
/// Stopping an associated radio yields `StaDisconnected(ASSOC_LEAVE)` then
/// `StaStop`, as `esp_wifi_stop` does.
pub struct SimWifiRadio {
    events: EventLoop,
    ip: Ipv4Addr,
    state: Mutex<RadioState>,
    init_calls: AtomicU32,
    connect_attempts: AtomicU32,
}

impl SimWifiRadio {
    pub fn new(events: EventLoop, ip: Ipv4Addr) -> Self {
        Self {
            events,
            ip,
            state: Mutex::new(RadioState { reachable: true, ..RadioState::default() }),
            init_calls: AtomicU32::new(0),
            connect_attempts: AtomicU32::new(0),
        }
    }

    /// Builder form of [`set_reachable(false)`](Self::set_reachable).
    pub fn unreachable(self) -> Self {
        self.set_reachable(false);
        self
    }

    pub fn set_reachable(&self, reachable: bool) {
        lock(&self.state).reachable = reachable;
    }

    pub fn init_calls(&self) -> u32 {
        self.init_calls.load(Ordering::Acquire)
    }

    /// Association attempts made while started.
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::Acquire)
    }

    pub fn is_started(&self) -> bool {
        lock(&self.state).started
    }

    /// Last configuration applied with `configure_station`.
    pub fn station(&self) -> Option<StationConfig> {
        lock(&self.state).station.clone()
    }
}

impl WifiRadio for SimWifiRadio {
    fn init(&self) -> Result<(), DriverError> {
        self.init_calls.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn configure_station(&self, config: &StationConfig) -> Result<(), DriverError> {
        lock(&self.state).station = Some(config.clone());
        Ok(())
    }

    fn start(&self) -> Result<(), DriverError> {
        let mut st = lock(&self.state);
        if st.station.is_none() {
            return Err(DriverError::new("esp_wifi_start", ERR_INVALID_STATE));
        }
        st.started = true;
        drop(st);
        self.events.post(NetEvent::WifiStaStart);
        Ok(())
    }

    fn stop(&self) -> Result<(), DriverError> {
        let mut st = lock(&self.state);
        let was_started = core::mem::take(&mut st.started);
        let was_associated = core::mem::take(&mut st.associated);
        drop(st);
        if was_associated {
            self.events.post(NetEvent::WifiStaDisconnected { reason: REASON_ASSOC_LEAVE });
        }
        if was_started {
            self.events.post(NetEvent::WifiStaStop);
        }
        Ok(())
    }

    fn connect(&self) -> Result<(), DriverError> {
        let mut st = lock(&self.state);
        if !st.started {
            return Err(DriverError::new("esp_wifi_connect", ERR_WIFI_NOT_STARTED));
        }
        let reachable = st.reachable;
        st.associated = reachable;
        drop(st);

        self.connect_attempts.fetch_add(1, Ordering::AcqRel);
        if reachable {
            self.events.post(NetEvent::WifiStaConnected);
            self.events.post(NetEvent::StaGotIp(self.ip));
        } else {
            self.events.post(NetEvent::WifiStaDisconnected { reason: REASON_NO_AP_FOUND });
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Ethernet MAC/PHY
// ───────────────────────────────────────────────────────────────

/// EMAC + PHY with a cable that is either plugged in or not.
pub struct SimEthernetMac {
    events: EventLoop,
    ip: Ipv4Addr,
    link_up: bool,
    init_error: Option<i32>,
    enable_error: Option<i32>,
    installed: Option<EthernetConfig>,
    installs: u32,
    enabled: bool,
}

impl SimEthernetMac {
    pub fn new(events: EventLoop, ip: Ipv4Addr) -> Self {
        Self {
            events,
            ip,
            link_up: true,
            init_error: None,
            enable_error: None,
            installed: None,
            installs: 0,
            enabled: false,
        }
    }

    /// No cable: the MAC starts but never reports a link.
    pub fn unplugged(mut self) -> Self {
        self.link_up = false;
        self
    }

    /// Make driver installation fail with `code`.
    pub fn failing_init(mut self, code: i32) -> Self {
        self.init_error = Some(code);
        self
    }

    /// Make the next `enable()` fail with `code`; later calls succeed.
    pub fn failing_enable(mut self, code: i32) -> Self {
        self.enable_error = Some(code);
        self
    }

    /// Driver installations so far. A reinstall replaces the previous one.
    pub fn installs(&self) -> u32 {
        self.installs
    }

    pub fn installed_config(&self) -> Option<&EthernetConfig> {
        self.installed.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Simulate the cable being pulled.
    pub fn unplug(&mut self) {
        self.link_up = false;
        if self.enabled {
            self.events.post(NetEvent::EthDisconnected);
        }
    }
}

impl EthernetMac for SimEthernetMac {
    fn init(&mut self, config: &EthernetConfig) -> Result<(), DriverError> {
        if let Some(code) = self.init_error {
            return Err(DriverError::new("esp_eth_driver_install", code));
        }
        self.enabled = false;
        self.installed = Some(config.clone());
        self.installs += 1;
        Ok(())
    }

    fn enable(&mut self) -> Result<(), DriverError> {
        if self.installed.is_none() {
            return Err(DriverError::new("esp_eth_start", ERR_INVALID_STATE));
        }
        if let Some(code) = self.enable_error.take() {
            return Err(DriverError::new("esp_eth_start", code));
        }
        self.enabled = true;
        self.events.post(NetEvent::EthStart);
        if self.link_up {
            self.events.post(NetEvent::EthConnected);
            self.events.post(NetEvent::EthGotIp(self.ip));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Clock / delay
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ClockState {
    epoch_us: i64,
    uptime_us: u64,
    /// (uptime at which the server answers, epoch seconds it reports)
    pending_sync: Option<(u64, i64)>,
    utc: bool,
}

/// Virtual wall clock starting at the epoch with zero uptime.
///
/// Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    state: Arc<Mutex<ClockState>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move virtual time forward, applying a scheduled sync once due.
    pub fn advance(&self, by: Duration) {
        let by_us = u64::try_from(by.as_micros()).unwrap_or(u64::MAX);
        let mut st = lock(&self.state);
        st.uptime_us = st.uptime_us.saturating_add(by_us);
        st.epoch_us = st.epoch_us.saturating_add(i64::try_from(by_us).unwrap_or(i64::MAX));
        if let Some((due, secs)) = st.pending_sync {
            if st.uptime_us >= due {
                let late = i64::try_from(st.uptime_us - due).unwrap_or(0);
                st.epoch_us = secs.saturating_mul(MICROS_PER_SEC as i64).saturating_add(late);
                st.pending_sync = None;
            }
        }
    }

    pub fn set_epoch(&self, secs: i64, subsec_micros: u32) {
        lock(&self.state).epoch_us = secs * MICROS_PER_SEC as i64 + i64::from(subsec_micros);
    }

    /// Step the clock to `epoch_secs` once `after` of uptime has passed.
    pub fn schedule_sync(&self, after: Duration, epoch_secs: i64) {
        let after_us = u64::try_from(after.as_micros()).unwrap_or(u64::MAX);
        let mut st = lock(&self.state);
        st.pending_sync = Some((st.uptime_us.saturating_add(after_us), epoch_secs));
    }

    /// Virtual time elapsed since creation.
    pub fn uptime(&self) -> Duration {
        Duration::from_micros(lock(&self.state).uptime_us)
    }

    pub fn is_utc(&self) -> bool {
        lock(&self.state).utc
    }
}

impl WallClock for SimClock {
    fn now(&self) -> WallTime {
        let us = lock(&self.state).epoch_us;
        let per_sec = MICROS_PER_SEC as i64;
        WallTime::new(us.div_euclid(per_sec), us.rem_euclid(per_sec) as u32)
    }

    fn set_timezone_utc(&self) {
        lock(&self.state).utc = true;
    }
}

/// `DelayNs` that advances a [`SimClock`] instead of sleeping.
#[derive(Debug, Clone)]
pub struct SimDelay {
    clock: SimClock,
}

impl SimDelay {
    pub fn new(clock: SimClock) -> Self {
        Self { clock }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        self.clock.advance(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock.advance(Duration::from_millis(u64::from(ms)));
    }
}

// ───────────────────────────────────────────────────────────────
// SNTP
// ───────────────────────────────────────────────────────────────

/// SNTP client whose server answers after a fixed delay, or never.
#[derive(Debug)]
pub struct SimSntpClient {
    clock: SimClock,
    answer: Option<(Duration, i64)>,
    server: Option<heapless::String<64>>,
}

impl SimSntpClient {
    /// A client whose server never answers.
    pub fn new(clock: SimClock) -> Self {
        Self { clock, answer: None, server: None }
    }

    /// The server answers `after` the client starts, reporting `epoch_secs`.
    pub fn syncs_after(mut self, after: Duration, epoch_secs: i64) -> Self {
        self.answer = Some((after, epoch_secs));
        self
    }

    /// Server passed to the last `start`.
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }
}

impl SntpClient for SimSntpClient {
    fn start(&mut self, server: &str) -> Result<(), DriverError> {
        let mut name = heapless::String::new();
        name.push_str(server)
            .map_err(|()| DriverError::new("esp_sntp_setservername", ERR_INVALID_STATE))?;
        self.server = Some(name);
        if let Some((after, secs)) = self.answer {
            self.clock.schedule_sync(after, secs);
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// GPIO
// ───────────────────────────────────────────────────────────────

/// Output pin that records each level it is driven to, stamped with the
/// virtual uptime of the clock it is attached to. Clones share the record.
#[derive(Debug, Clone)]
pub struct SimPin {
    clock: SimClock,
    history: Arc<Mutex<Vec<(PinState, Duration)>>>,
}

impl SimPin {
    pub fn new(clock: SimClock) -> Self {
        Self { clock, history: Arc::default() }
    }

    pub fn history(&self) -> Vec<(PinState, Duration)> {
        lock(&self.history).clone()
    }

    pub fn level(&self) -> Option<PinState> {
        lock(&self.history).last().map(|(s, _)| *s)
    }

    fn record(&self, state: PinState) {
        lock(&self.history).push((state, self.clock.uptime()));
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.record(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.record(PinState::High);
        Ok(())
    }
}

/// GPIO whose driver rejects every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokenPin;

#[derive(Debug, Clone, Copy)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl ErrorType for BrokenPin {
    type Error = PinFault;
}

impl OutputPin for BrokenPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(PinFault)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(PinFault)
    }
}
