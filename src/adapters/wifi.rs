//! WiFi station-mode adapter.
//!
//! [`WifiStation`] drives a [`WifiRadio`] and reports progress through the
//! shared [`ReadinessSignal`]. Bring-up ([`WifiStation::initialize`]) only
//! subscribes the event handler and returns; [`WifiStation::join`] is the
//! single blocking call.
//!
//! ## Join sequence
//!
//! ```text
//! join()                      dispatch thread
//!   inactive, stop,           StaDisconnected/StaStop from stop() → ignored
//!   clear flags, retries = 0,
//!   configure, start ───────▶ StaStart        → active, connect()
//!   wait_any(CONNECTED|FAILED) StaDisconnected → retry < max ? connect() : set FAILED
//!        ◀─────────────────── StaGotIp        → retries = 0, set CONNECTED
//! ```
//!
//! ## Reconnection policy
//!
//! A disconnect is retried immediately, up to `WifiConfig::max_retries`
//! times in a row. Once exhausted the handler sets `WIFI_FAILED` and stops
//! asking; the radio stays idle until the next `join`.
//!
//! Disconnect and stop events only count while a session is active, that
//! is between `StaStart` and the next `join` or `StaStop`. Stopping an
//! associated radio raises both events after `join` has reset the budget.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::{AuthThreshold, WifiConfig};
use crate::error::{CredentialsError, Error, Result};
use crate::events::{EventLoop, EventOutcome, EventSubscriber, NetEvent};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::ports::WifiRadio;
use crate::readiness::{ReadinessFlags, ReadinessSignal};

pub const MAX_SSID_LEN: usize = 32;
pub const MAX_PASSWORD_LEN: usize = 64;

/// Flags owned by the WiFi adapter.
const WIFI_FLAGS: ReadinessFlags = ReadinessFlags::STATION_READY
    .union(ReadinessFlags::WIFI_CONNECTED)
    .union(ReadinessFlags::WIFI_FAILED);
const LINK_FLAGS: ReadinessFlags =
    ReadinessFlags::STATION_READY.union(ReadinessFlags::WIFI_CONNECTED);

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

/// SSID and optional passphrase as raw bytes.
///
/// Built from a buffer plus an explicit length; the bytes are never scanned
/// for a terminator, so an SSID may contain any octet.
#[derive(Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::Vec<u8, MAX_SSID_LEN>,
    password: Option<heapless::Vec<u8, MAX_PASSWORD_LEN>>,
}

impl WifiCredentials {
    /// Take the first `ssid_len` bytes of `ssid` and, if present, the first
    /// `password_len` bytes of `password`.
    ///
    /// A length larger than its buffer is clamped to the buffer.
    pub fn from_parts(
        ssid: &[u8],
        ssid_len: usize,
        password: Option<&[u8]>,
        password_len: usize,
    ) -> core::result::Result<Self, CredentialsError> {
        let ssid = &ssid[..ssid_len.min(ssid.len())];
        if ssid.is_empty() {
            return Err(CredentialsError::EmptySsid);
        }
        let ssid = heapless::Vec::from_slice(ssid).map_err(|()| CredentialsError::SsidTooLong)?;

        let password = match password {
            Some(pwd) => {
                let pwd = &pwd[..password_len.min(pwd.len())];
                Some(
                    heapless::Vec::from_slice(pwd)
                        .map_err(|()| CredentialsError::PasswordTooLong)?,
                )
            }
            None => None,
        };

        Ok(Self { ssid, password })
    }

    pub fn new(ssid: &str, password: Option<&str>) -> core::result::Result<Self, CredentialsError> {
        let pwd = password.map(str::as_bytes);
        Self::from_parts(ssid.as_bytes(), ssid.len(), pwd, pwd.map_or(0, <[u8]>::len))
    }

    pub fn ssid(&self) -> &[u8] {
        &self.ssid
    }

    pub fn password(&self) -> Option<&[u8]> {
        self.password.as_deref()
    }

    /// SSID for log output; invalid UTF-8 is replaced.
    pub fn ssid_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.ssid)
    }
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid_lossy())
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ───────────────────────────────────────────────────────────────
// Station configuration handed to the radio
// ───────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq)]
pub struct StationConfig {
    pub ssid: heapless::Vec<u8, MAX_SSID_LEN>,
    /// Empty for an open network.
    pub password: heapless::Vec<u8, MAX_PASSWORD_LEN>,
    pub auth_threshold: AuthThreshold,
    pub pmf_capable: bool,
    pub pmf_required: bool,
}

impl StationConfig {
    pub fn new(credentials: &WifiCredentials, config: &WifiConfig) -> Self {
        Self {
            ssid: credentials.ssid.clone(),
            password: credentials.password.clone().unwrap_or_default(),
            auth_threshold: config.auth_threshold,
            pmf_capable: config.pmf_capable,
            pmf_required: config.pmf_required,
        }
    }
}

impl fmt::Debug for StationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StationConfig")
            .field("ssid", &String::from_utf8_lossy(&self.ssid))
            .field("password_len", &self.password.len())
            .field("auth_threshold", &self.auth_threshold)
            .field("pmf_capable", &self.pmf_capable)
            .field("pmf_required", &self.pmf_required)
            .finish()
    }
}

// ───────────────────────────────────────────────────────────────
// Outcome
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// An IP address was acquired.
    Connected,
    /// Reconnect attempts were exhausted before the deadline.
    Failed,
    /// Neither happened within the timeout.
    TimedOut,
}

impl ConnectionOutcome {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Failed => write!(f, "failed (retries exhausted)"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Event handler (runs on the dispatch thread)
// ───────────────────────────────────────────────────────────────

struct StationEventHandler<R> {
    radio: Arc<R>,
    signal: ReadinessSignal,
    retries: Arc<AtomicU32>,
    active: Arc<AtomicBool>,
    max_retries: u32,
}

impl<R: WifiRadio> StationEventHandler<R> {
    fn request_connect(&self) {
        if let Err(e) = self.radio.connect() {
            warn!("WiFi: connect request rejected: {}", e);
        }
    }

    fn on_disconnected(&self, reason: u16) {
        self.signal.clear(LINK_FLAGS);
        let max = self.max_retries;
        match self
            .retries
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
        {
            Ok(previous) => {
                info!("WiFi: retry to connect to the AP ({}/{}, reason={})", previous + 1, max, reason);
                self.request_connect();
            }
            Err(_) => {
                warn!("WiFi: maximum retries exceeded (reason={})", reason);
                self.signal.set(ReadinessFlags::WIFI_FAILED);
            }
        }
    }
}

impl<R: WifiRadio> EventSubscriber for StationEventHandler<R> {
    fn name(&self) -> &'static str {
        "wifi-sta"
    }

    fn on_event(&self, event: &NetEvent) -> EventOutcome {
        match *event {
            NetEvent::WifiStaStart => {
                self.retries.store(0, Ordering::Release);
                self.active.store(true, Ordering::Release);
                self.request_connect();
            }
            NetEvent::WifiStaConnected => debug!("WiFi: associated, waiting for DHCP"),
            NetEvent::WifiStaDisconnected { .. } | NetEvent::WifiStaStop
                if !self.active.load(Ordering::Acquire) =>
            {
                debug!("WiFi: '{}' outside a session, ignored", event);
                return EventOutcome::Ignored;
            }
            NetEvent::WifiStaDisconnected { reason } => self.on_disconnected(reason),
            NetEvent::WifiStaStop => {
                self.active.store(false, Ordering::Release);
                self.signal.clear(LINK_FLAGS);
            }
            NetEvent::StaGotIp(ip) => {
                info!("WiFi: got ip {}", ip);
                self.retries.store(0, Ordering::Release);
                self.signal.clear(ReadinessFlags::WIFI_FAILED);
                self.signal.set(LINK_FLAGS);
            }
            NetEvent::StaLostIp => self.signal.clear(LINK_FLAGS),
            _ => return EventOutcome::Ignored,
        }
        EventOutcome::Handled
    }
}

// ───────────────────────────────────────────────────────────────
// Station adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiStation<R: WifiRadio + 'static> {
    radio: Arc<R>,
    signal: ReadinessSignal,
    config: WifiConfig,
    retries: Arc<AtomicU32>,
    active: Arc<AtomicBool>,
    lifecycle: Lifecycle,
}

impl<R: WifiRadio + 'static> WifiStation<R> {
    pub fn new(radio: R, signal: ReadinessSignal, config: WifiConfig) -> Self {
        Self {
            radio: Arc::new(radio),
            signal,
            config,
            retries: Arc::new(AtomicU32::new(0)),
            active: Arc::new(AtomicBool::new(false)),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Bring the radio up idle and subscribe the station event handler.
    ///
    /// Idempotent: after the first success further calls do nothing.
    pub fn initialize(&self, events: &EventLoop) -> Result<()> {
        let first = self.lifecycle.ensure(|| {
            self.radio.init()?;
            events.subscribe(Arc::new(StationEventHandler {
                radio: Arc::clone(&self.radio),
                signal: self.signal.clone(),
                retries: Arc::clone(&self.retries),
                active: Arc::clone(&self.active),
                max_retries: self.config.max_retries,
            }));
            Ok::<(), Error>(())
        })?;
        if first {
            info!("WiFi: driver ready (no mode, max_retries={})", self.config.max_retries);
        }
        Ok(())
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Join `credentials`' network and wait up to `timeout` for an address.
    ///
    /// Blocks the calling thread. Never call from an event subscriber: the
    /// events it waits for are delivered on that same thread.
    pub fn join(&self, credentials: &WifiCredentials, timeout: Duration) -> Result<ConnectionOutcome> {
        if !self.lifecycle.is_ready() {
            return Err(Error::NotInitialized("wifi"));
        }

        // Events raised by stop() belong to the old session.
        self.active.store(false, Ordering::Release);
        self.radio.stop()?;
        self.signal.clear(WIFI_FLAGS);
        self.retries.store(0, Ordering::Release);

        let station = StationConfig::new(credentials, &self.config);
        self.radio.configure_station(&station)?;
        self.radio.start()?;
        info!(
            "WiFi: joining '{}' (timeout {} ms)",
            credentials.ssid_lossy(),
            timeout.as_millis()
        );

        let bits = self.signal.wait_any(
            ReadinessFlags::WIFI_CONNECTED | ReadinessFlags::WIFI_FAILED,
            timeout,
        );
        let outcome = if bits.contains(ReadinessFlags::WIFI_CONNECTED) {
            ConnectionOutcome::Connected
        } else if bits.contains(ReadinessFlags::WIFI_FAILED) {
            ConnectionOutcome::Failed
        } else {
            ConnectionOutcome::TimedOut
        };

        match outcome {
            ConnectionOutcome::Connected => info!("WiFi: connected to '{}'", credentials.ssid_lossy()),
            _ => error!("WiFi: join '{}' {}", credentials.ssid_lossy(), outcome),
        }
        Ok(outcome)
    }

    pub fn is_connected(&self) -> bool {
        self.signal.is_set(ReadinessFlags::WIFI_CONNECTED)
    }

    /// Reconnect attempts consumed since the last join or address.
    pub fn retry_count(&self) -> u32 {
        self.retries.load(Ordering::Acquire)
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn signal(&self) -> &ReadinessSignal {
        &self.signal
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
