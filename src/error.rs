//! Unified error types for network bring-up.
//!
//! A single `Error` enum that every adapter converts into, keeping the
//! firmware entry point's handling uniform. All variants are `Copy` so they
//! can cross the event-dispatch thread without allocation.

use core::fmt;

/// Generic vendor failure code (`ESP_FAIL`).
pub const ESP_FAIL: i32 = -1;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible bring-up operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A vendor driver call failed; the code is passed through unchanged.
    Driver(DriverError),
    /// WiFi credentials were rejected before reaching the driver.
    Credentials(CredentialsError),
    /// An operation was issued before its adapter finished initialising.
    NotInitialized(&'static str),
    /// Configuration is invalid or could not be decoded.
    Config(&'static str),
    /// The event-dispatch thread could not be spawned.
    EventLoop,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver(e) => write!(f, "driver: {e}"),
            Self::Credentials(e) => write!(f, "credentials: {e}"),
            Self::NotInitialized(what) => write!(f, "{what} not initialized"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::EventLoop => write!(f, "event loop task could not be started"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Driver errors
// ---------------------------------------------------------------------------

/// Failure reported by a vendor driver call.
///
/// `code` is the raw `esp_err_t` (or the simulator's stand-in) and is never
/// remapped, so callers can compare it against SDK constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverError {
    /// Short name of the failing call, e.g. `"esp_wifi_start"`.
    pub op: &'static str,
    pub code: i32,
}

impl DriverError {
    pub const fn new(op: &'static str, code: i32) -> Self {
        Self { op, code }
    }

    #[cfg(target_os = "espidf")]
    pub fn from_esp(op: &'static str, err: esp_idf_svc::sys::EspError) -> Self {
        Self::new(op, err.code())
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed (rc={})", self.op, self.code)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

// ---------------------------------------------------------------------------
// Credential errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsError {
    EmptySsid,
    SsidTooLong,
    PasswordTooLong,
}

impl fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySsid => write!(f, "SSID is empty"),
            Self::SsidTooLong => write!(f, "SSID longer than 32 bytes"),
            Self::PasswordTooLong => write!(f, "password longer than 64 bytes"),
        }
    }
}

impl From<CredentialsError> for Error {
    fn from(e: CredentialsError) -> Self {
        Self::Credentials(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
