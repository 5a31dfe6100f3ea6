//! Network readiness signal.
//!
//! A small set of named flags, each meaning "this interface is usable",
//! shared by every adapter through a cloneable [`ReadinessSignal`] handle.
//!
//! ```text
//! ┌──────────────┐ set/clear ┌──────────────────┐ wait_any ┌──────────────┐
//! │ WiFi handler │──────────▶│                  │◀─────────│ join()       │
//! │ ETH handler  │──────────▶│ ReadinessSignal  │◀─────────│ app tasks    │
//! └──────────────┘           └──────────────────┘          └──────────────┘
//!   (dispatch thread)          Mutex + Condvar              (worker threads)
//! ```
//!
//! Each flag has exactly one writer (the adapter owning its meaning); any
//! number of threads may wait on or read it.

use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign, Not};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// ───────────────────────────────────────────────────────────────
// Flags
// ───────────────────────────────────────────────────────────────

/// Bit set of readiness flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReadinessFlags(u8);

impl ReadinessFlags {
    pub const NONE: Self = Self(0);
    /// WiFi station has an IP address.
    pub const STATION_READY: Self = Self(0b0000_0001);
    /// Ethernet has an IP address.
    pub const ETHERNET_READY: Self = Self(0b0000_0010);
    /// Reserved for a cellular modem; never set by the WiFi/Ethernet adapters.
    pub const GSM_READY: Self = Self(0b0000_0100);
    /// The current WiFi join succeeded.
    pub const WIFI_CONNECTED: Self = Self(0b0000_1000);
    /// The current WiFi join exhausted its retries.
    pub const WIFI_FAILED: Self = Self(0b0001_0000);

    /// Any interface able to carry traffic.
    pub const ANY_NETWORK: Self =
        Self(Self::STATION_READY.0 | Self::ETHERNET_READY.0 | Self::GSM_READY.0);
    pub const ALL: Self = Self(0b0001_1111);

    const NAMES: [(Self, &'static str); 5] = [
        (Self::STATION_READY, "STATION_READY"),
        (Self::ETHERNET_READY, "ETHERNET_READY"),
        (Self::GSM_READY, "GSM_READY"),
        (Self::WIFI_CONNECTED, "WIFI_CONNECTED"),
        (Self::WIFI_FAILED, "WIFI_FAILED"),
    ];

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build from raw bits, dropping any bit without a name.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` if every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` if at least one flag in `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Iterate the individual named flags that are set.
    pub fn iter(self) -> impl Iterator<Item = Self> {
        Self::NAMES
            .into_iter()
            .map(|(flag, _)| flag)
            .filter(move |flag| self.contains(*flag))
    }
}

impl BitOr for ReadinessFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ReadinessFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ReadinessFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ReadinessFlags {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

impl fmt::Debug for ReadinessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Signal
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct Shared {
    bits: Mutex<ReadinessFlags>,
    changed: Condvar,
}

/// Shared, waitable readiness flags.
///
/// Cloning yields another handle to the same flags. Set/clear take effect
/// atomically with respect to [`wait_any`](Self::wait_any).
#[derive(Clone, Default)]
pub struct ReadinessSignal {
    shared: Arc<Shared>,
}

impl ReadinessSignal {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking waiter cannot leave the bitmask half-written, so a
    // poisoned lock still holds a valid value.
    fn lock(&self) -> MutexGuard<'_, ReadinessFlags> {
        self.shared.bits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set `flags` and wake every waiter.
    pub fn set(&self, flags: ReadinessFlags) {
        let mut bits = self.lock();
        *bits |= flags;
        self.shared.changed.notify_all();
    }

    /// Clear `flags`. Waiters are not woken; nobody waits for a flag to drop.
    pub fn clear(&self, flags: ReadinessFlags) {
        let mut bits = self.lock();
        *bits = bits.difference(flags);
    }

    /// Snapshot of all flags.
    pub fn get(&self) -> ReadinessFlags {
        *self.lock()
    }

    pub fn is_set(&self, flags: ReadinessFlags) -> bool {
        self.get().contains(flags)
    }

    /// `true` if any interface (WiFi, Ethernet, GSM) is usable.
    pub fn any_network_ready(&self) -> bool {
        self.get().intersects(ReadinessFlags::ANY_NETWORK)
    }

    /// Block until at least one of `flags` is set or `timeout` elapses.
    ///
    /// Returns the snapshot of all flags at return time; the caller checks
    /// which (if any) of the requested flags it contains. A zero timeout
    /// polls without blocking. Flags are not consumed.
    pub fn wait_any(&self, flags: ReadinessFlags, timeout: Duration) -> ReadinessFlags {
        let bits = self.lock();
        let (bits, _) = self
            .shared
            .changed
            .wait_timeout_while(bits, timeout, |bits| !bits.intersects(flags))
            .unwrap_or_else(PoisonError::into_inner);
        *bits
    }
}

impl fmt::Debug for ReadinessSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadinessSignal").field(&self.get()).finish()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
