//! SNTP time synchronisation.
//!
//! ```text
//!   Uninitialized ──initialize()──▶ Polling ──plausible reading──▶ Synchronized
//! ```
//!
//! [`TimeSync::wait_for_sync`] sleeps `poll_interval_ms`, reads the wall
//! clock and repeats until the reading reaches 1 January of
//! `min_valid_year` or `max_polls` checks have been made. Running out of
//! polls is not an error: the call returns [`TimeSyncOutcome::Unsynchronized`]
//! and the clock keeps whatever value it has.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::config::SntpConfig;
use crate::error::Result;
use crate::ports::{SntpClient, WallClock};

use super::time::{CivilDateTime, year_start_epoch_secs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Polling,
    Synchronized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSyncOutcome {
    Synchronized { epoch_secs: i64 },
    /// Poll budget exhausted without a plausible reading.
    Unsynchronized,
}

impl TimeSyncOutcome {
    pub fn is_synchronized(self) -> bool {
        matches!(self, Self::Synchronized { .. })
    }
}

pub struct TimeSync<S, C, D> {
    sntp: S,
    clock: C,
    delay: D,
    config: SntpConfig,
    state: SyncState,
}

impl<S, C, D> TimeSync<S, C, D>
where
    S: SntpClient,
    C: WallClock,
    D: DelayNs,
{
    pub fn new(sntp: S, clock: C, delay: D, config: SntpConfig) -> Self {
        Self {
            sntp,
            clock,
            delay,
            config,
            state: SyncState::Uninitialized,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Start the SNTP client in poll mode. No-op once started.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != SyncState::Uninitialized {
            return Ok(());
        }
        info!("SNTP: initializing (server {})", self.config.server);
        self.sntp.start(&self.config.server)?;
        self.state = SyncState::Polling;
        Ok(())
    }

    /// Block until the clock is plausible or the poll budget runs out.
    ///
    /// Always leaves the process time zone set to UTC.
    pub fn wait_for_sync(&mut self) -> TimeSyncOutcome {
        if let Err(e) = self.initialize() {
            // The clock may still have been set some other way; keep polling.
            warn!("SNTP: client start failed: {}", e);
        }

        let floor = year_start_epoch_secs(self.config.min_valid_year);
        let max = self.config.max_polls;
        let mut outcome = TimeSyncOutcome::Unsynchronized;

        for attempt in 1..=max {
            info!("SNTP: waiting for system time to be set... ({}/{})", attempt, max);
            self.delay.delay_ms(self.config.poll_interval_ms);
            let now = self.clock.now();
            if now.secs >= floor {
                outcome = TimeSyncOutcome::Synchronized { epoch_secs: now.secs };
                break;
            }
        }

        if outcome.is_synchronized() {
            self.state = SyncState::Synchronized;
        } else {
            warn!(
                "SNTP: no plausible time after {} polls, clock left unsynchronized",
                max
            );
        }

        self.clock.set_timezone_utc();
        info!("SNTP: TIME = {}", self.status_string());
        outcome
    }

    /// Alias for [`wait_for_sync`](Self::wait_for_sync) matching the
    /// firmware's bring-up vocabulary.
    pub fn update_time(&mut self) -> TimeSyncOutcome {
        self.wait_for_sync()
    }

    /// Microseconds since the epoch: whole wall-clock seconds plus the
    /// high-resolution sub-second sample. Valid before sync too; it then
    /// reflects the unsynchronized clock.
    pub fn current_time_micros(&self) -> u64 {
        self.clock.now().as_micros()
    }

    /// Current wall-clock time as `DD.MM.YYYY HH:MM:SS UTC`.
    pub fn status_string(&self) -> String {
        CivilDateTime::from_epoch_secs(self.clock.now().secs).to_string()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sntp(&self) -> &S {
        &self.sntp
    }
}
