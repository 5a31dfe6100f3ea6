//! One-shot initialisation state machine shared by the adapters.
//!
//! ```text
//!   Uninitialized ──ensure()──▶ Initializing ──ok──▶ Ready
//!         ▲                          │
//!         └──────────── err ─────────┘
//! ```
//!
//! [`Lifecycle::ensure`] runs the init closure at most once successfully;
//! later calls are no-ops. A failed init returns to `Uninitialized` so the
//! caller may try again.

use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Uninitialized = 0,
    Initializing = 1,
    Ready = 2,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Initializing,
            2 => Self::Ready,
            _ => Self::Uninitialized,
        }
    }
}

#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
    // Serialises concurrent `ensure` callers.
    init_lock: Mutex<()>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Uninitialized as u8),
            init_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    /// Run `init` unless already `Ready`.
    ///
    /// Returns `Ok(true)` if this call performed the initialisation,
    /// `Ok(false)` if it was already done.
    pub fn ensure<E>(&self, init: impl FnOnce() -> Result<(), E>) -> Result<bool, E> {
        if self.is_ready() {
            return Ok(false);
        }
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_ready() {
            return Ok(false);
        }
        self.store(LifecycleState::Initializing);
        match init() {
            Ok(()) => {
                self.store(LifecycleState::Ready);
                Ok(true)
            }
            Err(e) => {
                self.store(LifecycleState::Uninitialized);
                Err(e)
            }
        }
    }

    fn store(&self, state: LifecycleState) {
        self.state.store(state as u8, Ordering::Release);
    }
}
