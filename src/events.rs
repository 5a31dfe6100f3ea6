//! Network event loop.
//!
//! Vendor WiFi / IP / Ethernet events are translated to [`NetEvent`] and
//! posted here from whatever context the SDK raises them in. A dedicated
//! dispatch thread hands each event to every subscriber in registration
//! order.
//!
//! ```text
//! ┌─────────────┐      ┌──────────────┐      ┌────────────────────────┐
//! │ SDK bridge  │─────▶│              │      │ subscriber 1 (WiFi)    │
//! │ simulator   │─────▶│  mpsc queue  │─────▶│ subscriber 2 (ETH)     │
//! │ handlers    │─────▶│              │      │ subscriber n ...       │
//! └─────────────┘      └──────────────┘      └────────────────────────┘
//!    post()                                    net-evt thread
//! ```
//!
//! Subscribers never block: they flip readiness flags, bump counters and ask
//! the radio for a reconnect. Blocking waits belong on worker threads.

use core::fmt;
use std::net::Ipv4Addr;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::error::Result;
use crate::task::{Core, spawn_on_core};

/// Stack for the dispatch thread. Handlers are shallow but log.
const EVENT_TASK_STACK: usize = 6 * 1024;
const EVENT_TASK_NAME: &str = "net-evt\0";
/// Below the SDK event task (20) and the WiFi task (23).
const EVENT_TASK_PRIORITY: u8 = 18;

// ───────────────────────────────────────────────────────────────
// Events
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetEvent {
    // ── WiFi station ──────────────────────────────────────
    WifiStaStart,
    WifiStaStop,
    WifiStaConnected,
    /// `reason` is the 802.11 / SDK disconnect reason code.
    WifiStaDisconnected { reason: u16 },

    // ── IP layer ──────────────────────────────────────────
    StaGotIp(Ipv4Addr),
    StaLostIp,
    EthGotIp(Ipv4Addr),

    // ── Ethernet ──────────────────────────────────────────
    EthStart,
    EthStop,
    EthConnected,
    EthDisconnected,
}

impl fmt::Display for NetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiStaStart => write!(f, "wifi sta start"),
            Self::WifiStaStop => write!(f, "wifi sta stop"),
            Self::WifiStaConnected => write!(f, "wifi sta connected"),
            Self::WifiStaDisconnected { reason } => {
                write!(f, "wifi sta disconnected (reason={reason})")
            }
            Self::StaGotIp(ip) => write!(f, "sta got ip {ip}"),
            Self::StaLostIp => write!(f, "sta lost ip"),
            Self::EthGotIp(ip) => write!(f, "eth got ip {ip}"),
            Self::EthStart => write!(f, "eth start"),
            Self::EthStop => write!(f, "eth stop"),
            Self::EthConnected => write!(f, "eth link up"),
            Self::EthDisconnected => write!(f, "eth link down"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Subscribers
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Handled,
    Ignored,
}

/// Reacts to network events on the dispatch thread.
pub trait EventSubscriber: Send + Sync {
    /// Tag used in diagnostics.
    fn name(&self) -> &'static str;

    /// Must not block.
    fn on_event(&self, event: &NetEvent) -> EventOutcome;
}

type SubscriberList = Arc<Mutex<Vec<Arc<dyn EventSubscriber>>>>;

fn lock(list: &SubscriberList) -> MutexGuard<'_, Vec<Arc<dyn EventSubscriber>>> {
    list.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Invoke every subscriber in registration order; returns how many handled it.
fn dispatch(list: &SubscriberList, event: &NetEvent) -> usize {
    // Snapshot so a handler may subscribe without deadlocking.
    let subscribers: Vec<_> = lock(list).clone();
    let handled = subscribers
        .iter()
        .filter(|s| s.on_event(event) == EventOutcome::Handled)
        .count();
    if handled == 0 {
        debug!("events: '{}' unhandled", event);
    }
    handled
}

// ───────────────────────────────────────────────────────────────
// Event loop
// ───────────────────────────────────────────────────────────────

/// Handle to the network event loop. Clones share the same queue and
/// subscriber list; the dispatch thread exits once every handle is dropped.
#[derive(Clone)]
pub struct EventLoop {
    tx: Sender<NetEvent>,
    subscribers: SubscriberList,
}

impl EventLoop {
    /// Spawn the dispatch thread.
    pub fn start() -> Result<Self> {
        let (tx, rx) = mpsc::channel::<NetEvent>();
        let subscribers: SubscriberList = Arc::default();
        let list = Arc::clone(&subscribers);

        // Pinned next to the SDK event task that feeds the bridge.
        spawn_on_core(Core::Pro, EVENT_TASK_PRIORITY, EVENT_TASK_STACK, EVENT_TASK_NAME, move || {
            for event in rx {
                dispatch(&list, &event);
            }
            debug!("events: dispatch thread exiting");
        })?;

        Ok(Self { tx, subscribers })
    }

    /// Append a subscriber; it sees events posted after this call.
    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        debug!("events: subscribing '{}'", subscriber.name());
        lock(&self.subscribers).push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Queue an event for the dispatch thread. Never blocks on subscribers.
    ///
    /// Returns `false` if the dispatch thread is gone.
    pub fn post(&self, event: NetEvent) -> bool {
        if self.tx.send(event).is_err() {
            warn!("events: dispatch thread gone, dropping '{}'", event);
            return false;
        }
        true
    }

    /// Dispatch on the calling thread, bypassing the queue.
    ///
    /// For bridges that already run on the SDK's event task.
    pub fn dispatch_now(&self, event: &NetEvent) -> usize {
        dispatch(&self.subscribers, event)
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
