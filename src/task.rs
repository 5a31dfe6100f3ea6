//! Core-pinned thread spawning.
//!
//! On ESP-IDF `std::thread` is a pthread over a FreeRTOS task.
//! `esp_pthread_set_cfg()` sets a thread-local configuration that applies to
//! every later `pthread_create()` from the calling thread, so the config,
//! spawn and reset steps must not interleave with other thread creation on
//! that thread. Off target, core and priority are ignored.

use std::thread::{self, JoinHandle};

use log::info;

use crate::error::{Error, Result};

/// CPU cores of the dual-core ESP32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// PRO_CPU: WiFi, lwIP and the SDK event task live here.
    Pro = 0,
    /// APP_CPU.
    App = 1,
}

/// Spawn `f` as a FreeRTOS task pinned to `core` with `priority` and
/// `stack_bytes` of stack. `name` must be NUL-terminated (`"net-evt\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core<F>(
    core: Core,
    priority: u8,
    stack_bytes: usize,
    name: &'static str,
    f: F,
) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    use esp_idf_svc::sys::{ESP_OK, esp_create_default_pthread_config, esp_pthread_set_cfg};

    if !name.ends_with('\0') {
        return Err(Error::EventLoop);
    }

    // SAFETY: `name` is 'static and NUL-terminated; cfg is copied by the call.
    unsafe {
        let mut cfg = esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = i32::from(priority);
        cfg.stack_size = stack_bytes;
        cfg.thread_name = name.as_ptr().cast();
        if esp_pthread_set_cfg(&cfg) != ESP_OK as i32 {
            return Err(Error::EventLoop);
        }
    }

    let display_name = name.trim_end_matches('\0');
    info!(
        "task: spawning '{}' on {:?} (pri={}, stack={}B)",
        display_name, core, priority, stack_bytes
    );
    let spawned = thread::Builder::new().name(display_name.into()).spawn(f);

    // Later threads from this caller get the SDK defaults again.
    // SAFETY: plain FFI call with a fresh default config.
    unsafe {
        let defaults = esp_create_default_pthread_config();
        esp_pthread_set_cfg(&defaults);
    }

    spawned.map_err(|_| Error::EventLoop)
}

#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core<F>(
    _core: Core,
    _priority: u8,
    stack_bytes: usize,
    name: &'static str,
    f: F,
) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let display_name = name.trim_end_matches('\0');
    info!("task: spawning '{}' (host, no core pinning, stack={}B)", display_name, stack_bytes);
    thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_bytes)
        .spawn(f)
        .map_err(|_| Error::EventLoop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_thread_carries_trimmed_name() {
        let handle = spawn_on_core(Core::Pro, 5, 16 * 1024, "net-test\0", || {
            assert_eq!(thread::current().name(), Some("net-test"));
        })
        .unwrap();
        handle.join().unwrap();
    }
}
