//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below exercises one interface end to end through the
//! [`Network`](netbringup::Network) facade against the simulated drivers.
//! All tests run on the host with no hardware and a real dispatch thread.

#![cfg(not(target_os = "espidf"))]

mod ethernet_tests;
mod network_tests;
mod support;
mod time_sync_tests;
mod wifi_join_tests;
