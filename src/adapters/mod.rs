//! Adapters: the bring-up logic for each interface, plus concrete
//! implementations of the port traits.
//!
//! | Module     | Provides                         | Talks to                   |
//! |------------|----------------------------------|----------------------------|
//! | `wifi`     | WifiStation, WifiCredentials     | WifiRadio port             |
//! | `ethernet` | EthernetAdapter                  | EthernetMac, OutputPin     |
//! | `sntp`     | TimeSync                         | SntpClient, WallClock      |
//! | `time`     | WallTime, UTC calendar           | (pure)                     |
//! | `esp`      | WifiRadio, EthernetMac,          | ESP-IDF C API, esp-idf-svc |
//! |            | SntpClient, WallClock, SDK bridge|                            |
//! | `sim`      | Simulated ports for host tests   | Virtual clock, EventLoop   |

#[cfg(target_os = "espidf")]
pub mod esp;
pub mod ethernet;
#[cfg(not(target_os = "espidf"))]
pub mod sim;
pub mod sntp;
pub mod time;
pub mod wifi;
