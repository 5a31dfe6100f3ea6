//! netbringup firmware entry point.
//!
//! ```text
//!   link patches, logger
//!        │
//!   Network::start ── SDK event bridge
//!        │
//!   ┌────┴─────────────┐
//!   WiFi init + join   Ethernet init (PHY power, EMAC)
//!   └────┬─────────────┘
//!   wait for any network
//!        │
//!   SNTP sync ── status loop
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};
use log::{error, info, warn};

use netbringup::adapters::esp::{
    EspEthernetMac, EspSntpClient, EspWallClock, EspWifiRadio, RmiiPins, install_event_bridge,
};
use netbringup::{Network, NetworkConfig, WifiCredentials};

const NVS_NAMESPACE: &str = "netcfg";
const NVS_CONFIG_KEY: &str = "config";
const STATUS_INTERVAL_MS: u32 = 60_000;

/// Stored configuration, or defaults if absent or unreadable.
fn load_config(partition: EspDefaultNvsPartition) -> NetworkConfig {
    let mut nvs = match EspNvs::new(partition, NVS_NAMESPACE, true) {
        Ok(nvs) => nvs,
        Err(e) => {
            warn!("NVS: open failed ({}), using defaults", e);
            return NetworkConfig::default();
        }
    };

    let mut buf = [0u8; 256];
    match nvs.get_raw(NVS_CONFIG_KEY, &mut buf) {
        Ok(Some(blob)) => match NetworkConfig::from_bytes(blob) {
            Ok(config) => {
                info!("NVS: network config loaded");
                config
            }
            Err(e) => {
                warn!("NVS: {}, using defaults", e);
                NetworkConfig::default()
            }
        },
        Ok(None) => {
            let config = NetworkConfig::default();
            match config.to_bytes() {
                Ok(bytes) => {
                    if let Err(e) = nvs.set_raw(NVS_CONFIG_KEY, &bytes) {
                        warn!("NVS: could not store defaults ({})", e);
                    }
                }
                Err(e) => warn!("NVS: {}", e),
            }
            config
        }
        Err(e) => {
            warn!("NVS: read failed ({}), using defaults", e);
            NetworkConfig::default()
        }
    }
}

/// Credentials baked in at build time via `WIFI_SSID` / `WIFI_PASSWORD`.
fn wifi_credentials() -> Option<WifiCredentials> {
    let ssid = option_env!("WIFI_SSID")?;
    match WifiCredentials::new(ssid, option_env!("WIFI_PASSWORD")) {
        Ok(credentials) => Some(credentials),
        Err(e) => {
            error!("WiFi: build-time credentials rejected: {}", e);
            None
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("netbringup v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let config = load_config(EspDefaultNvsPartition::take()?);

    // ── 2. Event plumbing ─────────────────────────────────────
    let network = Network::start(config)?;
    install_event_bridge(network.events())?;

    // ── 3. WiFi station ───────────────────────────────────────
    // Driver errors end WiFi bring-up only; Ethernet may still come up.
    let wifi = match network.initialize_wifi(EspWifiRadio::new(peripherals.modem, sysloop.clone())) {
        Ok(wifi) => Some(wifi),
        Err(e) => {
            error!("WiFi: bring-up failed: {}", e);
            None
        }
    };
    match (&wifi, wifi_credentials()) {
        (Some(wifi), Some(credentials)) => match wifi.join(&credentials, network.join_timeout()) {
            Ok(outcome) => info!("WiFi: join {}", outcome),
            Err(e) => error!("WiFi: join failed: {}", e),
        },
        (Some(_), None) => warn!("WiFi: no credentials compiled in (set WIFI_SSID)"),
        (None, _) => {}
    }

    // ── 4. Ethernet (optional) ────────────────────────────────
    let pins = peripherals.pins;
    let rmii = RmiiPins {
        mac: peripherals.mac,
        txd0: pins.gpio19,
        txd1: pins.gpio22,
        tx_en: pins.gpio21,
        rxd0: pins.gpio25,
        rxd1: pins.gpio26,
        crs_dv: pins.gpio27,
        mdc: pins.gpio23,
        mdio: pins.gpio18,
        ref_clk: pins.gpio17,
    };
    let phy_power = PinDriver::output(pins.gpio12)?;
    // Kept alive for the lifetime of the firmware; dropping stops the EMAC.
    let _eth = match network.initialize_ethernet(
        EspEthernetMac::new(rmii, sysloop.clone()),
        phy_power,
        FreeRtos,
    ) {
        Ok(eth) => Some(eth),
        Err(e) => {
            error!("ETH: bring-up failed: {}", e);
            None
        }
    };

    // ── 5. Time ───────────────────────────────────────────────
    let mut time = network.time_sync(EspSntpClient::new(), EspWallClock, FreeRtos);
    if network.wait_for_network(network.join_timeout()) {
        let outcome = time.update_time();
        info!("SNTP: {:?}", outcome);
    } else {
        warn!("SNTP: no network, clock not synchronized");
    }

    // ── 6. Status loop ────────────────────────────────────────
    loop {
        info!(
            "status: flags={:?} wifi={} time={} ({} us)",
            network.signal().get(),
            wifi.as_ref().is_some_and(|w| w.is_connected()),
            time.status_string(),
            time.current_time_micros()
        );
        FreeRtos::delay_ms(STATUS_INTERVAL_MS);
    }
}
