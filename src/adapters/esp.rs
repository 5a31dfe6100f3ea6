//! ESP-IDF implementations of the ports.
//!
//! WiFi, SNTP and the wall clock go straight to the C API in
//! `esp_idf_svc::sys`; the EMAC driver is built with `esp_idf_svc::eth`.
//! [`install_event_bridge`] forwards SDK events from the default event loop
//! into the crate's [`EventLoop`].

use core::ffi::c_void;
use core::ptr;
use std::ffi::CString;
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use esp_idf_svc::eth::{EspEth, EthDriver, RmiiClockConfig, RmiiEth, RmiiEthChipset};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::{self, AnyOutputPin};
use esp_idf_svc::hal::mac::MAC;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::sys::*;
use esp_idf_svc::wifi::EspWifi;
use log::{debug, info};

use crate::config::{AuthThreshold, EthernetConfig, RmiiClockMode};
use crate::error::{DriverError, Error, Result};
use crate::events::{EventLoop, NetEvent};
use crate::pins;
use crate::ports::{EthernetMac, SntpClient, WallClock, WifiRadio};

use super::time::WallTime;
use super::wifi::StationConfig;

fn check(op: &'static str, rc: esp_err_t) -> core::result::Result<(), DriverError> {
    if rc == ESP_OK as esp_err_t {
        Ok(())
    } else {
        Err(DriverError::new(op, rc))
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// SDK event bridge
// ───────────────────────────────────────────────────────────────

/// Register one handler per event base on the default SDK event loop.
///
/// The handler owns a clone of `events` for the rest of the program.
pub fn install_event_bridge(events: &EventLoop) -> Result<()> {
    let arg = Box::into_raw(Box::new(events.clone())).cast::<c_void>();

    // SAFETY: the default loop exists (EspSystemEventLoop::take); `arg` is
    // leaked and outlives every callback.
    unsafe {
        for (op, base) in [
            ("register WIFI_EVENT", WIFI_EVENT),
            ("register IP_EVENT", IP_EVENT),
            ("register ETH_EVENT", ETH_EVENT),
        ] {
            check(
                op,
                esp_event_handler_register(base, ESP_EVENT_ANY_ID, Some(on_sdk_event), arg),
            )
            .map_err(Error::from)?;
        }
    }
    debug!("events: SDK bridge installed");
    Ok(())
}

unsafe extern "C" fn on_sdk_event(
    arg: *mut c_void,
    base: esp_event_base_t,
    id: i32,
    data: *mut c_void,
) {
    // SAFETY: `arg` is the leaked EventLoop from install_event_bridge.
    let events = unsafe { &*arg.cast::<EventLoop>() };
    if let Some(event) = unsafe { translate(base, id, data) } {
        events.post(event);
    }
}

/// # Safety
/// `data` must point at the payload type the SDK documents for (`base`, `id`).
unsafe fn translate(base: esp_event_base_t, id: i32, data: *mut c_void) -> Option<NetEvent> {
    let id = id as u32;
    let got_ip = |data: *mut c_void| {
        // SAFETY: GOT_IP events carry ip_event_got_ip_t.
        let info = unsafe { &*data.cast::<ip_event_got_ip_t>() };
        Ipv4Addr::from(u32::from_be(info.ip_info.ip.addr))
    };

    let event = if base == unsafe { WIFI_EVENT } {
        match id {
            wifi_event_t_WIFI_EVENT_STA_START => NetEvent::WifiStaStart,
            wifi_event_t_WIFI_EVENT_STA_STOP => NetEvent::WifiStaStop,
            wifi_event_t_WIFI_EVENT_STA_CONNECTED => NetEvent::WifiStaConnected,
            wifi_event_t_WIFI_EVENT_STA_DISCONNECTED => {
                let info = unsafe { &*data.cast::<wifi_event_sta_disconnected_t>() };
                NetEvent::WifiStaDisconnected { reason: u16::from(info.reason) }
            }
            _ => return None,
        }
    } else if base == unsafe { IP_EVENT } {
        match id {
            ip_event_t_IP_EVENT_STA_GOT_IP => NetEvent::StaGotIp(got_ip(data)),
            ip_event_t_IP_EVENT_STA_LOST_IP => NetEvent::StaLostIp,
            ip_event_t_IP_EVENT_ETH_GOT_IP => NetEvent::EthGotIp(got_ip(data)),
            _ => return None,
        }
    } else if base == unsafe { ETH_EVENT } {
        match id {
            eth_event_t_ETHERNET_EVENT_START => NetEvent::EthStart,
            eth_event_t_ETHERNET_EVENT_STOP => NetEvent::EthStop,
            eth_event_t_ETHERNET_EVENT_CONNECTED => NetEvent::EthConnected,
            eth_event_t_ETHERNET_EVENT_DISCONNECTED => NetEvent::EthDisconnected,
            _ => return None,
        }
    } else {
        return None;
    };
    Some(event)
}

// ───────────────────────────────────────────────────────────────
// WiFi
// ───────────────────────────────────────────────────────────────

/// Station radio on the ESP32 modem.
///
/// `EspWifi` creates the default STA netif and runs `esp_wifi_init`; every
/// later step is a direct `esp_wifi_*` call so the radio stays in the state
/// the station adapter expects.
pub struct EspWifiRadio {
    modem: Mutex<Modem>,
    sysloop: EspSystemEventLoop,
    driver: Mutex<Option<EspWifi<'static>>>,
}

impl EspWifiRadio {
    pub fn new(modem: Modem, sysloop: EspSystemEventLoop) -> Self {
        Self {
            modem: Mutex::new(modem),
            sysloop,
            driver: Mutex::new(None),
        }
    }
}

fn auth_mode(threshold: AuthThreshold) -> wifi_auth_mode_t {
    match threshold {
        AuthThreshold::Open => wifi_auth_mode_t_WIFI_AUTH_OPEN,
        AuthThreshold::WpaPsk => wifi_auth_mode_t_WIFI_AUTH_WPA_PSK,
        AuthThreshold::Wpa2Psk => wifi_auth_mode_t_WIFI_AUTH_WPA2_PSK,
        AuthThreshold::Wpa3Psk => wifi_auth_mode_t_WIFI_AUTH_WPA3_PSK,
    }
}

impl WifiRadio for EspWifiRadio {
    fn init(&self) -> core::result::Result<(), DriverError> {
        // A previous attempt's driver must be gone before the modem is reused.
        *lock(&self.driver) = None;
        // SAFETY: the only other handle to the modem lived in the driver
        // dropped above; a failed `EspWifi::new` drops its copy too.
        let modem = unsafe { lock(&self.modem).clone_unchecked() };
        let wifi = EspWifi::new(modem, self.sysloop.clone(), None)
            .map_err(|e| DriverError::from_esp("esp_wifi_init", e))?;

        // SAFETY: driver initialised above.
        unsafe {
            check("esp_wifi_set_storage", esp_wifi_set_storage(wifi_storage_t_WIFI_STORAGE_RAM))?;
            check("esp_wifi_set_mode", esp_wifi_set_mode(wifi_mode_t_WIFI_MODE_NULL))?;
            esp_log_level_set(c"wifi".as_ptr(), esp_log_level_t_ESP_LOG_WARN);
        }

        *lock(&self.driver) = Some(wifi);
        Ok(())
    }

    fn configure_station(&self, config: &StationConfig) -> core::result::Result<(), DriverError> {
        // SAFETY: all-zero is a valid wifi_config_t.
        let mut raw: wifi_config_t = unsafe { core::mem::zeroed() };
        {
            // SAFETY: `sta` is the member read for WIFI_IF_STA.
            let sta = unsafe { &mut raw.sta };
            sta.ssid[..config.ssid.len()].copy_from_slice(&config.ssid);
            sta.password[..config.password.len()].copy_from_slice(&config.password);
            sta.threshold.authmode = auth_mode(config.auth_threshold);
            sta.pmf_cfg.capable = config.pmf_capable;
            sta.pmf_cfg.required = config.pmf_required;
        }

        // SAFETY: plain FFI calls on an initialised driver.
        unsafe {
            check("esp_wifi_set_mode", esp_wifi_set_mode(wifi_mode_t_WIFI_MODE_STA))?;
            check(
                "esp_wifi_set_config",
                esp_wifi_set_config(wifi_interface_t_WIFI_IF_STA, &mut raw),
            )
        }
    }

    fn start(&self) -> core::result::Result<(), DriverError> {
        check("esp_wifi_start", unsafe { esp_wifi_start() })
    }

    fn stop(&self) -> core::result::Result<(), DriverError> {
        match unsafe { esp_wifi_stop() } {
            rc if rc == ESP_ERR_WIFI_NOT_STARTED as esp_err_t => Ok(()),
            rc => check("esp_wifi_stop", rc),
        }
    }

    fn connect(&self) -> core::result::Result<(), DriverError> {
        check("esp_wifi_connect", unsafe { esp_wifi_connect() })
    }
}

// ───────────────────────────────────────────────────────────────
// Ethernet (LAN8720, RMII)
// ───────────────────────────────────────────────────────────────

/// Peripherals the RMII EMAC claims. MDC/MDIO are 23/18 on the ESP32 EMAC.
pub struct RmiiPins {
    pub mac: MAC,
    pub txd0: gpio::Gpio19,
    pub txd1: gpio::Gpio22,
    pub tx_en: gpio::Gpio21,
    pub rxd0: gpio::Gpio25,
    pub rxd1: gpio::Gpio26,
    pub crs_dv: gpio::Gpio27,
    pub mdc: gpio::Gpio23,
    pub mdio: gpio::Gpio18,
    pub ref_clk: gpio::Gpio17,
}

pub struct EspEthernetMac {
    pins: RmiiPins,
    sysloop: EspSystemEventLoop,
    eth: Option<EspEth<'static, EthDriver<'static, RmiiEth>>>,
}

impl EspEthernetMac {
    pub fn new(pins: RmiiPins, sysloop: EspSystemEventLoop) -> Self {
        Self { pins, sysloop, eth: None }
    }
}

impl EthernetMac for EspEthernetMac {
    fn init(&mut self, config: &EthernetConfig) -> core::result::Result<(), DriverError> {
        const OP: &str = "esp_eth_driver_install";
        if config.clock_mode != RmiiClockMode::Gpio17Out
            || config.mdc_gpio != pins::SMI_MDC_GPIO
            || config.mdio_gpio != pins::SMI_MDIO_GPIO
        {
            return Err(DriverError::new(OP, ESP_ERR_NOT_SUPPORTED as esp_err_t));
        }

        // Uninstall whatever an earlier attempt left behind (installed but
        // not started) before the pins are handed out again.
        self.eth = None;

        let p = &mut self.pins;
        // SAFETY: this struct owns the pins and `self.eth` held the only
        // other copies; it was dropped above, and a failed install drops
        // its own copies before returning.
        let driver = unsafe {
            EthDriver::new_rmii(
                p.mac.clone_unchecked(),
                p.rxd0.clone_unchecked(),
                p.rxd1.clone_unchecked(),
                p.crs_dv.clone_unchecked(),
                p.mdc.clone_unchecked(),
                p.txd1.clone_unchecked(),
                p.tx_en.clone_unchecked(),
                p.txd0.clone_unchecked(),
                p.mdio.clone_unchecked(),
                RmiiClockConfig::<gpio::Gpio0, gpio::Gpio16, gpio::Gpio17>::OutputInvertedGpio17(
                    p.ref_clk.clone_unchecked(),
                ),
                None::<AnyOutputPin>,
                RmiiEthChipset::LAN87XX,
                Some(u32::from(config.phy_addr)),
                self.sysloop.clone(),
            )
        }
        .map_err(|e| DriverError::from_esp(OP, e))?;

        let eth = EspEth::wrap(driver).map_err(|e| DriverError::from_esp("esp_netif_attach", e))?;
        self.eth = Some(eth);
        Ok(())
    }

    fn enable(&mut self) -> core::result::Result<(), DriverError> {
        let eth = self
            .eth
            .as_mut()
            .ok_or(DriverError::new("esp_eth_start", ESP_ERR_INVALID_STATE as esp_err_t))?;
        eth.start().map_err(|e| DriverError::from_esp("esp_eth_start", e))
    }
}

// ───────────────────────────────────────────────────────────────
// SNTP
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct EspSntpClient {
    // lwIP keeps the pointer, so the name lives as long as the client.
    server: Option<CString>,
}

impl EspSntpClient {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SntpClient for EspSntpClient {
    fn start(&mut self, server: &str) -> core::result::Result<(), DriverError> {
        let name = CString::new(server)
            .map_err(|_| DriverError::new("esp_sntp_setservername", ESP_ERR_INVALID_ARG as esp_err_t))?;
        // SAFETY: `name` is stored in self and never freed while SNTP runs.
        unsafe {
            esp_sntp_setoperatingmode(esp_sntp_operatingmode_t_ESP_SNTP_OPMODE_POLL);
            esp_sntp_setservername(0, name.as_ptr());
            esp_sntp_init();
        }
        self.server = Some(name);
        info!("SNTP: client started");
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Wall clock
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct EspWallClock;

impl WallClock for EspWallClock {
    fn now(&self) -> WallTime {
        let mut tv = timeval { tv_sec: 0, tv_usec: 0 };
        // SAFETY: `tv` is a valid out-pointer; no timezone requested.
        if unsafe { gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return WallTime::default();
        }
        WallTime::new(tv.tv_sec as i64, tv.tv_usec as u32)
    }

    fn set_timezone_utc(&self) {
        // SAFETY: called from the bring-up thread before application tasks
        // read the environment.
        unsafe {
            std::env::set_var("TZ", "UTC");
            tzset();
        }
    }
}
