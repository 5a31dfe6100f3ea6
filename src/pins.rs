//! GPIO assignments for the LAN8720 Ethernet PHY wiring.
//!
//! Single source of truth: the Ethernet adapter and the firmware entry point
//! reference this module rather than hard-coding pin numbers. The RMII data
//! pins are fixed by the ESP32 EMAC and listed here for reference only.

// ---------------------------------------------------------------------------
// RMII data interface (fixed by silicon)
// ---------------------------------------------------------------------------

pub const RMII_TXD0_GPIO: i32 = 19;
pub const RMII_TXD1_GPIO: i32 = 22;
pub const RMII_TX_EN_GPIO: i32 = 21;
pub const RMII_RXD0_GPIO: i32 = 25;
pub const RMII_RXD1_GPIO: i32 = 26;
pub const RMII_CRS_DV_GPIO: i32 = 27;

/// 50 MHz reference clock, driven by the ESP32 APLL.
pub const RMII_REF_CLK_GPIO: i32 = 17;

// ---------------------------------------------------------------------------
// SMI management interface
// ---------------------------------------------------------------------------

pub const SMI_MDC_GPIO: i32 = 23;
pub const SMI_MDIO_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// PHY power control
// ---------------------------------------------------------------------------

/// Digital output: HIGH powers the LAN8720 oscillator and PHY.
pub const PHY_POWER_GPIO: i32 = 12;

/// Default SMI address of the LAN8720 on this board.
pub const PHY_ADDR: u8 = 0;
