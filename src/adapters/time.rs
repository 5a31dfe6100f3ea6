//! Wall-clock values and UTC calendar conversion.
//!
//! The clock itself is a port ([`WallClock`](crate::ports::WallClock)):
//!
//! - **`target_os = "espidf"`**: `gettimeofday()`, whose sub-second part
//!   comes from the ESP-IDF high-resolution timer.
//! - **`not(target_os = "espidf")`**: the virtual clock in `super::sim`.
//!
//! Calendar maths here is pure so it can be tested on the host; no libc
//! `gmtime`/`localtime` is involved.

use core::fmt;

const SECS_PER_DAY: i64 = 86_400;
pub const MICROS_PER_SEC: u64 = 1_000_000;

// ───────────────────────────────────────────────────────────────
// WallTime
// ───────────────────────────────────────────────────────────────

/// One reading of the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct WallTime {
    /// Seconds since 1970-01-01T00:00:00Z.
    pub secs: i64,
    /// 0..1_000_000.
    pub subsec_micros: u32,
}

impl WallTime {
    pub const fn new(secs: i64, subsec_micros: u32) -> Self {
        Self { secs, subsec_micros }
    }

    /// Microseconds since the epoch. Readings before the epoch clamp to 0.
    pub fn as_micros(self) -> u64 {
        if self.secs < 0 {
            return 0;
        }
        (self.secs as u64)
            .saturating_mul(MICROS_PER_SEC)
            .saturating_add(u64::from(self.subsec_micros.min(999_999)))
    }

    pub fn to_civil(self) -> CivilDateTime {
        CivilDateTime::from_epoch_secs(self.secs)
    }
}

// ───────────────────────────────────────────────────────────────
// Civil date/time (UTC)
// ───────────────────────────────────────────────────────────────

/// Broken-down UTC time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilDateTime {
    pub year: i32,
    /// 1–12
    pub month: u8,
    /// 1–31
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CivilDateTime {
    pub fn from_epoch_secs(secs: i64) -> Self {
        let days = secs.div_euclid(SECS_PER_DAY);
        let rem = secs.rem_euclid(SECS_PER_DAY);
        let (year, month, day) = civil_from_days(days);
        Self {
            year,
            month,
            day,
            hour: (rem / 3600) as u8,
            minute: (rem % 3600 / 60) as u8,
            second: (rem % 60) as u8,
        }
    }
}

/// `DD.MM.YYYY HH:MM:SS UTC`
impl fmt::Display for CivilDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}.{:02}.{:04} {:02}:{:02}:{:02} UTC",
            self.day, self.month, self.year, self.hour, self.minute, self.second
        )
    }
}

/// Epoch seconds of `year`-01-01T00:00:00Z.
pub fn year_start_epoch_secs(year: i32) -> i64 {
    days_from_civil(year, 1, 1) * SECS_PER_DAY
}

// Howard Hinnant's days_from_civil / civil_from_days, proleptic Gregorian.

fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let y = i64::from(year) - i64::from(month <= 2);
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = i64::from(month);
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year as i32, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_is_1970() {
        let c = CivilDateTime::from_epoch_secs(0);
        assert_eq!((c.year, c.month, c.day, c.hour), (1970, 1, 1, 0));
    }

    #[test]
    fn year_2017_floor() {
        assert_eq!(year_start_epoch_secs(2017), 1_483_228_800);
        assert_eq!(year_start_epoch_secs(1970), 0);
    }

    #[test]
    fn leap_day() {
        // 2024-02-29T12:34:56Z
        let c = CivilDateTime::from_epoch_secs(1_709_210_096);
        assert_eq!((c.year, c.month, c.day), (2024, 2, 29));
        assert_eq!((c.hour, c.minute, c.second), (12, 34, 56));
    }

    #[test]
    fn formats_like_status_line() {
        // 2018-11-29T08:05:09Z
        let c = CivilDateTime::from_epoch_secs(1_543_478_709);
        assert_eq!(c.to_string(), "29.11.2018 08:05:09 UTC");
    }

    #[test]
    fn before_epoch() {
        let c = CivilDateTime::from_epoch_secs(-1);
        assert_eq!((c.year, c.month, c.day), (1969, 12, 31));
        assert_eq!((c.hour, c.minute, c.second), (23, 59, 59));
    }

    #[test]
    fn micros_combine_secs_and_subsec() {
        assert_eq!(WallTime::new(2, 500).as_micros(), 2_000_500);
        assert_eq!(WallTime::new(-5, 10).as_micros(), 0);
    }
}
