//! Fuzz target: `WifiCredentials::from_parts`
//!
//! Feeds arbitrary SSID/password buffers with arbitrary explicit lengths and
//! checks that:
//! - construction never panics, whatever the lengths claim
//! - an accepted SSID is exactly the clamped prefix, 1..=32 bytes
//! - an accepted password is exactly the clamped prefix, at most 64 bytes
//!
//! cargo fuzz run fuzz_credentials

#![no_main]

use libfuzzer_sys::fuzz_target;
use netbringup::adapters::wifi::{MAX_PASSWORD_LEN, MAX_SSID_LEN, WifiCredentials};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let ssid_len = usize::from(data[0]);
    let password_len = usize::from(data[1]);
    let split = (usize::from(data[2]) % (data.len() - 2)) + 3;
    let (ssid, password) = data[3..].split_at(split.min(data.len()) - 3);
    let password = (data[2] & 1 == 0).then_some(password);

    if let Ok(c) = WifiCredentials::from_parts(ssid, ssid_len, password, password_len) {
        let n = ssid_len.min(ssid.len());
        assert!((1..=MAX_SSID_LEN).contains(&n));
        assert_eq!(c.ssid(), &ssid[..n]);
        if let Some(pwd) = password {
            let m = password_len.min(pwd.len());
            assert!(m <= MAX_PASSWORD_LEN);
            assert_eq!(c.password(), Some(&pwd[..m]));
        } else {
            assert!(c.password().is_none());
        }
    }
});
