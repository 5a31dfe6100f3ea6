//! Fuzz target: `NetworkConfig::from_bytes`
//!
//! Arbitrary NVS blobs must decode to a validated config or an error, never
//! a panic. Anything accepted must survive a re-encode unchanged.
//!
//! cargo fuzz run fuzz_stored_config

#![no_main]

use libfuzzer_sys::fuzz_target;
use netbringup::NetworkConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = NetworkConfig::from_bytes(data) {
        assert!(config.validate().is_ok());
        let bytes = config.to_bytes().expect("valid config encodes");
        assert_eq!(NetworkConfig::from_bytes(&bytes).ok(), Some(config));
    }
});
