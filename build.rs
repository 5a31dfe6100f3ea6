fn main() {
    // Only the firmware build needs the ESP-IDF environment; host builds
    // leave the `espidf` feature off.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
