fn main() {
    // Host builds (unit tests, proptest, fuzz) have no ESP-IDF environment
    // to forward; only the firmware build needs the sysenv passthrough.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
