fn main() {
    // Emit ESP-IDF link arguments only when building the firmware image.
    // Host builds (tests, tooling) skip this entirely.
    if std::env::var("CARGO_FEATURE_ESPIDF").is_ok() {
        embuild::espidf::sysenv::output();
    }
}
