fn main() {
    // Exports the ESP-IDF sysenv (toolchain paths, sdkconfig) when building
    // the firmware image; a no-op on plain host builds.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
