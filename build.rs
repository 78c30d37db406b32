fn main() {
    // Only ESP-IDF builds have an IDF environment to export; host builds
    // (tests, trace replay) skip it.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
