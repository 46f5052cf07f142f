//! Command: print version information.

/// Version string: `ASSETCTL_VERSION` at build time, else the package version.
#[must_use]
pub const fn version() -> &'static str {
    match option_env!("ASSETCTL_VERSION") {
        Some(version) => version,
        None => env!("CARGO_PKG_VERSION"),
    }
}

/// Print the assetctl version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("assetctl {}", version());
}
