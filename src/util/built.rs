//! This file handles build-time information.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use crate::util::log::log_info;

// Import the build-time information from the `built.rs` output file generated
// during the build process by `build.rs`.
#[allow(dead_code)]
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

// Expose Git version so it can be used in the application.
pub use built_info::GIT_VERSION;

// Expose rustc version so it can be used in the application.
pub use built_info::RUSTC_VERSION;

// Expose package version so it can be used in the application.
pub use built_info::PKG_VERSION;

/// Log build-time information to the console.
pub fn log_fw_info(bin_name: &str) {
    // General information
    log_info!("{} running {}", built_info::PKG_NAME, bin_name);
    log_info!("Author: {}", built_info::PKG_AUTHORS);
    log_info!("Version: {}", built_info::PKG_VERSION);

    // Git information
    log_info!("Git commit: {}", built_info::GIT_COMMIT_HASH.unwrap_or("unknown"));
    log_info!("Git dirty: {}", built_info::GIT_DIRTY.unwrap_or(false));
    log_info!("Git version: {}", built_info::GIT_VERSION.unwrap_or("unknown"));

    // Build information
    log_info!("Built: {}", built_info::BUILT_TIME_UTC);
    log_info!("Rust version: {}", built_info::RUSTC_VERSION);
    log_info!("Host triple: {}", built_info::HOST);
    log_info!("Target triple: {}", built_info::TARGET);
    log_info!("Build profile: {}", built_info::PROFILE);
    log_info!("Enabled features: {}", built_info::FEATURES_LOWERCASE_STR);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_version_matches_cargo() {
        assert_eq!(PKG_VERSION, env!("CARGO_PKG_VERSION"));
        assert!(!RUSTC_VERSION.is_empty());
    }

    #[test]
    fn log_fw_info_runs_on_host() {
        log_fw_info("unit-test");
    }
}
