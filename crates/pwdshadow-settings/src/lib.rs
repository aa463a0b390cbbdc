//! # pwdshadow-settings
//!
//! Configuration for the pwdshadow engine, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`ShadowSettings::default()`]
//! 2. **Settings file**: `$PWDSHADOW_CONFIG` or `/etc/pwdshadow/settings.json`
//! 3. **Environment variables**: `PWDSHADOW_*` overrides
//!
//! The loaded value is an immutable snapshot; the engine takes it by
//! reference when it is built.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<ShadowSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from [`settings_path`] with env var
/// overrides. If loading fails, logs the error and returns compiled
/// defaults.
pub fn get_settings() -> &'static ShadowSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to load settings, using defaults");
            ShadowSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: ShadowSettings) -> std::result::Result<(), ShadowSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
