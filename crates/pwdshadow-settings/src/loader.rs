//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ShadowSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `PWDSHADOW_*` environment overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{LogFormat, ShadowSettings};

/// Default settings file location.
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/pwdshadow/settings.json";

/// Resolve the settings file path (`$PWDSHADOW_CONFIG` or the default).
pub fn settings_path() -> PathBuf {
    read_env_string("PWDSHADOW_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH), PathBuf::from)
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ShadowSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a value that fails
/// validation is an error.
pub fn load_settings_from_path(path: &Path) -> Result<ShadowSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Read and merge the settings file without env overrides or validation.
pub fn read_settings_file(path: &Path) -> Result<ShadowSettings> {
    let defaults = serde_json::to_value(ShadowSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `PWDSHADOW_*` environment overrides.
pub fn apply_env_overrides(settings: &mut ShadowSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning (falling back to file or
/// default).
pub fn apply_overrides(settings: &mut ShadowSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read_bool = |name: &str| {
        let val = lookup(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    };
    let read_string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read_bool("PWDSHADOW_OVERRIDES") {
        settings.overrides = v;
    }
    if let Some(v) = read_bool("PWDSHADOW_USE_POLICIES") {
        settings.use_policies = v;
    }
    if let Some(v) = read_bool("PWDSHADOW_AUTO_EXPIRE") {
        settings.auto_expire = v;
    }
    if let Some(v) = read_string("PWDSHADOW_DEFAULT_POLICY") {
        settings.default_policy = Some(v);
    }
    if let Some(v) = read_string("PWDSHADOW_POLICY_ATTRIBUTE") {
        settings.policy_attribute = v;
    }
    if let Some(v) = read_string("PWDSHADOW_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_string("PWDSHADOW_LOG_FORMAT") {
        match serde_json::from_value::<LogFormat>(Value::String(v.to_lowercase())) {
            Ok(format) => settings.logging.format = format,
            Err(_) => warn!(key = "PWDSHADOW_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
