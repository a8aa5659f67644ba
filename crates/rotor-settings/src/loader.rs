//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RotorSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `ROTOR_*` environment variable overrides (highest priority)
//! 4. Validate the merged tree
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::RotorSettings;

/// Resolve the path to the settings file (`~/.rotor/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".rotor").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RotorSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns validated defaults. If the file
/// contains invalid JSON or invalid values, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<RotorSettings> {
    let defaults = serde_json::to_value(RotorSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: RotorSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Build validated settings from an already-merged key/value map.
///
/// Missing keys take their defaults. No environment overrides are applied.
pub fn settings_from_value(value: Value) -> Result<RotorSettings> {
    let defaults = serde_json::to_value(RotorSettings::default())?;
    let settings: RotorSettings = serde_json::from_value(deep_merge(defaults, value))?;
    settings.validate()?;
    Ok(settings)
}

/// Merge `overlay` into `base`.
///
/// Objects merge key by key; `null` in the overlay keeps the base value;
/// anything else (scalars, arrays) replaces it.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay)) => {
            for (key, value) in overlay.into_iter().filter(|(_, v)| !v.is_null()) {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut RotorSettings) {
    apply_overrides_with(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning (fall back to file/default).
pub fn apply_overrides_with<F>(settings: &mut RotorSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read_string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read_string("ROTOR_STRATEGY") {
        settings.strategy.kind = v;
    }
    if let Some(v) = read_string("ROTOR_PRESERVER") {
        settings.preserver.kind = v;
    }
    if let Some(v) = read_string("ROTOR_SUMMARIZER") {
        settings.summarizer.kind = v;
    }
    if let Some(v) = read_string("ROTOR_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_typed(&lookup, "ROTOR_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }
    if let Some(v) = read_typed(&lookup, "ROTOR_METRICS_WINDOW", |s| {
        parse_usize_range(s, 1, 100_000)
    }) {
        settings.metrics.window_size = v;
    }
    if let Some(v) = read_typed(&lookup, "ROTOR_SUMMARIZE_PCT", parse_pct) {
        settings.strategy.token_based.summarize_threshold_pct = v;
    }
    if let Some(v) = read_typed(&lookup, "ROTOR_ROTATE_PCT", parse_pct) {
        settings.strategy.token_based.rotate_threshold_pct = v;
    }
}

fn read_typed<F, T>(lookup: &F, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
{
    let val = lookup(name)?;
    let result = parse(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}

/// Parse a boolean env var value (`true/1/yes/on`, `false/0/no/off`).
pub fn parse_bool(val: &str) -> Option<bool> {
    let val = val.trim().to_ascii_lowercase();
    if matches!(val.as_str(), "true" | "1" | "yes" | "on") {
        Some(true)
    } else if matches!(val.as_str(), "false" | "0" | "no" | "off") {
        Some(false)
    } else {
        None
    }
}

/// Parse a `usize` within `min..=max`.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    val.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (min..=max).contains(n))
}

/// Parse a percentage in `[0, 100]`.
pub fn parse_pct(val: &str) -> Option<f64> {
    let n: f64 = val.parse().ok()?;
    (n.is_finite() && (0.0..=100.0).contains(&n)).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
