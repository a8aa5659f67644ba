//! # rotor-settings
//!
//! Strongly-typed configuration for the rotation subsystem.
//!
//! Every component (strategy, preserver, summarizer, retry, metrics) has its
//! own settings struct with production defaults and a `validate()` that runs
//! once, before anything is built from it.
//!
//! Settings are resolved in three layers (in priority order):
//! 1. **Compiled defaults**: [`RotorSettings::default()`]
//! 2. **User file**: `~/.rotor/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `ROTOR_*` overrides (highest priority)
//!
//! Callers that already hold a merged key/value map use
//! [`settings_from_value`] instead.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_from_value,
    settings_path,
};
pub use types::*;
