//! # wavelink-settings
//!
//! Configuration for the wavelink client engine.
//!
//! Loading flow:
//! 1. Start with compiled [`StreamConfig::default()`]
//! 2. If a JSON config file is given and exists, deep-merge its values
//!    over the defaults
//! 3. Apply environment variable overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, deep_merge, load_config, load_config_from_path};
pub use types::StreamConfig;
