use std::sync::{Arc, OnceLock};

use super::StaticConfig;

static CONFIG: OnceLock<Arc<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Only the binary entry point relies on this. Library components receive
/// their settings explicitly at construction.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get()
        .cloned()
        .unwrap_or_else(|| Arc::new(StaticConfig::default()))
}

/// Initialize the global configuration
///
/// Loads configuration from "config.toml" in the current directory,
/// overlaid by `LP__*` environment variables. Later calls are no-ops.
///
/// # Examples
/// ```no_run
/// use linkpulse::config::init_config;
/// init_config();
/// ```
pub fn init_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| Arc::new(StaticConfig::load()))
        .clone()
}

/// Initialize the global configuration with an explicit value (tests, embedding)
pub fn init_config_with(config: StaticConfig) -> Arc<StaticConfig> {
    CONFIG.get_or_init(|| Arc::new(config)).clone()
}
