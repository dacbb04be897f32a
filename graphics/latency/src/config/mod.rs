//! Runtime configuration

/// Environment variable forcing emulated pacing for every backend kind
pub const FORCE_EMULATION_ENV: &str = "LATENCY_SHIM_FORCE_EMULATION";

/// Environment variable silencing first-success logging
pub const QUIET_ENV: &str = "LATENCY_SHIM_QUIET";

/// Latency translation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyConfig {
    /// Never resolve native entry points, always emulate
    pub force_emulation: bool,
    /// Log the first successful completion of each hot-path request
    pub log_first_success: bool,
}

impl LatencyConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self {
            force_emulation: false,
            log_first_success: true,
        }
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(value) = lookup(FORCE_EMULATION_ENV) {
            config.force_emulation = parse_flag(&value);
            if config.force_emulation {
                log::info!("{} set, native pacing disabled", FORCE_EMULATION_ENV);
            }
        }

        if let Some(value) = lookup(QUIET_ENV) {
            config.log_first_success = !parse_flag(&value);
        }

        config
    }

    /// Force emulated pacing
    pub fn with_force_emulation(mut self, force: bool) -> Self {
        self.force_emulation = force;
        self
    }
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "True" | "yes" | "on")
}
