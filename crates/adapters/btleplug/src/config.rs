//! btleplug adapter configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the btleplug transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BtleplugConfig {
    /// Index of the host adapter to use, in the order btleplug lists them.
    pub adapter_index: usize,
    /// How long a connect attempt may take before it is reported as failed.
    pub connect_timeout_secs: u16,
    /// Capacity of the request queue between the central and the worker.
    pub command_capacity: usize,
    /// Capacity of the event queue from the worker to the central.
    pub event_capacity: usize,
}

impl BtleplugConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_secs))
    }
}

impl Default for BtleplugConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            connect_timeout_secs: 10,
            command_capacity: 16,
            event_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let config: BtleplugConfig = toml::from_str("connect_timeout_secs = 3").unwrap();
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.adapter_index, 0);
        assert_eq!(config.command_capacity, 16);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn should_default_to_ten_second_connect_timeout() {
        assert_eq!(
            BtleplugConfig::default().connect_timeout(),
            Duration::from_secs(10)
        );
    }
}
