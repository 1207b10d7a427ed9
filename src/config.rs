//! Link configuration
//!
//! Every field has a default, so a configuration file only needs the values
//! it changes:
//!
//! ```yaml
//! queue_capacity: 131072
//! history_len: 128
//! prescalers:
//!   position: 10
//!   resolution: 10
//! events_on: false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::kinematics::VelocityModel;
use crate::types::Prescalers;
use crate::{LinkError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default)]
pub struct LinkConfig {
    /// Ordered queue budget in encoded bytes.
    pub queue_capacity: usize,
    /// Samples kept for kinematics. At least the widest model window.
    pub history_len: usize,
    /// Sleep granularity of blocking waits.
    pub poll_interval_ms: u64,
    /// Used until the first block header announces the tracker's own.
    pub prescalers: Prescalers,
    pub samples_on: bool,
    pub events_on: bool,
    /// Consecutive packet source failures before the driver gives up.
    pub max_source_errors: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 65_000,
            history_len: 64,
            poll_interval_ms: 1,
            prescalers: Prescalers::default(),
            samples_on: true,
            events_on: true,
            max_source_errors: 10,
        }
    }
}

impl LinkConfig {
    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: LinkConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| LinkError::file_error(path.to_path_buf(), e))?;
        debug!("Loaded link configuration from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(LinkError::config_invalid("queue_capacity must be non-zero"));
        }
        if self.history_len < VelocityModel::MAX_WINDOW {
            return Err(LinkError::config_invalid(format!(
                "history_len {} is shorter than the widest velocity window ({})",
                self.history_len,
                VelocityModel::MAX_WINDOW
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(LinkError::config_invalid("poll_interval_ms must be non-zero"));
        }
        if self.max_source_errors == 0 {
            return Err(LinkError::config_invalid("max_source_errors must be non-zero"));
        }
        self.prescalers.validate()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = LinkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = LinkConfig::from_yaml_str(
            "queue_capacity: 1024\nprescalers:\n  position: 100\nevents_on: false\n",
        )
        .unwrap();
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.prescalers.position, 100);
        assert_eq!(config.prescalers.resolution, 10);
        assert!(!config.events_on);
        assert!(config.samples_on);
        assert_eq!(config.history_len, 64);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            LinkConfig::from_yaml_str("history_len: 8"),
            Err(LinkError::Config { .. })
        ));
        assert!(matches!(
            LinkConfig::from_yaml_str("queue_capacity: 0"),
            Err(LinkError::Config { .. })
        ));
        assert!(matches!(
            LinkConfig::from_yaml_str("prescalers:\n  pupil: 0"),
            Err(LinkError::InvalidPrescaler { .. })
        ));
        assert!(matches!(
            LinkConfig::from_yaml_str("queue_capacity: [1, 2]"),
            Err(LinkError::Config { .. })
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "history_len: 40\npoll_interval_ms: 5").unwrap();

        let config = LinkConfig::from_path(file.path()).unwrap();
        assert_eq!(config.history_len, 40);
        assert_eq!(config.poll_interval(), Duration::from_millis(5));

        let missing = LinkConfig::from_path("/nonexistent/gazelink.yaml");
        assert!(matches!(missing, Err(LinkError::File { .. })));
    }
}
