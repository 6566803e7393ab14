use serde::{Deserialize, Serialize};
use simpledmx_frame::MAX_CHANNELS;
use simpledmx_transport::PortConfig;

use crate::error::{DmxError, Result};
use crate::plan::STEP_COUNT;

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Channels in the universe. Default: 512.
    pub num_channels: u16,
    /// Interpolation ticks per ramp. Default: 256, one per intensity level.
    pub step_count: u16,
    /// Render after every `set_channel` / `clear` on the connection.
    pub autorender: bool,
    /// Serial link settings.
    pub port: PortConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            num_channels: MAX_CHANNELS,
            step_count: STEP_COUNT,
            autorender: false,
            port: PortConfig::default(),
        }
    }
}

impl ConnectionConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.step_count == 0 {
            return Err(DmxError::InvalidConfig(
                "step_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn defaults() {
        let cfg = ConnectionConfig::default();
        assert_eq!(cfg.num_channels, 512);
        assert_eq!(cfg.step_count, 256);
        assert!(!cfg.autorender);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_steps_rejected() {
        let cfg = ConnectionConfig {
            step_count: 0,
            ..ConnectionConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(DmxError::InvalidConfig(_))));
    }

    #[test]
    fn nested_port_settings_deserialize() {
        let cfg: ConnectionConfig = serde_json::from_str(
            r#"{"num_channels": 24, "autorender": true, "port": {"baud_rate": 115200, "write_timeout_ms": 50}}"#,
        )
        .unwrap();
        assert_eq!(cfg.num_channels, 24);
        assert_eq!(cfg.step_count, 256);
        assert!(cfg.autorender);
        assert_eq!(cfg.port.baud_rate, 115_200);
        assert_eq!(cfg.port.write_timeout, Duration::from_millis(50));
    }
}
