use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default link speed of the widget's virtual serial port.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Default read and write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial link settings.
///
/// Durations are (de)serialized as whole milliseconds so the struct can sit
/// in a host application's configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    /// Link speed in bits per second. Default: 57600.
    pub baud_rate: u32,
    /// Read timeout for blocking reads.
    #[serde(rename = "read_timeout_ms", with = "millis")]
    pub read_timeout: Duration,
    /// Upper bound for a single packet write.
    #[serde(rename = "write_timeout_ms", with = "millis")]
    pub write_timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
