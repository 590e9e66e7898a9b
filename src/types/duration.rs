//! Duration serialization helpers for configuration files

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Helper for deserializing Duration from seconds
///
/// TOML configs specify timeouts and intervals in whole seconds, so we need
/// custom serde to convert from u64 seconds to Duration
pub mod duration_serde {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(with = "duration_serde")]
        timeout: Duration,
    }

    #[test]
    fn test_deserialize_seconds() {
        let w: Wrapper = toml::from_str("timeout = 20").unwrap();
        assert_eq!(w.timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_serialize_truncates_to_seconds() {
        let w = Wrapper {
            timeout: Duration::from_millis(2500),
        };
        let s = toml::to_string(&w).unwrap();
        assert_eq!(s.trim(), "timeout = 2");
    }
}
