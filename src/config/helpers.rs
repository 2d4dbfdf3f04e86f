use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Custom deserializer for Duration from milliseconds
pub fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

/// Custom deserializer for Duration from seconds
pub fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Custom serializer for Duration to milliseconds
pub fn serialize_duration_to_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Custom serializer for Duration to seconds
pub fn serialize_duration_to_seconds<S>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct PollSettings {
        #[serde(
            deserialize_with = "deserialize_duration_from_ms",
            serialize_with = "serialize_duration_to_ms"
        )]
        polling_interval_ms: Duration,
        #[serde(
            deserialize_with = "deserialize_duration_from_seconds",
            serialize_with = "serialize_duration_to_seconds"
        )]
        shutdown_timeout_secs: Duration,
    }

    #[test]
    fn test_deserialize_durations() {
        let json = r#"{"polling_interval_ms": 6000, "shutdown_timeout_secs": 30}"#;
        let actual: PollSettings = serde_json::from_str(json).unwrap();
        assert_eq!(actual.polling_interval_ms, Duration::from_secs(6));
        assert_eq!(actual.shutdown_timeout_secs, Duration::from_secs(30));
    }

    #[test]
    fn test_serialize_durations_keeps_units() {
        let settings = PollSettings {
            polling_interval_ms: Duration::from_millis(1500),
            shutdown_timeout_secs: Duration::from_secs(5),
        };
        let actual = serde_json::to_string(&settings).unwrap();
        assert_eq!(actual, r#"{"polling_interval_ms":1500,"shutdown_timeout_secs":5}"#);
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        let json = r#"{"polling_interval_ms": -1, "shutdown_timeout_secs": 30}"#;
        assert!(serde_json::from_str::<PollSettings>(json).is_err());
    }
}
