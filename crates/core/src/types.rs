use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Device class of the browsing session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
        }
    }
}

impl std::str::FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(DeviceClass::Desktop),
            "mobile" => Ok(DeviceClass::Mobile),
            "tablet" => Ok(DeviceClass::Tablet),
            other => Err(format!("unknown device class: {other}")),
        }
    }
}

/// Per-session behavioral record, persisted as JSON in client-side storage.
///
/// Deserialization never fails on field content: absent fields take their
/// defaults, negative or non-numeric counts become 0, unknown device classes
/// become [`DeviceClass::Desktop`] and unparseable timestamps are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, alias = "sessionId", deserialize_with = "lenient::string")]
    pub session_id: String,
    #[serde(
        default,
        alias = "visitedPaths",
        alias = "pages",
        deserialize_with = "lenient::string_list"
    )]
    pub visited_paths: Vec<String>,
    #[serde(
        default,
        alias = "timeOnSite",
        deserialize_with = "lenient::count"
    )]
    pub time_on_site_secs: u64,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub referrer: Option<String>,
    #[serde(default, deserialize_with = "lenient::device")]
    pub device: DeviceClass,
    #[serde(default, deserialize_with = "lenient::string_set")]
    pub behaviors: BTreeSet<String>,
    #[serde(default, alias = "startedAt", deserialize_with = "lenient::timestamp")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        alias = "lastActivity",
        deserialize_with = "lenient::timestamp"
    )]
    pub last_activity: Option<DateTime<Utc>>,
}

impl Profile {
    /// A fresh profile created on the first page view of a session.
    pub fn new(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            started_at: Some(now),
            last_activity: Some(now),
            ..Default::default()
        }
    }

    pub fn visit_count(&self) -> usize {
        self.visited_paths.len()
    }

    /// Seconds since the last recorded activity; 0 when unknown or in the future.
    pub fn seconds_since_last_activity(&self, now: DateTime<Utc>) -> u64 {
        self.last_activity
            .map(|last| (now - last).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }
}

/// Score of one segment for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSegment {
    pub segment_id: String,
    pub score: f64,
}

/// Best-matching segment for a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMatch {
    pub segment_id: String,
    pub confidence: f64,
}

impl SegmentMatch {
    pub fn new(segment_id: impl Into<String>, confidence: f64) -> Self {
        Self {
            segment_id: segment_id.into(),
            confidence: clamp_unit(confidence),
        }
    }
}

/// Clamp into [0, 1], mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

mod lenient {
    use super::*;
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(optional_string(d)?.unwrap_or_default())
    }

    pub fn optional_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => match (n.as_u64(), n.as_f64()) {
                (Some(v), _) => v,
                (None, Some(f)) if f.is_finite() && f > 0.0 => f as u64,
                _ => 0,
            },
            Value::String(s) => s.trim().parse::<f64>().ok().map_or(0, |f| {
                if f.is_finite() && f > 0.0 {
                    f as u64
                } else {
                    0
                }
            }),
            _ => 0,
        })
    }

    fn strings(value: Value) -> impl Iterator<Item = String> {
        let items = match value {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        items.into_iter().filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(strings(Value::deserialize(d)?).collect())
    }

    pub fn string_set<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<String>, D::Error> {
        Ok(strings(Value::deserialize(d)?).collect())
    }

    pub fn device<'de, D: Deserializer<'de>>(d: D) -> Result<DeviceClass, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s.parse().unwrap_or_default(),
            _ => DeviceClass::default(),
        })
    }

    /// RFC 3339 strings or epoch milliseconds.
    pub fn timestamp<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Value::Number(n) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_json_round_trip_keeps_fields() {
        let now = Utc::now();
        let mut profile = Profile::new("sess-1", now);
        profile.visited_paths.push("/services/implants".into());
        profile.behaviors.insert("viewed_pricing".into());
        profile.referrer = Some("https://www.google.com/".into());
        profile.device = DeviceClass::Tablet;

        let json = serde_json::to_string(&profile).unwrap();
        let parsed: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.session_id, "sess-1");
        assert_eq!(parsed.visit_count(), 1);
        assert_eq!(parsed.device, DeviceClass::Tablet);
        assert!(parsed.behaviors.contains("viewed_pricing"));
    }

    #[test]
    fn test_adversarial_fields_become_defaults() {
        let parsed: Profile = serde_json::from_value(serde_json::json!({
            "sessionId": 42,
            "pages": ["/", 7, null, "/emergency"],
            "timeOnSite": -120,
            "device": "smartwatch",
            "behaviors": "viewed_pricing",
            "lastActivity": "yesterday-ish"
        }))
        .unwrap();

        assert_eq!(parsed.session_id, "42");
        assert_eq!(parsed.visited_paths, vec!["/", "/emergency"]);
        assert_eq!(parsed.time_on_site_secs, 0);
        assert_eq!(parsed.device, DeviceClass::Desktop);
        assert!(parsed.behaviors.is_empty());
        assert!(parsed.last_activity.is_none());
    }

    #[test]
    fn test_empty_object_is_default_profile() {
        let parsed: Profile = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, Profile::default());
    }

    #[test]
    fn test_epoch_millis_timestamp() {
        let parsed: Profile =
            serde_json::from_value(serde_json::json!({ "lastActivity": 1_700_000_000_000i64 }))
                .unwrap();
        assert_eq!(
            parsed.last_activity.map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_seconds_since_last_activity_never_negative() {
        let now = Utc::now();
        let mut profile = Profile::new("s", now);
        profile.last_activity = Some(now + chrono::Duration::seconds(30));
        assert_eq!(profile.seconds_since_last_activity(now), 0);
        profile.last_activity = Some(now - chrono::Duration::seconds(45));
        assert_eq!(profile.seconds_since_last_activity(now), 45);
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(0.42), 0.42);
    }
}
