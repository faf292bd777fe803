use serde::{Deserialize, Serialize};

/// Root application configuration. Loaded from environment variables
/// with the prefix `SMILE_SEGMENTS__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub personalization: PersonalizationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// How a `time_on_site` rule measures elapsed seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBasis {
    /// Seconds between the evaluation instant and the profile's last activity.
    SinceLastActivity,
    /// The profile's accumulated dwell time.
    Accumulated,
}

/// Which segment wins when several share the top score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// First declared segment wins.
    DeclarationOrder,
    /// Highest priority wins; declaration order among equal priorities.
    Priority,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonalizationConfig {
    #[serde(default = "default_personalization_enabled")]
    pub enabled: bool,
    #[serde(default = "default_time_basis")]
    pub time_basis: TimeBasis,
    #[serde(default = "default_tie_break")]
    pub tie_break: TieBreak,
    #[serde(default = "default_segment_id")]
    pub default_segment: String,
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,
    /// Gaps between two activities longer than this are not counted as dwell time.
    #[serde(default = "default_idle_gap_secs")]
    pub idle_gap_secs: u64,
    #[serde(default = "default_analytics_enabled")]
    pub analytics_enabled: bool,
    /// Optional JSON file with segment definitions replacing the built-in catalog.
    #[serde(default)]
    pub segments_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: String,
    #[serde(default = "default_profile_key_prefix")]
    pub profile_key_prefix: String,
    #[serde(default = "default_consent_key")]
    pub consent_key: String,
    #[serde(default = "default_consent_version")]
    pub consent_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_analytics_path")]
    pub output_path: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

// Default functions
fn default_personalization_enabled() -> bool {
    true
}
fn default_time_basis() -> TimeBasis {
    TimeBasis::SinceLastActivity
}
fn default_tie_break() -> TieBreak {
    TieBreak::DeclarationOrder
}
fn default_segment_id() -> String {
    "new_visitor".to_string()
}
fn default_fallback_confidence() -> f64 {
    0.1
}
fn default_idle_gap_secs() -> u64 {
    1800
}
fn default_analytics_enabled() -> bool {
    true
}
fn default_storage_dir() -> String {
    ".smile-segments".to_string()
}
fn default_profile_key_prefix() -> String {
    "visitor_profile_".to_string()
}
fn default_consent_key() -> String {
    "cookie_consent".to_string()
}
fn default_consent_version() -> u32 {
    1
}
fn default_analytics_path() -> String {
    "segment-events.jsonl".to_string()
}
fn default_batch_size() -> usize {
    100
}
fn default_flush_interval_ms() -> u64 {
    1000
}
fn default_channel_capacity() -> usize {
    10_000
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            enabled: default_personalization_enabled(),
            time_basis: default_time_basis(),
            tie_break: default_tie_break(),
            default_segment: default_segment_id(),
            fallback_confidence: default_fallback_confidence(),
            idle_gap_secs: default_idle_gap_secs(),
            analytics_enabled: default_analytics_enabled(),
            segments_path: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            profile_key_prefix: default_profile_key_prefix(),
            consent_key: default_consent_key(),
            consent_version: default_consent_version(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            output_path: default_analytics_path(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            personalization: PersonalizationConfig::default(),
            storage: StorageConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("SMILE_SEGMENTS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
