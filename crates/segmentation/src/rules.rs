//! Rule types and evaluation logic for segment scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use smile_core::config::TimeBasis;
use smile_core::types::{clamp_unit, DeviceClass, Profile};
use std::collections::BTreeSet;

/// A weighted predicate contributing to a segment's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub condition: Condition,
    /// Always within [0, 1].
    #[serde(deserialize_with = "unit_weight")]
    pub weight: f64,
}

impl Rule {
    pub fn new(condition: Condition, weight: f64) -> Self {
        Self {
            condition,
            weight: clamp_unit(weight),
        }
    }
}

/// The predicate of a rule. Each variant carries exactly what it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Number of recorded page visits compared against a threshold.
    VisitCount {
        comparison: Comparison,
        threshold: u64,
    },
    /// Any visited path contains the needle.
    VisitedPathContains { needle: String },
    /// Elapsed seconds compared against a threshold.
    TimeOnSite {
        comparison: Comparison,
        seconds: u64,
    },
    /// The stored referrer contains the needle.
    ReferrerContains { needle: String },
    DeviceIs { device: DeviceClass },
    /// Any recorded behavior tag is in the set.
    BehaviorAny { tags: BTreeSet<String> },
    /// A rule type this build doesn't know. Never matches.
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    GreaterThan,
    LessThan,
    /// Any operator other than the two above. Never matches.
    #[serde(other)]
    Unsupported,
}

impl Comparison {
    pub fn compare(&self, actual: u64, threshold: u64) -> bool {
        match self {
            Comparison::GreaterThan => actual > threshold,
            Comparison::LessThan => actual < threshold,
            Comparison::Unsupported => false,
        }
    }
}

/// Inputs to rule evaluation besides the profile itself.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub now: DateTime<Utc>,
    pub time_basis: TimeBasis,
}

impl EvalContext {
    pub fn elapsed_secs(&self, profile: &Profile) -> u64 {
        match self.time_basis {
            TimeBasis::SinceLastActivity => profile.seconds_since_last_activity(self.now),
            TimeBasis::Accumulated => profile.time_on_site_secs,
        }
    }
}

impl Condition {
    pub fn matches(&self, profile: &Profile, ctx: &EvalContext) -> bool {
        match self {
            Condition::VisitCount {
                comparison,
                threshold,
            } => comparison.compare(profile.visit_count() as u64, *threshold),
            Condition::VisitedPathContains { needle } => profile
                .visited_paths
                .iter()
                .any(|path| path.contains(needle.as_str())),
            Condition::TimeOnSite {
                comparison,
                seconds,
            } => comparison.compare(ctx.elapsed_secs(profile), *seconds),
            Condition::ReferrerContains { needle } => profile
                .referrer
                .as_deref()
                .is_some_and(|r| r.contains(needle.as_str())),
            Condition::DeviceIs { device } => profile.device == *device,
            Condition::BehaviorAny { tags } => {
                profile.behaviors.iter().any(|tag| tags.contains(tag))
            }
            Condition::Unrecognized => false,
        }
    }
}

fn unit_weight<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(clamp_unit(f64::deserialize(d)?))
}
