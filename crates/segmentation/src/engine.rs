//! Core segment scorer — assigns a profile to its best-matching segment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smile_core::config::{PersonalizationConfig, TieBreak, TimeBasis};
use smile_core::error::{SmileError, SmileResult};
use smile_core::types::{clamp_unit, Profile, ScoredSegment, SegmentMatch};
use std::collections::HashSet;
use tracing::debug;

use crate::rules::{EvalContext, Rule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Only consulted under [`TieBreak::Priority`].
    #[serde(default)]
    pub priority: i32,
    pub rules: Vec<Rule>,
}

impl Segment {
    /// Weighted mean of rule matches, in [0, 1]. Zero total weight scores 0.
    pub fn score(&self, profile: &Profile, ctx: &EvalContext) -> f64 {
        let (matched, total) = self.rules.iter().fold((0.0, 0.0), |(matched, total), rule| {
            let hit = if rule.condition.matches(profile, ctx) {
                rule.weight
            } else {
                0.0
            };
            (matched + hit, total + rule.weight)
        });
        if total <= 0.0 {
            return 0.0;
        }
        clamp_unit(matched / total)
    }
}

/// Pure scorer over a fixed list of segment definitions.
#[derive(Debug, Clone)]
pub struct SegmentScorer {
    segments: Vec<Segment>,
    time_basis: TimeBasis,
    tie_break: TieBreak,
    default_segment: String,
}

impl SegmentScorer {
    pub fn new(segments: Vec<Segment>, config: &PersonalizationConfig) -> Self {
        Self {
            segments,
            time_basis: config.time_basis,
            tie_break: config.tie_break,
            default_segment: config.default_segment.clone(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn default_segment(&self) -> &str {
        &self.default_segment
    }

    fn context(&self, now: DateTime<Utc>) -> EvalContext {
        EvalContext {
            now,
            time_basis: self.time_basis,
        }
    }

    /// Score every segment, in declaration order.
    pub fn score_all(&self, profile: &Profile, now: DateTime<Utc>) -> Vec<ScoredSegment> {
        let ctx = self.context(now);
        self.segments
            .iter()
            .map(|segment| ScoredSegment {
                segment_id: segment.id.clone(),
                score: segment.score(profile, &ctx),
            })
            .collect()
    }

    /// Best segment and its confidence. Never fails: with no segments
    /// configured the default segment is returned with confidence 0.
    pub fn evaluate(&self, profile: &Profile, now: DateTime<Utc>) -> SegmentMatch {
        let ctx = self.context(now);
        let mut best: Option<(&Segment, f64)> = None;

        for segment in &self.segments {
            let score = segment.score(profile, &ctx);
            let replace = match best {
                None => true,
                Some((current, best_score)) => {
                    score > best_score
                        || (self.tie_break == TieBreak::Priority
                            && score == best_score
                            && segment.priority > current.priority)
                }
            };
            if replace {
                best = Some((segment, score));
            }
        }

        match best {
            Some((segment, score)) => {
                debug!(
                    session_id = %profile.session_id,
                    segment = %segment.id,
                    score,
                    "segment evaluated"
                );
                SegmentMatch::new(segment.id.clone(), score)
            }
            None => SegmentMatch::new(self.default_segment.clone(), 0.0),
        }
    }
}

/// Parse a JSON array of segment definitions.
pub fn load_segments(json: &str) -> SmileResult<Vec<Segment>> {
    let segments: Vec<Segment> = serde_json::from_str(json)
        .map_err(|e| SmileError::SegmentDefinition(e.to_string()))?;
    validate_segments(&segments)?;
    Ok(segments)
}

pub fn validate_segments(segments: &[Segment]) -> SmileResult<()> {
    let mut seen = HashSet::new();
    for segment in segments {
        if segment.id.trim().is_empty() {
            return Err(SmileError::SegmentDefinition(
                "segment id must not be empty".into(),
            ));
        }
        if !seen.insert(segment.id.as_str()) {
            return Err(SmileError::SegmentDefinition(format!(
                "duplicate segment id: {}",
                segment.id
            )));
        }
    }
    Ok(())
}
