//! Segment builder — fluent API for constructing segment rules.

use smile_core::types::DeviceClass;

use crate::engine::Segment;
use crate::rules::{Comparison, Condition, Rule};

pub struct SegmentBuilder {
    id: String,
    name: String,
    description: Option<String>,
    priority: i32,
    rules: Vec<Rule>,
}

impl SegmentBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            priority: 0,
            rules: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn rule(mut self, condition: Condition, weight: f64) -> Self {
        self.rules.push(Rule::new(condition, weight));
        self
    }

    pub fn visits_greater_than(self, threshold: u64, weight: f64) -> Self {
        self.rule(
            Condition::VisitCount {
                comparison: Comparison::GreaterThan,
                threshold,
            },
            weight,
        )
    }

    pub fn visits_less_than(self, threshold: u64, weight: f64) -> Self {
        self.rule(
            Condition::VisitCount {
                comparison: Comparison::LessThan,
                threshold,
            },
            weight,
        )
    }

    pub fn path_contains(self, needle: impl Into<String>, weight: f64) -> Self {
        self.rule(
            Condition::VisitedPathContains {
                needle: needle.into(),
            },
            weight,
        )
    }

    pub fn time_on_site_less_than(self, seconds: u64, weight: f64) -> Self {
        self.rule(
            Condition::TimeOnSite {
                comparison: Comparison::LessThan,
                seconds,
            },
            weight,
        )
    }

    pub fn time_on_site_greater_than(self, seconds: u64, weight: f64) -> Self {
        self.rule(
            Condition::TimeOnSite {
                comparison: Comparison::GreaterThan,
                seconds,
            },
            weight,
        )
    }

    pub fn referrer_contains(self, needle: impl Into<String>, weight: f64) -> Self {
        self.rule(
            Condition::ReferrerContains {
                needle: needle.into(),
            },
            weight,
        )
    }

    pub fn device_is(self, device: DeviceClass, weight: f64) -> Self {
        self.rule(Condition::DeviceIs { device }, weight)
    }

    pub fn behavior_any<I, S>(self, tags: I, weight: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule(
            Condition::BehaviorAny {
                tags: tags.into_iter().map(Into::<String>::into).collect(),
            },
            weight,
        )
    }

    pub fn build(self) -> Segment {
        Segment {
            id: self.id,
            name: self.name,
            description: self.description,
            priority: self.priority,
            rules: self.rules,
        }
    }
}
