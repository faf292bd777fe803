//! Visitor segmentation — weighted rule scoring of session profiles against
//! a fixed list of audience segments, a fluent segment builder, and the
//! practice's built-in segment catalog.

pub mod builder;
pub mod catalog;
pub mod engine;
pub mod rules;

pub use builder::SegmentBuilder;
pub use catalog::default_segments;
pub use engine::{load_segments, Segment, SegmentScorer};
pub use rules::{Comparison, Condition, Rule};
