#![warn(clippy::unwrap_used)]

//! Calling layer around the segment scorer: consent gating, profile
//! tracking, fallback handling, analytics notification and tailored copy.
//!
//! # Modules
//!
//! - [`tracker`] — folds page views and behavior events into profiles
//! - [`personalizer`] — consent-gated scoring with error fallback
//! - [`content`] — tailored copy per segment

pub mod content;
pub mod personalizer;
pub mod tracker;

pub use content::{ContentCatalog, SegmentContent};
pub use personalizer::{Personalization, Personalizer};
pub use tracker::ProfileTracker;
