//! Personalization entry point — gates on consent, reads the stored profile,
//! scores it, notifies analytics and picks the tailored copy.
//!
//! Storage and analytics failures stop here: the caller always gets either
//! `None` (personalization not permitted) or a valid segment match.

use chrono::{DateTime, Utc};
use serde::Serialize;
use smile_core::config::PersonalizationConfig;
use smile_core::event_bus::{EventSink, SegmentEvent};
use smile_core::types::{Profile, SegmentMatch};
use smile_segmentation::SegmentScorer;
use smile_store::{ConsentRepository, ProfileRepository};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::content::{ContentCatalog, SegmentContent};

/// Result handed to presentation code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Personalization {
    pub session_id: String,
    pub segment: SegmentMatch,
    /// True when storage failed and the fixed fallback segment was used.
    pub fallback: bool,
    pub content: SegmentContent,
}

pub struct Personalizer {
    scorer: SegmentScorer,
    profiles: Arc<ProfileRepository>,
    consent: Arc<ConsentRepository>,
    sink: Arc<dyn EventSink>,
    content: ContentCatalog,
    config: PersonalizationConfig,
}

impl Personalizer {
    pub fn new(
        scorer: SegmentScorer,
        profiles: Arc<ProfileRepository>,
        consent: Arc<ConsentRepository>,
        sink: Arc<dyn EventSink>,
        config: PersonalizationConfig,
    ) -> Self {
        Self {
            scorer,
            profiles,
            consent,
            sink,
            content: ContentCatalog::default(),
            config,
        }
    }

    pub fn with_content(mut self, content: ContentCatalog) -> Self {
        self.content = content;
        self
    }

    pub fn scorer(&self) -> &SegmentScorer {
        &self.scorer
    }

    /// Personalize the session, or `None` when personalization is disabled
    /// or the visitor hasn't granted consent. The scorer doesn't run then.
    pub fn personalize(&self, session_id: &str, now: DateTime<Utc>) -> Option<Personalization> {
        if !self.permitted() {
            debug!(session_id, "personalization skipped");
            return None;
        }

        let (segment, fallback) = match self.profiles.load(session_id) {
            Ok(Some(profile)) => (self.scorer.evaluate(&profile, now), false),
            Ok(None) => (
                self.scorer.evaluate(&Profile::new(session_id, now), now),
                false,
            ),
            Err(e) => {
                warn!(session_id, error = %e, "profile unavailable, using fallback segment");
                metrics::counter!("personalization.fallback").increment(1);
                (self.fallback_match(), true)
            }
        };
        metrics::counter!("personalization.evaluated").increment(1);

        self.notify(session_id, &segment, fallback, now);

        Some(Personalization {
            session_id: session_id.to_string(),
            content: self.content.content_for(&segment.segment_id).clone(),
            segment,
            fallback,
        })
    }

    /// Evaluate a raw serialized profile under the same gate as
    /// [`personalize`](Self::personalize); malformed input yields the
    /// fallback segment instead of an error.
    pub fn evaluate_stored(&self, raw: &str, now: DateTime<Utc>) -> Option<SegmentMatch> {
        if !self.permitted() {
            return None;
        }
        let segment = match serde_json::from_str::<Profile>(raw) {
            Ok(profile) => self.scorer.evaluate(&profile, now),
            Err(e) => {
                warn!(error = %e, "malformed profile, using fallback segment");
                metrics::counter!("personalization.fallback").increment(1);
                self.fallback_match()
            }
        };
        Some(segment)
    }

    pub fn fallback_match(&self) -> SegmentMatch {
        SegmentMatch::new(
            self.config.default_segment.clone(),
            self.config.fallback_confidence,
        )
    }

    /// Enabled in config and consented to by the visitor.
    fn permitted(&self) -> bool {
        if !self.config.enabled {
            debug!("personalization disabled");
            return false;
        }
        if !self.consent.personalization_allowed() {
            debug!("personalization not consented");
            return false;
        }
        true
    }

    fn notify(&self, session_id: &str, segment: &SegmentMatch, fallback: bool, now: DateTime<Utc>) {
        if !self.config.analytics_enabled || !self.consent.analytics_allowed() {
            return;
        }
        let event = SegmentEvent::new(
            session_id,
            segment.segment_id.clone(),
            segment.confidence,
            fallback,
            now,
        );
        let sink = &self.sink;
        if catch_unwind(AssertUnwindSafe(|| sink.emit(event))).is_err() {
            metrics::counter!("analytics.sink_panics").increment(1);
            error!(session_id, "analytics sink panicked; event discarded");
        }
    }
}
