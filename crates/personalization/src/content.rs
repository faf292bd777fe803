//! Tailored page copy per segment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentContent {
    pub headline: String,
    pub body: String,
    pub cta_label: String,
    pub cta_href: String,
}

impl SegmentContent {
    fn new(headline: &str, body: &str, cta_label: &str, cta_href: &str) -> Self {
        Self {
            headline: headline.to_string(),
            body: body.to_string(),
            cta_label: cta_label.to_string(),
            cta_href: cta_href.to_string(),
        }
    }
}

pub struct ContentCatalog {
    by_segment: HashMap<String, SegmentContent>,
    generic: SegmentContent,
}

impl ContentCatalog {
    pub fn new(generic: SegmentContent) -> Self {
        Self {
            by_segment: HashMap::new(),
            generic,
        }
    }

    pub fn insert(&mut self, segment_id: impl Into<String>, content: SegmentContent) {
        self.by_segment.insert(segment_id.into(), content);
    }

    /// Copy for the segment, or the generic copy.
    pub fn content_for(&self, segment_id: &str) -> &SegmentContent {
        self.by_segment.get(segment_id).unwrap_or(&self.generic)
    }

    pub fn generic(&self) -> &SegmentContent {
        &self.generic
    }
}

impl Default for ContentCatalog {
    fn default() -> Self {
        let mut catalog = Self::new(SegmentContent::new(
            "Gentle, modern dentistry for the whole family",
            "Check-ups, cosmetic treatments and same-day emergency care in one practice.",
            "Book a visit",
            "/book",
        ));
        catalog.insert(
            "emergency_visitor",
            SegmentContent::new(
                "In pain? We keep same-day slots open for emergencies",
                "Call now and we'll tell you exactly when we can see you today.",
                "Call the emergency line",
                "tel:+15550100",
            ),
        );
        catalog.insert(
            "new_visitor",
            SegmentContent::new(
                "Welcome! Meet your new dental team",
                "New patients get a full check-up, cleaning and X-rays at their first visit.",
                "Book your first visit",
                "/new-patients",
            ),
        );
        catalog.insert(
            "price_conscious",
            SegmentContent::new(
                "Clear prices, no surprises",
                "See our fee guide and 0% financing plans before you book.",
                "View pricing",
                "/pricing",
            ),
        );
        catalog.insert(
            "cosmetic_interest",
            SegmentContent::new(
                "The smile you've been picturing",
                "Whitening, veneers and aligners planned around your goals.",
                "Start the smile quiz",
                "/cosmetic/smile-quiz",
            ),
        );
        catalog.insert(
            "family_planner",
            SegmentContent::new(
                "One visit for the whole family",
                "Back-to-back appointments and a kid-friendly pediatric team.",
                "Book a family visit",
                "/family",
            ),
        );
        catalog.insert(
            "returning_patient",
            SegmentContent::new(
                "Welcome back",
                "Manage appointments and treatment plans in the patient portal.",
                "Open the patient portal",
                "/portal",
            ),
        );
        catalog
    }
}
