//! Built-in segments for the practice website, in evaluation order.

use smile_core::types::DeviceClass;

use crate::builder::SegmentBuilder;
use crate::engine::Segment;

pub const EMERGENCY_VISITOR: &str = "emergency_visitor";
pub const NEW_VISITOR: &str = "new_visitor";
pub const PRICE_CONSCIOUS: &str = "price_conscious";
pub const COSMETIC_INTEREST: &str = "cosmetic_interest";
pub const FAMILY_PLANNER: &str = "family_planner";
pub const RETURNING_PATIENT: &str = "returning_patient";

pub fn default_segments() -> Vec<Segment> {
    vec![
        SegmentBuilder::new(EMERGENCY_VISITOR, "Emergency visitor")
            .description("Looking for urgent care right now")
            .priority(100)
            .path_contains("emergency", 1.0)
            .build(),
        SegmentBuilder::new(NEW_VISITOR, "New visitor")
            .description("First look at the practice")
            .priority(10)
            .visits_less_than(3, 0.5)
            .time_on_site_less_than(300, 0.4)
            .referrer_contains("google", 0.1)
            .build(),
        SegmentBuilder::new(PRICE_CONSCIOUS, "Price conscious")
            .description("Comparing costs and payment options")
            .priority(50)
            .behavior_any(["viewed_pricing", "compared_prices", "viewed_financing"], 0.5)
            .visits_greater_than(3, 0.4)
            .path_contains("financing", 0.1)
            .build(),
        SegmentBuilder::new(COSMETIC_INTEREST, "Cosmetic interest")
            .priority(40)
            .path_contains("cosmetic", 0.4)
            .path_contains("whitening", 0.3)
            .behavior_any(["viewed_smile_gallery", "started_smile_quiz"], 0.3)
            .build(),
        SegmentBuilder::new(FAMILY_PLANNER, "Family planner")
            .description("Booking for children or the whole family")
            .priority(30)
            .path_contains("pediatric", 0.5)
            .path_contains("family", 0.3)
            .device_is(DeviceClass::Tablet, 0.2)
            .build(),
        SegmentBuilder::new(RETURNING_PATIENT, "Returning patient")
            .priority(60)
            .visits_greater_than(8, 0.4)
            .behavior_any(
                ["booked_appointment", "logged_in", "viewed_patient_portal"],
                0.6,
            )
            .build(),
    ]
}
