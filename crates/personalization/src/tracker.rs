//! Profile tracking — folds page views and behavior events into the
//! per-session profile.

use chrono::{DateTime, Utc};
use smile_core::config::PersonalizationConfig;
use smile_core::device::classify_user_agent;
use smile_core::error::SmileResult;
use smile_core::types::Profile;
use smile_store::{ConsentRepository, ProfileRepository, StoreError};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ProfileTracker {
    profiles: Arc<ProfileRepository>,
    consent: Arc<ConsentRepository>,
    idle_gap_secs: u64,
}

impl ProfileTracker {
    pub fn new(
        profiles: Arc<ProfileRepository>,
        consent: Arc<ConsentRepository>,
        config: &PersonalizationConfig,
    ) -> Self {
        Self {
            profiles,
            consent,
            idle_gap_secs: config.idle_gap_secs,
        }
    }

    /// Record a page view. Returns `Ok(false)` without touching storage when
    /// the visitor hasn't granted personalization consent.
    pub fn record_page_view(
        &self,
        session_id: &str,
        location: &str,
        referrer: Option<&str>,
        user_agent: Option<&str>,
        now: DateTime<Utc>,
    ) -> SmileResult<bool> {
        if !self.consent.personalization_allowed() {
            debug!(session_id, "page view not tracked without consent");
            return Ok(false);
        }

        let (mut profile, created) = self.current(session_id, now)?;
        if created {
            profile.referrer = referrer.filter(|r| !r.is_empty()).map(str::to_string);
            if let Some(ua) = user_agent {
                profile.device = classify_user_agent(ua);
            }
        }
        self.touch(&mut profile, now);
        profile.visited_paths.push(normalize_path(location));

        self.profiles.save(&profile)?;
        debug!(
            session_id,
            visits = profile.visit_count(),
            "page view recorded"
        );
        Ok(true)
    }

    /// Record a behavior tag such as `viewed_pricing`. Blank tags are
    /// ignored and return `Ok(false)`.
    pub fn record_behavior(
        &self,
        session_id: &str,
        tag: &str,
        now: DateTime<Utc>,
    ) -> SmileResult<bool> {
        let tag = tag.trim();
        if tag.is_empty() {
            debug!(session_id, "blank behavior tag ignored");
            return Ok(false);
        }
        if !self.consent.personalization_allowed() {
            debug!(session_id, tag, "behavior not tracked without consent");
            return Ok(false);
        }

        let (mut profile, _) = self.current(session_id, now)?;
        self.touch(&mut profile, now);
        profile.behaviors.insert(tag.to_string());

        self.profiles.save(&profile)?;
        debug!(session_id, tag, "behavior recorded");
        Ok(true)
    }

    /// Stored profile, or a fresh one. A corrupt entry is replaced.
    fn current(&self, session_id: &str, now: DateTime<Utc>) -> SmileResult<(Profile, bool)> {
        match self.profiles.load(session_id) {
            Ok(Some(profile)) => Ok((profile, false)),
            Ok(None) => Ok((Profile::new(session_id, now), true)),
            Err(StoreError::Corrupt { key, source }) => {
                warn!(key = %key, error = %source, "replacing corrupt profile");
                metrics::counter!("profile.reset").increment(1);
                Ok((Profile::new(session_id, now), true))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Accumulate dwell time since the last activity, ignoring idle gaps.
    fn touch(&self, profile: &mut Profile, now: DateTime<Utc>) {
        if let Some(last) = profile.last_activity {
            let gap = (now - last).num_seconds();
            if gap > 0 && gap as u64 <= self.idle_gap_secs {
                profile.time_on_site_secs = profile.time_on_site_secs.saturating_add(gap as u64);
            }
        }
        if profile.started_at.is_none() {
            profile.started_at = Some(now);
        }
        profile.last_activity = Some(now);
    }
}

/// Reduce a full URL or raw path to its path component.
pub fn normalize_path(location: &str) -> String {
    let location = location.trim();
    if let Ok(url) = url::Url::parse(location) {
        return url.path().to_string();
    }
    let path = location
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use smile_core::types::DeviceClass;
    use smile_store::{KeyValueStore, MemoryStore};

    struct Fixture {
        store: Arc<MemoryStore>,
        profiles: Arc<ProfileRepository>,
        consent: Arc<ConsentRepository>,
        tracker: ProfileTracker,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let profiles = Arc::new(ProfileRepository::new(store.clone(), "visitor_profile_"));
        let consent = Arc::new(ConsentRepository::new(store.clone(), "cookie_consent", 1));
        let tracker = ProfileTracker::new(
            profiles.clone(),
            consent.clone(),
            &PersonalizationConfig::default(),
        );
        Fixture {
            store,
            profiles,
            consent,
            tracker,
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("https://smiles.example/services/emergency?utm=x#top"),
            "/services/emergency"
        );
        assert_eq!(normalize_path("/pricing?plan=basic"), "/pricing");
        assert_eq!(normalize_path("contact"), "/contact");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_no_tracking_without_consent() {
        let f = fixture();
        let now = Utc::now();
        assert!(!f.tracker.record_page_view("s", "/", None, None, now).unwrap());
        assert!(!f.tracker.record_behavior("s", "viewed_pricing", now).unwrap());
        assert!(f.store.get("visitor_profile_s").unwrap().is_none());
    }

    #[test]
    fn test_first_view_captures_referrer_and_device() {
        let f = fixture();
        let now = Utc::now();
        f.consent.accept_all(now).unwrap();

        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";
        f.tracker
            .record_page_view("s", "https://smiles.example/", Some("https://www.google.com/"), Some(ua), now)
            .unwrap();
        f.tracker
            .record_page_view("s", "/about", Some("https://bing.com/"), None, now)
            .unwrap();

        let profile = f.profiles.load("s").unwrap().unwrap();
        assert_eq!(profile.visited_paths, vec!["/", "/about"]);
        assert_eq!(profile.referrer.as_deref(), Some("https://www.google.com/"));
        assert_eq!(profile.device, DeviceClass::Mobile);
    }

    #[test]
    fn test_dwell_time_skips_idle_gaps() {
        let f = fixture();
        let start = Utc::now();
        f.consent.accept_all(start).unwrap();

        f.tracker.record_page_view("s", "/", None, None, start).unwrap();
        let t1 = start + chrono::Duration::seconds(40);
        f.tracker.record_behavior("s", "viewed_pricing", t1).unwrap();
        let t2 = t1 + chrono::Duration::hours(2);
        f.tracker.record_page_view("s", "/pricing", None, None, t2).unwrap();

        let profile = f.profiles.load("s").unwrap().unwrap();
        assert_eq!(profile.time_on_site_secs, 40);
        assert_eq!(profile.started_at, Some(start));
        assert_eq!(profile.last_activity, Some(t2));
        assert!(profile.behaviors.contains("viewed_pricing"));
    }

    #[test]
    fn test_blank_behavior_tag_is_ignored() {
        let f = fixture();
        let now = Utc::now();
        f.consent.accept_all(now).unwrap();

        assert!(!f.tracker.record_behavior("s", "", now).unwrap());
        assert!(!f.tracker.record_behavior("s", "   ", now).unwrap());
        assert!(f.store.get("visitor_profile_s").unwrap().is_none());

        assert!(f.tracker.record_behavior("s", " viewed_pricing ", now).unwrap());
        let profile = f.profiles.load("s").unwrap().unwrap();
        assert_eq!(profile.behaviors.len(), 1);
        assert!(profile.behaviors.contains("viewed_pricing"));
    }

    #[test]
    fn test_mismatched_stored_session_id_stays_under_its_key() {
        let f = fixture();
        let now = Utc::now();
        f.consent.accept_all(now).unwrap();
        f.store
            .set("visitor_profile_s1", r#"{"sessionId": "other", "pages": ["/"]}"#)
            .unwrap();

        f.tracker.record_page_view("s1", "/pricing", None, None, now).unwrap();

        assert!(f.store.get("visitor_profile_other").unwrap().is_none());
        let profile = f.profiles.load("s1").unwrap().unwrap();
        assert_eq!(profile.visited_paths, vec!["/", "/pricing"]);
    }

    #[test]
    fn test_corrupt_profile_is_replaced() {
        let f = fixture();
        let now = Utc::now();
        f.consent.accept_all(now).unwrap();
        f.store.set("visitor_profile_s", "][").unwrap();

        assert!(f.tracker.record_page_view("s", "/emergency", None, None, now).unwrap());
        let profile = f.profiles.load("s").unwrap().unwrap();
        assert_eq!(profile.visited_paths, vec!["/emergency"]);
    }
}
