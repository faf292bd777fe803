//! Per-session profile persistence over a [`KeyValueStore`].

use chrono::{DateTime, Utc};
use smile_core::types::Profile;
use std::sync::Arc;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::kv::KeyValueStore;

pub struct ProfileRepository {
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn key_for(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }

    /// Stored profile for the session. Unparseable JSON is `StoreError::Corrupt`.
    /// The session id always comes from the key, whatever the stored body says.
    pub fn load(&self, session_id: &str) -> StoreResult<Option<Profile>> {
        let key = self.key_for(session_id);
        let Some(raw) = self.store.get(&key)? else {
            metrics::counter!("profile.miss").increment(1);
            debug!(session_id, "no stored profile");
            return Ok(None);
        };
        metrics::counter!("profile.hit").increment(1);

        let mut profile: Profile =
            serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt { key, source })?;
        if !profile.session_id.is_empty() && profile.session_id != session_id {
            debug!(
                session_id,
                stored = %profile.session_id,
                "stored session id differs from key, using key"
            );
        }
        profile.session_id = session_id.to_string();
        Ok(Some(profile))
    }

    pub fn save(&self, profile: &Profile) -> StoreResult<()> {
        let json = serde_json::to_string(profile)?;
        self.store.set(&self.key_for(&profile.session_id), &json)
    }

    /// Stored profile, or a fresh one stamped with `now`.
    pub fn load_or_new(&self, session_id: &str, now: DateTime<Utc>) -> StoreResult<Profile> {
        Ok(self
            .load(session_id)?
            .unwrap_or_else(|| Profile::new(session_id, now)))
    }

    pub fn remove(&self, session_id: &str) -> StoreResult<()> {
        self.store.remove(&self.key_for(session_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn repo() -> (Arc<MemoryStore>, ProfileRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = ProfileRepository::new(store.clone(), "visitor_profile_");
        (store, repo)
    }

    #[test]
    fn test_save_and_load() {
        let (store, repo) = repo();
        let now = Utc::now();
        let mut profile = Profile::new("sess-9", now);
        profile.visited_paths.push("/emergency".into());
        repo.save(&profile).unwrap();

        assert!(store.get("visitor_profile_sess-9").unwrap().is_some());
        let loaded = repo.load("sess-9").unwrap().unwrap();
        assert_eq!(loaded.visited_paths, vec!["/emergency"]);
    }

    #[test]
    fn test_missing_and_corrupt() {
        let (store, repo) = repo();
        assert!(repo.load("nobody").unwrap().is_none());

        store.set("visitor_profile_broken", "{not json").unwrap();
        assert!(matches!(
            repo.load("broken"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_session_id_filled_from_key() {
        let (store, repo) = repo();
        store
            .set("visitor_profile_s1", r#"{"pages": ["/"]}"#)
            .unwrap();
        let loaded = repo.load("s1").unwrap().unwrap();
        assert_eq!(loaded.session_id, "s1");
        assert_eq!(loaded.visit_count(), 1);
    }

    #[test]
    fn test_key_wins_over_stored_session_id() {
        let (store, repo) = repo();
        let now = Utc::now();
        store
            .set(
                "visitor_profile_s1",
                r#"{"sessionId": "other", "pages": ["/pricing"]}"#,
            )
            .unwrap();

        let mut loaded = repo.load("s1").unwrap().unwrap();
        assert_eq!(loaded.session_id, "s1");

        loaded.last_activity = Some(now);
        repo.save(&loaded).unwrap();
        assert!(store.get("visitor_profile_other").unwrap().is_none());
        let reloaded = repo.load("s1").unwrap().unwrap();
        assert_eq!(reloaded.session_id, "s1");
        assert_eq!(reloaded.visited_paths, vec!["/pricing"]);
    }

    #[test]
    fn test_load_or_new() {
        let (_, repo) = repo();
        let now = Utc::now();
        let profile = repo.load_or_new("fresh", now).unwrap();
        assert_eq!(profile.session_id, "fresh");
        assert_eq!(profile.last_activity, Some(now));
        repo.remove("fresh").unwrap();
    }
}
