//! Cookie consent preferences persisted next to the visitor profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::kv::KeyValueStore;

/// Stored consent choices. `necessary` cookies cannot be declined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPreferences {
    #[serde(default = "always_true")]
    pub necessary: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub marketing: bool,
    #[serde(default)]
    pub personalization: bool,
    /// Consent policy version the visitor answered.
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn always_true() -> bool {
    true
}

impl ConsentPreferences {
    /// Nothing optional granted.
    pub fn declined(version: u32) -> Self {
        Self {
            necessary: true,
            analytics: false,
            marketing: false,
            personalization: false,
            version,
            updated_at: None,
        }
    }

    /// Merge a partial update; unset fields keep their current value.
    pub fn merge(&mut self, update: &ConsentUpdate) {
        if let Some(v) = update.analytics {
            self.analytics = v;
        }
        if let Some(v) = update.marketing {
            self.marketing = v;
        }
        if let Some(v) = update.personalization {
            self.personalization = v;
        }
        self.necessary = true;
    }
}

/// Partial consent change from the banner or the preferences dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentUpdate {
    pub analytics: Option<bool>,
    pub marketing: Option<bool>,
    pub personalization: Option<bool>,
}

impl ConsentUpdate {
    pub fn all(granted: bool) -> Self {
        Self {
            analytics: Some(granted),
            marketing: Some(granted),
            personalization: Some(granted),
        }
    }
}

pub struct ConsentRepository {
    store: Arc<dyn KeyValueStore>,
    key: String,
    version: u32,
}

impl ConsentRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, version: u32) -> Self {
        Self {
            store,
            key: key.into(),
            version,
        }
    }

    pub fn load(&self) -> StoreResult<Option<ConsentPreferences>> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        let mut prefs: ConsentPreferences =
            serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                key: self.key.clone(),
                source,
            })?;
        prefs.necessary = true;
        Ok(Some(prefs))
    }

    /// Merge `update` onto the stored choices (or onto "declined" when none
    /// are readable) and persist under the current policy version.
    pub fn update(&self, update: &ConsentUpdate, now: DateTime<Utc>) -> StoreResult<ConsentPreferences> {
        let mut prefs = match self.load() {
            Ok(Some(prefs)) => prefs,
            Ok(None) => ConsentPreferences::declined(self.version),
            Err(e) => {
                warn!(error = %e, "discarding unreadable consent entry");
                ConsentPreferences::declined(self.version)
            }
        };
        prefs.merge(update);
        prefs.version = self.version;
        prefs.updated_at = Some(now);

        self.store.set(&self.key, &serde_json::to_string(&prefs)?)?;
        info!(
            analytics = prefs.analytics,
            marketing = prefs.marketing,
            personalization = prefs.personalization,
            version = prefs.version,
            "consent updated"
        );
        Ok(prefs)
    }

    pub fn accept_all(&self, now: DateTime<Utc>) -> StoreResult<ConsentPreferences> {
        self.update(&ConsentUpdate::all(true), now)
    }

    pub fn reject_all(&self, now: DateTime<Utc>) -> StoreResult<ConsentPreferences> {
        self.update(&ConsentUpdate::all(false), now)
    }

    /// Whether the banner should be shown: no readable answer for the
    /// current policy version.
    pub fn needs_prompt(&self) -> bool {
        match self.load() {
            Ok(Some(prefs)) => prefs.version < self.version,
            _ => true,
        }
    }

    /// Personalization may run only on an explicit, readable grant.
    pub fn personalization_allowed(&self) -> bool {
        matches!(self.load(), Ok(Some(prefs)) if prefs.personalization)
    }

    pub fn analytics_allowed(&self) -> bool {
        matches!(self.load(), Ok(Some(prefs)) if prefs.analytics)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn repo(version: u32) -> (Arc<MemoryStore>, ConsentRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = ConsentRepository::new(store.clone(), "cookie_consent", version);
        (store, repo)
    }

    #[test]
    fn test_nothing_stored_means_prompt_and_no_personalization() {
        let (_, repo) = repo(1);
        assert!(repo.load().unwrap().is_none());
        assert!(repo.needs_prompt());
        assert!(!repo.personalization_allowed());
    }

    #[test]
    fn test_partial_update_merges() {
        let (_, repo) = repo(1);
        let now = Utc::now();
        repo.accept_all(now).unwrap();

        let prefs = repo
            .update(
                &ConsentUpdate {
                    marketing: Some(false),
                    ..Default::default()
                },
                now,
            )
            .unwrap();
        assert!(prefs.necessary);
        assert!(prefs.analytics);
        assert!(!prefs.marketing);
        assert!(prefs.personalization);
        assert!(!repo.needs_prompt());
        assert!(repo.personalization_allowed());
    }

    #[test]
    fn test_necessary_cannot_be_declined() {
        let (store, repo) = repo(1);
        store
            .set(
                "cookie_consent",
                r#"{"necessary": false, "personalization": true, "version": 1}"#,
            )
            .unwrap();
        assert!(repo.load().unwrap().unwrap().necessary);

        let prefs = repo.reject_all(Utc::now()).unwrap();
        assert!(prefs.necessary);
        assert!(!prefs.personalization);
        assert!(!repo.personalization_allowed());
    }

    #[test]
    fn test_corrupt_entry_denies_and_is_replaced_on_update() {
        let (store, repo) = repo(1);
        store.set("cookie_consent", "\u{0}garbage").unwrap();
        assert!(repo.load().is_err());
        assert!(!repo.personalization_allowed());
        assert!(repo.needs_prompt());

        let prefs = repo
            .update(
                &ConsentUpdate {
                    personalization: Some(true),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert!(prefs.personalization);
        assert!(!prefs.analytics);
    }

    #[test]
    fn test_older_policy_version_prompts_again() {
        let (store, _) = repo(1);
        let old = ConsentRepository::new(store.clone(), "cookie_consent", 1);
        old.accept_all(Utc::now()).unwrap();

        let current = ConsentRepository::new(store, "cookie_consent", 2);
        assert!(current.needs_prompt());
        // Earlier grants still count until the visitor answers again.
        assert!(current.personalization_allowed());
    }
}
