use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ProfileStore;
use crate::error::AppResult;
use crate::models::{ProfileUpdate, SessionRecord, SessionStep, UserProfile};

/// Process-local store used when no Redis URL is configured
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
    sessions: RwLock<HashMap<(String, String), SessionRecord>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn read_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(user_id).cloned())
    }

    async fn write_profile(&self, user_id: &str, update: ProfileUpdate) -> AppResult<UserProfile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.entry(user_id.to_string()).or_default();
        profile.merge(update);
        Ok(profile.clone())
    }

    async fn append_session_step(
        &self,
        user_id: &str,
        session_id: &str,
        category: &str,
        step: SessionStep,
    ) -> AppResult<SessionRecord> {
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .entry((user_id.to_string(), session_id.to_string()))
            .or_insert_with(|| SessionRecord::new(category.to_string()));
        record.append_step(category.to_string(), step);
        Ok(record.clone())
    }

    async fn read_session(&self, user_id: &str, session_id: &str) -> AppResult<Option<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&(user_id.to_string(), session_id.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn step(index: u32, shown: Vec<u64>) -> SessionStep {
        SessionStep {
            step_index: index,
            shown_ids: shown,
            liked_ids: Vec::new(),
            disliked_ids: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_unknown_user_reads_none() {
        let store = InMemoryProfileStore::new();
        assert_eq!(store.read_profile("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_patches_keep_other_fields() {
        let store = InMemoryProfileStore::new();
        let mut liked = UserProfile::new();
        liked.liked_tags = HashMap::from([("mecha".to_string(), 0.8)]);
        store
            .write_profile("u1", ProfileUpdate::tags_of(&liked))
            .await
            .unwrap();

        let mut shown = UserProfile::new();
        shown.exposure_history = vec![1, 2, 3];
        let merged = store
            .write_profile("u1", ProfileUpdate::exposure_of(&shown))
            .await
            .unwrap();

        assert_eq!(merged.liked_tags.get("mecha"), Some(&0.8));
        assert_eq!(merged.exposure_history, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_session_steps_are_unioned() {
        let store = InMemoryProfileStore::new();
        let first = step(0, vec![1, 2, 2]);

        store
            .append_session_step("u1", "s1", "action", first.clone())
            .await
            .unwrap();
        let record = store
            .append_session_step("u1", "s1", "action", first)
            .await
            .unwrap();
        assert_eq!(record.steps.len(), 1);
        assert_eq!(record.steps[0].shown_ids, vec![1, 2]);

        let record = store
            .append_session_step("u1", "s1", "romance", step(1, vec![3]))
            .await
            .unwrap();
        assert_eq!(record.steps.len(), 2);
        assert_eq!(record.category, "romance");

        let stored = store.read_session("u1", "s1").await.unwrap();
        assert_eq!(stored, Some(record));
        assert_eq!(store.read_session("u1", "other").await.unwrap(), None);
    }
}
