use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use redis::Client;
use std::collections::HashMap;
use std::fmt::Display;

use crate::db::ProfileStore;
use crate::error::AppError;
use crate::error::AppResult;
use crate::models::{ProfileUpdate, SessionRecord, SessionStep, UserProfile};

/// Sessions expire 30 days after their last step
const SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 30;

const FIELD_LIKED_TAGS: &str = "liked_tags";
const FIELD_DISLIKED_TAGS: &str = "disliked_tags";
const FIELD_EXPOSURE_HISTORY: &str = "exposure_history";
const FIELD_UPDATED_AT: &str = "updated_at";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Profile(String),
    Session { user_id: String, session_id: String },
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKey::Profile(user_id) => write!(f, "profile:{}", user_id),
            StoreKey::Session {
                user_id,
                session_id,
            } => write!(f, "session:{}:{}", user_id, session_id),
        }
    }
}

/// Creates a Redis client for the profile store
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed profile and session store
///
/// A profile is a hash with one JSON-encoded field per profile field, so a
/// merge patch is a single `HSET` of the fields it carries. Sessions are JSON
/// documents with a sliding expiry.
#[derive(Clone)]
pub struct RedisProfileStore {
    redis_client: Client,
}

impl RedisProfileStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        Ok(self.redis_client.get_multiplexed_async_connection().await?)
    }
}

/// Hash fields written by a patch; `updated_at` is always present
fn update_fields(update: &ProfileUpdate) -> AppResult<Vec<(&'static str, String)>> {
    let mut fields = Vec::with_capacity(4);
    if let Some(liked) = &update.liked_tags {
        fields.push((FIELD_LIKED_TAGS, serde_json::to_string(liked)?));
    }
    if let Some(disliked) = &update.disliked_tags {
        fields.push((FIELD_DISLIKED_TAGS, serde_json::to_string(disliked)?));
    }
    if let Some(history) = &update.exposure_history {
        fields.push((FIELD_EXPOSURE_HISTORY, serde_json::to_string(history)?));
    }
    fields.push((FIELD_UPDATED_AT, serde_json::to_string(&update.updated_at)?));
    Ok(fields)
}

fn profile_from_fields(fields: &HashMap<String, String>) -> AppResult<Option<UserProfile>> {
    if fields.is_empty() {
        return Ok(None);
    }

    let mut profile = UserProfile::new();
    if let Some(json) = fields.get(FIELD_LIKED_TAGS) {
        profile.liked_tags = serde_json::from_str(json)?;
    }
    if let Some(json) = fields.get(FIELD_DISLIKED_TAGS) {
        profile.disliked_tags = serde_json::from_str(json)?;
    }
    if let Some(json) = fields.get(FIELD_EXPOSURE_HISTORY) {
        profile.exposure_history = serde_json::from_str(json)?;
    }
    if let Some(json) = fields.get(FIELD_UPDATED_AT) {
        profile.updated_at = serde_json::from_str(json)?;
    }
    Ok(Some(profile.normalized()))
}

#[async_trait]
impl ProfileStore for RedisProfileStore {
    async fn read_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let mut conn = self.connection().await?;
        let fields: HashMap<String, String> =
            conn.hgetall(StoreKey::Profile(user_id.to_string()).to_string()).await?;
        profile_from_fields(&fields)
    }

    async fn write_profile(&self, user_id: &str, update: ProfileUpdate) -> AppResult<UserProfile> {
        let key = StoreKey::Profile(user_id.to_string()).to_string();
        let fields = update_fields(&update)?;

        let mut conn = self.connection().await?;
        let (stored,): (HashMap<String, String>,) = redis::pipe()
            .atomic()
            .hset_multiple(&key, fields.as_slice())
            .ignore()
            .hgetall(&key)
            .query_async(&mut conn)
            .await?;

        tracing::debug!(user_id = %user_id, fields = fields.len(), "Profile patch written");

        profile_from_fields(&stored)?
            .ok_or_else(|| AppError::Internal(format!("Profile {} vanished after write", key)))
    }

    async fn append_session_step(
        &self,
        user_id: &str,
        session_id: &str,
        category: &str,
        step: SessionStep,
    ) -> AppResult<SessionRecord> {
        let key = StoreKey::Session {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
        .to_string();

        let mut conn = self.connection().await?;
        let existing: Option<String> = conn.get(&key).await?;
        let mut record = match existing {
            Some(json) => serde_json::from_str(&json)?,
            None => SessionRecord::new(category.to_string()),
        };
        record.append_step(category.to_string(), step);

        let json = serde_json::to_string(&record)?;
        let _: () = conn.set_ex(&key, json, SESSION_TTL_SECS).await?;
        Ok(record)
    }

    async fn read_session(&self, user_id: &str, session_id: &str) -> AppResult<Option<SessionRecord>> {
        let key = StoreKey::Session {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        };
        let mut conn = self.connection().await?;
        let stored: Option<String> = conn.get(key.to_string()).await?;

        match stored {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
