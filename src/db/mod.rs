pub mod memory;
pub mod redis;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{ProfileUpdate, SessionRecord, SessionStep, UserProfile};

pub use memory::InMemoryProfileStore;
pub use self::redis::{create_redis_client, RedisProfileStore, StoreKey};

/// Persistence for user profiles and browsing sessions
///
/// Profile writes are field-level merge patches: only the fields present in a
/// `ProfileUpdate` are replaced, so concurrent feedback and exposure writes for
/// the same user keep each other's changes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Stored profile of `user_id`, `None` when the user is unknown
    async fn read_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>>;

    /// Merges `update` into the stored profile and returns the result
    async fn write_profile(&self, user_id: &str, update: ProfileUpdate) -> AppResult<UserProfile>;

    /// Appends `step` to a session, creating the session on first use
    ///
    /// An identical step already present is not stored twice.
    async fn append_session_step(
        &self,
        user_id: &str,
        session_id: &str,
        category: &str,
        step: SessionStep,
    ) -> AppResult<SessionRecord>;

    async fn read_session(&self, user_id: &str, session_id: &str) -> AppResult<Option<SessionRecord>>;
}
