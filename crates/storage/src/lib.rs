mod memory;
mod sqlite;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use voices_core::seed::{default_emotions, default_policies};
use voices_core::validation::{require_text, MAX_POLICY_TITLE_LEN};
use voices_core::{Emotion, NewPolicy, NewPost, PolicyRecord, PostRecord, ValidationError};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use sqlx::Error as SqlxError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("malformed stored row: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

pub trait PolicyRepository: Send + Sync {
    /// First policy, in insertion order, whose title or content contains
    /// `keyword` ignoring case. A blank keyword never matches.
    async fn find_first_policy(&self, keyword: &str) -> Result<Option<PolicyRecord>, StoreError>;
    async fn insert_policy(&self, policy: NewPolicy) -> Result<PolicyRecord, StoreError>;
    async fn count_policies(&self) -> Result<u64, StoreError>;
}

pub trait PostRepository: Send + Sync {
    async fn insert_post(&self, post: NewPost) -> Result<PostRecord, StoreError>;
    /// Non-deleted posts, newest first.
    async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError>;
    /// Returns false when no live post has this id.
    async fn soft_delete_post(&self, post_id: i64) -> Result<bool, StoreError>;
}

pub trait EmotionRepository: Send + Sync {
    async fn list_emotions(&self) -> Result<Vec<Emotion>, StoreError>;
    async fn emotion_exists(&self, emotion_id: i64) -> Result<bool, StoreError>;
    async fn upsert_emotion(&self, emotion: Emotion) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SeedSummary {
    pub policies_inserted: usize,
    pub emotions_upserted: usize,
}

/// Seeds the default policy set when the policy table is empty and
/// upserts the emotion master.
pub async fn seed_defaults<S>(store: &S) -> Result<SeedSummary, StoreError>
where
    S: PolicyRepository + EmotionRepository,
{
    let mut summary = SeedSummary::default();

    if store.count_policies().await? == 0 {
        for policy in default_policies() {
            store.insert_policy(policy).await?;
            summary.policies_inserted += 1;
        }
    }

    for emotion in default_emotions() {
        store.upsert_emotion(emotion).await?;
        summary.emotions_upserted += 1;
    }

    tracing::info!(
        policies_inserted = summary.policies_inserted,
        emotions_upserted = summary.emotions_upserted,
        "seed data applied"
    );

    Ok(summary)
}

pub(crate) fn validate_policy(policy: &NewPolicy) -> Result<(), StoreError> {
    require_text("title", Some(&policy.title), MAX_POLICY_TITLE_LEN)?;
    Ok(())
}

pub(crate) fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| StoreError::Corrupt(format!("POST_DATE {raw:?}: {error}")))
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self, StoreError> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl PolicyRepository for Store {
    async fn find_first_policy(&self, keyword: &str) -> Result<Option<PolicyRecord>, StoreError> {
        match self {
            Store::Memory(store) => store.find_first_policy(keyword).await,
            Store::Sqlite(store) => store.find_first_policy(keyword).await,
        }
    }

    async fn insert_policy(&self, policy: NewPolicy) -> Result<PolicyRecord, StoreError> {
        match self {
            Store::Memory(store) => store.insert_policy(policy).await,
            Store::Sqlite(store) => store.insert_policy(policy).await,
        }
    }

    async fn count_policies(&self) -> Result<u64, StoreError> {
        match self {
            Store::Memory(store) => store.count_policies().await,
            Store::Sqlite(store) => store.count_policies().await,
        }
    }
}

impl PostRepository for Store {
    async fn insert_post(&self, post: NewPost) -> Result<PostRecord, StoreError> {
        match self {
            Store::Memory(store) => store.insert_post(post).await,
            Store::Sqlite(store) => store.insert_post(post).await,
        }
    }

    async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError> {
        match self {
            Store::Memory(store) => store.list_posts().await,
            Store::Sqlite(store) => store.list_posts().await,
        }
    }

    async fn soft_delete_post(&self, post_id: i64) -> Result<bool, StoreError> {
        match self {
            Store::Memory(store) => store.soft_delete_post(post_id).await,
            Store::Sqlite(store) => store.soft_delete_post(post_id).await,
        }
    }
}

impl EmotionRepository for Store {
    async fn list_emotions(&self) -> Result<Vec<Emotion>, StoreError> {
        match self {
            Store::Memory(store) => store.list_emotions().await,
            Store::Sqlite(store) => store.list_emotions().await,
        }
    }

    async fn emotion_exists(&self, emotion_id: i64) -> Result<bool, StoreError> {
        match self {
            Store::Memory(store) => store.emotion_exists(emotion_id).await,
            Store::Sqlite(store) => store.emotion_exists(emotion_id).await,
        }
    }

    async fn upsert_emotion(&self, emotion: Emotion) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.upsert_emotion(emotion).await,
            Store::Sqlite(store) => store.upsert_emotion(emotion).await,
        }
    }
}
