use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use voices_core::{Emotion, NewPolicy, NewPost, PolicyRecord, PostRecord};

use crate::{
    contains_ignore_case, validate_policy, EmotionRepository, PolicyRepository, PostRepository,
    StoreError,
};

#[derive(Clone, Default)]
pub struct MemoryStore {
    policies: Arc<RwLock<Vec<PolicyRecord>>>,
    posts: Arc<RwLock<Vec<PostRecord>>>,
    emotions: Arc<RwLock<BTreeMap<i64, Emotion>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PolicyRepository for MemoryStore {
    async fn find_first_policy(&self, keyword: &str) -> Result<Option<PolicyRecord>, StoreError> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        Ok(self
            .policies
            .read()
            .iter()
            .find(|policy| {
                contains_ignore_case(&policy.title, &needle)
                    || contains_ignore_case(&policy.content, &needle)
            })
            .cloned())
    }

    async fn insert_policy(&self, policy: NewPolicy) -> Result<PolicyRecord, StoreError> {
        validate_policy(&policy)?;
        let mut guard = self.policies.write();
        let record = PolicyRecord {
            id: guard.len() as i64 + 1,
            title: policy.title,
            content: policy.content,
        };
        guard.push(record.clone());
        Ok(record)
    }

    async fn count_policies(&self) -> Result<u64, StoreError> {
        Ok(self.policies.read().len() as u64)
    }
}

impl PostRepository for MemoryStore {
    async fn insert_post(&self, post: NewPost) -> Result<PostRecord, StoreError> {
        let mut guard = self.posts.write();
        let record = PostRecord {
            id: guard.len() as i64 + 1,
            company_id: post.company_id,
            user_id: post.user_id,
            emotion_id: post.emotion_id,
            content: post.content,
            final_suggestion: post.final_suggestion,
            post_date: post.post_date,
            deleted: false,
        };
        guard.push(record.clone());
        Ok(record)
    }

    async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError> {
        let mut posts = self
            .posts
            .read()
            .iter()
            .filter(|post| !post.deleted)
            .cloned()
            .collect::<Vec<_>>();
        posts.sort_by(|a, b| b.post_date.cmp(&a.post_date).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn soft_delete_post(&self, post_id: i64) -> Result<bool, StoreError> {
        let mut guard = self.posts.write();
        match guard
            .iter_mut()
            .find(|post| post.id == post_id && !post.deleted)
        {
            Some(post) => {
                post.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl EmotionRepository for MemoryStore {
    async fn list_emotions(&self) -> Result<Vec<Emotion>, StoreError> {
        Ok(self.emotions.read().values().cloned().collect())
    }

    async fn emotion_exists(&self, emotion_id: i64) -> Result<bool, StoreError> {
        Ok(self.emotions.read().contains_key(&emotion_id))
    }

    async fn upsert_emotion(&self, emotion: Emotion) -> Result<(), StoreError> {
        self.emotions.write().insert(emotion.id, emotion);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn policy(title: &str, content: &str) -> NewPolicy {
        NewPolicy {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    fn post(user_id: i64, minutes_ago: i64) -> NewPost {
        NewPost {
            company_id: None,
            user_id,
            emotion_id: 1,
            content: format!("post from {user_id}"),
            final_suggestion: None,
            post_date: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn first_inserted_match_wins() {
        let store = MemoryStore::new();
        store
            .insert_policy(policy("Overtime", "See the working hours rule."))
            .await
            .unwrap();
        store
            .insert_policy(policy("Working Hours", "9:00 to 18:00."))
            .await
            .unwrap();

        let found = store.find_first_policy("WORKING hours").await.unwrap();
        assert_eq!(found.map(|p| p.title), Some("Overtime".to_string()));
    }

    #[tokio::test]
    async fn japanese_title_round_trips() {
        let store = MemoryStore::new();
        store
            .insert_policy(policy("残業規定", "残業は原則として認められていません。"))
            .await
            .unwrap();

        let found = store.find_first_policy("残業規定").await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(1));
    }

    #[tokio::test]
    async fn blank_keyword_matches_nothing() {
        let store = MemoryStore::new();
        store.insert_policy(policy("a", "b")).await.unwrap();
        assert!(store.find_first_policy("  ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn soft_deleted_posts_are_hidden() {
        let store = MemoryStore::new();
        let older = store.insert_post(post(1, 10)).await.unwrap();
        let newer = store.insert_post(post(2, 1)).await.unwrap();

        let listed = store.list_posts().await.unwrap();
        assert_eq!(
            listed.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );

        assert!(store.soft_delete_post(newer.id).await.unwrap());
        assert!(!store.soft_delete_post(newer.id).await.unwrap());

        let listed = store.list_posts().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, older.id);
    }
}
