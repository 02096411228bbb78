use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use voices_core::{Emotion, NewPolicy, NewPost, PolicyRecord, PostRecord};

use crate::{
    contains_ignore_case, format_timestamp, parse_timestamp, validate_policy, EmotionRepository,
    PolicyRepository, PostRepository, StoreError,
};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS policies (
              POLICY_ID INTEGER PRIMARY KEY AUTOINCREMENT,
              POLICY_TITLE TEXT NOT NULL CHECK (length(POLICY_TITLE) <= 255),
              POLICY_CONTENT TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS emotion_master (
              EMOTION_ID INTEGER PRIMARY KEY,
              EMOTION_NAME TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
              POST_ID INTEGER PRIMARY KEY AUTOINCREMENT,
              COMPANY_ID INTEGER,
              USER_ID INTEGER NOT NULL,
              EMOTION_ID INTEGER NOT NULL REFERENCES emotion_master(EMOTION_ID),
              CONTENT_ENCRYPTED TEXT NOT NULL,
              FINAL_SUGGESTION TEXT,
              POST_DATE TEXT NOT NULL,
              DELETED_FLAG INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn post_from_row(row: &SqliteRow) -> Result<PostRecord, StoreError> {
    Ok(PostRecord {
        id: row.get("POST_ID"),
        company_id: row.get("COMPANY_ID"),
        user_id: row.get("USER_ID"),
        emotion_id: row.get("EMOTION_ID"),
        content: row.get("CONTENT_ENCRYPTED"),
        final_suggestion: row.get("FINAL_SUGGESTION"),
        post_date: parse_timestamp(row.get::<String, _>("POST_DATE").as_str())?,
        deleted: row.get::<i64, _>("DELETED_FLAG") != 0,
    })
}

impl PolicyRepository for SqliteStore {
    async fn find_first_policy(&self, keyword: &str) -> Result<Option<PolicyRecord>, StoreError> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        // SQLite lower() folds ASCII only, so matching happens here.
        let rows = sqlx::query(
            r#"
            SELECT POLICY_ID, POLICY_TITLE, POLICY_CONTENT
            FROM policies
            ORDER BY POLICY_ID
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| PolicyRecord {
                id: row.get("POLICY_ID"),
                title: row.get("POLICY_TITLE"),
                content: row.get("POLICY_CONTENT"),
            })
            .find(|policy| {
                contains_ignore_case(&policy.title, &needle)
                    || contains_ignore_case(&policy.content, &needle)
            }))
    }

    async fn insert_policy(&self, policy: NewPolicy) -> Result<PolicyRecord, StoreError> {
        validate_policy(&policy)?;
        let result = sqlx::query(
            r#"
            INSERT INTO policies (POLICY_TITLE, POLICY_CONTENT)
            VALUES (?1, ?2)
            "#,
        )
        .bind(&policy.title)
        .bind(&policy.content)
        .execute(&self.pool)
        .await?;

        Ok(PolicyRecord {
            id: result.last_insert_rowid(),
            title: policy.title,
            content: policy.content,
        })
    }

    async fn count_policies(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM policies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

impl PostRepository for SqliteStore {
    async fn insert_post(&self, post: NewPost) -> Result<PostRecord, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (
              COMPANY_ID, USER_ID, EMOTION_ID, CONTENT_ENCRYPTED,
              FINAL_SUGGESTION, POST_DATE, DELETED_FLAG
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
            "#,
        )
        .bind(post.company_id)
        .bind(post.user_id)
        .bind(post.emotion_id)
        .bind(&post.content)
        .bind(&post.final_suggestion)
        .bind(format_timestamp(post.post_date))
        .execute(&self.pool)
        .await?;

        Ok(PostRecord {
            id: result.last_insert_rowid(),
            company_id: post.company_id,
            user_id: post.user_id,
            emotion_id: post.emotion_id,
            content: post.content,
            final_suggestion: post.final_suggestion,
            post_date: post.post_date,
            deleted: false,
        })
    }

    async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT POST_ID, COMPANY_ID, USER_ID, EMOTION_ID, CONTENT_ENCRYPTED,
                   FINAL_SUGGESTION, POST_DATE, DELETED_FLAG
            FROM posts
            WHERE DELETED_FLAG = 0
            ORDER BY POST_DATE DESC, POST_ID DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(post_from_row).collect()
    }

    async fn soft_delete_post(&self, post_id: i64) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE posts SET DELETED_FLAG = 1 WHERE POST_ID = ?1 AND DELETED_FLAG = 0")
                .bind(post_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl EmotionRepository for SqliteStore {
    async fn list_emotions(&self) -> Result<Vec<Emotion>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT EMOTION_ID, EMOTION_NAME
            FROM emotion_master
            ORDER BY EMOTION_ID
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Emotion {
                id: row.get("EMOTION_ID"),
                name: row.get("EMOTION_NAME"),
            })
            .collect())
    }

    async fn emotion_exists(&self, emotion_id: i64) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM emotion_master WHERE EMOTION_ID = ?1")
            .bind(emotion_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn upsert_emotion(&self, emotion: Emotion) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO emotion_master (EMOTION_ID, EMOTION_NAME)
            VALUES (?1, ?2)
            ON CONFLICT(EMOTION_ID) DO UPDATE SET
              EMOTION_NAME=excluded.EMOTION_NAME
            "#,
        )
        .bind(emotion.id)
        .bind(&emotion.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::seed_defaults;

    async fn memory_sqlite() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteStore::from_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn finds_seeded_japanese_policy() {
        let store = memory_sqlite().await;
        seed_defaults(&store).await.unwrap();

        let found = store.find_first_policy("残業規定").await.unwrap().unwrap();
        assert_eq!(found.title, "残業規定");
    }

    #[tokio::test]
    async fn content_match_ignores_ascii_case() {
        let store = memory_sqlite().await;
        seed_defaults(&store).await.unwrap();

        let found = store.find_first_policy("LEAVE REQUEST").await.unwrap().unwrap();
        assert_eq!(found.title, "day off");
    }

    #[tokio::test]
    async fn zero_rows_is_not_an_error() {
        let store = memory_sqlite().await;
        assert!(store.find_first_policy("dress code").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closed_pool_surfaces_unavailable() {
        let store = memory_sqlite().await;
        store.close().await;

        let result = store.find_first_policy("working hours").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn posts_insert_and_soft_delete() {
        let store = memory_sqlite().await;
        seed_defaults(&store).await.unwrap();

        let saved = store
            .insert_post(NewPost {
                company_id: Some(3),
                user_id: 7,
                emotion_id: 2,
                content: "great week".to_string(),
                final_suggestion: None,
                post_date: Utc::now(),
            })
            .await
            .unwrap();

        let listed = store.list_posts().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, saved.id);
        assert_eq!(listed[0].company_id, Some(3));
        assert!(!listed[0].deleted);

        assert!(store.soft_delete_post(saved.id).await.unwrap());
        assert!(store.list_posts().await.unwrap().is_empty());

        let flag: i64 = sqlx::query_scalar("SELECT DELETED_FLAG FROM posts WHERE POST_ID = ?1")
            .bind(saved.id)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(flag, 1);
    }

    #[tokio::test]
    async fn emotion_master_lookup() {
        let store = memory_sqlite().await;
        seed_defaults(&store).await.unwrap();

        assert!(store.emotion_exists(8).await.unwrap());
        assert!(!store.emotion_exists(9).await.unwrap());
        assert_eq!(store.list_emotions().await.unwrap()[2].name, "Angry");
    }
}
