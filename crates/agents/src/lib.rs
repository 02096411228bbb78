pub mod completion;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use voices_core::validation::{
    optional_text, require_text, MAX_MESSAGE_LEN, MAX_POST_CONTENT_LEN, MAX_SUGGESTION_LEN,
};
use voices_core::{
    classify, compose_prompt, counselor_prompt, detect_language, normalize_reply, ChatInput,
    ChatReply, ComposedPrompt, Emotion, KeywordSet, NewPost, PipelineMode, PolicyOutcome,
    PolicyRecord, PostRecord, SaveCommentInput, ValidationError,
};
use voices_observability::AppMetrics;
use voices_storage::{EmotionRepository, PolicyRepository, PostRepository, StoreError};

pub use completion::{
    CompletionClient, CompletionError, CompletionRequest, ModelClient, OfflineClient,
    OpenAiClient, OpenAiConfig,
};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    #[error("model call failed: {0}")]
    ModelCallFailed(#[from] CompletionError),
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub mode: PipelineMode,
    pub model: String,
    pub temperature: f32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Policy,
            model: completion::DEFAULT_MODEL.to_string(),
            temperature: completion::DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Clone)]
pub struct ChatAgent<S, C>
where
    S: PolicyRepository + PostRepository + EmotionRepository,
    C: CompletionClient,
{
    store: Arc<S>,
    completion: Arc<C>,
    keywords: KeywordSet,
    settings: ChatSettings,
    metrics: Arc<AppMetrics>,
}

impl<S, C> ChatAgent<S, C>
where
    S: PolicyRepository + PostRepository + EmotionRepository,
    C: CompletionClient,
{
    pub fn new(
        store: Arc<S>,
        completion: Arc<C>,
        keywords: KeywordSet,
        settings: ChatSettings,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            store,
            completion,
            keywords,
            settings,
            metrics,
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn completion_backend(&self) -> &'static str {
        self.completion.backend_name()
    }

    #[instrument(skip(self, input), fields(mode = self.settings.mode.as_str()))]
    pub async fn handle_chat(&self, input: ChatInput) -> Result<ChatReply, ChatError> {
        let started = Instant::now();
        self.metrics.inc_chat_request();

        if input.text.chars().count() > MAX_MESSAGE_LEN {
            return Err(ValidationError::TooLong {
                field: "message",
                max: MAX_MESSAGE_LEN,
            }
            .into());
        }

        let reply = match self.settings.mode {
            PipelineMode::Policy => self.answer_from_policy(&input.text).await?,
            PipelineMode::Counselor => self.answer_as_counselor(&input.text).await?,
        };

        self.metrics.observe_latency(started.elapsed());
        info!(
            language = %reply.language.as_code(),
            keyword = ?reply.keyword,
            outcome = ?reply.outcome,
            "chat handled"
        );

        Ok(reply)
    }

    async fn answer_from_policy(&self, text: &str) -> Result<ChatReply, ChatError> {
        let classification = classify(text, &self.keywords);
        let (outcome, policy) = self.resolve_policy(classification.keyword.as_deref()).await?;

        if outcome.found() {
            self.metrics.inc_policy_hit();
        } else {
            self.metrics.inc_probe_reply();
        }

        let prompt = compose_prompt(text, classification.language, outcome, policy.as_ref());
        let raw = self.call_model(&prompt).await?;

        Ok(ChatReply {
            response: normalize_reply(&raw, false),
            found_policy: Some(outcome.found()),
            language: classification.language,
            keyword: classification.keyword,
            outcome: Some(outcome),
        })
    }

    async fn answer_as_counselor(&self, text: &str) -> Result<ChatReply, ChatError> {
        let raw = self.call_model(&counselor_prompt(text)).await?;

        Ok(ChatReply {
            response: normalize_reply(&raw, true),
            found_policy: None,
            language: detect_language(text),
            keyword: None,
            outcome: None,
        })
    }

    /// No keyword means no store query at all.
    async fn resolve_policy(
        &self,
        keyword: Option<&str>,
    ) -> Result<(PolicyOutcome, Option<PolicyRecord>), ChatError> {
        let Some(keyword) = keyword else {
            return Ok((PolicyOutcome::NoKeyword, None));
        };

        match self.store.find_first_policy(keyword).await {
            Ok(Some(policy)) => Ok((PolicyOutcome::Found, Some(policy))),
            Ok(None) => Ok((PolicyOutcome::NotFound, None)),
            Err(error) => {
                self.metrics.inc_store_failure();
                warn!(keyword, error = %error, "policy lookup failed");
                Err(error.into())
            }
        }
    }

    async fn call_model(&self, prompt: &ComposedPrompt) -> Result<String, ChatError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: prompt.messages(),
            temperature: self.settings.temperature,
        };

        self.completion.complete(&request).await.map_err(|error| {
            self.metrics.inc_model_failure();
            warn!(
                backend = self.completion.backend_name(),
                error = %error,
                "completion call failed"
            );
            ChatError::ModelCallFailed(error)
        })
    }

    #[instrument(skip(self, input))]
    pub async fn save_comment(&self, input: SaveCommentInput) -> Result<PostRecord, ChatError> {
        let user_id = input.user_id.ok_or(ValidationError::Missing("user_id"))?;
        let emotion_id = input
            .emotion_id
            .ok_or(ValidationError::Missing("emotion_id"))?;
        let content = require_text("content", input.content.as_deref(), MAX_POST_CONTENT_LEN)?;
        let final_suggestion = optional_text(
            "final_suggestion",
            input.final_suggestion.as_deref(),
            MAX_SUGGESTION_LEN,
        )?;

        if !self.store.emotion_exists(emotion_id).await? {
            return Err(ValidationError::UnknownEmotion(emotion_id).into());
        }

        let post = self
            .store
            .insert_post(NewPost {
                company_id: input.company_id,
                user_id,
                emotion_id,
                content: content.to_string(),
                final_suggestion,
                post_date: input.post_date.unwrap_or_else(Utc::now),
            })
            .await?;

        self.metrics.inc_post_saved();
        info!(post_id = post.id, user_id, emotion_id, "post saved");

        Ok(post)
    }

    pub async fn list_posts(&self) -> Result<Vec<PostRecord>, ChatError> {
        Ok(self.store.list_posts().await?)
    }

    pub async fn delete_post(&self, post_id: i64) -> Result<bool, ChatError> {
        let deleted = self.store.soft_delete_post(post_id).await?;
        if deleted {
            info!(post_id, "post soft-deleted");
        }
        Ok(deleted)
    }

    pub async fn list_emotions(&self) -> Result<Vec<Emotion>, ChatError> {
        Ok(self.store.list_emotions().await?)
    }

    pub async fn find_policy(&self, keyword: &str) -> Result<Option<PolicyRecord>, ChatError> {
        Ok(self.store.find_first_policy(keyword).await?)
    }
}
