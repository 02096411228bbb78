use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    En,
    Ja,
    Unknown,
}

impl Language {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ja => "ja",
            Self::Unknown => "unknown",
        }
    }
}

/// Outcome of the policy lookup step for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyOutcome {
    Found,
    NotFound,
    NoKeyword,
}

impl PolicyOutcome {
    pub fn found(self) -> bool {
        self == Self::Found
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Classify, look up a policy, and answer from it when possible.
    Policy,
    /// Counselor-only prompt with no policy lookup.
    Counselor,
}

impl PipelineMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "policy" | "policies" => Some(Self::Policy),
            "counselor" | "counsellor" | "counseling" => Some(Self::Counselor),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Counselor => "counselor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub language: Language,
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPolicy {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emotion {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub company_id: Option<i64>,
    pub user_id: i64,
    pub emotion_id: i64,
    pub content: String,
    pub final_suggestion: Option<String>,
    pub post_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub company_id: Option<i64>,
    pub user_id: i64,
    pub emotion_id: i64,
    pub content: String,
    pub final_suggestion: Option<String>,
    pub post_date: DateTime<Utc>,
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedPrompt {
    pub system: String,
    pub user: String,
    pub assistant_seed: Option<String>,
}

impl ComposedPrompt {
    pub fn messages(&self) -> Vec<PromptMessage> {
        let mut messages = vec![
            PromptMessage {
                role: Role::System,
                content: self.system.clone(),
            },
            PromptMessage {
                role: Role::User,
                content: self.user.clone(),
            },
        ];

        if let Some(seed) = &self.assistant_seed {
            messages.push(PromptMessage {
                role: Role::Assistant,
                content: seed.clone(),
            });
        }

        messages
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInput {
    pub text: String,
}

/// Raw save-comment payload; required fields are checked before any store call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveCommentInput {
    pub user_id: Option<i64>,
    pub company_id: Option<i64>,
    pub emotion_id: Option<i64>,
    pub content: Option<String>,
    pub final_suggestion: Option<String>,
    pub post_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    /// Absent in counselor mode, where no lookup happens.
    pub found_policy: Option<bool>,
    pub language: Language,
    pub keyword: Option<String>,
    pub outcome: Option<PolicyOutcome>,
}
