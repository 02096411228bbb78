use std::env;
use std::time::Duration;

use anyhow::{bail, Result};
use voices_agents::completion::{DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL};
use voices_agents::OpenAiConfig;
use voices_core::{KeywordSet, PipelineMode};

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub database_url: Option<String>,
    pub seed_data: bool,
    pub allowed_origins: Vec<String>,
    pub keywords: KeywordSet,
    pub mode: PipelineMode,
    pub model: String,
    pub openai: Option<OpenAiConfig>,
    pub body_limit_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database_url: None,
            seed_data: true,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            keywords: KeywordSet::default(),
            mode: PipelineMode::Policy,
            model: DEFAULT_MODEL.to_string(),
            openai: None,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let seconds = |key: &str, default: u64| {
            value(key)
                .and_then(|raw| raw.parse::<u64>().ok())
                .map(|secs| secs.clamp(1, 600))
                .unwrap_or(default)
        };

        let mode = match value("VOICES_PIPELINE_MODE") {
            Some(raw) => match PipelineMode::parse(&raw) {
                Some(mode) => mode,
                None => bail!("VOICES_PIPELINE_MODE must be `policy` or `counselor`, got {raw:?}"),
            },
            None => PipelineMode::Policy,
        };

        let keywords = match value("VOICES_KEYWORDS") {
            Some(raw) => {
                let keywords = KeywordSet::from_csv(&raw);
                if keywords.is_empty() {
                    bail!("VOICES_KEYWORDS is set but contains no keywords");
                }
                keywords
            }
            None => KeywordSet::default(),
        };

        let allowed_origins = value("VOICES_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().trim_end_matches('/').to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_ALLOWED_ORIGIN.to_string()]);

        let openai = value("OPENAI_API_KEY").map(|api_key| OpenAiConfig {
            api_key,
            base_url: value("VOICES_OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            timeout: Duration::from_secs(seconds("VOICES_MODEL_TIMEOUT_SECONDS", 20)),
            connect_timeout: Duration::from_secs(seconds(
                "VOICES_MODEL_CONNECT_TIMEOUT_SECONDS",
                6,
            )),
        });

        Ok(Self {
            bind: value("VOICES_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            database_url: value("VOICES_DATABASE_URL"),
            seed_data: value("VOICES_SEED_DATA")
                .map(|raw| !matches!(raw.to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
            allowed_origins,
            keywords,
            mode,
            model: value("VOICES_OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        })
    }
}
