use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use voices_agents::{ChatAgent, ChatError, ChatSettings, ModelClient};
use voices_api::{build_app, AppConfig};
use voices_core::{classify, ChatInput, ChatReply, Classification, PipelineMode};
use voices_observability::{init_tracing, AppMetrics};
use voices_storage::{seed_defaults, Store};

#[derive(Debug, Parser)]
#[command(name = "voices")]
#[command(about = "Voices HR sentiment chat CLI")]
struct Cli {
    /// Overrides VOICES_DATABASE_URL; the in-memory store is used when neither is set.
    #[arg(long)]
    database_url: Option<String>,

    /// Overrides VOICES_PIPELINE_MODE.
    #[arg(long)]
    mode: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Interactive chat against the configured pipeline.
    Chat,
    /// Print the detected language and matched keyword for a message.
    Classify { text: String },
    /// Insert the default policies and emotion master.
    Seed,
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },
}

#[derive(Debug, Subcommand)]
enum PolicyCommand {
    /// First policy whose title or content contains the keyword.
    Search { keyword: String },
}

#[derive(Debug, Serialize)]
struct ClassifyOutput<'a> {
    language: &'static str,
    keyword: Option<&'a str>,
}

impl<'a> From<&'a Classification> for ClassifyOutput<'a> {
    fn from(classification: &'a Classification) -> Self {
        Self {
            language: classification.language.as_code(),
            keyword: classification.keyword.as_deref(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("voices_cli");
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(database_url) = cli.database_url {
        config.database_url = Some(database_url);
    }
    if let Some(mode) = cli.mode.as_deref() {
        config.mode = PipelineMode::parse(mode)
            .with_context(|| format!("invalid --mode {mode:?}, expected policy or counselor"))?;
    }

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            let bind = config.bind.clone();
            let app = build_app(config).await?;
            let listener = tokio::net::TcpListener::bind(&bind).await?;
            tracing::info!(bind = %bind, "voices api started");
            axum::serve(listener, app).await?;
        }
        Command::Chat => {
            let agent = build_agent(&config).await?;
            run_chat(agent).await?;
        }
        Command::Classify { text } => {
            let classification = classify(&text, &config.keywords);
            println!(
                "{}",
                serde_json::to_string_pretty(&ClassifyOutput::from(&classification))?
            );
        }
        Command::Seed => {
            let store = open_store(&config).await?;
            let summary = seed_defaults(&store).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Policy { command } => match command {
            PolicyCommand::Search { keyword } => {
                let agent = build_agent(&config).await?;
                match agent.find_policy(&keyword).await? {
                    Some(policy) => println!("{}", serde_json::to_string_pretty(&policy)?),
                    None => println!("no policy matches {keyword:?}"),
                }
            }
        },
    }

    Ok(())
}

async fn run_chat(agent: ChatAgent<Store, ModelClient>) -> Result<()> {
    println!("Voices chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let result = agent
            .handle_chat(ChatInput {
                text: message.to_string(),
            })
            .await;

        println!("{}", render_turn(result));
    }

    Ok(())
}

/// One chat turn as printed in the interactive loop. Errors are shown and
/// the session continues.
fn render_turn(result: Result<ChatReply, ChatError>) -> String {
    match result {
        Ok(reply) => {
            let mut out = format!("\n{}\n", reply.response);
            if let Some(found) = reply.found_policy {
                out.push_str(&format!(
                    "[language: {}, keyword: {}, policy found: {found}]\n",
                    reply.language.as_code(),
                    reply.keyword.as_deref().unwrap_or("-"),
                ));
            }
            out
        }
        Err(error) => {
            tracing::warn!(error = %error, "chat turn failed");
            format!("\nerror: {error}\n")
        }
    }
}

async fn open_store(config: &AppConfig) -> Result<Store> {
    match config.database_url.as_deref() {
        Some(database_url) => Store::sqlite(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {database_url}")),
        None => Ok(Store::memory()),
    }
}

async fn build_agent(config: &AppConfig) -> Result<ChatAgent<Store, ModelClient>> {
    let store = open_store(config).await?;
    if config.seed_data {
        seed_defaults(&store).await?;
    }

    let model = match config.openai.clone() {
        Some(openai) => ModelClient::openai(openai)?,
        None => ModelClient::offline(),
    };

    Ok(ChatAgent::new(
        Arc::new(store),
        Arc::new(model),
        config.keywords.clone(),
        ChatSettings {
            mode: config.mode,
            model: config.model.clone(),
            ..ChatSettings::default()
        },
        AppMetrics::shared(),
    ))
}
