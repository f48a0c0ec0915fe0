//! Command line front end for the course memory service.

use anyhow::{Context, bail};
use autoagents_llm::LLMProvider;
use autoagents_llm::backends::google::Google;
use autoagents_llm::builder::LLMBuilder;
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use scholar_rs::config::ScholarConfig;
use scholar_rs::core::{FindOutcome, MemoryService, PromoteTarget, open_sqlite_store};
use scholar_rs::memory::{MemoryId, MessageRole};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "scholar", version)]
struct Cli {
    /// Optional path to a scholar.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// SQLite database file, overriding memory.path
    #[arg(long)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save one exchange to a course
    Save {
        #[arg(long)]
        course: String,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        message: String,
        #[arg(long)]
        response: String,
        #[arg(long)]
        long_term: bool,
    },
    /// Find the memory saved for a message
    Find {
        #[arg(long)]
        course: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        message: String,
    },
    /// Promote a memory to long-term by id
    Promote {
        #[arg(long)]
        user: String,
        id: MemoryId,
    },
    /// Promote a matching memory or create a long-term one
    Remember {
        #[arg(long)]
        user: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        response: String,
    },
    /// Drop a memory back to short-term
    Forget {
        #[arg(long)]
        user: String,
        id: MemoryId,
    },
    /// Print the recall context for a course
    Recall {
        #[arg(long)]
        course: String,
        #[arg(long)]
        user: Option<String>,
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Refresh the course summary
    Summarize {
        #[arg(long)]
        course: String,
        #[arg(long)]
        user: String,
    },
    /// Record a raw course message
    Message {
        #[arg(long)]
        course: String,
        #[arg(long, value_parser = parse_role)]
        role: MessageRole,
        #[arg(long)]
        content: String,
        /// Count a finished turn for this user after a model message
        #[arg(long)]
        user: Option<String>,
    },
    /// Delete a course, keeping its long-term memories
    DeleteCourse {
        #[arg(long)]
        course: String,
    },
}

fn parse_role(value: &str) -> Result<MessageRole, String> {
    MessageRole::parse(value).ok_or_else(|| format!("unknown role '{value}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    scholar_rs::init_logging();

    let cli = Cli::parse();
    let config = if let Some(path) = cli.config.as_ref() {
        ScholarConfig::load_from_path(path).context("failed to load config")?
    } else {
        let cwd = std::env::current_dir().context("cwd")?;
        let layered = ScholarConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };

    let llm = build_llm(&config)?;
    let store = open_sqlite_store(&config, cli.db.as_deref(), llm.clone())
        .context("failed to open memory store")?;
    let mut builder = MemoryService::builder(Arc::new(store)).config(&config);
    if let Some(llm) = llm {
        builder = builder.llm(llm);
    }
    let service = builder.build();

    match cli.command {
        Command::Save {
            course,
            user,
            message,
            response,
            long_term,
        } => {
            if !service
                .save_memory(&course, &message, &response, user.as_deref(), long_term)
                .await
            {
                bail!("failed to save memory");
            }
            println!("saved");
        }
        Command::Find {
            course,
            user,
            message,
        } => match service.find_memory(&course, &message, &user).await {
            FindOutcome::Found { memory_id } => println!("{memory_id}"),
            FindOutcome::NotFound { reason } => println!("not found: {reason}"),
            FindOutcome::Unavailable => bail!("memory store unavailable"),
        },
        Command::Promote { user, id } => {
            if !service.promote(id, &user).await {
                bail!("failed to promote {id}");
            }
            println!("promoted {id}");
        }
        Command::Remember {
            user,
            message,
            response,
        } => {
            let target = PromoteTarget::Exchange {
                user_message: message,
                ai_response: response,
            };
            if !service.promote_or_create(&user, target).await {
                bail!("failed to remember exchange");
            }
            println!("remembered");
        }
        Command::Forget { user, id } => {
            if !service.forget(id, &user).await {
                bail!("failed to forget {id}");
            }
            println!("forgot {id}");
        }
        Command::Recall {
            course,
            user,
            query,
        } => {
            println!(
                "{}",
                service.recall_context(&course, &query, user.as_deref()).await
            );
        }
        Command::Summarize { course, user } => {
            if !service.summarize(&course, &user).await {
                bail!("failed to summarize course {course}");
            }
            println!("summarized");
        }
        Command::Message {
            course,
            role,
            content,
            user,
        } => {
            if !service.record_message(&course, role, &content).await {
                bail!("failed to record message");
            }
            if let Some(user) = user
                && !role.is_user()
                && service.complete_turn(&course, &user).await
            {
                println!("summary refreshed");
            }
        }
        Command::DeleteCourse { course } => match service.delete_course(&course).await {
            Some(deletion) => println!(
                "deleted={} detached={} messages={}",
                deletion.deleted, deletion.detached, deletion.deleted_messages
            ),
            None => bail!("failed to delete course {course}"),
        },
    }
    Ok(())
}

/// Gemini provider when the configured key variable is set.
fn build_llm(config: &ScholarConfig) -> anyhow::Result<Option<Arc<dyn LLMProvider>>> {
    if config.llm.provider != "google" {
        bail!("unsupported llm provider '{}'", config.llm.provider);
    }
    let Ok(api_key) = std::env::var(&config.llm.api_key_env) else {
        warn!(
            "{} not set, summaries and embeddings disabled",
            config.llm.api_key_env
        );
        return Ok(None);
    };
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| config.llm.model.clone());
    info!("building llm provider (model={model})");
    let mut builder = LLMBuilder::<Google>::new().api_key(api_key).model(model);
    if let Some(temperature) = config.llm.temperature {
        builder = builder.temperature(temperature);
    }
    let llm: Arc<dyn LLMProvider> = builder
        .build()
        .context("failed to build Gemini LLM provider")?;
    Ok(Some(llm))
}
