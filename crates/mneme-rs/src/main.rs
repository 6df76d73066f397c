//! Command-line front end for a mneme memory store.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::{debug, info};
use mneme_rs::MemorySystem;
use mneme_rs::config::MnemeConfig;
use mneme_rs::memory::{
    ConversationLog, ConversationRecord, DEFAULT_CONVERSATION_THRESHOLD, LongTermStore,
    MemoryRecord, ShortTermSnapshot, ShortTermStore,
};
use serde_json::Value;
use std::path::PathBuf;

/// Command-line options for the mneme client.
#[derive(Parser)]
#[command(name = "mneme", version, about = "Persistent short-term and long-term memory")]
struct Cli {
    /// Optional path to a mneme.json5 config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a long-term memory
    Remember {
        category: String,
        content: String,
        /// Exempt the record from retention sweeps
        #[arg(long)]
        permanent: bool,
    },
    /// Recent memories from the category closest to QUERY
    Recall {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Memories whose content resembles QUERY
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Most recent memories in any category
    Recent {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Known categories, most recently used first
    Categories,
    /// Mark the oldest memory with exactly this content as permanent
    Pin { content: String },
    /// Delete non-permanent memories with exactly this content
    Forget { content: String },
    /// Summarize and evict memories older than the retention age
    Sweep {
        /// Override the configured maximum age in days
        #[arg(long)]
        days: Option<u32>,
    },
    /// Session (short-term) memory
    #[command(subcommand)]
    Session(SessionCommand),
    /// Conversation log
    #[command(subcommand)]
    Chat(ChatCommand),
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Print the session document
    Show,
    /// Append an entry; ENTRY is parsed as JSON, falling back to a string
    Add { category: String, entry: String },
    /// Replace the session document with an empty one
    Clear,
}

#[derive(Subcommand)]
enum ChatCommand {
    /// Record one exchange
    Log {
        user_message: String,
        ai_response: String,
    },
    /// Conversations ranked by user message length, then recency
    Recent {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Like `recent`, one entry per distinct user message
    History {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Conversations whose user message resembles QUERY
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Keep only the most recent conversations
    Prune {
        #[arg(long)]
        keep: Option<usize>,
    },
}

/// Entry point for the mneme CLI.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mneme_rs::init_logging();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let config = if let Some(path) = cli.config.as_ref() {
        info!("loading config from path: {}", path.display());
        MnemeConfig::load_from_path(path).context("failed to load config")?
    } else {
        let layered = MnemeConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };

    let system = MemorySystem::open(config, &cwd)
        .await
        .context("failed to open memory stores")?;
    run(&system, cli.command, cli.json).await
}

async fn run(system: &MemorySystem, command: Command, json: bool) -> anyhow::Result<()> {
    let config = system.config();
    let default_limit = config.retrieval.default_limit;
    let store = system.long_term();

    match command {
        Command::Remember {
            category,
            content,
            permanent,
        } => {
            let id = store
                .insert(&category, &content, permanent)
                .await
                .context("failed to store memory")?;
            println!("{id}");
        }
        Command::Recall {
            query,
            limit,
            threshold,
        } => {
            let limit = limit.unwrap_or(default_limit);
            let threshold = threshold.unwrap_or(config.retrieval.category_threshold);
            let records = system
                .retrieval()
                .retrieve_by_category_with_threshold(&query, limit, threshold)
                .await
                .context("failed to recall memories")?;
            print_records(&records, json)?;
        }
        Command::Search {
            query,
            limit,
            threshold,
        } => {
            let limit = limit.unwrap_or(default_limit);
            let threshold = threshold.unwrap_or(config.retrieval.content_threshold);
            let records = system
                .retrieval()
                .search_content_with_threshold(&query, limit, threshold)
                .await
                .context("failed to search memories")?;
            print_records(&records, json)?;
        }
        Command::Recent { limit } => {
            let records = store
                .query_recent(limit.unwrap_or(default_limit))
                .await
                .context("failed to list memories")?;
            print_records(&records, json)?;
        }
        Command::Categories => {
            let categories = store.categories().await.context("failed to list categories")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else {
                for stat in categories {
                    println!("{}\t{}", stat.category, stat.latest.to_rfc3339());
                }
            }
        }
        Command::Pin { content } => {
            if !store
                .mark_permanent(&content)
                .await
                .context("failed to pin memory")?
            {
                bail!("no memory with content {content:?}");
            }
            println!("pinned");
        }
        Command::Forget { content } => {
            let deleted = store
                .delete_by_content(&content)
                .await
                .context("failed to delete memories")?;
            println!("{deleted}");
        }
        Command::Sweep { days } => {
            let days = days.unwrap_or(system.retention().policy().max_age_days);
            let report = system
                .retention()
                .run_retention(days)
                .await
                .context("retention sweep failed")?;
            match report.summary_id {
                Some(summary_id) => println!(
                    "summarized {} memories into #{summary_id}, deleted {}",
                    report.candidates.len(),
                    report.deleted
                ),
                None => println!("nothing older than {}", report.cutoff.to_rfc3339()),
            }
        }
        Command::Session(command) => run_session(system, command)?,
        Command::Chat(command) => run_chat(system, command, json).await?,
    }
    Ok(())
}

fn run_session(system: &MemorySystem, command: SessionCommand) -> anyhow::Result<()> {
    let short_term = system.short_term();
    match command {
        SessionCommand::Show => {
            let snapshot = short_term.load().context("failed to load session memory")?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        SessionCommand::Add { category, entry } => {
            let entry = serde_json::from_str(&entry).unwrap_or(Value::String(entry));
            short_term
                .append(&category, entry)
                .context("failed to save session memory")?;
        }
        SessionCommand::Clear => {
            short_term
                .save(&ShortTermSnapshot::new())
                .context("failed to clear session memory")?;
        }
    }
    Ok(())
}

async fn run_chat(system: &MemorySystem, command: ChatCommand, json: bool) -> anyhow::Result<()> {
    let store = system.long_term();
    let conversations = &system.config().conversations;
    match command {
        ChatCommand::Log {
            user_message,
            ai_response,
        } => {
            let id = store
                .record_conversation(&user_message, &ai_response)
                .await
                .context("failed to record conversation")?;
            println!("{id}");
        }
        ChatCommand::Recent { limit } => {
            let records = store
                .recent_conversations(limit.unwrap_or(conversations.recent_limit))
                .await
                .context("failed to list conversations")?;
            print_conversations(&records, json)?;
        }
        ChatCommand::History { limit } => {
            let records = store
                .recent_unique_conversations(limit.unwrap_or(conversations.recent_limit))
                .await
                .context("failed to list conversation history")?;
            print_conversations(&records, json)?;
        }
        ChatCommand::Search {
            query,
            limit,
            threshold,
        } => {
            let hits = store
                .search_conversations(
                    &query,
                    limit.unwrap_or(conversations.recent_limit),
                    threshold.unwrap_or(DEFAULT_CONVERSATION_THRESHOLD),
                )
                .await
                .context("failed to search conversations")?;
            let records: Vec<ConversationRecord> = hits.into_iter().map(|hit| hit.record).collect();
            print_conversations(&records, json)?;
        }
        ChatCommand::Prune { keep } => {
            let deleted = store
                .prune_conversations(keep.unwrap_or(conversations.keep_latest))
                .await
                .context("failed to prune conversations")?;
            println!("{deleted}");
        }
    }
    Ok(())
}

fn print_records(records: &[MemoryRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    for record in records {
        let pin = if record.permanent { " *" } else { "" };
        println!(
            "#{} {} [{}]{pin} {}",
            record.id,
            record.timestamp.to_rfc3339(),
            record.category,
            record.content
        );
    }
    Ok(())
}

fn print_conversations(records: &[ConversationRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    for record in records {
        println!("#{} {}", record.id, record.timestamp.to_rfc3339());
        println!("  user: {}", record.user_message);
        println!("  ai:   {}", record.ai_response);
    }
    Ok(())
}
