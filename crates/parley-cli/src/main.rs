//! Parley CLI - chat, extraction, tagging and SQL question answering

mod demo;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use parley_ai::{
    Chatbot, ConversationChain, ExtractionChain, LlmClient, SqlQueryChain, TaggingChain,
};
use parley_history::{ChatHistory, ConversationMemory, FileChatHistory};
use parley_schema::{People, Person};
use parley_sql::{DatabaseOptions, SqlDatabase};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_HISTORY_FILE: &str = "messages.json";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///data/street_tree_db.sqlite";

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Chat, extract and query data with a language model")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message with no memory
    Ask {
        message: String,
    },

    /// Send messages in order, remembering the conversation in a JSON file
    Chat {
        #[arg(long, env = "PARLEY_HISTORY_FILE", default_value = DEFAULT_HISTORY_FILE)]
        history: PathBuf,

        /// Keep only the last N exchanges in the prompt
        #[arg(long)]
        window: Option<usize>,

        #[arg(required = true)]
        messages: Vec<String>,
    },

    /// Inspect or reset the conversation file
    History {
        #[command(subcommand)]
        action: HistoryAction,

        #[arg(long, env = "PARLEY_HISTORY_FILE", default_value = DEFAULT_HISTORY_FILE, global = true)]
        history: PathBuf,
    },

    /// Extract people mentioned in a text
    Extract {
        /// Extract a list of people instead of a single one
        #[arg(long)]
        many: bool,

        text: String,
    },

    /// Tag a text with sentiment, political tendency and language
    Tag {
        /// Restrict labels to fixed vocabularies
        #[arg(long)]
        enums: bool,

        text: String,
    },

    /// Answer a question from a SQLite database
    Sql {
        #[command(flatten)]
        db: DatabaseArgs,

        #[arg(long, value_enum, default_value_t = SqlMode::Answer)]
        mode: SqlMode,

        question: String,
    },

    /// Replay one of the bundled walkthroughs
    Demo {
        #[arg(value_enum)]
        name: DemoName,

        #[arg(long, env = "PARLEY_HISTORY_FILE", default_value = DEFAULT_HISTORY_FILE)]
        history: PathBuf,

        #[command(flatten)]
        db: DatabaseArgs,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryAction {
    /// Print every stored message
    Show,
    /// Remove every stored message
    Clear,
}

#[derive(clap::Args, Debug, Clone)]
struct DatabaseArgs {
    /// SQLite URI or file path
    #[arg(long, env = "PARLEY_DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    database: String,

    /// Maximum rows the generated query should return
    #[arg(long, env = "PARLEY_SQL_TOP_K", default_value_t = 5)]
    top_k: usize,

    /// Open the database writable and skip the read-only guard
    #[arg(long)]
    allow_writes: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SqlMode {
    /// Print the generated query only
    Query,
    /// Print the result of running the generated query
    Execute,
    /// Print a natural-language answer
    Answer,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum DemoName {
    Chatbot,
    Extraction,
    Sentiment,
    Sql,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask { message } => {
            let client = LlmClient::from_env()?;
            let reply = Chatbot::new(&client).ask(&message).await?;
            println!("{}", reply);
        }
        Commands::Chat {
            history,
            window,
            messages,
        } => {
            run_chat(&history, window, &messages).await?;
        }
        Commands::History { action, history } => {
            run_history(action, &history)?;
        }
        Commands::Extract { many, text } => {
            run_extract(many, &text).await?;
        }
        Commands::Tag { enums, text } => {
            run_tag(enums, &text).await?;
        }
        Commands::Sql { db, mode, question } => {
            run_sql(&db, mode, &question).await?;
        }
        Commands::Demo { name, history, db } => {
            let client = LlmClient::from_env()?;
            let mut out = std::io::stdout();
            match name {
                DemoName::Chatbot => demo::chatbot(&client, &history, &mut out).await?,
                DemoName::Extraction => demo::extraction(&client, &mut out).await?,
                DemoName::Sentiment => demo::sentiment(&client, &mut out).await?,
                DemoName::Sql => {
                    let database = open_database(&db).await?;
                    demo::sql(&client, database, db.top_k, &mut out).await?
                }
            }
        }
    }

    Ok(())
}

async fn run_chat(history: &Path, window: Option<usize>, messages: &[String]) -> Result<()> {
    let client = LlmClient::from_env()?;
    let mut memory = ConversationMemory::new(FileChatHistory::new(history)?);
    if let Some(exchanges) = window {
        memory = memory.with_window(exchanges);
    }
    info!("Using conversation file {:?}", history);

    let mut chain = ConversationChain::new(&client, memory);
    for message in messages {
        let reply = chain.send(message).await?;
        println!("> {}", message);
        println!("{}\n", reply);
    }
    Ok(())
}

fn run_history(action: HistoryAction, path: &Path) -> Result<()> {
    let mut history = FileChatHistory::new(path)?;
    match action {
        HistoryAction::Show => {
            let messages = history.messages()?;
            if messages.is_empty() {
                println!("No messages in {:?}", path);
            }
            for message in messages {
                println!("{}: {}", message.role, message.content);
            }
        }
        HistoryAction::Clear => {
            history.clear()?;
            println!("Cleared {:?}", path);
        }
    }
    Ok(())
}

async fn run_extract(many: bool, text: &str) -> Result<()> {
    let client = LlmClient::from_env()?;
    let value = if many {
        ExtractionChain::<_, People>::new(&client)
            .extract_value(text)
            .await?
    } else {
        ExtractionChain::<_, Person>::new(&client)
            .extract_value(text)
            .await?
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn run_tag(enums: bool, text: &str) -> Result<()> {
    let client = LlmClient::from_env()?;
    let value = if enums {
        TaggingChain::classification_with_enums(&client)
            .tag_value(text)
            .await?
    } else {
        TaggingChain::classification(&client).tag_value(text).await?
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn open_database(args: &DatabaseArgs) -> Result<SqlDatabase> {
    let options = DatabaseOptions {
        allow_writes: args.allow_writes,
        ..DatabaseOptions::default()
    };
    let db = SqlDatabase::connect(&args.database, options).await?;
    info!("Opened {} database at {:?}", db.dialect(), db.path());
    Ok(db)
}

async fn run_sql(args: &DatabaseArgs, mode: SqlMode, question: &str) -> Result<()> {
    let client = LlmClient::from_env()?;
    let db = open_database(args).await?;
    let chain = SqlQueryChain::new(&client, db).with_top_k(args.top_k);

    match mode {
        SqlMode::Query => println!("{}", chain.write_query(question).await?),
        SqlMode::Execute => {
            let (query, result) = chain.write_and_execute(question).await?;
            info!("Executed: {}", query);
            println!("{}", result);
        }
        SqlMode::Answer => {
            let answer = chain.answer(question).await?;
            println!("{}", answer.answer);
        }
    }

    chain.database().close().await;
    Ok(())
}
