use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

pub mod console;
pub mod request;
pub mod threads;
pub mod tools;
pub mod workspace;

use crate::core::AppConfig;
use tools::ToolCommand;
use workspace::Workspace;

#[derive(Subcommand)]
enum Command {
    /// List threads, the active one is marked with *
    Threads {},
    /// Create a new thread and make it active
    New {},
    /// Print every message in a thread
    Show {
        #[arg(long)]
        thread: Option<Uuid>,
    },
    /// Make a thread the active one
    Use { thread: Uuid },
    /// Rename a thread
    Rename {
        name: String,
        #[arg(long)]
        thread: Option<Uuid>,
    },
    /// Delete a thread
    Delete { thread: Uuid },
    /// Edit the message at an index
    Set {
        #[arg(long)]
        thread: Option<Uuid>,
        #[arg(long)]
        index: usize,
        /// Content block to edit for AI messages
        #[arg(long, default_value = "0")]
        block: usize,
        value: String,
    },
    /// Remove every message after an index
    Truncate {
        #[arg(long)]
        thread: Option<Uuid>,
        #[arg(long)]
        index: usize,
    },
    /// Request the model at a model choice (defaults to the last one)
    Request {
        #[arg(long)]
        thread: Option<Uuid>,
        #[arg(long)]
        index: Option<usize>,
    },
    /// Copy a thread up to a model choice and request it in the copy
    Resend {
        #[arg(long)]
        thread: Option<Uuid>,
        #[arg(long)]
        index: usize,
    },
    /// Write a thread to a JSON file
    Export {
        #[arg(long)]
        thread: Option<Uuid>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import a thread from a JSON file
    Import { file: PathBuf },
    /// List the models that can be chosen
    Models {},
    /// Manage the tool catalog
    Tool {
        #[command(subcommand)]
        command: ToolCommand,
    },
    /// Interactive session on a thread
    Console {
        #[arg(long)]
        thread: Option<Uuid>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let workspace = Workspace::open(AppConfig::default())?;

    // Handle each sub command
    match args.command {
        Some(Command::Threads {}) => threads::list(&workspace),
        Some(Command::New {}) => threads::create(&workspace)?,
        Some(Command::Show { thread }) => threads::show(&workspace, thread)?,
        Some(Command::Use { thread }) => threads::activate(&workspace, thread)?,
        Some(Command::Rename { name, thread }) => threads::rename(&workspace, thread, &name)?,
        Some(Command::Delete { thread }) => threads::delete(&workspace, thread)?,
        Some(Command::Set {
            thread,
            index,
            block,
            value,
        }) => threads::set(&workspace, thread, index, block, &value)?,
        Some(Command::Truncate { thread, index }) => threads::truncate(&workspace, thread, index)?,
        Some(Command::Request { thread, index }) => {
            request::run(&workspace, thread, index).await?;
        }
        Some(Command::Resend { thread, index }) => {
            request::resend(&workspace, thread, index).await?;
        }
        Some(Command::Export { thread, out }) => threads::export(&workspace, thread, out)?,
        Some(Command::Import { file }) => threads::import(&workspace, file)?,
        Some(Command::Models {}) => {
            for (i, id) in workspace.registry.ids().iter().enumerate() {
                let marker = if i == 0 { "*" } else { " " };
                println!("{} {}", marker, id);
            }
        }
        Some(Command::Tool { command }) => tools::run(&workspace, command)?,
        Some(Command::Console { thread }) => console::run(&workspace, thread).await?,
        None => {}
    }

    Ok(())
}
