//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// quizcast: Telegram channel bot that drafts, reviews and publishes daily Python lessons
#[derive(Parser, Debug)]
#[command(name = "quizcast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the bot and the daily schedule
    Run(RunArgs),

    /// One-shot generation for a category, nothing is stored
    Generate(GenerateArgs),

    /// Inspect, prepare or publish drafts without the bot
    Draft(DraftArgs),

    /// Inspect the topic curriculum
    Curriculum(CurriculumArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Write channel posts to the outbox file instead of publishing
    #[arg(long)]
    pub dry_run: bool,

    /// Path to outbox file (used with --dry-run)
    #[arg(long)]
    pub outbox: Option<PathBuf>,

    /// Only serve operator commands, never fire scheduled slots
    #[arg(long)]
    pub no_schedule: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Category to generate (morning, noon, evening, quiz)
    pub category: String,

    /// Topic override for curriculum-linked categories
    #[arg(long)]
    pub topic: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DraftArgs {
    #[command(subcommand)]
    pub command: DraftCommands,
}

#[derive(Subcommand, Debug)]
pub enum DraftCommands {
    /// Show stored drafts
    Show {
        /// Only this category
        category: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate and store a fresh draft, previewed to the operator
    Prepare {
        category: String,

        /// Send the preview to the outbox file instead of Telegram
        #[arg(long)]
        dry_run: bool,

        /// Path to outbox file (used with --dry-run)
        #[arg(long)]
        outbox: Option<PathBuf>,
    },

    /// Publish the stored draft of a category
    Publish {
        category: String,

        /// Send the post to the outbox file instead of the channel
        #[arg(long)]
        dry_run: bool,

        /// Path to outbox file (used with --dry-run)
        #[arg(long)]
        outbox: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct CurriculumArgs {
    #[command(subcommand)]
    pub command: CurriculumCommands,
}

#[derive(Subcommand, Debug)]
pub enum CurriculumCommands {
    /// List topics and mark the one the cursor points at
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Check specific component (config, store, llm, telegram, schedule, curriculum)
    #[arg(long)]
    pub check: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
