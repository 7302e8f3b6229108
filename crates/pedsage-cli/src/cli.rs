//! CLI argument definitions for pedsage.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// pedsage -- session memory for a pediatric chat assistant.
#[derive(Parser)]
#[command(
    name = "pedsage",
    version,
    about = "pedsage -- session memory for a pediatric chat assistant",
    long_about = "Records chat turns, extracts categorized clinical memories, and returns \
                  the memories most relevant to the next question."
)]
pub struct Cli {
    /// Configuration file (defaults to config/default.toml).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Keep all state in memory for this run; nothing is written to disk.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive chat session.
    Chat,

    /// Record one message in the current session.
    Add {
        /// Message author: user or assistant.
        #[arg(long, short, default_value = "user")]
        role: String,
        /// Message text.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Record a memory by hand, logged as a user message in the current session.
    Remember {
        /// medical_fact, case_context, user_preference, clinical_rule or conversation.
        #[arg(long, short = 'k', default_value = "clinical_rule")]
        category: String,
        /// Tag to attach (repeatable).
        #[arg(long, short)]
        tag: Vec<String>,
        /// Memory text.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Rank stored memories against a query.
    Search {
        /// Search query.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Maximum number of results (defaults to memory.search_limit).
        #[arg(long, short)]
        limit: Option<usize>,
        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the prompt context that would accompany a question.
    Recall {
        /// The question.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Print memory counts as JSON.
    Stats,

    /// List sessions, most recently active first.
    History {
        /// Print sessions as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete all memories and sessions.
    Clear {
        /// Do not ask for confirmation.
        #[arg(long, short)]
        yes: bool,
    },

    /// Show configuration and storage status.
    Status,
}
