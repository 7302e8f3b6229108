//! CLI entry point for pedsage.
//!
//! This binary provides the `pedsage` command: an interactive chat REPL plus
//! one-shot subcommands for recording messages and inspecting memory.

mod cli;
mod commands;
mod config;
mod helpers;
mod repl;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::PedsageConfig;
use crate::helpers::{init_tracing, open_manager, open_store};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let mut config = PedsageConfig::load(cli.config.as_deref())?;
    config.apply_env();
    if cli.ephemeral {
        config.storage.ephemeral = true;
    }

    init_tracing(&config.log);
    info!(ephemeral = config.storage.ephemeral, key = %config.storage.key, "starting pedsage");

    let store = open_store(&config).await?;
    let mut memory = open_manager(&config, store).await;

    match cli.command {
        Commands::Chat => repl::cmd_chat(&config, memory).await,
        Commands::Add { role, text } => commands::cmd_add(&mut memory, &role, &text.join(" ")).await,
        Commands::Remember {
            category,
            tag,
            text,
        } => commands::cmd_remember(&mut memory, &category, &tag, &text.join(" ")).await,
        Commands::Search { query, limit, json } => commands::cmd_search(
            &memory,
            &query.join(" "),
            limit.unwrap_or(config.memory.search_limit),
            json,
        ),
        Commands::Recall { query } => {
            commands::cmd_recall(&config, &memory, &query.join(" "));
            Ok(())
        }
        Commands::Stats => commands::cmd_stats(&memory),
        Commands::History { json } => commands::cmd_history(&memory, json),
        Commands::Clear { yes } => commands::cmd_clear(&mut memory, yes).await,
        Commands::Status => {
            commands::cmd_status(&config, &memory);
            Ok(())
        }
    }
}
