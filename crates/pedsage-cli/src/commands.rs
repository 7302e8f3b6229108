//! One-shot subcommands.

use std::io::{self, BufRead, Write as _};

use anyhow::{Context, Result};
use pedsage_memory::{MemoryCategory, MemoryManager, Role};

use crate::config::PedsageConfig;
use crate::helpers::{print_history, print_scored, print_stats};

pub async fn cmd_add(memory: &mut MemoryManager, role: &str, text: &str) -> Result<()> {
    let role: Role = role.parse()?;
    let ids = memory.add_message(role, text).await;
    let session = memory.current_session_id().unwrap_or("-");
    println!("Recorded {role} message in session {session}.");
    for id in &ids {
        if let Some(entry) = memory.memory(id) {
            println!("  + {} {}", entry.category, entry.id);
        }
    }
    Ok(())
}

pub async fn cmd_remember(
    memory: &mut MemoryManager,
    category: &str,
    tags: &[String],
    text: &str,
) -> Result<()> {
    let category: MemoryCategory = category.parse()?;
    let id = memory.remember(text, category, tags).await;
    let session = memory.current_session_id().unwrap_or("-");
    println!("Remembered {category} {id} in session {session}.");
    Ok(())
}

pub fn cmd_search(memory: &MemoryManager, query: &str, limit: usize, json: bool) -> Result<()> {
    let results = memory.search_scored(query, limit);
    if json {
        let out = serde_json::to_string_pretty(&results).context("failed to encode results")?;
        println!("{out}");
    } else {
        print_scored(&results);
    }
    Ok(())
}

pub fn cmd_recall(config: &PedsageConfig, memory: &MemoryManager, query: &str) {
    let context = memory.build_context(query, Vec::new(), config.memory.context_window);
    if context.is_empty() {
        println!("No remembered context for this question.");
    } else {
        println!("{}", context.render());
    }
}

pub fn cmd_stats(memory: &MemoryManager) -> Result<()> {
    print_stats(&memory.get_memory_stats())
}

pub fn cmd_history(memory: &MemoryManager, json: bool) -> Result<()> {
    let sessions = memory.get_conversation_history();
    if json {
        let out = serde_json::to_string_pretty(&sessions).context("failed to encode sessions")?;
        println!("{out}");
    } else {
        print_history(&sessions, memory.current_session_id());
    }
    Ok(())
}

pub async fn cmd_clear(memory: &mut MemoryManager, yes: bool) -> Result<()> {
    let stats = memory.get_memory_stats();
    if !yes {
        print!(
            "Delete {} memories and {} sessions? [y/N] ",
            stats.total_memories, stats.total_conversations
        );
        io::stdout().flush().ok();

        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("failed to read confirmation")?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    memory.clear_memories().await;
    println!(
        "Deleted {} memories and {} sessions.",
        stats.total_memories, stats.total_conversations
    );
    Ok(())
}

pub fn cmd_status(config: &PedsageConfig, memory: &MemoryManager) {
    let stats = memory.get_memory_stats();

    println!();
    println!("  pedsage v{}", env!("CARGO_PKG_VERSION"));
    println!();
    if config.storage.ephemeral {
        println!("  Storage:   in-memory (ephemeral)");
    } else {
        println!("  Storage:   {}", config.storage.path.display());
    }
    println!("  Key:       {}", memory.storage_key());
    println!("  Memories:  {}", stats.total_memories);
    for (category, count) in &stats.categories {
        println!("    {:<16} {count}", category.as_str());
    }
    println!("  Sessions:  {}", stats.total_conversations);
    match memory.current_session() {
        Some(session) => println!(
            "  Current:   {} ({} messages)",
            session.session_id,
            session.messages.len()
        ),
        None => println!("  Current:   none"),
    }
    println!();
}
