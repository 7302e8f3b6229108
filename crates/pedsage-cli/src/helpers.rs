//! Shared helper functions used across CLI subcommands.
//!
//! Tracing initialization, store bootstrap, and plain-text rendering of
//! memory results.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use pedsage_memory::{ConversationMemory, MemoryManager, MemoryStats, ScoredMemory};
use pedsage_store::{Database, InMemoryKvStore, KvStore, SqliteKvStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat, PedsageConfig};

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber. `RUST_LOG` overrides `log.level`.
pub fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match log.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

// ---------------------------------------------------------------------------
// Store bootstrap
// ---------------------------------------------------------------------------

/// Open the configured key-value store.
pub async fn open_store(config: &PedsageConfig) -> Result<Arc<dyn KvStore>> {
    if config.storage.ephemeral {
        info!("using ephemeral in-memory store");
        return Ok(Arc::new(InMemoryKvStore::new()));
    }

    let path = &config.storage.path;
    let db = Database::open_and_migrate(path.clone())
        .await
        .with_context(|| format!("failed to open database {}", path.display()))?;
    info!(path = %path.display(), "store initialized");
    Ok(Arc::new(SqliteKvStore::new(db)))
}

/// Build a [`MemoryManager`] over `store` and load its persisted state.
pub async fn open_manager(config: &PedsageConfig, store: Arc<dyn KvStore>) -> MemoryManager {
    let mut manager = MemoryManager::new(store)
        .with_storage_key(config.storage.key.clone())
        .with_relevant_limit(config.memory.relevant_limit);
    manager.load().await;
    manager
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Local wall-clock time, minute precision.
pub fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Collapse whitespace and cut `text` to at most `max` characters.
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

pub fn print_scored(results: &[ScoredMemory]) {
    if results.is_empty() {
        println!("  No matching memories.");
        return;
    }
    for (rank, scored) in results.iter().enumerate() {
        let entry = &scored.entry;
        println!(
            "  {:>2}. [{:>6.2}] {:<16} {}",
            rank + 1,
            scored.score,
            entry.category.as_str(),
            preview(&entry.content, 72)
        );
        if !entry.tags.is_empty() {
            let tags: Vec<&str> = entry.tags.iter().map(String::as_str).collect();
            println!("      tags: {}", tags.join(", "));
        }
    }
}

pub fn print_stats(stats: &MemoryStats) -> Result<()> {
    let json = serde_json::to_string_pretty(stats).context("failed to encode stats")?;
    println!("{json}");
    Ok(())
}

pub fn print_history(sessions: &[&ConversationMemory], current: Option<&str>) {
    if sessions.is_empty() {
        println!("  No sessions yet.");
        return;
    }
    for session in sessions {
        let marker = if current == Some(session.session_id.as_str()) { "*" } else { " " };
        println!(
            "{marker} {}  {} messages  last active {}",
            session.session_id,
            session.messages.len(),
            local_time(session.last_activity)
        );
        if !session.summary.is_empty() {
            println!("    {}", session.summary);
        }
    }
}
