//! # pedsage-memory
//!
//! Session memory and relevance retrieval for the pedsage chat assistant.
//!
//! Every chat message passes through a [`ContentClassifier`] that turns it
//! into zero or more categorized [`MemoryEntry`] values. Entries and sessions
//! live in the [`MemoryManager`], which mirrors its whole state into a
//! [`KvStore`](pedsage_store::KvStore) blob after each mutation. Before the
//! next model call the host asks for the memories relevant to the new query
//! and splices them into the prompt.
//!
//! ```text
//!   add_message ──► classifier ──► entries ─┐
//!        │                                  ▼
//!        └────────► session ───► MemoryManager ──► KvStore (JSON snapshot)
//!                                           │
//!   get_relevant_memories ◄── scorer ◄──────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use pedsage_memory::{MemoryManager, Role};
//! use pedsage_store::InMemoryKvStore;
//!
//! let mut memory = MemoryManager::open(Arc::new(InMemoryKvStore::new())).await;
//! memory.add_message(Role::User, "I prefer weight-based dosing").await;
//! let context = memory.get_relevant_memories("dosing");
//! ```

pub mod context;
pub mod error;
pub mod extractor;
pub mod manager;
pub mod rules;
pub mod scorer;
pub mod snapshot;
pub mod summary;
pub mod types;

// ── re-exports ───────────────────────────────────────────────────────

pub use context::{CorpusExcerpt, CorpusSearch, PromptContext};
pub use error::{MemoryError, MemoryResult};
pub use extractor::{ContentClassifier, KeywordExtractor};
pub use manager::{DEFAULT_SEARCH_LIMIT, DEFAULT_STORAGE_KEY, MemoryManager, RELEVANT_MEMORY_LIMIT};
pub use scorer::ScoredMemory;
pub use snapshot::{MemorySnapshot, SNAPSHOT_VERSION};
pub use types::{
    ConversationMemory, ConversationMessage, EntryMetadata, MemoryCategory, MemoryEntry,
    MemorySource, MemoryStats, Role,
};
