//! The memory facade.
//!
//! [`MemoryManager`] owns the in-process state (entries and sessions, both
//! in insertion order) and mirrors it to a [`KvStore`] blob after every
//! mutation. Reads never touch the store.
//!
//! No public operation returns an error. Persistence and corpus failures are
//! logged at `warn` and the call carries on with in-memory state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pedsage_store::KvStore;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::context::{CorpusExcerpt, CorpusSearch, PromptContext};
use crate::error::MemoryResult;
use crate::extractor::{ContentClassifier, KeywordExtractor};
use crate::scorer::{self, ScoredMemory};
use crate::snapshot::{MemorySnapshot, SNAPSHOT_VERSION};
use crate::summary;
use crate::types::{
    ConversationMemory, ConversationMessage, EntryMetadata, MemoryCategory, MemoryEntry,
    MemorySource, MemoryStats, Role,
};

/// Key the snapshot blob is stored under unless overridden.
pub const DEFAULT_STORAGE_KEY: &str = "pedsage-memory";

/// Ranked memories returned by [`MemoryManager::get_relevant_memories`].
pub const RELEVANT_MEMORY_LIMIT: usize = 5;

/// Default `limit` for [`MemoryManager::search_memories`] callers.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

// ═══════════════════════════════════════════════════════════════════════
//  In-process state
// ═══════════════════════════════════════════════════════════════════════

/// Entries and sessions keyed by id, iterated in insertion order.
#[derive(Debug, Default)]
struct MemoryState {
    entries: Vec<MemoryEntry>,
    entry_index: HashMap<String, usize>,
    sessions: Vec<ConversationMemory>,
    session_index: HashMap<String, usize>,
    current_session_id: Option<String>,
}

impl MemoryState {
    /// Insert or, for a known id, replace in place. Replacement only
    /// happens when a snapshot repeats an id.
    fn insert_entry(&mut self, entry: MemoryEntry) {
        match self.entry_index.get(&entry.id) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.entry_index.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    fn insert_session(&mut self, session: ConversationMemory) {
        match self.session_index.get(&session.session_id) {
            Some(&pos) => self.sessions[pos] = session,
            None => {
                self.session_index
                    .insert(session.session_id.clone(), self.sessions.len());
                self.sessions.push(session);
            }
        }
    }

    fn session(&self, id: &str) -> Option<&ConversationMemory> {
        self.session_index.get(id).map(|&pos| &self.sessions[pos])
    }

    fn session_mut(&mut self, id: &str) -> Option<&mut ConversationMemory> {
        self.session_index
            .get(id)
            .copied()
            .map(move |pos| &mut self.sessions[pos])
    }

    fn current_session(&self) -> Option<&ConversationMemory> {
        self.current_session_id
            .as_deref()
            .and_then(|id| self.session(id))
    }

    fn from_snapshot(snapshot: MemorySnapshot) -> Self {
        let mut state = Self::default();
        for (id, mut entry) in snapshot.memories {
            entry.id = id;
            state.insert_entry(entry);
        }
        for (id, mut session) in snapshot.conversations {
            session.session_id = id;
            state.insert_session(session);
        }
        state.current_session_id = snapshot
            .current_session_id
            .filter(|id| state.session_index.contains_key(id));
        state
    }

    fn to_snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            version: SNAPSHOT_VERSION,
            memories: self
                .entries
                .iter()
                .map(|e| (e.id.clone(), e.clone()))
                .collect(),
            conversations: self
                .sessions
                .iter()
                .map(|s| (s.session_id.clone(), s.clone()))
                .collect(),
            current_session_id: self.current_session_id.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  MemoryManager
// ═══════════════════════════════════════════════════════════════════════

/// Session memory and relevance retrieval for one chat host.
///
/// Construct once at startup and pass it to whatever drives the chat.
pub struct MemoryManager {
    store: Arc<dyn KvStore>,
    classifier: Box<dyn ContentClassifier>,
    storage_key: String,
    relevant_limit: usize,
    state: MemoryState,
}

impl MemoryManager {
    /// Empty manager using the keyword extractor. Call [`load`](Self::load)
    /// to pick up persisted state.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_classifier(store, Box::new(KeywordExtractor::new()))
    }

    /// Empty manager using a custom classifier.
    pub fn with_classifier(store: Arc<dyn KvStore>, classifier: Box<dyn ContentClassifier>) -> Self {
        Self {
            store,
            classifier,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            relevant_limit: RELEVANT_MEMORY_LIMIT,
            state: MemoryState::default(),
        }
    }

    /// Store the snapshot under `key` instead of [`DEFAULT_STORAGE_KEY`].
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Number of ranked memories [`get_relevant_memories`](Self::get_relevant_memories) returns.
    pub fn with_relevant_limit(mut self, limit: usize) -> Self {
        self.relevant_limit = limit;
        self
    }

    /// [`new`](Self::new) followed by [`load`](Self::load).
    pub async fn open(store: Arc<dyn KvStore>) -> Self {
        let mut manager = Self::new(store);
        manager.load().await;
        manager
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    // ── persistence ──────────────────────────────────────────────────

    /// Replace in-process state with the persisted snapshot.
    ///
    /// A missing, corrupt or newer-format blob leaves the manager empty.
    #[instrument(skip(self), fields(key = %self.storage_key))]
    pub async fn load(&mut self) {
        self.state = match self.read_snapshot().await {
            Ok(Some(snapshot)) => MemoryState::from_snapshot(snapshot),
            Ok(None) => {
                debug!("no persisted memory state");
                MemoryState::default()
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable memory state");
                MemoryState::default()
            }
        };
        info!(
            memories = self.state.entries.len(),
            sessions = self.state.sessions.len(),
            "memory state loaded"
        );
    }

    async fn read_snapshot(&self) -> MemoryResult<Option<MemorySnapshot>> {
        match self.store.get(&self.storage_key).await? {
            Some(raw) => Ok(Some(MemorySnapshot::from_json(&raw)?)),
            None => Ok(None),
        }
    }

    /// Current state in its persisted form.
    pub fn snapshot(&self) -> MemorySnapshot {
        self.state.to_snapshot()
    }

    async fn write_snapshot(&self) -> MemoryResult<usize> {
        let json = self.state.to_snapshot().to_json()?;
        self.store.set(&self.storage_key, &json).await?;
        Ok(json.len())
    }

    async fn persist(&self) {
        match self.write_snapshot().await {
            Ok(bytes) => debug!(key = %self.storage_key, bytes, "memory snapshot saved"),
            Err(e) => warn!(key = %self.storage_key, error = %e, "failed to persist memory state"),
        }
    }

    // ── sessions ─────────────────────────────────────────────────────

    fn open_session(&mut self, now: DateTime<Utc>) -> String {
        let session = ConversationMemory::new(now);
        let id = session.session_id.clone();
        self.state.insert_session(session);
        self.state.current_session_id = Some(id.clone());
        debug!(session_id = %id, "session started");
        id
    }

    /// Begin a new session and make it current. Earlier sessions are kept.
    #[instrument(skip(self))]
    pub async fn start_session(&mut self) -> String {
        let id = self.open_session(Utc::now());
        self.persist().await;
        id
    }

    /// Record a chat message in the current session, starting one if needed.
    ///
    /// Returns the ids of the memory entries extracted from `content`.
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub async fn add_message(&mut self, role: Role, content: &str) -> Vec<String> {
        let entries = self.classifier.extract(content, role);
        let memory_ids = self.record_message(role, content, entries, Utc::now());
        self.persist().await;
        memory_ids
    }

    /// Store `entries` and append the message that owns them.
    ///
    /// Entries are immutable once stored: an id that is already taken gets
    /// a fresh one instead of overwriting the earlier entry.
    fn record_message(
        &mut self,
        role: Role,
        content: &str,
        entries: Vec<MemoryEntry>,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let session_id = match self.state.current_session_id.clone() {
            Some(id) => id,
            None => self.open_session(now),
        };

        let mut memory_ids = Vec::with_capacity(entries.len());
        for mut entry in entries {
            if self.state.entry_index.contains_key(&entry.id) {
                let fresh = Uuid::now_v7().to_string();
                warn!(taken = %entry.id, id = %fresh, "memory id already stored; re-keying entry");
                entry.id = fresh;
            }
            memory_ids.push(entry.id.clone());
            self.state.insert_entry(entry);
        }

        if let Some(session) = self.state.session_mut(&session_id) {
            session.push(ConversationMessage {
                role,
                content: content.to_string(),
                timestamp: now,
                memory_ids: memory_ids.clone(),
            });
            if summary::should_summarize(session.messages.len()) {
                summary::recompute(session);
            }
        }
        memory_ids
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.state.current_session_id.as_deref()
    }

    pub fn current_session(&self) -> Option<&ConversationMemory> {
        self.state.current_session()
    }

    pub fn session(&self, id: &str) -> Option<&ConversationMemory> {
        self.state.session(id)
    }

    /// All sessions, most recently active first.
    pub fn get_conversation_history(&self) -> Vec<&ConversationMemory> {
        let mut sessions: Vec<&ConversationMemory> = self.state.sessions.iter().collect();
        sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        sessions
    }

    // ── entries ──────────────────────────────────────────────────────

    /// Record an entry by hand, bypassing the classifier.
    ///
    /// The text is logged as a user message in the current session (started
    /// if needed) and that message owns the new entry.
    #[instrument(skip(self, content, tags))]
    pub async fn remember<I, S>(&mut self, content: &str, category: MemoryCategory, tags: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let now = Utc::now();
        let entry = MemoryEntry::new(content, category, category.default_importance())
            .with_tags(tags)
            .with_timestamp(now)
            .with_metadata(EntryMetadata {
                source: Some(MemorySource::UserInput),
                ..EntryMetadata::default()
            });
        let mut ids = self.record_message(Role::User, content, vec![entry], now);
        self.persist().await;
        ids.pop().unwrap_or_default()
    }

    pub fn memory(&self, id: &str) -> Option<&MemoryEntry> {
        self.state
            .entry_index
            .get(id)
            .map(|&pos| &self.state.entries[pos])
    }

    /// Entries of one category in insertion order.
    pub fn memories_by_category(&self, category: MemoryCategory) -> Vec<&MemoryEntry> {
        self.state
            .entries
            .iter()
            .filter(|e| e.category == category)
            .collect()
    }

    /// Empty both maps and drop the current session pointer.
    #[instrument(skip(self))]
    pub async fn clear_memories(&mut self) {
        let cleared = self.state.entries.len();
        self.state = MemoryState::default();
        info!(cleared, "memory cleared");
        self.persist().await;
    }

    // ── retrieval ────────────────────────────────────────────────────

    /// Ranked entries with their scores, as of `now`.
    pub fn search_scored_at(&self, query: &str, limit: usize, now: DateTime<Utc>) -> Vec<ScoredMemory> {
        scorer::rank(&self.state.entries, query, limit, now)
    }

    pub fn search_scored(&self, query: &str, limit: usize) -> Vec<ScoredMemory> {
        self.search_scored_at(query, limit, Utc::now())
    }

    /// Up to `limit` entries ranked by relevance to `query`.
    pub fn search_memories(&self, query: &str, limit: usize) -> Vec<MemoryEntry> {
        self.search_scored(query, limit)
            .into_iter()
            .map(|s| s.entry)
            .collect()
    }

    /// Memory strings for the next prompt: the current session summary
    /// (if any) followed by the top ranked entry contents.
    pub fn get_relevant_memories(&self, query: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(self.relevant_limit + 1);
        if let Some(session) = self.state.current_session()
            && !session.summary.is_empty()
        {
            out.push(session.summary.clone());
        }
        out.extend(
            self.search_scored(query, self.relevant_limit)
                .into_iter()
                .map(|s| s.entry.content),
        );
        out
    }

    pub fn get_memory_stats(&self) -> MemoryStats {
        let mut categories = BTreeMap::new();
        for entry in &self.state.entries {
            *categories.entry(entry.category).or_insert(0) += 1;
        }
        MemoryStats {
            total_memories: self.state.entries.len(),
            total_conversations: self.state.sessions.len(),
            categories,
        }
    }

    // ── prompt context ───────────────────────────────────────────────

    /// Bundle corpus excerpts, relevant memories and the last `window`
    /// messages of the current session.
    pub fn build_context(
        &self,
        query: &str,
        corpus_excerpts: Vec<CorpusExcerpt>,
        window: usize,
    ) -> PromptContext {
        let recent_messages = self
            .state
            .current_session()
            .map(|s| s.recent(window).to_vec())
            .unwrap_or_default();
        PromptContext {
            corpus_excerpts,
            memories: self.get_relevant_memories(query),
            recent_messages,
        }
    }

    /// Like [`build_context`](Self::build_context), querying `corpus` first.
    /// A failing corpus contributes no excerpts.
    #[instrument(skip(self, corpus))]
    pub async fn build_context_with(
        &self,
        corpus: &dyn CorpusSearch,
        query: &str,
        corpus_limit: usize,
        window: usize,
    ) -> PromptContext {
        let excerpts = match corpus.search(query, corpus_limit).await {
            Ok(excerpts) => excerpts,
            Err(e) => {
                warn!(error = %e, "corpus search failed; continuing without excerpts");
                Vec::new()
            }
        };
        self.build_context(query, excerpts, window)
    }
}
