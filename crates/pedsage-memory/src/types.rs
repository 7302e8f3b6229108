//! Memory data model.
//!
//! Entries and sessions reference each other only by id: a
//! [`ConversationMessage`] lists the [`MemoryEntry`] ids it produced, and an
//! entry never points back at its session.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MemoryError;

// ═══════════════════════════════════════════════════════════════════════
//  Enumerations
// ═══════════════════════════════════════════════════════════════════════

/// The category of a memory entry. Exactly one per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    MedicalFact,
    CaseContext,
    UserPreference,
    ClinicalRule,
    Conversation,
}

impl MemoryCategory {
    /// Every category, in declaration order.
    pub const ALL: [MemoryCategory; 5] = [
        Self::MedicalFact,
        Self::CaseContext,
        Self::UserPreference,
        Self::ClinicalRule,
        Self::Conversation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MedicalFact => "medical_fact",
            Self::CaseContext => "case_context",
            Self::UserPreference => "user_preference",
            Self::ClinicalRule => "clinical_rule",
            Self::Conversation => "conversation",
        }
    }

    /// Importance assigned to entries of this category at creation.
    pub fn default_importance(self) -> f64 {
        match self {
            Self::MedicalFact => 0.8,
            Self::CaseContext => 0.7,
            Self::UserPreference => 0.9,
            Self::ClinicalRule => 0.85,
            Self::Conversation => 0.5,
        }
    }
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryCategory {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| MemoryError::UnknownCategory(s.to_string()))
    }
}

/// Where a memory entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    /// The reference textbook corpus.
    Nelson,
    /// Derived from conversation content.
    Conversation,
    /// Stated directly by the user.
    UserInput,
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(MemoryError::UnknownRole(s.to_string())),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Memory entries
// ═══════════════════════════════════════════════════════════════════════

/// Optional structured hints attached to an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MemorySource>,
}

/// A single categorized fact or context snippet derived from one message.
///
/// Entries are immutable once created; the only way to remove them is a
/// bulk clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// Verbatim text of the source message.
    pub content: String,
    pub category: MemoryCategory,
    /// Fixed at creation, in `[0, 1]`.
    pub importance: f64,
    pub timestamp: DateTime<Utc>,
    /// Lowercase keywords found in `content`.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub metadata: EntryMetadata,
}

impl MemoryEntry {
    /// Create an entry stamped with a fresh id and the current time.
    pub fn new(content: impl Into<String>, category: MemoryCategory, importance: f64) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            content: content.into(),
            category,
            importance: importance.clamp(0.0, 1.0),
            timestamp: Utc::now(),
            tags: BTreeSet::new(),
            metadata: EntryMetadata::default(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags.into_iter().map(|t| t.as_ref().to_lowercase()).collect();
        self
    }

    pub fn with_metadata(mut self, metadata: EntryMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Override the creation time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Sessions
// ═══════════════════════════════════════════════════════════════════════

/// One appended chat message and the memory ids extracted from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub memory_ids: Vec<String>,
}

/// One continuous conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMemory {
    pub session_id: String,
    /// Append-only, in arrival order.
    pub messages: Vec<ConversationMessage>,
    /// Rolling summary; empty until the first recompute.
    #[serde(default)]
    pub summary: String,
    /// Condition keywords seen anywhere in the session.
    #[serde(default)]
    pub key_topics: BTreeSet<String>,
    pub start_time: DateTime<Utc>,
    /// Never moves backwards.
    pub last_activity: DateTime<Utc>,
}

impl ConversationMemory {
    /// Start an empty session with a fresh id.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::now_v7().to_string(),
            messages: Vec::new(),
            summary: String::new(),
            key_topics: BTreeSet::new(),
            start_time: now,
            last_activity: now,
        }
    }

    /// Append a message and advance `last_activity`.
    pub fn push(&mut self, message: ConversationMessage) {
        if message.timestamp > self.last_activity {
            self.last_activity = message.timestamp;
        }
        self.messages.push(message);
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> &[ConversationMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Stats
// ═══════════════════════════════════════════════════════════════════════

/// Counts over the whole store. Categories with no entries are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_memories: usize,
    pub total_conversations: usize,
    pub categories: BTreeMap<MemoryCategory, usize>,
}
