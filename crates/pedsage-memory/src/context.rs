//! Prompt context handed to the model-call collaborator.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoryResult;
use crate::types::ConversationMessage;

/// One ranked passage returned by the reference corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusExcerpt {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub score: f64,
}

impl CorpusExcerpt {
    pub fn new(text: impl Into<String>, score: f64) -> Self {
        Self {
            text: text.into(),
            chapter: None,
            section: None,
            score,
        }
    }
}

/// External reference-text search. Independent of the memory scorer.
#[async_trait]
pub trait CorpusSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> MemoryResult<Vec<CorpusExcerpt>>;
}

/// Everything the memory core contributes to the next model call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromptContext {
    pub corpus_excerpts: Vec<CorpusExcerpt>,
    /// Session summary first (when present), then ranked memory contents.
    pub memories: Vec<String>,
    /// Trailing window of the current session, oldest first.
    pub recent_messages: Vec<ConversationMessage>,
}

impl PromptContext {
    pub fn is_empty(&self) -> bool {
        self.corpus_excerpts.is_empty() && self.memories.is_empty() && self.recent_messages.is_empty()
    }

    /// Render as markdown sections. Empty sections are omitted.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.corpus_excerpts.is_empty() {
            out.push_str("## Reference excerpts\n\n");
            for excerpt in &self.corpus_excerpts {
                let location = match (&excerpt.chapter, &excerpt.section) {
                    (Some(c), Some(s)) => format!(" ({c} / {s})"),
                    (Some(c), None) => format!(" ({c})"),
                    (None, Some(s)) => format!(" ({s})"),
                    (None, None) => String::new(),
                };
                let _ = writeln!(out, "-{location} {}", excerpt.text);
            }
            out.push('\n');
        }

        if !self.memories.is_empty() {
            out.push_str("## Remembered context\n\n");
            for memory in &self.memories {
                let _ = writeln!(out, "- {memory}");
            }
            out.push('\n');
        }

        if !self.recent_messages.is_empty() {
            out.push_str("## Recent conversation\n\n");
            for message in &self.recent_messages {
                let _ = writeln!(out, "{}: {}", message.role, message.content);
            }
            out.push('\n');
        }

        out.truncate(out.trim_end().len());
        out
    }
}
