//! Rolling session summary.

use std::collections::BTreeSet;

use tracing::debug;

use crate::rules::TOPIC_VOCABULARY;
use crate::types::{ConversationMemory, ConversationMessage};

/// The summary is recomputed after every `SUMMARY_INTERVAL`-th message.
pub const SUMMARY_INTERVAL: usize = 10;

/// Number of trailing messages the summary sentence is built from.
pub const SUMMARY_WINDOW: usize = 10;

/// Whether appending the `message_count`-th message triggers a recompute.
pub fn should_summarize(message_count: usize) -> bool {
    message_count > 0 && message_count % SUMMARY_INTERVAL == 0
}

/// Condition keywords mentioned anywhere in `messages`.
pub fn key_topics(messages: &[ConversationMessage]) -> BTreeSet<String> {
    let text = messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    TOPIC_VOCABULARY
        .find_all(&text)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Summary sentence for a set of topics.
pub fn render_summary(topics: &BTreeSet<String>) -> String {
    if topics.is_empty() {
        "Recent discussion covered no specific conditions.".to_string()
    } else {
        let list = topics.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        format!("Recent discussion covered: {list}.")
    }
}

/// Rebuild `summary` from the recent window and `key_topics` from the whole
/// history.
pub fn recompute(session: &mut ConversationMemory) {
    let recent = key_topics(session.recent(SUMMARY_WINDOW));
    session.summary = render_summary(&recent);
    session.key_topics = key_topics(&session.messages);
    debug!(
        session_id = %session.session_id,
        messages = session.messages.len(),
        topics = session.key_topics.len(),
        "session summary recomputed"
    );
}
