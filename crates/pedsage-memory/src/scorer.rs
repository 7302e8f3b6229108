//! Lexical relevance scoring with linear time decay.
//!
//! For a lowercased query and its whitespace-split terms longer than two
//! characters:
//!
//! ```text
//! base  = 10 · [content ⊇ query]
//!       + Σ_terms ( 2 · [content ⊇ term] + 3 · [∃ tag ⊇ term] )
//! score = base · importance · max(0.1, 1 − age_days / 30)
//! ```
//!
//! Entries scoring zero are dropped. Ties keep the caller's order.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::MemoryEntry;

/// Days over which the decay factor falls from 1.0 to [`DECAY_FLOOR`].
pub const DECAY_WINDOW_DAYS: f64 = 30.0;

/// Lower bound of the decay factor.
pub const DECAY_FLOOR: f64 = 0.1;

pub const PHRASE_BONUS: f64 = 10.0;
pub const CONTENT_TERM_BONUS: f64 = 2.0;
pub const TAG_TERM_BONUS: f64 = 3.0;

/// Query terms shorter than this are ignored.
const MIN_TERM_LEN: usize = 3;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A memory entry paired with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMemory {
    pub entry: MemoryEntry,
    pub score: f64,
}

/// Whitespace-split terms of a lowercased query, keeping those longer than
/// two characters.
pub fn query_terms(lowered_query: &str) -> Vec<&str> {
    lowered_query
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TERM_LEN)
        .collect()
}

/// Multiplier in `[DECAY_FLOOR, 1.0]` for an entry created at `timestamp`.
///
/// Timestamps in the future count as age zero.
pub fn decay_factor(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_ms = (now - timestamp).num_milliseconds().max(0) as f64;
    let age_days = age_ms / MILLIS_PER_DAY;
    (1.0 - age_days / DECAY_WINDOW_DAYS).max(DECAY_FLOOR)
}

/// Lexical overlap score before importance and decay.
fn base_score(entry: &MemoryEntry, lowered_query: &str, terms: &[&str]) -> f64 {
    let content = entry.content.to_lowercase();
    let mut score = 0.0;

    if content.contains(lowered_query) {
        score += PHRASE_BONUS;
    }
    for term in terms {
        if content.contains(term) {
            score += CONTENT_TERM_BONUS;
        }
        if entry.tags.iter().any(|tag| tag.contains(term)) {
            score += TAG_TERM_BONUS;
        }
    }
    score
}

/// Relevance of one entry to `query` as of `now`.
pub fn score_entry(entry: &MemoryEntry, query: &str, now: DateTime<Utc>) -> f64 {
    let lowered = query.to_lowercase();
    let terms = query_terms(&lowered);
    base_score(entry, &lowered, &terms) * entry.importance * decay_factor(entry.timestamp, now)
}

/// Score `entries`, drop non-positive scores, and return the top `limit`
/// highest first. Equal scores keep iteration order.
pub fn rank<'a, I>(entries: I, query: &str, limit: usize, now: DateTime<Utc>) -> Vec<ScoredMemory>
where
    I: IntoIterator<Item = &'a MemoryEntry>,
{
    let lowered = query.to_lowercase();
    let terms = query_terms(&lowered);

    let mut scored: Vec<ScoredMemory> = entries
        .into_iter()
        .filter_map(|entry| {
            let score = base_score(entry, &lowered, &terms)
                * entry.importance
                * decay_factor(entry.timestamp, now);
            (score > 0.0).then(|| ScoredMemory {
                entry: entry.clone(),
                score,
            })
        })
        .collect();

    // `sort_by` is stable, so ties stay in iteration order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryCategory;
    use chrono::Duration;

    fn entry(content: &str, age: Duration, now: DateTime<Utc>) -> MemoryEntry {
        MemoryEntry::new(content, MemoryCategory::MedicalFact, 0.8).with_timestamp(now - age)
    }

    #[test]
    fn short_terms_are_dropped() {
        assert_eq!(query_terms("is a fever in an infant"), vec!["fever", "infant"]);
        assert!(query_terms("").is_empty());
    }

    #[test]
    fn decay_is_linear_then_floored() {
        let now = Utc::now();
        assert_eq!(decay_factor(now, now), 1.0);
        let half = decay_factor(now - Duration::days(15), now);
        assert!((half - 0.5).abs() < 1e-9);
        assert_eq!(decay_factor(now - Duration::days(29), now), DECAY_FLOOR);
        assert_eq!(decay_factor(now - Duration::days(400), now), DECAY_FLOOR);
    }

    #[test]
    fn future_timestamps_do_not_boost() {
        let now = Utc::now();
        assert_eq!(decay_factor(now + Duration::days(5), now), 1.0);
    }

    #[test]
    fn full_phrase_and_terms_accumulate() {
        let now = Utc::now();
        let e = entry("Fever management in infants", Duration::zero(), now)
            .with_tags(["infant", "treatment"]);

        // phrase 10 + "fever" content 2 + "management" content 2 = 14
        let score = score_entry(&e, "fever management", now);
        assert!((score - 14.0 * 0.8).abs() < 1e-9);

        // "infant" hits content (2) and tag (3); no phrase match for the full query
        let score = score_entry(&e, "infant dosing", now);
        assert!((score - 5.0 * 0.8).abs() < 1e-9);
    }

    #[test]
    fn tag_match_is_substring_of_tag() {
        let now = Utc::now();
        let e = entry("unrelated words", Duration::zero(), now).with_tags(["cardiology"]);
        let score = score_entry(&e, "cardio", now);
        assert!((score - 3.0 * 0.8).abs() < 1e-9);
    }

    #[test]
    fn fresher_entry_ranks_first() {
        let now = Utc::now();
        let old = entry("asthma inhaler technique", Duration::days(40), now);
        let fresh = entry("asthma inhaler technique", Duration::days(1), now);

        let ranked = rank([&old, &fresh], "asthma inhaler", 10, now);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].entry.id, fresh.id);
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn ancient_entries_keep_the_floor() {
        let now = Utc::now();
        let e = entry("asthma", Duration::days(3650), now);
        let base = PHRASE_BONUS + CONTENT_TERM_BONUS;
        let score = score_entry(&e, "asthma", now);
        assert!((score - base * 0.8 * DECAY_FLOOR).abs() < 1e-9);
        assert!(score > 0.0);
    }

    #[test]
    fn non_matching_entries_are_dropped() {
        let now = Utc::now();
        let e = entry("rash on the arm", Duration::zero(), now);
        assert!(rank([&e], "seizure", 10, now).is_empty());
    }

    #[test]
    fn zero_importance_entries_are_dropped() {
        let now = Utc::now();
        let e = MemoryEntry::new("seizure plan", MemoryCategory::Conversation, 0.0)
            .with_timestamp(now);
        assert!(rank([&e], "seizure", 10, now).is_empty());
    }

    #[test]
    fn ties_keep_insertion_order_and_limit_applies() {
        let now = Utc::now();
        let entries: Vec<_> = (0..5)
            .map(|i| entry(&format!("cough note {i}"), Duration::zero(), now))
            .collect();

        let ranked = rank(&entries, "cough", 3, now);
        let ids: Vec<_> = ranked.iter().map(|s| s.entry.id.as_str()).collect();
        let expected: Vec<_> = entries[..3].iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn blank_query_lists_everything_by_weight() {
        let now = Utc::now();
        let older = entry("one", Duration::days(10), now);
        let newer = entry("two", Duration::zero(), now);

        let ranked = rank([&older, &newer], "", 10, now);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].entry.id, newer.id);
        assert!((ranked[0].score - PHRASE_BONUS * 0.8).abs() < 1e-9);
    }
}
