//! Entry extraction: chat message → categorized memory entries.
//!
//! [`ContentClassifier`] is the seam; [`KeywordExtractor`] is the built-in
//! implementation driven by the tables in [`crate::rules`]. Extraction never
//! fails: text that matches nothing yields no entries.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::rules::{
    AGE_STAGE_TERMS, CATEGORY_RULES, CATEGORY_TRIGGERS, DEFAULT_SPECIALTY, Enrichment,
    SPECIALTY_RULES, TAG_VOCABULARY,
};
use crate::types::{EntryMetadata, MemoryEntry, Role};

/// Turns one chat message into zero or more memory entries.
///
/// Implementations must be deterministic for a given input and clock and
/// must not perform I/O.
pub trait ContentClassifier: Send + Sync {
    fn extract(&self, content: &str, role: Role) -> Vec<MemoryEntry>;
}

/// Keyword-heuristic classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract with an explicit creation time for every emitted entry.
    pub fn extract_at(&self, content: &str, role: Role, now: DateTime<Utc>) -> Vec<MemoryEntry> {
        let lowered = content.to_lowercase();
        let mut tags: Option<BTreeSet<String>> = None;
        let mut entries = Vec::new();

        for (rule, triggers) in CATEGORY_RULES.iter().zip(CATEGORY_TRIGGERS.iter()) {
            if rule.role.is_some_and(|r| r != role) || !triggers.contains_any(&lowered) {
                continue;
            }

            let mut metadata = EntryMetadata {
                source: Some(rule.source),
                ..EntryMetadata::default()
            };
            match rule.enrichment {
                Enrichment::Specialty => {
                    metadata.medical_specialty = Some(infer_specialty(content).to_string());
                }
                Enrichment::PatientAge => metadata.patient_age = extract_patient_age(content),
                Enrichment::None => {}
            }

            let tags = tags.get_or_insert_with(|| extract_tags(content));
            entries.push(
                MemoryEntry::new(content, rule.category, rule.importance)
                    .with_timestamp(now)
                    .with_tags(tags.iter())
                    .with_metadata(metadata),
            );
        }

        if !entries.is_empty() {
            debug!(
                role = %role,
                count = entries.len(),
                categories = ?entries.iter().map(|e| e.category).collect::<Vec<_>>(),
                "memory entries extracted"
            );
        }
        entries
    }
}

impl ContentClassifier for KeywordExtractor {
    fn extract(&self, content: &str, role: Role) -> Vec<MemoryEntry> {
        self.extract_at(content, role, Utc::now())
    }
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

/// Specialty, clinical and age-group keywords found in `content`.
pub fn extract_tags(content: &str) -> BTreeSet<String> {
    TAG_VOCABULARY
        .find_all(&content.to_lowercase())
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// The first specialty whose triggers appear in `content`.
pub fn infer_specialty(content: &str) -> &'static str {
    let lowered = content.to_lowercase();
    SPECIALTY_RULES
        .iter()
        .find(|rule| rule.triggers.iter().any(|t| lowered.contains(t)))
        .map_or(DEFAULT_SPECIALTY, |rule| rule.specialty)
}

static AGE_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)[\s-]*(year|month|week|day)s?[\s-]*old\b")
        .expect("age pattern compiles")
});

/// Normalized patient age phrase, e.g. `"5 years old"` or `"infant"`.
///
/// An explicit `"<n> <unit> old"` phrase wins; otherwise the first
/// developmental-stage term found is returned.
pub fn extract_patient_age(content: &str) -> Option<String> {
    if let Some(caps) = AGE_PHRASE.captures(content) {
        let count = &caps[1];
        let unit = caps[2].to_lowercase();
        let plural = if count.trim_start_matches('0') == "1" { "" } else { "s" };
        return Some(format!("{count} {unit}{plural} old"));
    }

    let lowered = content.to_lowercase();
    AGE_STAGE_TERMS
        .iter()
        .find(|term| lowered.contains(*term))
        .map(|term| term.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemoryCategory, MemorySource};

    fn extract(content: &str, role: Role) -> Vec<MemoryEntry> {
        KeywordExtractor::new().extract(content, role)
    }

    #[test]
    fn assistant_clinical_terms_yield_medical_fact() {
        for content in [
            "The diagnosis is bronchiolitis.",
            "First-line TREATMENT is supportive care.",
            "Medication dosing is weight based.",
        ] {
            let entries = extract(content, Role::Assistant);
            let fact = entries
                .iter()
                .find(|e| e.category == MemoryCategory::MedicalFact)
                .expect("medical fact emitted");
            assert_eq!(fact.importance, 0.8);
            assert_eq!(fact.metadata.source, Some(MemorySource::Conversation));
            assert!(fact.metadata.medical_specialty.is_some());
        }
    }

    #[test]
    fn user_clinical_terms_do_not_yield_medical_fact() {
        let entries = extract("what is the treatment for croup?", Role::User);
        assert!(entries.iter().all(|e| e.category != MemoryCategory::MedicalFact));
    }

    #[test]
    fn user_preference_requires_user_role() {
        let entries = extract("I prefer metric units", Role::User);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, MemoryCategory::UserPreference);
        assert_eq!(entries[0].importance, 0.9);
        assert_eq!(entries[0].metadata.source, Some(MemorySource::UserInput));

        let entries = extract("I always prefer metric units", Role::Assistant);
        assert!(entries.is_empty());
    }

    #[test]
    fn case_context_fires_for_either_role() {
        for role in [Role::User, Role::Assistant] {
            let entries = extract("This patient is a 3 year old", role);
            let case = entries
                .iter()
                .find(|e| e.category == MemoryCategory::CaseContext)
                .expect("case context emitted");
            assert_eq!(case.importance, 0.7);
            assert_eq!(case.metadata.patient_age.as_deref(), Some("3 years old"));
        }
    }

    #[test]
    fn one_message_can_fan_out_to_several_categories() {
        let entries = extract(
            "For this patient I always prefer oral rehydration",
            Role::User,
        );
        let categories: Vec<_> = entries.iter().map(|e| e.category).collect();
        assert_eq!(
            categories,
            vec![MemoryCategory::UserPreference, MemoryCategory::CaseContext]
        );
        assert!(entries.iter().all(|e| e.content == entries[0].content));
        assert_ne!(entries[0].id, entries[1].id);
    }

    #[test]
    fn unmatched_text_yields_nothing() {
        assert!(extract("hello there", Role::User).is_empty());
        assert!(extract("", Role::Assistant).is_empty());
    }

    #[test]
    fn content_is_kept_verbatim() {
        let long = format!("Patient history: {}", "x".repeat(10_000));
        let entries = extract(&long, Role::User);
        assert_eq!(entries[0].content, long);
    }

    #[test]
    fn every_entry_carries_the_same_tags() {
        let entries = extract(
            "Diagnosis for this pediatric patient: cardiology referral",
            Role::Assistant,
        );
        assert_eq!(entries.len(), 2);
        let expected: BTreeSet<String> = ["cardiology", "diagnosis", "pediatric"]
            .into_iter()
            .map(String::from)
            .collect();
        for entry in &entries {
            assert_eq!(entry.tags, expected);
        }
    }

    #[test]
    fn tag_extraction_is_case_insensitive() {
        let tags = extract_tags("NEUROLOGY consult for Infant SEIZURE syndrome");
        assert!(tags.contains("neurology"));
        assert!(tags.contains("infant"));
        assert!(tags.contains("syndrome"));
        assert!(!tags.contains("seizure"));
    }

    #[test]
    fn specialty_first_rule_wins() {
        assert_eq!(infer_specialty("heart murmur and brain MRI"), "cardiology");
        assert_eq!(infer_specialty("Neuroblastoma tumor"), "neurology");
        assert_eq!(infer_specialty("renal failure"), "nephrology");
        assert_eq!(infer_specialty("bacterial infection"), "infectious disease");
        assert_eq!(infer_specialty("urgent review"), "emergency medicine");
        assert_eq!(infer_specialty("well child visit"), DEFAULT_SPECIALTY);
    }

    #[test]
    fn age_phrase_is_normalized() {
        assert_eq!(
            extract_patient_age("This is a 5 year old with fever").as_deref(),
            Some("5 years old")
        );
        assert_eq!(
            extract_patient_age("2 month old infant").as_deref(),
            Some("2 months old")
        );
        assert_eq!(
            extract_patient_age("1 year old").as_deref(),
            Some("1 year old")
        );
        assert_eq!(
            extract_patient_age("a 3 Weeks Old neonate").as_deref(),
            Some("3 weeks old")
        );
        assert_eq!(
            extract_patient_age("a 10-day-old").as_deref(),
            Some("10 days old")
        );
    }

    #[test]
    fn age_falls_back_to_developmental_stage() {
        assert_eq!(
            extract_patient_age("an adolescent with acne").as_deref(),
            Some("adolescent")
        );
        assert_eq!(
            extract_patient_age("School-age child").as_deref(),
            Some("school-age")
        );
        assert_eq!(extract_patient_age("an adult"), None);
    }

    #[test]
    fn extract_at_stamps_the_given_time() {
        let when = Utc::now() - chrono::Duration::days(3);
        let entries = KeywordExtractor::new().extract_at("patient case", Role::User, when);
        assert_eq!(entries[0].timestamp, when);
    }
}
