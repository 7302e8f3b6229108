//! Keyword rule tables.
//!
//! Every heuristic the extractor and the session summary rely on is an
//! ordered, static table here. Order matters where noted: category rules
//! fire independently, specialty rules stop at the first match.
//!
//! Vocabulary scans go through [`KeywordSet`], an Aho-Corasick automaton
//! searched with overlapping matches so that every term present in the
//! text is reported, including terms nested inside other terms.

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;

use crate::types::{MemoryCategory, MemorySource, Role};

// ---------------------------------------------------------------------------
// Category rules
// ---------------------------------------------------------------------------

/// Extra metadata a category rule attaches to the entries it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    None,
    /// Fill `metadata.medical_specialty` via [`infer_specialty`](crate::extractor::infer_specialty).
    Specialty,
    /// Fill `metadata.patient_age` via [`extract_patient_age`](crate::extractor::extract_patient_age).
    PatientAge,
}

/// One category trigger rule.
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub category: MemoryCategory,
    /// Only messages from this role can fire the rule; `None` means any role.
    pub role: Option<Role>,
    /// Case-insensitive substrings; any one fires the rule.
    pub triggers: &'static [&'static str],
    pub importance: f64,
    pub source: MemorySource,
    pub enrichment: Enrichment,
}

/// Category rules, evaluated in order, each independently.
pub static CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: MemoryCategory::MedicalFact,
        role: Some(Role::Assistant),
        triggers: &["diagnosis", "treatment", "medication"],
        importance: 0.8,
        source: MemorySource::Conversation,
        enrichment: Enrichment::Specialty,
    },
    CategoryRule {
        category: MemoryCategory::UserPreference,
        role: Some(Role::User),
        triggers: &["prefer", "always", "never"],
        importance: 0.9,
        source: MemorySource::UserInput,
        enrichment: Enrichment::None,
    },
    CategoryRule {
        category: MemoryCategory::CaseContext,
        role: None,
        triggers: &["patient", "case", "year old"],
        importance: 0.7,
        source: MemorySource::Conversation,
        enrichment: Enrichment::PatientAge,
    },
];

// ---------------------------------------------------------------------------
// Tag vocabularies
// ---------------------------------------------------------------------------

pub static SPECIALTY_VOCABULARY: &[&str] = &[
    "cardiology",
    "neurology",
    "oncology",
    "endocrinology",
    "gastroenterology",
    "pulmonology",
    "nephrology",
    "infectious",
    "emergency",
];

pub static CLINICAL_TERMS: &[&str] = &[
    "diagnosis",
    "treatment",
    "medication",
    "symptom",
    "syndrome",
    "disease",
    "therapy",
    "surgery",
    "procedure",
];

pub static AGE_GROUPS: &[&str] = &[
    "newborn",
    "infant",
    "toddler",
    "child",
    "adolescent",
    "pediatric",
];

// ---------------------------------------------------------------------------
// Specialty inference
// ---------------------------------------------------------------------------

/// Maps trigger substrings to a specialty name.
#[derive(Debug, Clone, Copy)]
pub struct SpecialtyRule {
    pub triggers: &'static [&'static str],
    pub specialty: &'static str,
}

/// First matching rule wins.
pub static SPECIALTY_RULES: &[SpecialtyRule] = &[
    SpecialtyRule { triggers: &["heart", "cardiac"], specialty: "cardiology" },
    SpecialtyRule { triggers: &["brain", "neuro"], specialty: "neurology" },
    SpecialtyRule { triggers: &["cancer", "tumor"], specialty: "oncology" },
    SpecialtyRule { triggers: &["diabetes", "hormone"], specialty: "endocrinology" },
    SpecialtyRule { triggers: &["stomach", "intestin"], specialty: "gastroenterology" },
    SpecialtyRule { triggers: &["lung", "respiratory"], specialty: "pulmonology" },
    SpecialtyRule { triggers: &["kidney", "renal"], specialty: "nephrology" },
    SpecialtyRule { triggers: &["infection", "bacteria"], specialty: "infectious disease" },
    SpecialtyRule { triggers: &["emergency", "urgent"], specialty: "emergency medicine" },
];

pub const DEFAULT_SPECIALTY: &str = "general pediatrics";

// ---------------------------------------------------------------------------
// Age and topic vocabularies
// ---------------------------------------------------------------------------

/// Developmental stages used when no explicit "N years old" phrase exists.
/// Checked in order.
pub static AGE_STAGE_TERMS: &[&str] = &[
    "newborn",
    "infant",
    "toddler",
    "preschooler",
    "school-age",
    "adolescent",
];

/// Conditions tracked as session key topics.
pub static CONDITION_TOPICS: &[&str] = &[
    "fever",
    "cough",
    "asthma",
    "diabetes",
    "seizure",
    "infection",
    "rash",
    "pain",
];

// ---------------------------------------------------------------------------
// KeywordSet
// ---------------------------------------------------------------------------

/// A fixed vocabulary compiled into an Aho-Corasick automaton.
///
/// Terms must be lowercase; callers pass lowercased text.
pub struct KeywordSet {
    terms: Vec<&'static str>,
    automaton: AhoCorasick,
}

impl KeywordSet {
    pub fn new(terms: Vec<&'static str>) -> Self {
        let automaton = AhoCorasick::new(&terms).expect("static vocabulary compiles");
        Self { terms, automaton }
    }

    /// Whether any term occurs in `lowered`.
    pub fn contains_any(&self, lowered: &str) -> bool {
        self.automaton.is_match(lowered)
    }

    /// Every distinct term found in `lowered`, in vocabulary order.
    pub fn find_all(&self, lowered: &str) -> Vec<&'static str> {
        let mut hit = vec![false; self.terms.len()];
        for mat in self.automaton.find_overlapping_iter(lowered) {
            hit[mat.pattern().as_usize()] = true;
        }
        self.terms
            .iter()
            .zip(hit)
            .filter_map(|(term, found)| found.then_some(*term))
            .collect()
    }

    pub fn terms(&self) -> &[&'static str] {
        &self.terms
    }
}

/// Trigger sets for [`CATEGORY_RULES`], index-aligned.
pub(crate) static CATEGORY_TRIGGERS: LazyLock<Vec<KeywordSet>> = LazyLock::new(|| {
    CATEGORY_RULES
        .iter()
        .map(|rule| KeywordSet::new(rule.triggers.to_vec()))
        .collect()
});

/// Union of the specialty, clinical and age-group vocabularies.
pub(crate) static TAG_VOCABULARY: LazyLock<KeywordSet> = LazyLock::new(|| {
    let terms = SPECIALTY_VOCABULARY
        .iter()
        .chain(CLINICAL_TERMS)
        .chain(AGE_GROUPS)
        .copied()
        .collect();
    KeywordSet::new(terms)
});

pub(crate) static TOPIC_VOCABULARY: LazyLock<KeywordSet> =
    LazyLock::new(|| KeywordSet::new(CONDITION_TOPICS.to_vec()));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabularies_are_lowercase() {
        let all = SPECIALTY_VOCABULARY
            .iter()
            .chain(CLINICAL_TERMS)
            .chain(AGE_GROUPS)
            .chain(AGE_STAGE_TERMS)
            .chain(CONDITION_TOPICS)
            .chain(CATEGORY_RULES.iter().flat_map(|r| r.triggers))
            .chain(SPECIALTY_RULES.iter().flat_map(|r| r.triggers));
        for term in all {
            assert_eq!(*term, term.to_lowercase());
        }
    }

    #[test]
    fn category_rule_table_matches_documented_order() {
        let order: Vec<_> = CATEGORY_RULES.iter().map(|r| r.category).collect();
        assert_eq!(
            order,
            vec![
                MemoryCategory::MedicalFact,
                MemoryCategory::UserPreference,
                MemoryCategory::CaseContext,
            ]
        );
        assert_eq!(CATEGORY_TRIGGERS.len(), CATEGORY_RULES.len());
    }

    #[test]
    fn category_importance_matches_category_defaults() {
        for rule in CATEGORY_RULES {
            assert_eq!(rule.importance, rule.category.default_importance());
        }
    }

    #[test]
    fn find_all_reports_terms_in_vocabulary_order() {
        let found = TAG_VOCABULARY.find_all("pediatric infectious-disease childhood");
        assert_eq!(found, vec!["infectious", "disease", "child", "pediatric"]);
    }

    #[test]
    fn find_all_reports_nested_terms() {
        let set = KeywordSet::new(vec!["infect", "infection"]);
        assert_eq!(set.find_all("an infection"), vec!["infect", "infection"]);
    }

    #[test]
    fn find_all_deduplicates_repeated_terms() {
        let found = TOPIC_VOCABULARY.find_all("fever fever and more fever");
        assert_eq!(found, vec!["fever"]);
    }

    #[test]
    fn contains_any_is_substring_match() {
        let prefs = KeywordSet::new(vec!["prefer"]);
        assert!(prefs.contains_any("i preferably dose by weight"));
        assert!(!prefs.contains_any("dose by weight"));
        assert_eq!(prefs.terms(), ["prefer"]);
    }
}
