use std::collections::HashSet;
use crate::core::error::ValidationError;
use crate::models::SymptomVocabulary;

/// Trim, lowercase and deduplicate raw symptom strings
///
/// Order of first appearance is kept and blank entries are dropped.
pub fn clean_symptoms<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(raw.len());
    raw.iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Clean raw symptoms and check them against the known vocabulary
///
/// Every unknown token is reported together, in first-seen order.
pub fn normalize_symptoms<S: AsRef<str>>(
    raw: &[S],
    vocabulary: &SymptomVocabulary,
) -> Result<Vec<String>, ValidationError> {
    let symptoms = clean_symptoms(raw);
    if symptoms.is_empty() {
        return Err(ValidationError::NoSymptoms);
    }

    let unknown: Vec<String> = symptoms
        .iter()
        .filter(|s| !vocabulary.contains(s))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(ValidationError::UnknownSymptoms(unknown));
    }

    Ok(symptoms)
}
