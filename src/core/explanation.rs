use crate::models::SymptomImportance;

/// Choose up to `k` symptoms that explain a prediction
///
/// Reported symptoms with a global importance score come first, ordered by
/// score (ties keep request order). Remaining slots are filled from the
/// global importance ranking, skipping anything already chosen.
pub fn select_important_symptoms(
    symptoms: &[String],
    importance: &SymptomImportance,
    k: usize,
) -> Vec<String> {
    let mut scored: Vec<(&str, f64)> = Vec::with_capacity(symptoms.len());
    for symptom in symptoms {
        if scored.iter().any(|(s, _)| *s == symptom.as_str()) {
            continue;
        }
        if let Some(score) = importance.score(symptom) {
            scored.push((symptom.as_str(), score));
        }
    }
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut selected: Vec<String> = scored
        .into_iter()
        .take(k)
        .map(|(symptom, _)| symptom.to_string())
        .collect();

    // Fill from the global ranking
    for (symptom, _) in importance.ranking() {
        if selected.len() >= k {
            break;
        }
        if !selected.contains(symptom) {
            selected.push(symptom.clone());
        }
    }

    selected
}
