use crate::core::{error::InferenceError, features::FeatureRow};
use crate::ml::{ClassLabel, Classifier, LabelEncoder};
use crate::models::DiseaseProbability;

/// Round a probability to the 4 decimals exposed to clients
#[inline]
pub fn round_confidence(probability: f64) -> f64 {
    (probability * 10_000.0).round() / 10_000.0
}

/// Map a classifier's native label to a disease name
///
/// Encoded labels go through the label encoder when the bundle has one;
/// without an encoder they are rendered as their integer value.
pub fn decode_label(
    label: &ClassLabel,
    encoder: Option<&LabelEncoder>,
) -> Result<String, InferenceError> {
    match (label, encoder) {
        (ClassLabel::Name(name), _) => Ok(name.clone()),
        (ClassLabel::Encoded(code), Some(encoder)) => encoder
            .decode(*code as usize)
            .map(str::to_string)
            .ok_or_else(|| InferenceError::new(format!("label encoder has no class {}", code))),
        (ClassLabel::Encoded(code), None) => Ok(code.to_string()),
    }
}

/// Rank classes by predicted probability
///
/// Probabilities are sorted descending with a stable sort, so equal
/// probabilities keep the classifier's native class order. At most `top_n`
/// entries are returned, each rounded to 4 decimals.
pub fn rank_predictions(
    classifier: &dyn Classifier,
    encoder: Option<&LabelEncoder>,
    row: &FeatureRow,
    top_n: usize,
) -> Result<Vec<DiseaseProbability>, InferenceError> {
    let probabilities = classifier.predict_proba(row)?;
    let labels = classifier.classes();

    if probabilities.len() != labels.len() {
        return Err(InferenceError::new(format!(
            "classifier returned {} probabilities for {} classes",
            probabilities.len(),
            labels.len()
        )));
    }

    let mut ranked = labels
        .iter()
        .zip(probabilities)
        .map(|(label, probability)| {
            if !probability.is_finite() {
                return Err(InferenceError::new(format!(
                    "non-finite probability for class {}",
                    label
                )));
            }
            Ok((decode_label(label, encoder)?, probability))
        })
        .collect::<Result<Vec<_>, _>>()?;

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(top_n);

    Ok(ranked
        .into_iter()
        .map(|(disease, probability)| DiseaseProbability {
            disease,
            confidence: round_confidence(probability),
        })
        .collect())
}
