use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Patient gender as the model was trained on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    /// Accepts any casing and surrounding whitespace
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err("gender must be 'male' or 'female'".to_string()),
        }
    }
}

impl TryFrom<String> for Gender {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Optional lifestyle flags; both default to false
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifestyle {
    #[serde(default)]
    pub smoking: bool,
    #[serde(default)]
    pub alcohol: bool,
}

/// One ranked disease with its rounded probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseProbability {
    pub disease: String,
    pub confidence: f64,
}

/// Evaluation scores of one training candidate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Output bounds of the prediction pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionLimits {
    /// Number of ranked diseases returned
    pub top_predictions: usize,
    /// Target length of the explanation list
    pub explanation_size: usize,
}

impl Default for PredictionLimits {
    fn default() -> Self {
        Self {
            top_predictions: 3,
            explanation_size: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parsing_is_case_and_space_insensitive() {
        assert_eq!(" Male ".parse::<Gender>(), Ok(Gender::Male));
        assert_eq!("FEMALE".parse::<Gender>(), Ok(Gender::Female));
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn test_gender_deserializes_from_loose_string() {
        let gender: Gender = serde_json::from_str("\"  Female\"").unwrap();
        assert_eq!(gender, Gender::Female);
        assert_eq!(serde_json::to_string(&gender).unwrap(), "\"female\"");
        assert!(serde_json::from_str::<Gender>("\"x\"").is_err());
    }

    #[test]
    fn test_lifestyle_defaults() {
        let lifestyle: Lifestyle = serde_json::from_str("{}").unwrap();
        assert!(!lifestyle.smoking);
        assert!(!lifestyle.alcohol);
    }
}
