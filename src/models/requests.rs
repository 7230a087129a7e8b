use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::{Gender, Lifestyle};

/// Request to predict probable diseases
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PredictRequest {
    #[validate(range(min = 1, max = 100))]
    pub age: u32,
    pub gender: Gender,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[validate(range(min = 1, max = 60))]
    #[serde(alias = "durationDays")]
    pub duration_days: u32,
    #[serde(default)]
    pub lifestyle: Option<Lifestyle>,
}

impl PredictRequest {
    /// Lifestyle flags, with both set to false when the request omits them
    pub fn lifestyle(&self) -> Lifestyle {
        self.lifestyle.unwrap_or_default()
    }
}
