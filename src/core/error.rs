use thiserror::Error;

/// Input problems the caller can fix by correcting the request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no symptoms")]
    NoSymptoms,

    #[error("unknown symptoms: {}", .0.join(", "))]
    UnknownSymptoms(Vec<String>),
}

/// The classifier could not produce a usable probability vector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("inference failed: {0}")]
pub struct InferenceError(pub String);

impl InferenceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors surfaced by a single pass through the prediction pipeline
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PredictError {
    /// Whether the error is caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_symptoms_message_lists_tokens() {
        let err = ValidationError::UnknownSymptoms(vec!["rash".to_string(), "itch".to_string()]);
        assert_eq!(err.to_string(), "unknown symptoms: rash, itch");
    }

    #[test]
    fn test_error_categories() {
        assert!(PredictError::from(ValidationError::NoSymptoms).is_client_error());
        assert!(!PredictError::from(InferenceError::new("boom")).is_client_error());
        assert!(!PredictError::Internal("panic".to_string()).is_client_error());
    }
}
