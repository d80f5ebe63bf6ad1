use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Comparison '{comparison_id}' not found")]
    NotFound { comparison_id: String },

    #[error("Tariff '{tariff_id}' not found")]
    TariffNotFound { tariff_id: String },

    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    #[error("Calculation failed for tariff '{tariff_id}': {reason}")]
    Computation { tariff_id: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    pub fn computation(tariff_id: &str, reason: impl Into<String>) -> Self {
        Self::Computation {
            tariff_id: tariff_id.to_string(),
            reason:    reason.into(),
        }
    }

    /// HTTP status an invoking endpoint should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. }  => 400,
            Self::NotFound { .. }
            | Self::TariffNotFound { .. } => 404,
            Self::Computation { .. } => 422,
            Self::Storage(_)         => 503,
            Self::Serialization(_)
            | Self::Other(_)         => 500,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_failure_category() {
        assert_eq!(EngineError::validation("bad").status_code(), 400);
        assert_eq!(
            EngineError::NotFound { comparison_id: "x".into() }.status_code(),
            404
        );
        assert_eq!(
            EngineError::TariffNotFound { tariff_id: "t".into() }.status_code(),
            404
        );
        assert_eq!(EngineError::computation("t", "nan").status_code(), 422);
        assert_eq!(
            EngineError::Storage(rusqlite::Error::InvalidQuery).status_code(),
            503
        );
        assert_eq!(EngineError::Other(anyhow::anyhow!("boom")).status_code(), 500);
    }
}
