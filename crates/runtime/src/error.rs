use sqlx::types::Uuid;

use crate::rules::RuleViolation;

#[derive(Debug, thiserror::Error)]
pub enum ArmoryError {
    /// Entity not found - includes entity type and ID for actionable error messages.
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ArmoryError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Rule(violation) => violation.is_not_found(),
            Self::Database(_) => false,
        }
    }
}
