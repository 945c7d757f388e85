use thiserror::Error;

use crate::model::Slot;

/// Why a slot ended up with no candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoCandidatesReason {
    /// The catalog holds no items of the slot's meal type at all.
    EmptyMealType,
    /// Allergy/preference exclusions removed every item.
    AllExcluded,
}

impl std::fmt::Display for NoCandidatesReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoCandidatesReason::EmptyMealType => write!(f, "no catalog items for this meal type"),
            NoCandidatesReason::AllExcluded => write!(f, "every item matched an exclusion term"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No candidates for {slot}: {reason}")]
    NoCandidates {
        slot: Slot,
        reason: NoCandidatesReason,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Nutrition target oracle error: {0}")]
    Oracle(String),
}

impl PlannerError {
    pub fn validation(message: impl Into<String>) -> Self {
        PlannerError::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        PlannerError::Config(message.into())
    }
}

impl From<config::ConfigError> for PlannerError {
    fn from(err: config::ConfigError) -> Self {
        PlannerError::Config(err.to_string())
    }
}

pub type Result<T, E = PlannerError> = std::result::Result<T, E>;
