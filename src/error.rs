//! Error types for Lesson Pulse

use std::fmt;

use thiserror::Error;

/// Kind of entity a lookup failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Student,
    Lesson,
    Quiz,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Student => "student",
            EntityKind::Lesson => "lesson",
            EntityKind::Quiz => "quiz",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    /// A referenced id does not resolve. Signals a caller or data-integrity
    /// problem, never a transient fault.
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: u64 },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Insufficient data for computation: {0}")]
    InsufficientData(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),
}

impl ComputeError {
    pub fn not_found(entity: EntityKind, id: u64) -> Self {
        ComputeError::NotFound { entity, id }
    }

    /// Whether this error is a lookup failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, ComputeError::NotFound { .. })
    }
}

/// Rejections raised at the boundary before values reach the scoring functions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("fatigue must be within [0, 1], got {0}")]
    FatigueOutOfRange(f64),

    #[error("unknown student id {0}")]
    UnknownStudent(u64),

    #[error("unknown lesson id {0}")]
    UnknownLesson(u64),

    #[error("quiz answer key references unknown question '{0}'")]
    UnknownQuestion(String),

    #[error("correct option '{option}' is not an option of question '{question_id}'")]
    UnknownOption { question_id: String, option: String },

    #[error("duplicate question id '{0}'")]
    DuplicateQuestion(String),

    #[error("quiz {0} already exists")]
    DuplicateQuiz(u64),

    #[error("unknown quiz id {0}")]
    UnknownQuiz(u64),

    #[error("quiz score must be within [0, 100], got {0}")]
    QuizScoreOutOfRange(f64),

    #[error("invalid scoring config: {0}")]
    InvalidConfig(String),
}
