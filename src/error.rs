use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GradeError {
    #[error("weight budget exceeded: requested {requested}, only {remaining} of 100 remains")]
    WeightBudgetExceeded { requested: f64, remaining: f64 },

    #[error("component label must not be empty")]
    EmptyLabel,

    #[error("score {0} is outside 0-100")]
    ScoreOutOfRange(f64),

    #[error("weight {0} is outside (0, 100]")]
    WeightOutOfRange(f64),

    #[error("'{0}' is not an institutional grade letter")]
    UnknownScaleLetter(String),

    #[error("min score {0} is outside 0-100")]
    MinScoreOutOfRange(i32),

    #[error("gpa point {0} is outside 0.0-4.0")]
    GpaPointOutOfRange(f64),

    #[error("course {0} not found")]
    CourseNotFound(Uuid),

    #[error("grade component {0} not found")]
    ComponentNotFound(Uuid),

    #[error("term {0} not found")]
    TermNotFound(Uuid),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl GradeError {
    /// Rejections of the caller's input, as opposed to lookup misses and
    /// storage failures. Bulk callers may skip past these per row.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GradeError::WeightBudgetExceeded { .. }
                | GradeError::EmptyLabel
                | GradeError::ScoreOutOfRange(_)
                | GradeError::WeightOutOfRange(_)
                | GradeError::UnknownScaleLetter(_)
                | GradeError::MinScoreOutOfRange(_)
                | GradeError::GpaPointOutOfRange(_)
        )
    }
}
