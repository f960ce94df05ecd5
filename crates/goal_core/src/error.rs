use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    MacroGoal,
    MicroGoal,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::MacroGoal => f.write_str("macro goal"),
            RecordKind::MicroGoal => f.write_str("micro goal"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GoalError {
    #[error("{kind} `{id}` not found")]
    NotFound { kind: RecordKind, id: String },

    /// Raised by validation only; scheduling treats a bad rule as never due.
    #[error("invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("invalid goal: {0}")]
    Validation(String),

    #[error("limit reached: at most {limit} {what}")]
    LimitReached { what: &'static str, limit: usize },

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl GoalError {
    pub fn micro_not_found(id: impl Into<String>) -> Self {
        GoalError::NotFound {
            kind: RecordKind::MicroGoal,
            id: id.into(),
        }
    }

    pub fn macro_not_found(id: impl Into<String>) -> Self {
        GoalError::NotFound {
            kind: RecordKind::MacroGoal,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GoalError::NotFound { .. })
    }
}

pub type GoalResult<T> = Result<T, GoalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_record() {
        let err = GoalError::micro_not_found("abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "micro goal `abc` not found");
    }

    #[test]
    fn persistence_errors_keep_their_message() {
        let err: GoalError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, GoalError::Persistence(_)));
        assert_eq!(err.to_string(), "disk full");
    }
}
