use crate::reactive::SlotKey;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReactiveError {
    #[error("slot {key} missing")]
    MissingSlot { key: SlotKey },
    #[error("slot {key} type mismatch; expected {expected}, found {found}")]
    TypeMismatch {
        key: SlotKey,
        expected: &'static str,
        found: &'static str,
    },
    #[error("expression failed: {message}")]
    Evaluation { message: String },
}

impl ReactiveError {
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session already started")]
    AlreadyStarted,
    #[error("session not started")]
    NotStarted,
    #[error("session stopped")]
    Stopped,
}
