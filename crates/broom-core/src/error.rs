use crate::ledger::LedgerError;
use crate::participant::ParticipantId;
use crate::roll::RollId;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when manipulating the game store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// The referenced participant does not exist in the store.
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// The referenced roll event does not exist in the store.
    #[error("roll not found: {0}")]
    RollNotFound(RollId),

    /// A roll event with the same ID was already registered.
    #[error("duplicate roll: {0}")]
    DuplicateRoll(RollId),

    /// A ledger adjustment was rejected.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The external dice engine failed to evaluate a formula.
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}
