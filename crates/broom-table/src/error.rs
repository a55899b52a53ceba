//! Error taxonomy for protocol operations.

use broom_core::{CoreError, LedgerError, RollId};

use crate::message::DenyReason;

/// Alias for `Result<T, TableError>`.
pub type TableResult<T> = Result<T, TableError>;

/// Everything that can go wrong with a claim or spend.
///
/// Validation failures (`Unauthorized`, `InvalidAmount`, and the optimistic
/// `InsufficientBalance`) are resolved locally and never reach the channel;
/// the rest come back from the authority as a [`Denial`](crate::Denial).
/// None is fatal: a failed operation leaves every ledger and annotation
/// unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    /// The acting user lacks control over the relevant participant.
    #[error("you do not control that character")]
    Unauthorized,

    /// The roll's token was already claimed.
    #[error("the token for roll {0} was already taken")]
    AlreadyClaimed(RollId),

    /// The spend amount was not a positive integer.
    #[error("invalid token amount: {0}")]
    InvalidAmount(i64),

    /// The balance cannot cover the cost (locally optimistic or
    /// authoritative).
    #[error("insufficient tokens: have {have}, need {need}")]
    InsufficientBalance {
        /// The balance checked.
        have: u32,
        /// The cost of the operation.
        need: u32,
    },

    /// A referenced roll or participant is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// The moderator explicitly rejected the request.
    #[error("the moderator denied the request")]
    Denied,
}

impl TableError {
    /// The wire-level reason for this error.
    pub fn deny_reason(&self) -> DenyReason {
        match self {
            Self::Unauthorized => DenyReason::Unauthorized,
            Self::AlreadyClaimed(_) => DenyReason::AlreadyClaimed,
            Self::InvalidAmount(_) => DenyReason::InvalidAmount,
            Self::InsufficientBalance { .. } => DenyReason::InsufficientBalance,
            Self::NotFound(_) => DenyReason::NotFound,
            Self::Denied => DenyReason::Denied,
        }
    }
}

impl From<CoreError> for TableError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Ledger(LedgerError::InsufficientBalance { have, need }) => {
                Self::InsufficientBalance { have, need }
            }
            CoreError::Ledger(LedgerError::Overflow { delta, .. }) => Self::InvalidAmount(delta),
            other => Self::NotFound(other.to_string()),
        }
    }
}

impl From<LedgerError> for TableError {
    fn from(err: LedgerError) -> Self {
        Self::from(CoreError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broom_core::ParticipantId;

    #[test]
    fn deny_reason_mapping() {
        assert_eq!(
            TableError::Unauthorized.deny_reason(),
            DenyReason::Unauthorized
        );
        assert_eq!(
            TableError::AlreadyClaimed(RollId::new()).deny_reason(),
            DenyReason::AlreadyClaimed
        );
        assert_eq!(
            TableError::InsufficientBalance { have: 1, need: 4 }.deny_reason(),
            DenyReason::InsufficientBalance
        );
        assert_eq!(TableError::Denied.deny_reason(), DenyReason::Denied);
    }

    #[test]
    fn core_error_conversion() {
        let err = CoreError::Ledger(LedgerError::InsufficientBalance { have: 1, need: 2 });
        assert_eq!(
            TableError::from(err),
            TableError::InsufficientBalance { have: 1, need: 2 }
        );

        let missing = ParticipantId::new();
        let err = CoreError::ParticipantNotFound(missing);
        assert!(matches!(TableError::from(err), TableError::NotFound(_)));
    }
}
