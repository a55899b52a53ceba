//! Validated mutation of a participant's adversity-token balance.
//!
//! Every balance change in the workspace goes through [`TokenLedger::try_adjust`];
//! there is no direct field mutation anywhere else. A delta that would drive
//! the balance negative is rejected before application, so a failed
//! adjustment leaves the ledger untouched.

use serde::{Deserialize, Serialize};

/// Errors produced by ledger adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The balance cannot cover the requested deduction.
    #[error("insufficient tokens: have {have}, need {need}")]
    InsufficientBalance {
        /// The current balance.
        have: u32,
        /// The number of tokens the deduction required.
        need: u32,
    },

    /// The adjustment would overflow the balance.
    #[error("token balance overflow: have {have}, delta {delta}")]
    Overflow {
        /// The current balance.
        have: u32,
        /// The rejected delta.
        delta: i64,
    },
}

/// A non-negative adversity-token balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    balance: u32,
}

impl TokenLedger {
    /// Create a ledger with the given starting balance.
    pub fn with_balance(balance: u32) -> Self {
        Self { balance }
    }

    /// The current balance.
    pub fn balance(&self) -> u32 {
        self.balance
    }

    /// Apply a signed delta, rejecting any result outside `0..=u32::MAX`.
    /// Returns the new balance on success; the ledger is unchanged on error.
    pub fn try_adjust(&mut self, delta: i64) -> Result<u32, LedgerError> {
        let next = i64::from(self.balance) + delta;
        if next < 0 {
            return Err(LedgerError::InsufficientBalance {
                have: self.balance,
                need: delta.unsigned_abs().min(u64::from(u32::MAX)) as u32,
            });
        }
        if next > i64::from(u32::MAX) {
            return Err(LedgerError::Overflow {
                have: self.balance,
                delta,
            });
        }
        self.balance = next as u32;
        Ok(self.balance)
    }

    /// Overwrite the balance with an authoritative value from a broadcast.
    ///
    /// Replica-sync only: protocol code mutates through [`Self::try_adjust`].
    pub fn sync_to(&mut self, balance: u32) {
        self.balance = balance;
    }
}

impl std::fmt::Display for TokenLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} tokens", self.balance)
    }
}
