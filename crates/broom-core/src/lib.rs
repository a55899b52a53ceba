//! Core types for Broomtable: participants, token ledgers, rolls, and the
//! game store.
//!
//! This crate defines the data model the table protocol operates on. It is
//! independent of any transport; you can construct a [`GameStore`]
//! programmatically or deserialize one from JSON. The dice engine itself is
//! external and reached only through the [`RollEvaluator`] seam.

/// Error types used throughout the crate.
pub mod error;
/// The boundary to the external dice evaluation engine.
pub mod evaluate;
/// Validated token balance mutation.
pub mod ledger;
/// Participant identity and control.
pub mod participant;
/// Roll events, annotations, and display records.
pub mod roll;
/// The game store that owns participants, rolls, and annotations.
pub mod store;

/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export the evaluator seam.
pub use evaluate::{FixedEvaluator, RollData, RollEvaluator};
/// Re-export ledger types.
pub use ledger::{LedgerError, TokenLedger};
/// Re-export participant types.
pub use participant::{Participant, ParticipantId, UserId};
/// Re-export roll types.
pub use roll::{RollAnnotation, RollDisplay, RollEvent, RollId};
/// Re-export the store.
pub use store::{GameStore, StoreMeta};
