//! The adversity-token table protocol.
//!
//! Several player sessions and one moderator session share a dice table.
//! When a roll goes badly its owner may *claim* one adversity token
//! (at most once per roll); anyone may *spend* tokens to raise a roll's
//! recorded total, paying a premium when boosting someone else's roll.
//!
//! Shared state (token ledgers, roll annotations) is authoritative only at
//! the [`Authority`]; player sessions hold replicas updated by
//! authority-originated broadcasts, or by their own locally-applied
//! mutations over data they control, which they then broadcast themselves.
//! This single-writer rule is what makes double-claims and double-spends
//! impossible without distributed locking.

/// The authority session: ground truth and request arbitration.
pub mod authority;
/// The claim state machine (take one token, at most once).
pub mod claim;
/// Player-session replicas and their local protocol paths.
pub mod client;
/// Error taxonomy for protocol operations.
pub mod error;
/// Wire messages exchanged over the table channel.
pub mod message;
/// The spend cost policy.
pub mod policy;
/// The spend state machine (boost a roll, authority-mediated).
pub mod spend;
/// In-process channel harness wiring an authority to its clients.
pub mod table;

/// Re-export authority types.
pub use authority::{Authority, ConfirmationPrompt, Outcome};
/// Re-export the claim operation.
pub use claim::apply_claim;
/// Re-export client types.
pub use client::{ClientAction, Notice, TableClient};
/// Re-export error types.
pub use error::{TableError, TableResult};
/// Re-export wire message types.
pub use message::{Broadcast, Denial, DenyReason, Message, Request, RequestId};
/// Re-export the cost policy.
pub use policy::SpendPolicy;
/// Re-export the spend operations.
pub use spend::{SpendCheck, apply_spend, validate_spend};
/// Re-export the table harness.
pub use table::{ClientId, Table, TableEvent};
