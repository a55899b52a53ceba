//! Wire messages exchanged over the table channel.
//!
//! Field names are fixed camelCase and must round-trip exactly; the
//! integration with the surrounding VTT depends on them. Requests carry a
//! `requestId` so a reply can be matched to its originating call even with
//! several requests in flight; a broadcast that is not a reply omits
//! `inReplyTo` entirely.

use std::fmt;

use broom_core::{ParticipantId, RollId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation identifier for one request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// A typed request sent to the authority, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    /// Claim the adversity token for a roll.
    #[serde(rename = "claim", rename_all = "camelCase")]
    Claim {
        /// Correlation ID for the reply.
        request_id: RequestId,
        /// The roll being claimed.
        roll_event_id: RollId,
        /// The roll owner receiving the token.
        claimant_participant_id: ParticipantId,
    },

    /// Spend tokens to raise a roll's total.
    #[serde(rename = "spend", rename_all = "camelCase")]
    Spend {
        /// Correlation ID for the reply.
        request_id: RequestId,
        /// The roll being boosted.
        roll_event_id: RollId,
        /// The participant whose ledger pays.
        spender_participant_id: ParticipantId,
        /// How much the roll total should rise.
        amount: u32,
        /// What the spender's ledger is charged (amount times the policy
        /// multiplier for cross-participant spends).
        cost: u32,
    },
}

impl Request {
    /// The correlation ID of this request.
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Claim { request_id, .. } | Self::Spend { request_id, .. } => *request_id,
        }
    }

    /// The roll this request targets.
    pub fn roll_event_id(&self) -> RollId {
        match self {
            Self::Claim { roll_event_id, .. } | Self::Spend { roll_event_id, .. } => *roll_event_id,
        }
    }

    /// The participant whose ledger the request would mutate.
    pub fn participant_id(&self) -> ParticipantId {
        match self {
            Self::Claim {
                claimant_participant_id,
                ..
            } => *claimant_participant_id,
            Self::Spend {
                spender_participant_id,
                ..
            } => *spender_participant_id,
        }
    }
}

/// An authority-originated (or locally-originated, for self-owned data)
/// state update fanned out to every session.
///
/// Carries absolute values, never deltas, so replaying one is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    /// The roll whose annotation changed.
    pub roll_event_id: RollId,
    /// Authoritative claim flag.
    pub claimed: bool,
    /// Authoritative cumulative tokens spent on the roll.
    pub tokens_spent: u32,
    /// Authoritative roll total.
    pub current_total: i64,
    /// The participant whose balance changed.
    pub participant_id: ParticipantId,
    /// That participant's authoritative new balance.
    pub new_balance: u32,
    /// The request this broadcast answers, when it answers one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub in_reply_to: Option<RequestId>,
}

/// A targeted rejection returned only to the requesting session.
///
/// Denials never mutate shared state and are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Denial {
    /// The rejected request.
    pub in_reply_to: RequestId,
    /// The roll the request targeted.
    pub roll_event_id: RollId,
    /// The participant the request was spending (or claiming) for.
    pub spender_participant_id: ParticipantId,
    /// Why the request was rejected.
    pub reason: DenyReason,
}

/// Wire-level rejection reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DenyReason {
    /// The acting user lacks control over the relevant participant.
    Unauthorized,
    /// The roll's token was already claimed.
    AlreadyClaimed,
    /// The spend amount was not a positive integer.
    InvalidAmount,
    /// The spender's authoritative balance cannot cover the cost.
    InsufficientBalance,
    /// The referenced roll or participant is unknown to the authority.
    NotFound,
    /// The moderator explicitly rejected the request.
    Denied,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unauthorized => "you do not control that character",
            Self::AlreadyClaimed => "the token for that roll was already taken",
            Self::InvalidAmount => "the token amount must be a positive number",
            Self::InsufficientBalance => "not enough adversity tokens",
            Self::NotFound => "the roll or character no longer exists",
            Self::Denied => "the moderator denied the request",
        };
        f.write_str(text)
    }
}

/// Envelope for everything the channel carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// A client-originated request for the authority.
    Request(Request),
    /// A targeted rejection.
    Denial(Denial),
    /// A state update for every session.
    Broadcast(Broadcast),
}
