use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::TokenLedger;

/// Unique identifier for a participant at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub Uuid);

impl ParticipantId {
    /// Generate a new random participant ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Unique identifier for a connected user (a player or the moderator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// A player-controlled entity holding an adversity-token balance.
///
/// Control is user-based: every user in `controlling_users` may act for this
/// participant. Absent authority mediation, only controlling users have
/// write authority over the participant's ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Stable unique identifier.
    pub id: ParticipantId,
    /// Display name.
    pub name: String,
    /// The adversity-token balance.
    pub ledger: TokenLedger,
    /// Users with write authority over this participant.
    pub controlling_users: HashSet<UserId>,
}

impl Participant {
    /// Create a participant with a fresh ID, an empty ledger, and no
    /// controlling users.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(),
            name: name.into(),
            ledger: TokenLedger::default(),
            controlling_users: HashSet::new(),
        }
    }

    /// Add a controlling user (builder style).
    #[must_use]
    pub fn with_controller(mut self, user: UserId) -> Self {
        self.controlling_users.insert(user);
        self
    }

    /// Set the starting token balance (builder style).
    #[must_use]
    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.ledger = TokenLedger::with_balance(tokens);
        self
    }

    /// Whether the given user has write authority over this participant.
    pub fn is_controlled_by(&self, user: UserId) -> bool {
        self.controlling_users.contains(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_participant_is_uncontrolled() {
        let p = Participant::new("Billy");
        assert_eq!(p.name, "Billy");
        assert_eq!(p.ledger.balance(), 0);
        assert!(p.controlling_users.is_empty());
    }

    #[test]
    fn controller_check() {
        let user = UserId::new();
        let other = UserId::new();
        let p = Participant::new("Billy").with_controller(user);
        assert!(p.is_controlled_by(user));
        assert!(!p.is_controlled_by(other));
    }

    #[test]
    fn starting_tokens() {
        let p = Participant::new("Billy").with_tokens(3);
        assert_eq!(p.ledger.balance(), 3);
    }

    #[test]
    fn id_display_is_short() {
        let id = ParticipantId::new();
        assert_eq!(id.to_string().len(), 8);
    }
}
