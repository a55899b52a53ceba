//! Roll events and the mutable annotations attached to them.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::participant::ParticipantId;

/// Unique identifier for a roll event (the chat message carrying the roll).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RollId(pub Uuid);

impl RollId {
    /// Generate a new random roll ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RollId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// An immutable record of one dice evaluation.
///
/// Created once when the external dice engine evaluates a formula; never
/// mutated afterwards. All later adjustments live in the [`RollAnnotation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollEvent {
    /// Stable unique identifier.
    pub id: RollId,
    /// The participant who made the roll.
    pub owner: ParticipantId,
    /// Chat label for the roll ("Brains + d8", etc.).
    pub flavor: String,
    /// The evaluated total at creation time.
    pub base_total: i64,
}

impl RollEvent {
    /// Create a roll event with a fresh ID.
    pub fn new(owner: ParticipantId, flavor: impl Into<String>, base_total: i64) -> Self {
        Self {
            id: RollId::new(),
            owner,
            flavor: flavor.into(),
            base_total,
        }
    }
}

/// The mutable side-record tracking claim and spend state for one roll.
///
/// Created lazily on the first claim or spend against a roll and never
/// deleted. Maintains `current_total == base_total + tokens_spent` through
/// its two mutators; replicas overwrite state wholesale with
/// [`RollAnnotation::sync_to`] when an authoritative broadcast arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollAnnotation {
    /// Whether the owner has taken their adversity token for this roll.
    pub claimed: bool,
    /// Total tokens spent on the roll so far (by anyone).
    pub tokens_spent: u32,
    /// The roll total including all spent tokens.
    pub current_total: i64,
}

impl RollAnnotation {
    /// Create an annotation for a roll with the given base total.
    pub fn new(base_total: i64) -> Self {
        Self {
            claimed: false,
            tokens_spent: 0,
            current_total: base_total,
        }
    }

    /// Mark the roll's token as claimed. Terminal: there is no way back.
    pub fn apply_claim(&mut self) {
        self.claimed = true;
    }

    /// Record a spend of `amount` tokens, raising the current total by the
    /// same amount. The spender's cost never reaches the total.
    pub fn apply_spend(&mut self, amount: u32) {
        self.tokens_spent += amount;
        self.current_total += i64::from(amount);
    }

    /// Overwrite with authoritative values from a broadcast.
    ///
    /// Absolute, not delta-based, so replaying a broadcast is a no-op.
    pub fn sync_to(&mut self, claimed: bool, tokens_spent: u32, current_total: i64) {
        self.claimed = claimed;
        self.tokens_spent = tokens_spent;
        self.current_total = current_total;
    }

    /// Build the display record for the chat/UI layer.
    pub fn display(&self, roll: RollId) -> RollDisplay {
        RollDisplay {
            roll,
            current_total: self.current_total,
            claimed: self.claimed,
            tokens_spent: self.tokens_spent,
        }
    }
}

/// A display event emitted for the external chat/UI layer to render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollDisplay {
    /// The roll this display update belongs to.
    pub roll: RollId,
    /// The total to show (base plus spent tokens).
    pub current_total: i64,
    /// Whether the claim affordance should be disabled.
    pub claimed: bool,
    /// Total tokens spent so far.
    pub tokens_spent: u32,
}

impl fmt::Display for RollDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "roll {}: total {}", self.roll, self.current_total)?;
        if self.tokens_spent > 0 {
            write!(f, " (+{} from tokens)", self.tokens_spent)?;
        }
        if self.claimed {
            write!(f, " [token claimed]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_annotation_mirrors_base() {
        let ann = RollAnnotation::new(10);
        assert!(!ann.claimed);
        assert_eq!(ann.tokens_spent, 0);
        assert_eq!(ann.current_total, 10);
    }

    #[test]
    fn claim_is_terminal() {
        let mut ann = RollAnnotation::new(4);
        ann.apply_claim();
        assert!(ann.claimed);
        // Totals are untouched by a claim.
        assert_eq!(ann.current_total, 4);
    }

    #[test]
    fn spend_raises_total_by_amount() {
        let mut ann = RollAnnotation::new(10);
        ann.apply_spend(2);
        ann.apply_spend(1);
        assert_eq!(ann.tokens_spent, 3);
        assert_eq!(ann.current_total, 13);
    }

    #[test]
    fn spend_on_negative_base() {
        let mut ann = RollAnnotation::new(-2);
        ann.apply_spend(1);
        assert_eq!(ann.current_total, -1);
    }

    #[test]
    fn sync_is_absolute() {
        let mut ann = RollAnnotation::new(10);
        ann.sync_to(true, 2, 12);
        ann.sync_to(true, 2, 12);
        assert_eq!(ann, RollAnnotation {
            claimed: true,
            tokens_spent: 2,
            current_total: 12
        });
    }

    #[test]
    fn display_record() {
        let mut ann = RollAnnotation::new(10);
        ann.apply_spend(2);
        ann.apply_claim();
        let d = ann.display(RollId::new());
        assert_eq!(d.current_total, 12);
        assert_eq!(d.tokens_spent, 2);
        assert!(d.claimed);
        assert!(d.to_string().contains("total 12"));
        assert!(d.to_string().contains("token claimed"));
    }
}
