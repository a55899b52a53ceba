//! The claim state machine: convert a roll outcome into a token grant for
//! its owner, at most once per roll.
//!
//! `Open -> Claimed` is the only transition and it is terminal. The guard is
//! enforced against whichever store the caller holds: clients check their
//! replica optimistically, the authority re-checks ground truth, so two
//! racing claims resolve to exactly one winner.

use broom_core::{GameStore, RollId, UserId};

use crate::error::{TableError, TableResult};
use crate::message::Broadcast;

/// Validate and apply a claim against a store.
///
/// On success the roll is marked claimed, the owner's ledger gains one
/// token, and the resulting broadcast is returned. On error nothing has
/// been mutated.
pub fn apply_claim(
    store: &mut GameStore,
    roll_id: RollId,
    acting_user: UserId,
) -> TableResult<Broadcast> {
    let owner_id = store.roll(roll_id)?.owner;
    let owner = store.participant(owner_id)?;
    if !owner.is_controlled_by(acting_user) {
        return Err(TableError::Unauthorized);
    }
    if store.annotation_or_init(roll_id)?.claimed {
        return Err(TableError::AlreadyClaimed(roll_id));
    }

    // Ledger first: it is the only mutation that can still fail, and a
    // rejected adjustment must leave the annotation untouched.
    let new_balance = store.participant_mut(owner_id)?.ledger.try_adjust(1)?;
    let annotation = store.annotation_or_init(roll_id)?;
    annotation.apply_claim();

    Ok(Broadcast {
        roll_event_id: roll_id,
        claimed: true,
        tokens_spent: annotation.tokens_spent,
        current_total: annotation.current_total,
        participant_id: owner_id,
        new_balance,
        in_reply_to: None,
    })
}
