//! The spend state machine: consume tokens to raise a roll's recorded
//! total.
//!
//! Spends are repeatable. Only `amount` ever reaches the roll total; the
//! spender's ledger is charged `cost`, which carries the policy premium for
//! boosting someone else's roll. Validation is split from application so
//! that clients can fail fast against their replica while the authority
//! re-runs the same checks against ground truth.

use broom_core::{GameStore, ParticipantId, RollId, UserId};

use crate::error::{TableError, TableResult};
use crate::message::Broadcast;
use crate::policy::SpendPolicy;

/// The result of validating a spend: what to charge and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendCheck {
    /// The validated positive amount.
    pub amount: u32,
    /// The ledger cost under the table's policy.
    pub cost: u32,
    /// Whether the spender counts as boosting their own roll.
    pub own_roll: bool,
}

/// Validate a spend without mutating anything.
///
/// Checks, in order: the amount is a positive integer, the acting user
/// controls the spender, and the spender's balance covers the policy cost.
/// Against a replica the balance check is optimistic only; the authority's
/// re-validation is the one that decides.
pub fn validate_spend(
    store: &GameStore,
    policy: &SpendPolicy,
    roll_id: RollId,
    spender_id: ParticipantId,
    acting_user: UserId,
    amount: i64,
) -> TableResult<SpendCheck> {
    let amount = u32::try_from(amount).map_err(|_| TableError::InvalidAmount(amount))?;
    if amount == 0 {
        return Err(TableError::InvalidAmount(0));
    }

    let roll = store.roll(roll_id)?;
    let spender = store.participant(spender_id)?;
    if !spender.is_controlled_by(acting_user) {
        return Err(TableError::Unauthorized);
    }

    let owner = store.participant(roll.owner)?;
    let own_roll = spender.id == owner.id || owner.is_controlled_by(acting_user);
    let cost = policy.cost_for(amount, own_roll);

    let have = spender.ledger.balance();
    if have < cost {
        return Err(TableError::InsufficientBalance { have, need: cost });
    }

    Ok(SpendCheck {
        amount,
        cost,
        own_roll,
    })
}

/// Apply a validated spend: charge the spender's ledger and raise the
/// roll's annotation. All-or-nothing; on error nothing has been mutated.
pub fn apply_spend(
    store: &mut GameStore,
    roll_id: RollId,
    spender_id: ParticipantId,
    amount: u32,
    cost: u32,
) -> TableResult<Broadcast> {
    // Resolve the roll before touching the ledger so a missing roll cannot
    // leave a charge behind.
    store.roll(roll_id)?;

    let new_balance = store
        .participant_mut(spender_id)?
        .ledger
        .try_adjust(-i64::from(cost))?;
    let annotation = store.annotation_or_init(roll_id)?;
    annotation.apply_spend(amount);

    Ok(Broadcast {
        roll_event_id: roll_id,
        claimed: annotation.claimed,
        tokens_spent: annotation.tokens_spent,
        current_total: annotation.current_total,
        participant_id: spender_id,
        new_balance,
        in_reply_to: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use broom_core::{Participant, RollEvent, StoreMeta};

    struct Fixture {
        store: GameStore,
        policy: SpendPolicy,
        owner_user: UserId,
        other_user: UserId,
        owner: ParticipantId,
        other: ParticipantId,
        roll_id: RollId,
    }

    fn fixture() -> Fixture {
        let owner_user = UserId::new();
        let other_user = UserId::new();
        let mut store = GameStore::new(StoreMeta::new("Test Table"));
        let owner = store.add_participant(
            Participant::new("Billy")
                .with_controller(owner_user)
                .with_tokens(3),
        );
        let other = store.add_participant(
            Participant::new("Hazel")
                .with_controller(other_user)
                .with_tokens(5),
        );
        let roll_id = store.add_roll(RollEvent::new(owner, "Flight", 10)).unwrap();
        Fixture {
            store,
            policy: SpendPolicy::default(),
            owner_user,
            other_user,
            owner,
            other,
            roll_id,
        }
    }

    #[test]
    fn own_spend_costs_face_value() {
        let f = fixture();
        let check = validate_spend(
            &f.store,
            &f.policy,
            f.roll_id,
            f.owner,
            f.owner_user,
            2,
        )
        .unwrap();
        assert_eq!(check.amount, 2);
        assert_eq!(check.cost, 2);
        assert!(check.own_roll);
    }

    #[test]
    fn cross_spend_pays_premium() {
        let f = fixture();
        let check = validate_spend(
            &f.store,
            &f.policy,
            f.roll_id,
            f.other,
            f.other_user,
            1,
        )
        .unwrap();
        assert_eq!(check.amount, 1);
        assert_eq!(check.cost, 2);
        assert!(!check.own_roll);
    }

    #[test]
    fn non_positive_amount_rejected() {
        let f = fixture();
        for amount in [-1, 0] {
            assert_eq!(
                validate_spend(&f.store, &f.policy, f.roll_id, f.owner, f.owner_user, amount)
                    .unwrap_err(),
                TableError::InvalidAmount(amount)
            );
        }
    }

    #[test]
    fn uncontrolled_spender_rejected() {
        let f = fixture();
        assert_eq!(
            validate_spend(&f.store, &f.policy, f.roll_id, f.owner, f.other_user, 1).unwrap_err(),
            TableError::Unauthorized
        );
    }

    #[test]
    fn insufficient_balance_fails_fast() {
        let f = fixture();
        // Hazel has 5 tokens; boosting Billy's roll by 3 costs 6.
        assert_eq!(
            validate_spend(&f.store, &f.policy, f.roll_id, f.other, f.other_user, 3).unwrap_err(),
            TableError::InsufficientBalance { have: 5, need: 6 }
        );
    }

    #[test]
    fn apply_charges_cost_but_raises_by_amount() {
        let mut f = fixture();
        let broadcast = apply_spend(&mut f.store, f.roll_id, f.other, 1, 2).unwrap();

        assert_eq!(broadcast.new_balance, 3);
        assert_eq!(broadcast.current_total, 11);
        assert_eq!(broadcast.tokens_spent, 1);
        assert_eq!(broadcast.participant_id, f.other);
    }

    #[test]
    fn repeated_spends_accumulate() {
        let mut f = fixture();
        apply_spend(&mut f.store, f.roll_id, f.owner, 1, 1).unwrap();
        let broadcast = apply_spend(&mut f.store, f.roll_id, f.owner, 2, 2).unwrap();

        assert_eq!(broadcast.tokens_spent, 3);
        assert_eq!(broadcast.current_total, 13);
        assert_eq!(broadcast.new_balance, 0);
    }

    #[test]
    fn failed_apply_leaves_store_unchanged() {
        let mut f = fixture();
        let before = f.store.clone();
        // Authoritative re-check: cost 10 exceeds Billy's 3 tokens.
        let err = apply_spend(&mut f.store, f.roll_id, f.owner, 10, 10).unwrap_err();
        assert_eq!(err, TableError::InsufficientBalance { have: 3, need: 10 });
        assert_eq!(f.store, before);
    }

    #[test]
    fn missing_roll_never_charges() {
        let mut f = fixture();
        let missing = RollId::new();
        assert!(matches!(
            apply_spend(&mut f.store, missing, f.owner, 1, 1).unwrap_err(),
            TableError::NotFound(_)
        ));
        assert_eq!(f.store.participant(f.owner).unwrap().ledger.balance(), 3);
    }
}
