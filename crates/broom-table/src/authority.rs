//! The authority session: ground truth and request arbitration.
//!
//! Exactly one session at a table is the authority (the moderator). It owns
//! the ground-truth [`GameStore`], re-validates every incoming request
//! against it, and is the only writer for data the requester does not
//! control. Requests are applied one at a time through `&mut self`, which
//! serializes every annotation read-modify-write; no spend can be lost to a
//! stale-total race.

use std::collections::HashMap;

use broom_core::{GameStore, ParticipantId, RollDisplay, RollEvent, RollId, UserId};
use broom_core::CoreResult;
use tracing::{debug, info, warn};

use crate::claim::apply_claim;
use crate::error::{TableError, TableResult};
use crate::message::{Broadcast, Denial, Request, RequestId};
use crate::policy::SpendPolicy;
use crate::spend::{apply_spend, validate_spend};

/// A cross-participant spend waiting for the moderator's decision.
///
/// There is no timeout: the entry stays until explicitly resolved or the
/// session ends, at which point it is discarded, not retried.
#[derive(Debug, Clone, Copy)]
struct PendingSpend {
    from: UserId,
    roll_event_id: RollId,
    spender: ParticipantId,
    amount: u32,
    cost: u32,
}

/// What the moderator is asked to approve.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationPrompt {
    /// The suspended request.
    pub request_id: RequestId,
    /// Who pays.
    pub spender_name: String,
    /// Whose roll is boosted.
    pub owner_name: String,
    /// How much the roll total would rise.
    pub amount: u32,
    /// What the spender's ledger would be charged.
    pub cost: u32,
}

impl std::fmt::Display for ConfirmationPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} wants to spend {} adversity tokens on {}'s roll to increase it by {}. Approve?",
            self.spender_name, self.cost, self.owner_name, self.amount
        )
    }
}

/// The authority's answer to one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The mutation was applied; fan the broadcast out to every session.
    Approve(Broadcast),
    /// The request was rejected; return the denial to its origin only.
    Deny(Denial),
    /// The request is suspended awaiting the moderator's decision.
    AwaitConfirmation(ConfirmationPrompt),
}

/// The single session holding ground-truth write access.
#[derive(Debug)]
pub struct Authority {
    store: GameStore,
    policy: SpendPolicy,
    pending: HashMap<RequestId, PendingSpend>,
}

impl Authority {
    /// Create an authority over the given ground-truth store.
    pub fn new(store: GameStore, policy: SpendPolicy) -> Self {
        Self {
            store,
            policy,
            pending: HashMap::new(),
        }
    }

    /// The ground-truth store.
    pub fn store(&self) -> &GameStore {
        &self.store
    }

    /// The table's spend policy.
    pub fn policy(&self) -> SpendPolicy {
        self.policy
    }

    /// Register a new roll event in ground truth.
    pub fn observe_roll(&mut self, roll: RollEvent) -> CoreResult<RollId> {
        self.store.add_roll(roll)
    }

    /// Number of requests waiting for the moderator.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Process one request against ground truth.
    ///
    /// `from` identifies the sending user; every precondition is re-checked
    /// here regardless of what the requesting client already validated.
    pub fn handle(&mut self, from: UserId, request: Request) -> Outcome {
        match request {
            Request::Claim {
                request_id,
                roll_event_id,
                claimant_participant_id,
            } => {
                let result = self.revalidate_claim(from, roll_event_id, claimant_participant_id);
                match result {
                    Ok(mut broadcast) => {
                        broadcast.in_reply_to = Some(request_id);
                        Outcome::Approve(broadcast)
                    }
                    Err(err) => {
                        self.deny(request_id, roll_event_id, claimant_participant_id, &err)
                    }
                }
            }

            Request::Spend {
                request_id,
                roll_event_id,
                spender_participant_id,
                amount,
                cost,
            } => {
                let check = validate_spend(
                    &self.store,
                    &self.policy,
                    roll_event_id,
                    spender_participant_id,
                    from,
                    i64::from(amount),
                );
                let check = match check {
                    Ok(check) => check,
                    Err(err) => {
                        return self.deny(request_id, roll_event_id, spender_participant_id, &err);
                    }
                };
                if check.cost != cost {
                    // The requester computed its cost under a stale or
                    // divergent policy; ground truth wins.
                    warn!(%request_id, client_cost = cost, authority_cost = check.cost,
                        "request cost disagrees with table policy");
                }

                if check.own_roll {
                    match apply_spend(
                        &mut self.store,
                        roll_event_id,
                        spender_participant_id,
                        check.amount,
                        check.cost,
                    ) {
                        Ok(mut broadcast) => {
                            broadcast.in_reply_to = Some(request_id);
                            Outcome::Approve(broadcast)
                        }
                        Err(err) => {
                            self.deny(request_id, roll_event_id, spender_participant_id, &err)
                        }
                    }
                } else {
                    // Cross-participant spend: suspend until the moderator
                    // decides. Names resolved eagerly; validation above
                    // guarantees both lookups succeed.
                    self.suspend(
                        request_id,
                        from,
                        roll_event_id,
                        spender_participant_id,
                        check.amount,
                        check.cost,
                    )
                }
            }
        }
    }

    /// Resolve a suspended cross-participant spend.
    ///
    /// Approval re-applies against current ground truth (the balance may
    /// have moved while the prompt was open); rejection produces a denial
    /// and no mutation. Unknown IDs are an error for the caller, not a
    /// protocol denial.
    pub fn resolve(&mut self, request_id: RequestId, approved: bool) -> TableResult<Outcome> {
        let pending = self
            .pending
            .remove(&request_id)
            .ok_or_else(|| TableError::NotFound(format!("no pending request {request_id}")))?;

        if !approved {
            info!(%request_id, user = %pending.from, "moderator denied the spend");
            return Ok(Outcome::Deny(Denial {
                in_reply_to: request_id,
                roll_event_id: pending.roll_event_id,
                spender_participant_id: pending.spender,
                reason: TableError::Denied.deny_reason(),
            }));
        }

        match apply_spend(
            &mut self.store,
            pending.roll_event_id,
            pending.spender,
            pending.amount,
            pending.cost,
        ) {
            Ok(mut broadcast) => {
                broadcast.in_reply_to = Some(request_id);
                Ok(Outcome::Approve(broadcast))
            }
            Err(err) => Ok(self.deny(request_id, pending.roll_event_id, pending.spender, &err)),
        }
    }

    /// Drop every pending request without replying. Session teardown only.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        if dropped > 0 {
            info!(dropped, "discarding unresolved spend requests");
        }
        self.pending.clear();
        dropped
    }

    // -----------------------------------------------------------------------
    // Moderator-local actions (the authority session acting at its own table)
    // -----------------------------------------------------------------------

    /// Claim a roll's token directly against ground truth.
    pub fn claim(&mut self, roll_id: RollId, acting_user: UserId) -> TableResult<Broadcast> {
        apply_claim(&mut self.store, roll_id, acting_user)
    }

    /// Spend directly against ground truth. The moderator needs no
    /// confirmation from themselves.
    pub fn spend(
        &mut self,
        roll_id: RollId,
        spender: ParticipantId,
        acting_user: UserId,
        amount: i64,
    ) -> TableResult<Broadcast> {
        let check = validate_spend(&self.store, &self.policy, roll_id, spender, acting_user, amount)?;
        apply_spend(&mut self.store, roll_id, spender, check.amount, check.cost)
    }

    /// Absorb a broadcast originated by a client that held write authority
    /// over its own data. Absolute values make this idempotent.
    pub fn apply_broadcast(&mut self, broadcast: &Broadcast) -> CoreResult<RollDisplay> {
        self.store
            .participant_mut(broadcast.participant_id)?
            .ledger
            .sync_to(broadcast.new_balance);
        let annotation = self.store.annotation_or_init(broadcast.roll_event_id)?;
        annotation.sync_to(
            broadcast.claimed,
            broadcast.tokens_spent,
            broadcast.current_total,
        );
        Ok(annotation.display(broadcast.roll_event_id))
    }

    fn revalidate_claim(
        &mut self,
        from: UserId,
        roll_id: RollId,
        claimant: ParticipantId,
    ) -> TableResult<Broadcast> {
        // The claimant named in the request must be the roll's owner; the
        // token always goes to whoever rolled.
        let owner = self.store.roll(roll_id)?.owner;
        if owner != claimant {
            return Err(TableError::Unauthorized);
        }
        apply_claim(&mut self.store, roll_id, from)
    }

    fn suspend(
        &mut self,
        request_id: RequestId,
        from: UserId,
        roll_event_id: RollId,
        spender: ParticipantId,
        amount: u32,
        cost: u32,
    ) -> Outcome {
        let spender_name = match self.store.participant(spender) {
            Ok(p) => p.name.clone(),
            Err(err) => return self.deny(request_id, roll_event_id, spender, &err.into()),
        };
        let owner_name = self
            .store
            .roll(roll_event_id)
            .ok()
            .and_then(|roll| self.store.participant(roll.owner).ok())
            .map(|p| p.name.clone())
            .unwrap_or_default();

        self.pending.insert(request_id, PendingSpend {
            from,
            roll_event_id,
            spender,
            amount,
            cost,
        });
        debug!(%request_id, user = %from, "spend suspended for confirmation");

        Outcome::AwaitConfirmation(ConfirmationPrompt {
            request_id,
            spender_name,
            owner_name,
            amount,
            cost,
        })
    }

    fn deny(
        &self,
        request_id: RequestId,
        roll_event_id: RollId,
        participant: ParticipantId,
        err: &TableError,
    ) -> Outcome {
        if let TableError::NotFound(detail) = err {
            // Stale references are logged and dropped, never retried.
            warn!(%request_id, %detail, "dropping request for unknown target");
        }
        Outcome::Deny(Denial {
            in_reply_to: request_id,
            roll_event_id,
            spender_participant_id: participant,
            reason: err.deny_reason(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DenyReason;
    use broom_core::{Participant, StoreMeta};

    struct Fixture {
        authority: Authority,
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
        let roll = RollEvent::new(owner, "Flight", 10);
        let roll_id = roll.id;
        let mut authority = Authority::new(store, SpendPolicy::default());
        authority.observe_roll(roll).unwrap();
        Fixture {
            authority,
            owner_user,
            other_user,
            owner,
            other,
            roll_id,
        }
    }

    fn claim_request(f: &Fixture) -> Request {
        Request::Claim {
            request_id: RequestId::new(),
            roll_event_id: f.roll_id,
            claimant_participant_id: f.owner,
        }
    }

    #[test]
    fn claim_approved_and_correlated() {
        let mut f = fixture();
        let request = claim_request(&f);
        let request_id = request.request_id();

        match f.authority.handle(f.owner_user, request) {
            Outcome::Approve(b) => {
                assert!(b.claimed);
                assert_eq!(b.new_balance, 4);
                assert_eq!(b.in_reply_to, Some(request_id));
            }
            other => panic!("expected approval, got {other:?}"),
        }
    }

    #[test]
    fn racing_claims_one_winner() {
        let mut f = fixture();
        let first = f.authority.handle(f.owner_user, claim_request(&f));
        let second = f.authority.handle(f.owner_user, claim_request(&f));

        assert!(matches!(first, Outcome::Approve(_)));
        match second {
            Outcome::Deny(d) => assert_eq!(d.reason, DenyReason::AlreadyClaimed),
            other => panic!("expected denial, got {other:?}"),
        }
        // The owner gained exactly one token.
        let balance = f.authority.store().participant(f.owner).unwrap().ledger.balance();
        assert_eq!(balance, 4);
    }

    #[test]
    fn claim_for_wrong_participant_denied() {
        let mut f = fixture();
        let request = Request::Claim {
            request_id: RequestId::new(),
            roll_event_id: f.roll_id,
            claimant_participant_id: f.other,
        };
        match f.authority.handle(f.other_user, request) {
            Outcome::Deny(d) => assert_eq!(d.reason, DenyReason::Unauthorized),
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[test]
    fn own_spend_applied_without_confirmation() {
        let mut f = fixture();
        let request = Request::Spend {
            request_id: RequestId::new(),
            roll_event_id: f.roll_id,
            spender_participant_id: f.owner,
            amount: 2,
            cost: 2,
        };
        match f.authority.handle(f.owner_user, request) {
            Outcome::Approve(b) => {
                assert_eq!(b.new_balance, 1);
                assert_eq!(b.current_total, 12);
            }
            other => panic!("expected approval, got {other:?}"),
        }
        assert_eq!(f.authority.pending_count(), 0);
    }

    #[test]
    fn cross_spend_suspends_then_approves() {
        let mut f = fixture();
        let request_id = RequestId::new();
        let request = Request::Spend {
            request_id,
            roll_event_id: f.roll_id,
            spender_participant_id: f.other,
            amount: 1,
            cost: 2,
        };

        let prompt = match f.authority.handle(f.other_user, request) {
            Outcome::AwaitConfirmation(prompt) => prompt,
            other => panic!("expected suspension, got {other:?}"),
        };
        assert_eq!(prompt.spender_name, "Hazel");
        assert_eq!(prompt.owner_name, "Billy");
        assert_eq!(prompt.cost, 2);
        // Nothing applied yet.
        assert_eq!(
            f.authority.store().participant(f.other).unwrap().ledger.balance(),
            5
        );

        match f.authority.resolve(request_id, true).unwrap() {
            Outcome::Approve(b) => {
                assert_eq!(b.new_balance, 3);
                assert_eq!(b.current_total, 11);
                assert_eq!(b.tokens_spent, 1);
                assert_eq!(b.in_reply_to, Some(request_id));
            }
            other => panic!("expected approval, got {other:?}"),
        }
    }

    #[test]
    fn cross_spend_rejection_leaves_state() {
        let mut f = fixture();
        let request_id = RequestId::new();
        let request = Request::Spend {
            request_id,
            roll_event_id: f.roll_id,
            spender_participant_id: f.other,
            amount: 1,
            cost: 2,
        };
        f.authority.handle(f.other_user, request);

        match f.authority.resolve(request_id, false).unwrap() {
            Outcome::Deny(d) => assert_eq!(d.reason, DenyReason::Denied),
            other => panic!("expected denial, got {other:?}"),
        }
        assert_eq!(
            f.authority.store().participant(f.other).unwrap().ledger.balance(),
            5
        );
        assert_eq!(f.authority.store().display(f.roll_id).unwrap().current_total, 10);
    }

    #[test]
    fn resolve_unknown_request_is_error() {
        let mut f = fixture();
        assert!(matches!(
            f.authority.resolve(RequestId::new(), true).unwrap_err(),
            TableError::NotFound(_)
        ));
    }

    #[test]
    fn approval_rechecks_current_balance() {
        let mut f = fixture();
        let request_id = RequestId::new();
        f.authority.handle(f.other_user, Request::Spend {
            request_id,
            roll_event_id: f.roll_id,
            spender_participant_id: f.other,
            amount: 2,
            cost: 4,
        });

        // Hazel spends her tokens elsewhere while the prompt is open.
        let own_roll = RollEvent::new(f.other, "Brains", 6);
        let own_roll_id = f.authority.observe_roll(own_roll).unwrap();
        f.authority
            .spend(own_roll_id, f.other, f.other_user, 3)
            .unwrap();

        match f.authority.resolve(request_id, true).unwrap() {
            Outcome::Deny(d) => assert_eq!(d.reason, DenyReason::InsufficientBalance),
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[test]
    fn unknown_roll_denied_not_found() {
        let mut f = fixture();
        let request = Request::Claim {
            request_id: RequestId::new(),
            roll_event_id: RollId::new(),
            claimant_participant_id: f.owner,
        };
        match f.authority.handle(f.owner_user, request) {
            Outcome::Deny(d) => assert_eq!(d.reason, DenyReason::NotFound),
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[test]
    fn discard_pending_drops_all() {
        let mut f = fixture();
        let request_id = RequestId::new();
        f.authority.handle(f.other_user, Request::Spend {
            request_id,
            roll_event_id: f.roll_id,
            spender_participant_id: f.other,
            amount: 1,
            cost: 2,
        });
        assert_eq!(f.authority.pending_count(), 1);
        assert_eq!(f.authority.discard_pending(), 1);
        assert_eq!(f.authority.pending_count(), 0);
        // Discarded, not retried: resolving now fails.
        assert!(f.authority.resolve(request_id, true).is_err());
    }
}
