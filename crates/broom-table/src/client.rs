//! Player-session replicas and their local protocol paths.
//!
//! A `TableClient` holds an eventually-consistent replica of the table
//! state. It validates every action locally first (no channel traffic for
//! obviously bad input), applies mutations itself only over data it has
//! write authority for, and forwards everything else to the authority as a
//! typed request tracked in a pending table until the reply arrives.

use std::collections::{HashMap, HashSet};

use broom_core::{CoreResult, GameStore, ParticipantId, RollDisplay, RollEvent, RollId, UserId};

use crate::claim::apply_claim;
use crate::error::{TableError, TableResult};
use crate::message::{Broadcast, Denial, Request, RequestId};
use crate::policy::SpendPolicy;
use crate::spend::{apply_spend, validate_spend};

/// A user-visible notification, rendered by the external UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Informational (an action succeeded or was forwarded).
    Info(String),
    /// A warning (an action was rejected).
    Warn(String),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info(text) | Self::Warn(text) => f.write_str(text),
        }
    }
}

/// What a local action produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// The client held write authority and applied the mutation itself;
    /// the broadcast it originated must be fanned out to every session.
    Applied {
        /// The broadcast to distribute.
        broadcast: Broadcast,
        /// The display update for the local chat/UI layer.
        display: RollDisplay,
        /// The local notification.
        notice: Notice,
    },
    /// The mutation needs the authority; send the request over the channel.
    Send {
        /// The request to transmit.
        request: Request,
        /// The local notification.
        notice: Notice,
    },
}

/// One player session: a replica plus the local ends of both protocols.
#[derive(Debug)]
pub struct TableClient {
    user: UserId,
    participant: ParticipantId,
    store: GameStore,
    policy: SpendPolicy,
    write_authority: HashSet<ParticipantId>,
    pending: HashMap<RequestId, Request>,
}

impl TableClient {
    /// Create a client session for `user` playing `participant`, seeded
    /// with a replica of the table state. The client starts with write
    /// authority over its own participant's data.
    pub fn new(
        user: UserId,
        participant: ParticipantId,
        replica: GameStore,
        policy: SpendPolicy,
    ) -> Self {
        Self {
            user,
            participant,
            store: replica,
            policy,
            write_authority: HashSet::from([participant]),
            pending: HashMap::new(),
        }
    }

    /// Drop all local write authority: every mutation round-trips through
    /// the authority. Used for tables where the moderator owns all shared
    /// documents.
    #[must_use]
    pub fn replica_only(mut self) -> Self {
        self.write_authority.clear();
        self
    }

    /// The user driving this session.
    pub fn user(&self) -> UserId {
        self.user
    }

    /// The participant this session plays.
    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    /// The local replica.
    pub fn store(&self) -> &GameStore {
        &self.store
    }

    /// Requests sent but not yet answered.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Record a newly created roll event in the replica.
    pub fn observe_roll(&mut self, roll: RollEvent) -> CoreResult<RollId> {
        self.store.add_roll(roll)
    }

    /// Take the adversity token for a roll.
    ///
    /// Fails locally (no traffic) when the user does not control the roll's
    /// owner or the replica already shows the roll claimed; the authority
    /// re-checks both on the forwarded path.
    pub fn take_token(&mut self, roll_id: RollId) -> TableResult<ClientAction> {
        let owner_id = self.store.roll(roll_id)?.owner;
        let owner = self.store.participant(owner_id)?;
        if !owner.is_controlled_by(self.user) {
            return Err(TableError::Unauthorized);
        }
        if self.store.annotation(roll_id).is_some_and(|a| a.claimed) {
            return Err(TableError::AlreadyClaimed(roll_id));
        }
        let owner_name = owner.name.clone();

        if self.write_authority.contains(&owner_id) {
            let broadcast = apply_claim(&mut self.store, roll_id, self.user)?;
            let display = display_of(&broadcast);
            Ok(ClientAction::Applied {
                broadcast,
                display,
                notice: Notice::Info(format!("{owner_name} gained 1 adversity token.")),
            })
        } else {
            let request = Request::Claim {
                request_id: RequestId::new(),
                roll_event_id: roll_id,
                claimant_participant_id: owner_id,
            };
            self.pending.insert(request.request_id(), request.clone());
            Ok(ClientAction::Send {
                request,
                notice: Notice::Info(format!(
                    "Requested an adversity token for {owner_name}."
                )),
            })
        }
    }

    /// Spend this session's tokens to raise a roll's total.
    ///
    /// Validation (positive amount, control, optimistic balance) happens
    /// against the replica before anything reaches the channel. The local
    /// path applies only when this client holds write authority over both
    /// the spender's ledger and the roll's annotation, which means the
    /// spender is also the roll's owner.
    pub fn spend_tokens(&mut self, roll_id: RollId, amount: i64) -> TableResult<ClientAction> {
        let check = validate_spend(
            &self.store,
            &self.policy,
            roll_id,
            self.participant,
            self.user,
            amount,
        )?;
        let owner_id = self.store.roll(roll_id)?.owner;

        let local = owner_id == self.participant && self.write_authority.contains(&self.participant);
        if local {
            let broadcast = apply_spend(
                &mut self.store,
                roll_id,
                self.participant,
                check.amount,
                check.cost,
            )?;
            let display = display_of(&broadcast);
            Ok(ClientAction::Applied {
                broadcast,
                display,
                notice: Notice::Info(format!(
                    "Spent {} tokens to increase the roll total.",
                    check.amount
                )),
            })
        } else {
            let request = Request::Spend {
                request_id: RequestId::new(),
                roll_event_id: roll_id,
                spender_participant_id: self.participant,
                amount: check.amount,
                cost: check.cost,
            };
            self.pending.insert(request.request_id(), request.clone());
            Ok(ClientAction::Send {
                request,
                notice: Notice::Info(format!(
                    "Requested to spend {} tokens ({} from your pool).",
                    check.amount, check.cost
                )),
            })
        }
    }

    /// Absorb an authoritative broadcast into the replica.
    ///
    /// Absolute values make this idempotent: replaying a broadcast (or
    /// receiving the echo of one this client originated) is a no-op.
    pub fn apply_broadcast(&mut self, broadcast: &Broadcast) -> CoreResult<RollDisplay> {
        if let Some(request_id) = broadcast.in_reply_to {
            self.pending.remove(&request_id);
        }
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

    /// Absorb a targeted denial: the pending entry resolves with no state
    /// change and the user gets a warning notice.
    pub fn apply_denial(&mut self, denial: &Denial) -> Notice {
        self.pending.remove(&denial.in_reply_to);
        Notice::Warn(format!("Request denied: {}.", denial.reason))
    }
}

fn display_of(broadcast: &Broadcast) -> RollDisplay {
    RollDisplay {
        roll: broadcast.roll_event_id,
        current_total: broadcast.current_total,
        claimed: broadcast.claimed,
        tokens_spent: broadcast.tokens_spent,
    }
}
