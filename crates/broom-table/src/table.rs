//! In-process channel harness wiring one authority to its clients.
//!
//! Models the table's transport: per-sender FIFO request delivery to the
//! authority and fan-out of broadcasts to every session (the authority's
//! ground truth included, so client-originated broadcasts over self-owned
//! data land everywhere). Denials are delivered only to the session whose
//! request they answer. Requests drain one at a time, which is exactly the
//! serialization the annotation read-modify-write needs.

use std::collections::{HashMap, VecDeque};

use broom_core::{CoreResult, RollDisplay, RollEvent, RollId, UserId};

use crate::authority::{Authority, ConfirmationPrompt, Outcome};
use crate::client::{ClientAction, Notice, TableClient};
use crate::error::{TableError, TableResult};
use crate::message::{Broadcast, Request, RequestId};

/// Handle for one joined client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientId(usize);

/// Something observable that happened at the table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    /// An authoritative display update every session rendered.
    Display(RollDisplay),
    /// A notification for one user.
    Notice {
        /// Who sees it.
        user: UserId,
        /// What they see.
        notice: Notice,
    },
    /// The moderator is being asked to approve a cross-participant spend.
    Prompt(ConfirmationPrompt),
}

/// One authority plus any number of client sessions over FIFO queues.
#[derive(Debug)]
pub struct Table {
    authority: Authority,
    clients: Vec<TableClient>,
    requests: VecDeque<(UserId, Request)>,
    origins: HashMap<RequestId, usize>,
    events: Vec<TableEvent>,
}

impl Table {
    /// Create a table around an authority.
    pub fn new(authority: Authority) -> Self {
        Self {
            authority,
            clients: Vec::new(),
            requests: VecDeque::new(),
            origins: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Join a client session.
    pub fn join(&mut self, client: TableClient) -> ClientId {
        self.clients.push(client);
        ClientId(self.clients.len() - 1)
    }

    /// The authority session.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// A joined client session.
    pub fn client(&self, id: ClientId) -> &TableClient {
        &self.clients[id.0]
    }

    /// Register a new roll event with the authority and every replica.
    pub fn post_roll(&mut self, roll: RollEvent) -> CoreResult<RollId> {
        let id = self.authority.observe_roll(roll.clone())?;
        for client in &mut self.clients {
            client.observe_roll(roll.clone())?;
        }
        Ok(id)
    }

    /// Drain everything observable since the last call.
    pub fn drain_events(&mut self) -> Vec<TableEvent> {
        std::mem::take(&mut self.events)
    }

    /// Requests queued but not yet pumped.
    pub fn queued_requests(&self) -> usize {
        self.requests.len()
    }

    // -----------------------------------------------------------------------
    // Player actions
    // -----------------------------------------------------------------------

    /// A client takes the adversity token for a roll.
    pub fn claim(&mut self, id: ClientId, roll_id: RollId) -> TableResult<()> {
        let action = self.clients[id.0].take_token(roll_id)?;
        self.route(id, action)
    }

    /// A client spends its participant's tokens on a roll.
    pub fn spend(&mut self, id: ClientId, roll_id: RollId, amount: i64) -> TableResult<()> {
        let action = self.clients[id.0].spend_tokens(roll_id, amount)?;
        self.route(id, action)
    }

    // -----------------------------------------------------------------------
    // Moderator actions
    // -----------------------------------------------------------------------

    /// The moderator claims a token directly against ground truth.
    pub fn moderator_claim(&mut self, roll_id: RollId, acting_user: UserId) -> TableResult<()> {
        let broadcast = self.authority.claim(roll_id, acting_user)?;
        self.fanout(broadcast)?;
        Ok(())
    }

    /// The moderator approves a suspended spend.
    pub fn approve(&mut self, request_id: RequestId) -> TableResult<()> {
        let outcome = self.authority.resolve(request_id, true)?;
        self.dispatch(request_id, outcome)
    }

    /// The moderator rejects a suspended spend.
    pub fn deny(&mut self, request_id: RequestId) -> TableResult<()> {
        let outcome = self.authority.resolve(request_id, false)?;
        self.dispatch(request_id, outcome)
    }

    /// End-of-session teardown: outstanding requests are discarded, not
    /// retried. Returns how many were dropped.
    pub fn end_session(&mut self) -> usize {
        let dropped = self.authority.discard_pending();
        self.origins.clear();
        self.requests.clear();
        dropped
    }

    // -----------------------------------------------------------------------
    // Delivery
    // -----------------------------------------------------------------------

    /// Deliver all queued requests to the authority, one at a time in
    /// receipt order, routing each outcome back out.
    pub fn pump(&mut self) -> TableResult<()> {
        while let Some((from, request)) = self.requests.pop_front() {
            let request_id = request.request_id();
            let outcome = self.authority.handle(from, request);
            self.dispatch(request_id, outcome)?;
        }
        Ok(())
    }

    fn route(&mut self, id: ClientId, action: ClientAction) -> TableResult<()> {
        let user = self.clients[id.0].user();
        match action {
            ClientAction::Applied {
                broadcast, notice, ..
            } => {
                self.events.push(TableEvent::Notice { user, notice });
                self.fanout(broadcast)?;
            }
            ClientAction::Send { request, notice } => {
                self.events.push(TableEvent::Notice { user, notice });
                self.origins.insert(request.request_id(), id.0);
                self.requests.push_back((user, request));
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, request_id: RequestId, outcome: Outcome) -> TableResult<()> {
        match outcome {
            Outcome::Approve(broadcast) => {
                self.origins.remove(&request_id);
                self.fanout(broadcast)?;
            }
            Outcome::Deny(denial) => {
                if let Some(idx) = self.origins.remove(&request_id) {
                    let user = self.clients[idx].user();
                    let notice = self.clients[idx].apply_denial(&denial);
                    self.events.push(TableEvent::Notice { user, notice });
                }
            }
            Outcome::AwaitConfirmation(prompt) => {
                // Origin entry stays until the moderator resolves it.
                self.events.push(TableEvent::Prompt(prompt));
            }
        }
        Ok(())
    }

    fn fanout(&mut self, broadcast: Broadcast) -> TableResult<()> {
        let display = self
            .authority
            .apply_broadcast(&broadcast)
            .map_err(TableError::from)?;
        for client in &mut self.clients {
            client.apply_broadcast(&broadcast)?;
        }
        self.events.push(TableEvent::Display(display));
        Ok(())
    }
}
