//! The game store: the explicit registry of participants, rolls, and
//! annotations.
//!
//! One instance is ground truth, owned by the table authority; every other
//! session holds its own replica instance updated only by
//! authority-originated broadcasts. Protocol handlers receive the store by
//! reference rather than reaching through ambient globals.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::participant::{Participant, ParticipantId};
use crate::roll::{RollAnnotation, RollDisplay, RollEvent, RollId};

/// Metadata about the table session itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMeta {
    /// Display name of the table.
    pub name: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl StoreMeta {
    /// Create metadata with the current timestamp.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Registry of all participants, roll events, and roll annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStore {
    /// Session metadata.
    pub meta: StoreMeta,
    participants: HashMap<ParticipantId, Participant>,
    rolls: HashMap<RollId, RollEvent>,
    annotations: HashMap<RollId, RollAnnotation>,
}

impl GameStore {
    /// Create an empty store.
    pub fn new(meta: StoreMeta) -> Self {
        Self {
            meta,
            participants: HashMap::new(),
            rolls: HashMap::new(),
            annotations: HashMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Participants
    // -----------------------------------------------------------------------

    /// Register a participant. Returns its ID.
    pub fn add_participant(&mut self, participant: Participant) -> ParticipantId {
        let id = participant.id;
        self.participants.insert(id, participant);
        id
    }

    /// Get a participant by ID.
    pub fn participant(&self, id: ParticipantId) -> CoreResult<&Participant> {
        self.participants
            .get(&id)
            .ok_or(CoreError::ParticipantNotFound(id))
    }

    /// Get a mutable participant by ID.
    pub fn participant_mut(&mut self, id: ParticipantId) -> CoreResult<&mut Participant> {
        self.participants
            .get_mut(&id)
            .ok_or(CoreError::ParticipantNotFound(id))
    }

    /// Iterate all participants in unspecified order.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    // -----------------------------------------------------------------------
    // Rolls and annotations
    // -----------------------------------------------------------------------

    /// Register a roll event. Rejects an ID that is already present, since
    /// roll events are immutable once created.
    pub fn add_roll(&mut self, roll: RollEvent) -> CoreResult<RollId> {
        let id = roll.id;
        if self.rolls.contains_key(&id) {
            return Err(CoreError::DuplicateRoll(id));
        }
        self.rolls.insert(id, roll);
        Ok(id)
    }

    /// Get a roll event by ID.
    pub fn roll(&self, id: RollId) -> CoreResult<&RollEvent> {
        self.rolls.get(&id).ok_or(CoreError::RollNotFound(id))
    }

    /// The annotation for a roll, if one has been created.
    pub fn annotation(&self, id: RollId) -> Option<&RollAnnotation> {
        self.annotations.get(&id)
    }

    /// The annotation for a roll, created lazily from the roll's base total
    /// on first access. Annotations are append-only: there is no removal.
    pub fn annotation_or_init(&mut self, id: RollId) -> CoreResult<&mut RollAnnotation> {
        let base_total = self.roll(id)?.base_total;
        Ok(self
            .annotations
            .entry(id)
            .or_insert_with(|| RollAnnotation::new(base_total)))
    }

    /// The display record for a roll, reflecting the annotation if present
    /// or the bare base total otherwise.
    pub fn display(&self, id: RollId) -> CoreResult<RollDisplay> {
        let roll = self.roll(id)?;
        Ok(match self.annotations.get(&id) {
            Some(ann) => ann.display(id),
            None => RollAnnotation::new(roll.base_total).display(id),
        })
    }

    /// Number of annotations created so far.
    pub fn annotation_count(&self) -> usize {
        self.annotations.len()
    }
}
