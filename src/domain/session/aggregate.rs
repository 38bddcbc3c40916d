//! Session aggregate entity.
//!
//! A session is the durable unit of one brief conversation: the ordered turn
//! log plus the brief data gathered so far.
//!
//! # Invariants
//!
//! - Turns are only ever appended; none is edited or removed.
//! - Brief data only changes through [`Session::merge_extraction`], which
//!   never replaces a filled field with a blank one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::turn::Turn;
use crate::domain::brief::BriefData;
use crate::domain::foundation::{SessionId, Timestamp};

/// Session aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Client-supplied identifier.
    id: SessionId,

    /// Append-only conversation log.
    #[serde(rename = "message")]
    turns: Vec<Turn>,

    /// Brief fields gathered so far.
    data: BriefData,

    /// Owning user, when the client supplied one.
    owner_id: Option<String>,

    /// Downstream campaign record this brief updates, if any.
    campaign_id: Option<String>,

    /// When the session was created.
    created_at: Timestamp,

    /// When the session was last changed.
    updated_at: Timestamp,
}

impl Session {
    /// Creates an empty session.
    pub fn new(id: SessionId) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            turns: Vec::new(),
            data: BriefData::new(),
            owner_id: None,
            campaign_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes a session from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SessionId,
        turns: Vec<Turn>,
        data: BriefData,
        owner_id: Option<String>,
        campaign_id: Option<String>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            turns,
            data,
            owner_id,
            campaign_id,
            created_at,
            updated_at,
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn data(&self) -> &BriefData {
        &self.data
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn campaign_id(&self) -> Option<&str> {
        self.campaign_id.as_deref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    // ───────────────────────────────────────────────────────────────
    // Mutations
    // ───────────────────────────────────────────────────────────────

    /// Appends a turn to the log.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.touch();
    }

    /// Merges extraction arguments into the brief data.
    ///
    /// Returns the keys that were written.
    pub fn merge_extraction(&mut self, args: &Map<String, Value>) -> Vec<String> {
        let written = self.data.merge(args);
        self.touch();
        written
    }

    /// Records the owner when a non-blank one is supplied.
    pub fn assign_owner(&mut self, owner_id: Option<&str>) {
        if let Some(owner) = non_blank(owner_id) {
            self.owner_id = Some(owner.to_string());
            self.touch();
        }
    }

    /// Records the campaign when a non-blank one is supplied.
    pub fn assign_campaign(&mut self, campaign_id: Option<&str>) {
        if let Some(campaign) = non_blank(campaign_id) {
            self.campaign_id = Some(campaign.to_string());
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
