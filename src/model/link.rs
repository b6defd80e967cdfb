//! Directed links between entries

use super::id::{EntryId, UserId};
use super::{require_text, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The ordered pair that identifies a link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    pub source_id: EntryId,
    pub target_id: EntryId,
}

impl LinkKey {
    pub fn new(source_id: impl Into<EntryId>, target_id: impl Into<EntryId>) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("source_id", self.source_id.as_str())?;
        require_text("target_id", self.target_id.as_str())
    }
}

impl std::fmt::Display for LinkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source_id, self.target_id)
    }
}

/// A directed edge `source_id -> target_id` owned by the user who created it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source_id: EntryId,
    pub target_id: EntryId,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
}

impl Link {
    pub fn create(new: NewLink, now: DateTime<Utc>) -> Self {
        Self {
            source_id: new.source_id,
            target_id: new.target_id,
            owner: new.owner,
            created_at: now,
        }
    }

    pub fn key(&self) -> LinkKey {
        LinkKey::new(self.source_id.clone(), self.target_id.clone())
    }
}

/// Input for creating a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub source_id: EntryId,
    pub target_id: EntryId,
    pub owner: UserId,
}

impl NewLink {
    pub fn new(
        source_id: impl Into<EntryId>,
        target_id: impl Into<EntryId>,
        owner: impl Into<UserId>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            owner: owner.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("source_id", self.source_id.as_str())?;
        require_text("target_id", self.target_id.as_str())?;
        require_text("owner", self.owner.as_str())?;
        if self.source_id == self.target_id {
            return Err(ValidationError::SelfLink(self.source_id.clone()));
        }
        Ok(())
    }
}
