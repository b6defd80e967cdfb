//! Entry representation and its growth stage

use super::id::{EntryId, UserId};
use super::{require_text, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Maturity of a note, from a fresh idea to a settled piece of writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthStage {
    Seed,
    Sprout,
    Bloom,
    Evergreen,
}

impl GrowthStage {
    pub const ALL: [GrowthStage; 4] = [
        GrowthStage::Seed,
        GrowthStage::Sprout,
        GrowthStage::Bloom,
        GrowthStage::Evergreen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Sprout => "sprout",
            Self::Bloom => "bloom",
            Self::Evergreen => "evergreen",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Seed => 0,
            Self::Sprout => 1,
            Self::Bloom => 2,
            Self::Evergreen => 3,
        }
    }

    /// Whether moving to `next` keeps the forward-only progression
    /// `seed -> sprout -> bloom -> evergreen`.
    ///
    /// Not enforced by the entry service, which accepts any stage change.
    pub fn can_advance_to(&self, next: GrowthStage) -> bool {
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown growth stage '{0}' (expected seed, sprout, bloom or evergreen)")]
pub struct ParseGrowthStageError(pub String);

impl FromStr for GrowthStage {
    type Err = ParseGrowthStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        GrowthStage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseGrowthStageError(s.to_string()))
    }
}

/// A stored note owned by a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub owner: UserId,
    pub title: String,
    pub content: String,
    pub growth_stage: GrowthStage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Materialize a new entry with a fresh id, stamped at `now`
    pub fn create(new: NewEntry, now: DateTime<Utc>) -> Self {
        Self {
            id: EntryId::new(),
            owner: new.owner,
            title: new.title,
            content: new.content,
            growth_stage: new.growth_stage,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update on top of this entry.
    ///
    /// Identity, owner and `created_at` are carried over from `self`.
    pub fn apply(&self, update: EntryUpdate, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id.clone(),
            owner: self.owner.clone(),
            title: update.title,
            content: update.content,
            growth_stage: update.growth_stage,
            created_at: self.created_at,
            updated_at: now,
        }
    }
}

/// Input for creating an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub owner: UserId,
    pub title: String,
    pub content: String,
    pub growth_stage: GrowthStage,
}

impl NewEntry {
    pub fn new(
        owner: impl Into<UserId>,
        title: impl Into<String>,
        content: impl Into<String>,
        growth_stage: GrowthStage,
    ) -> Self {
        Self {
            owner: owner.into(),
            title: title.into(),
            content: content.into(),
            growth_stage,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("owner", self.owner.as_str())?;
        require_text("title", &self.title)?;
        require_text("content", &self.content)
    }
}

/// Full replacement of an entry's editable fields.
///
/// `owner` is the identity asserted by the caller and must match the stored owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryUpdate {
    pub id: EntryId,
    pub owner: UserId,
    pub title: String,
    pub content: String,
    pub growth_stage: GrowthStage,
}

impl EntryUpdate {
    pub fn new(
        id: impl Into<EntryId>,
        owner: impl Into<UserId>,
        title: impl Into<String>,
        content: impl Into<String>,
        growth_stage: GrowthStage,
    ) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            title: title.into(),
            content: content.into(),
            growth_stage,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("id", self.id.as_str())?;
        require_text("title", &self.title)?;
        require_text("content", &self.content)
    }
}
