//! Garden data model: entries, links, and the identifiers that tie them together

mod entry;
mod id;
mod link;

pub use entry::{Entry, EntryUpdate, GrowthStage, NewEntry, ParseGrowthStageError};
pub use id::{EntryId, UserId};
pub use link::{Link, LinkKey, NewLink};

use thiserror::Error;

/// Why a piece of input was refused before it reached storage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error(transparent)]
    GrowthStage(#[from] ParseGrowthStageError),

    #[error("entry {0} cannot link to itself")]
    SelfLink(EntryId),

    #[error("invalid timestamp: {0}")]
    Timestamp(String),

    /// Storage refused the write on a constraint (missing endpoint, duplicate link)
    #[error("{0}")]
    Rejected(String),
}

/// Fails with `EmptyField` when `value` is empty after trimming.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

/// Current UTC time at the microsecond precision every store keeps.
pub fn now_utc() -> chrono::DateTime<chrono::Utc> {
    use chrono::SubsecRound;
    chrono::Utc::now().trunc_subsecs(6)
}
