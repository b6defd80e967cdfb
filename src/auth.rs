//! Ownership check applied before every read or mutation of an owned resource

use crate::error::{DomainError, DomainResult};
use crate::model::UserId;

/// Allow the call only if `requester` is present, non-empty and equal to `owner`.
///
/// `resource` names the target in the error and the denial log line.
pub fn authorize(
    resource: impl std::fmt::Display,
    owner: &UserId,
    requester: Option<&UserId>,
) -> DomainResult<()> {
    match requester {
        Some(who) if !who.is_empty() && who == owner => Ok(()),
        _ => {
            let resource = resource.to_string();
            tracing::warn!(
                %resource,
                requester = requester.map(UserId::as_str).unwrap_or(""),
                "ownership check denied"
            );
            Err(DomainError::unauthorized(resource, requester))
        }
    }
}
