//! Entry lifecycle: validation, ownership and persistence of entries

use crate::auth::authorize;
use crate::call::CallContext;
use crate::clock::{Clock, SystemClock};
use crate::error::DomainResult;
use crate::model::{Entry, EntryId, EntryUpdate, NewEntry, UserId};
use crate::storage::EntryStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Orchestrates create/get/update/delete/list for entries.
///
/// Holds no mutable state; clones share the same store and clock.
#[derive(Clone)]
pub struct EntryService {
    store: Arc<dyn EntryStore>,
    clock: Arc<dyn Clock>,
}

impl EntryService {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn EntryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Validate and store a new entry.
    ///
    /// Assigns the id and sets `created_at = updated_at = now`.
    pub async fn create(&self, ctx: &CallContext, new: NewEntry) -> DomainResult<Entry> {
        new.validate()?;
        let entry = Entry::create(new, self.clock.now());
        debug!(entry = %entry.id, owner = %entry.owner, stage = %entry.growth_stage, "creating entry");

        Ok(ctx.bound(self.store.create_entry(ctx, &entry)).await?)
    }

    /// Fetch an entry on behalf of `requester`, who must own it.
    pub async fn get(
        &self,
        ctx: &CallContext,
        id: &EntryId,
        requester: &UserId,
    ) -> DomainResult<Entry> {
        debug!(entry = %id, %requester, "getting entry");
        let entry = ctx.bound(self.store.get_entry(ctx, id)).await?;
        authorize(format_args!("entry {id}"), &entry.owner, Some(requester))?;
        Ok(entry)
    }

    /// Replace title, content and stage of an existing entry.
    ///
    /// The owner carried on the update must match the stored owner.
    /// `created_at` and `owner` are never changed; `updated_at` strictly advances.
    pub async fn update(&self, ctx: &CallContext, update: EntryUpdate) -> DomainResult<Entry> {
        update.validate()?;
        debug!(entry = %update.id, owner = %update.owner, "updating entry");

        let existing = ctx.bound(self.store.get_entry(ctx, &update.id)).await?;
        authorize(format_args!("entry {}", existing.id), &existing.owner, Some(&update.owner))?;

        let now = self.next_update_time(existing.updated_at);
        let changed = existing.apply(update, now);
        Ok(ctx.bound(self.store.update_entry(ctx, &changed)).await?)
    }

    /// Delete an entry owned by `requester`; links touching it go with it.
    pub async fn delete(&self, ctx: &CallContext, id: &EntryId, requester: &UserId) -> DomainResult<()> {
        debug!(entry = %id, %requester, "deleting entry");
        let existing = ctx.bound(self.store.get_entry(ctx, id)).await?;
        authorize(format_args!("entry {id}"), &existing.owner, Some(requester))?;

        ctx.bound(self.store.delete_entry(ctx, id)).await?;
        Ok(())
    }

    /// All entries of `owner`, oldest first
    pub async fn list(&self, ctx: &CallContext, owner: &UserId) -> DomainResult<Vec<Entry>> {
        let entries = ctx.bound(self.store.list_entries_by_owner(ctx, owner)).await?;
        debug!(%owner, count = entries.len(), "listed entries");
        Ok(entries)
    }

    /// Entries of `owner` whose `updated_at` is at or after `since`, for
    /// incremental sync
    pub async fn list_since(
        &self,
        ctx: &CallContext,
        owner: &UserId,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<Entry>> {
        let entries = ctx
            .bound(self.store.list_entries_by_owner_since(ctx, owner, since))
            .await?;
        debug!(%owner, %since, count = entries.len(), "listed entries since");
        Ok(entries)
    }

    fn next_update_time(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        let now = self.clock.now();
        if now > previous {
            now
        } else {
            previous + chrono::Duration::microseconds(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SteppingClock;
    use crate::error::ErrorKind;
    use crate::model::GrowthStage;
    use crate::storage::MemoryStore;

    fn setup() -> (EntryService, CallContext) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(SteppingClock::starting_now());
        (EntryService::with_clock(store, clock), CallContext::background())
    }

    fn seed(owner: &str, title: &str) -> NewEntry {
        NewEntry::new(owner, title, "x", GrowthStage::Seed)
    }

    // === Scenario: create then get by owner round-trips ===
    #[tokio::test]
    async fn create_then_get_returns_same_entry() {
        let (svc, ctx) = setup();
        let created = svc.create(&ctx, seed("u1", "A")).await.unwrap();
        assert_eq!(created.growth_stage, GrowthStage::Seed);
        assert_eq!(created.created_at, created.updated_at);

        let fetched = svc.get(&ctx, &created.id, &UserId::from("u1")).await.unwrap();
        assert_eq!(fetched, created);
    }

    // === Scenario: invalid input never reaches the store ===
    #[tokio::test]
    async fn invalid_create_writes_nothing() {
        let (svc, ctx) = setup();
        let owner = UserId::from("u1");

        for bad in [seed("u1", ""), NewEntry::new("u1", "A", "", GrowthStage::Bloom)] {
            let err = svc.create(&ctx, bad).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
        assert!(svc.list(&ctx, &owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_by_other_user_is_unauthorized() {
        let (svc, ctx) = setup();
        let created = svc.create(&ctx, seed("u1", "A")).await.unwrap();

        for requester in ["u2", "", "U1"] {
            let err = svc
                .get(&ctx, &created.id, &UserId::from(requester))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unauthorized, "requester {requester:?}");
        }
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (svc, ctx) = setup();
        let err = svc
            .get(&ctx, &EntryId::from("nope"), &UserId::from("u1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // === Scenario: update semantics ===
    #[tokio::test]
    async fn update_advances_updated_at_only() {
        let (svc, ctx) = setup();
        let created = svc.create(&ctx, seed("u1", "A")).await.unwrap();

        let update = EntryUpdate::new(created.id.clone(), "u1", "A2", "y", GrowthStage::Evergreen);
        let updated = svc.update(&ctx, update).await.unwrap();

        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.title, "A2");
        assert_eq!(updated.growth_stage, GrowthStage::Evergreen);
    }

    #[tokio::test]
    async fn update_allows_any_stage_change() {
        let (svc, ctx) = setup();
        let created = svc
            .create(&ctx, NewEntry::new("u1", "A", "x", GrowthStage::Evergreen))
            .await
            .unwrap();

        let back = EntryUpdate::new(created.id.clone(), "u1", "A", "x", GrowthStage::Seed);
        assert_eq!(svc.update(&ctx, back).await.unwrap().growth_stage, GrowthStage::Seed);
    }

    #[tokio::test]
    async fn update_errors_are_ordered_validation_then_lookup_then_owner() {
        let (svc, ctx) = setup();
        let created = svc.create(&ctx, seed("u1", "A")).await.unwrap();

        let invalid = EntryUpdate::new("nope", "u2", "", "y", GrowthStage::Seed);
        assert_eq!(svc.update(&ctx, invalid).await.unwrap_err().kind(), ErrorKind::InvalidInput);

        let missing = EntryUpdate::new("nope", "u1", "B", "y", GrowthStage::Seed);
        assert_eq!(svc.update(&ctx, missing).await.unwrap_err().kind(), ErrorKind::NotFound);

        let foreign = EntryUpdate::new(created.id.clone(), "u2", "B", "y", GrowthStage::Seed);
        assert_eq!(svc.update(&ctx, foreign).await.unwrap_err().kind(), ErrorKind::Unauthorized);

        let unchanged = svc.get(&ctx, &created.id, &UserId::from("u1")).await.unwrap();
        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn updated_at_advances_even_when_clock_stalls() {
        let store = Arc::new(MemoryStore::new());
        let frozen = Arc::new(SteppingClock::new(crate::model::now_utc(), chrono::Duration::zero()));
        let svc = EntryService::with_clock(store, frozen);
        let ctx = CallContext::background();

        let created = svc.create(&ctx, seed("u1", "A")).await.unwrap();
        let update = EntryUpdate::new(created.id.clone(), "u1", "A", "y", GrowthStage::Seed);
        let updated = svc.update(&ctx, update).await.unwrap();
        assert_eq!(updated.updated_at, created.updated_at + chrono::Duration::microseconds(1));
    }

    // === Scenario: delete is owner-only ===
    #[tokio::test]
    async fn delete_checks_owner() {
        let (svc, ctx) = setup();
        let created = svc.create(&ctx, seed("u1", "A")).await.unwrap();

        let err = svc.delete(&ctx, &created.id, &UserId::from("u2")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(svc.get(&ctx, &created.id, &UserId::from("u1")).await.is_ok());

        svc.delete(&ctx, &created.id, &UserId::from("u1")).await.unwrap();
        let err = svc.delete(&ctx, &created.id, &UserId::from("u1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn list_since_is_subset_of_list() {
        let (svc, ctx) = setup();
        let owner = UserId::from("u1");
        let a = svc.create(&ctx, seed("u1", "A")).await.unwrap();
        let b = svc.create(&ctx, seed("u1", "B")).await.unwrap();
        svc.create(&ctx, seed("u2", "other")).await.unwrap();

        let all = svc.list(&ctx, &owner).await.unwrap();
        assert_eq!(all, vec![a.clone(), b.clone()]);

        for t in [a.updated_at, b.updated_at, b.updated_at + chrono::Duration::seconds(1)] {
            let expected: Vec<Entry> = all.iter().filter(|e| e.updated_at >= t).cloned().collect();
            assert_eq!(svc.list_since(&ctx, &owner, t).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn cancelled_call_is_internal_and_writes_nothing() {
        let (svc, _) = setup();
        let ctx = CallContext::background();
        ctx.cancellation().cancel();

        let err = svc.create(&ctx, seed("u1", "A")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let fresh = CallContext::background();
        assert!(svc.list(&fresh, &UserId::from("u1")).await.unwrap().is_empty());
    }
}
