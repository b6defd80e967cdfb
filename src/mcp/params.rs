//! MCP tool parameter structs with schemars-derived JSON schemas.

use schemars::JsonSchema;
use serde::Deserialize;

// ── Entry params ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateEntryParams {
    #[schemars(description = "User who will own the entry")]
    pub owner: String,
    pub title: String,
    pub content: String,
    #[schemars(description = "One of: seed, sprout, bloom, evergreen")]
    pub growth_stage: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EntryAccessParams {
    #[schemars(description = "The entry ID")]
    pub id: String,
    #[schemars(description = "User making the request; must own the entry")]
    pub requester: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateEntryParams {
    #[schemars(description = "The entry ID to update")]
    pub id: String,
    #[schemars(description = "User making the request; must own the entry")]
    pub owner: String,
    pub title: String,
    pub content: String,
    #[schemars(description = "One of: seed, sprout, bloom, evergreen")]
    pub growth_stage: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListEntriesParams {
    #[schemars(description = "Owner whose entries to list")]
    pub owner: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListEntriesSinceParams {
    #[schemars(description = "Owner whose entries to list")]
    pub owner: String,
    #[schemars(description = "RFC 3339 timestamp; entries updated at or after it are returned")]
    pub since: String,
}

// ── Link params ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateLinkParams {
    #[schemars(description = "The source entry ID")]
    pub source_id: String,
    #[schemars(description = "The target entry ID")]
    pub target_id: String,
    #[schemars(description = "User creating the link; must own both entries")]
    pub owner: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteLinkParams {
    #[schemars(description = "The source entry ID")]
    pub source_id: String,
    #[schemars(description = "The target entry ID")]
    pub target_id: String,
    #[schemars(description = "User making the request; must own the link")]
    pub requester: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EntryIdParams {
    #[schemars(description = "The entry ID")]
    pub entry_id: String,
}
