//! Moss: the core of a personal digital garden
//!
//! Users keep short notes ("entries") that mature through growth stages and
//! connect them with directed links. This crate owns the rules: what makes an
//! entry or link valid, who may read or change it, and how the link graph
//! stays consistent with the entries it connects.
//!
//! # Core Concepts
//!
//! - **Entries**: owned notes with a title, content and a growth stage
//!   (`seed`, `sprout`, `bloom`, `evergreen`)
//! - **Links**: directed `source -> target` edges between two entries of the same owner
//! - **Ownership**: every read or change of an entry or link is checked against its owner
//!
//! # Example
//!
//! ```
//! use moss::{CallContext, MemoryStore, MossApi};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let api = MossApi::new(Arc::new(MemoryStore::new()));
//! let ctx = CallContext::background();
//! let entry = api.create_entry(&ctx, "u1", "Tea", "Steep for three minutes", "seed").await.unwrap();
//! assert_eq!(api.get_entry(&ctx, entry.id.as_str(), "u1").await.unwrap(), entry);
//! # });
//! ```

pub mod api;
pub mod auth;
pub mod call;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod model;
pub mod service;
pub mod storage;

pub use api::{EntryView, MossApi};
pub use call::{CallContext, CancellationToken};
pub use clock::{Clock, SteppingClock, SystemClock};
pub use config::{ConfigError, ConfigLayer, ConfigLoader, MossConfig};
pub use error::{DomainError, DomainResult, ErrorKind};
pub use model::{
    Entry, EntryId, EntryUpdate, GrowthStage, Link, LinkKey, NewEntry, NewLink, UserId,
    ValidationError,
};
pub use service::{EntryService, LinkService};
pub use storage::{
    EntryStore, GardenStore, LinkStore, MemoryStore, OpenStore, SqliteStore, StorageError,
    StorageResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
