//! Storage backends for Moss
//!
//! Moss supports multiple storage backends through the `EntryStore` and
//! `LinkStore` traits. `SqliteStore` is the persistent implementation;
//! `MemoryStore` keeps everything in process.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{EntryStore, GardenStore, LinkStore, OpenStore, StorageError, StorageResult};
