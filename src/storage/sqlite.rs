//! SQLite storage backend for Moss

use super::traits::{EntryStore, LinkStore, OpenStore, StorageError, StorageResult};
use crate::call::CallContext;
use crate::model::{Entry, EntryId, GrowthStage, Link, LinkKey, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Params, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const ENTRY_COLUMNS: &str = "id, owner, title, content, growth_stage, created_at, updated_at";
const LINK_COLUMNS: &str = "source_id, target_id, owner, created_at";

type EntryRow = (String, String, String, String, String, i64, i64);
type LinkRow = (String, String, String, i64);

/// SQLite-backed garden store
///
/// Uses a single SQLite database file with an `entries` table and an
/// `entry_links` table. Thread-safe via internal mutex on the connection.
///
/// Link endpoints are foreign keys with `ON DELETE CASCADE`, so deleting an
/// entry removes every link touching it in the same statement.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    ///
    /// Every statement is idempotent, so opening an existing database is safe.
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                growth_stage TEXT NOT NULL
                    CHECK (growth_stage IN ('seed', 'sprout', 'bloom', 'evergreen')),
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- Owner listings and incremental sync
            CREATE INDEX IF NOT EXISTS idx_entries_owner_updated
                ON entries(owner, updated_at);

            CREATE TABLE IF NOT EXISTS entry_links (
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                owner TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (source_id, target_id),
                FOREIGN KEY (source_id) REFERENCES entries(id) ON DELETE CASCADE,
                FOREIGN KEY (target_id) REFERENCES entries(id) ON DELETE CASCADE
            );

            -- The primary key serves lookups by source; this one serves targets
            CREATE INDEX IF NOT EXISTS idx_entry_links_target
                ON entry_links(target_id);

            PRAGMA foreign_keys = ON;

            -- Concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Timestamps are stored as Unix microseconds, so SQL comparison is
    /// chronological for every representable instant.
    fn timestamp_micros(ts: &DateTime<Utc>) -> i64 {
        ts.timestamp_micros()
    }

    /// Lower bound for `updated_at >= since`; sub-microsecond remainders
    /// round up so that no stored value below `since` matches.
    fn lower_bound_micros(since: &DateTime<Utc>) -> i64 {
        let micros = since.timestamp_micros();
        if since.timestamp_subsec_nanos() % 1_000 == 0 {
            micros
        } else {
            micros.saturating_add(1)
        }
    }

    fn parse_timestamp(micros: i64) -> StorageResult<DateTime<Utc>> {
        DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| StorageError::DateParse(format!("{micros} microseconds is out of range")))
    }

    fn read_entry_row(row: &Row<'_>) -> rusqlite::Result<EntryRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }

    fn row_to_entry(row: EntryRow) -> StorageResult<Entry> {
        let (id, owner, title, content, growth_stage, created_at, updated_at) = row;
        let growth_stage: GrowthStage = growth_stage
            .parse()
            .map_err(|e| StorageError::Corrupt(format!("entry {id}: {e}")))?;

        Ok(Entry {
            id: EntryId::from_string(id),
            owner: UserId::from_string(owner),
            title,
            content,
            growth_stage,
            created_at: Self::parse_timestamp(created_at)?,
            updated_at: Self::parse_timestamp(updated_at)?,
        })
    }

    fn read_link_row(row: &Row<'_>) -> rusqlite::Result<LinkRow> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn row_to_link(row: LinkRow) -> StorageResult<Link> {
        let (source_id, target_id, owner, created_at) = row;
        Ok(Link {
            source_id: EntryId::from_string(source_id),
            target_id: EntryId::from_string(target_id),
            owner: UserId::from_string(owner),
            created_at: Self::parse_timestamp(created_at)?,
        })
    }

    fn query_entries<P: Params>(conn: &Connection, sql: &str, params: P) -> StorageResult<Vec<Entry>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::read_entry_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(Self::row_to_entry(row?)?);
        }
        Ok(entries)
    }

    fn query_links<P: Params>(conn: &Connection, sql: &str, params: P) -> StorageResult<Vec<Link>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::read_link_row)?;

        let mut links = Vec::new();
        for row in rows {
            links.push(Self::row_to_link(row?)?);
        }
        Ok(links)
    }

    fn load_entry(conn: &Connection, id: &EntryId) -> StorageResult<Entry> {
        let row = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                params![id.as_str()],
                Self::read_entry_row,
            )
            .optional()?;

        match row {
            Some(row) => Self::row_to_entry(row),
            None => Err(StorageError::EntryNotFound(id.clone())),
        }
    }

    fn load_link(conn: &Connection, key: &LinkKey) -> StorageResult<Link> {
        let row = conn
            .query_row(
                &format!("SELECT {LINK_COLUMNS} FROM entry_links WHERE source_id = ?1 AND target_id = ?2"),
                params![key.source_id.as_str(), key.target_id.as_str()],
                Self::read_link_row,
            )
            .optional()?;

        match row {
            Some(row) => Self::row_to_link(row),
            None => Err(StorageError::LinkNotFound(key.clone())),
        }
    }

    fn is_constraint_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
        )
    }

    fn count(conn: &Connection, sql: &str, id: &EntryId) -> StorageResult<u64> {
        let count: i64 = conn.query_row(sql, params![id.as_str()], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl EntryStore for SqliteStore {
    async fn create_entry(&self, ctx: &CallContext, entry: &Entry) -> StorageResult<Entry> {
        ctx.check()?;
        let conn = self.lock()?;

        conn.execute(
            &format!("INSERT INTO entries ({ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                entry.id.as_str(),
                entry.owner.as_str(),
                entry.title,
                entry.content,
                entry.growth_stage.as_str(),
                Self::timestamp_micros(&entry.created_at),
                Self::timestamp_micros(&entry.updated_at),
            ],
        )
        .map_err(|e| {
            if Self::is_constraint_violation(&e) {
                StorageError::Constraint(format!("entry already exists: {}", entry.id))
            } else {
                StorageError::Database(e)
            }
        })?;

        Self::load_entry(&conn, &entry.id)
    }

    async fn get_entry(&self, ctx: &CallContext, id: &EntryId) -> StorageResult<Entry> {
        ctx.check()?;
        let conn = self.lock()?;
        Self::load_entry(&conn, id)
    }

    async fn list_entries_by_owner(
        &self,
        ctx: &CallContext,
        owner: &UserId,
    ) -> StorageResult<Vec<Entry>> {
        ctx.check()?;
        let conn = self.lock()?;
        Self::query_entries(
            &conn,
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE owner = ?1 ORDER BY created_at, id"),
            params![owner.as_str()],
        )
    }

    async fn list_entries_by_owner_since(
        &self,
        ctx: &CallContext,
        owner: &UserId,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<Entry>> {
        ctx.check()?;
        let conn = self.lock()?;
        Self::query_entries(
            &conn,
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM entries
                 WHERE owner = ?1 AND updated_at >= ?2
                 ORDER BY created_at, id"
            ),
            params![owner.as_str(), Self::lower_bound_micros(&since)],
        )
    }

    async fn update_entry(&self, ctx: &CallContext, entry: &Entry) -> StorageResult<Entry> {
        ctx.check()?;
        let conn = self.lock()?;

        let rows = conn.execute(
            r#"
            UPDATE entries
            SET title = ?2, content = ?3, growth_stage = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
            params![
                entry.id.as_str(),
                entry.title,
                entry.content,
                entry.growth_stage.as_str(),
                Self::timestamp_micros(&entry.updated_at),
            ],
        )?;

        if rows == 0 {
            return Err(StorageError::EntryNotFound(entry.id.clone()));
        }
        Self::load_entry(&conn, &entry.id)
    }

    async fn delete_entry(&self, ctx: &CallContext, id: &EntryId) -> StorageResult<()> {
        ctx.check()?;
        let conn = self.lock()?;

        // Links referencing the entry go with it (ON DELETE CASCADE)
        let rows = conn.execute("DELETE FROM entries WHERE id = ?1", params![id.as_str()])?;
        if rows == 0 {
            return Err(StorageError::EntryNotFound(id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl LinkStore for SqliteStore {
    async fn create_link(&self, ctx: &CallContext, link: &Link) -> StorageResult<Link> {
        ctx.check()?;
        let conn = self.lock()?;
        let key = link.key();

        // Endpoint existence and ownership are checked by the same statement
        // that inserts, so a concurrent entry delete cannot slip in between.
        let inserted = conn
            .execute(
                r#"
                INSERT INTO entry_links (source_id, target_id, owner, created_at)
                SELECT ?1, ?2, ?3, ?4
                WHERE EXISTS (SELECT 1 FROM entries WHERE id = ?1 AND owner = ?3)
                  AND EXISTS (SELECT 1 FROM entries WHERE id = ?2 AND owner = ?3)
                "#,
                params![
                    link.source_id.as_str(),
                    link.target_id.as_str(),
                    link.owner.as_str(),
                    Self::timestamp_micros(&link.created_at),
                ],
            )
            .map_err(|e| {
                if Self::is_constraint_violation(&e) {
                    StorageError::Constraint(format!("link already exists: {key}"))
                } else {
                    StorageError::Database(e)
                }
            })?;

        if inserted == 0 {
            return Err(StorageError::Constraint(format!(
                "missing endpoint for link {key}: both entries must exist and belong to {}",
                link.owner
            )));
        }
        Self::load_link(&conn, &key)
    }

    async fn get_link(&self, ctx: &CallContext, key: &LinkKey) -> StorageResult<Link> {
        ctx.check()?;
        let conn = self.lock()?;
        Self::load_link(&conn, key)
    }

    async fn delete_link(&self, ctx: &CallContext, key: &LinkKey) -> StorageResult<()> {
        ctx.check()?;
        let conn = self.lock()?;

        let rows = conn.execute(
            "DELETE FROM entry_links WHERE source_id = ?1 AND target_id = ?2",
            params![key.source_id.as_str(), key.target_id.as_str()],
        )?;
        if rows == 0 {
            return Err(StorageError::LinkNotFound(key.clone()));
        }
        Ok(())
    }

    async fn list_links_by_source(
        &self,
        ctx: &CallContext,
        source: &EntryId,
    ) -> StorageResult<Vec<Link>> {
        ctx.check()?;
        let conn = self.lock()?;
        Self::query_links(
            &conn,
            &format!(
                "SELECT {LINK_COLUMNS} FROM entry_links WHERE source_id = ?1 ORDER BY created_at, target_id"
            ),
            params![source.as_str()],
        )
    }

    async fn list_links_by_target(
        &self,
        ctx: &CallContext,
        target: &EntryId,
    ) -> StorageResult<Vec<Link>> {
        ctx.check()?;
        let conn = self.lock()?;
        Self::query_links(
            &conn,
            &format!(
                "SELECT {LINK_COLUMNS} FROM entry_links WHERE target_id = ?1 ORDER BY created_at, source_id"
            ),
            params![target.as_str()],
        )
    }

    async fn count_links_by_source(
        &self,
        ctx: &CallContext,
        source: &EntryId,
    ) -> StorageResult<u64> {
        ctx.check()?;
        let conn = self.lock()?;
        Self::count(&conn, "SELECT COUNT(*) FROM entry_links WHERE source_id = ?1", source)
    }

    async fn count_links_by_target(
        &self,
        ctx: &CallContext,
        target: &EntryId,
    ) -> StorageResult<u64> {
        ctx.check()?;
        let conn = self.lock()?;
        Self::count(&conn, "SELECT COUNT(*) FROM entry_links WHERE target_id = ?1", target)
    }
}
