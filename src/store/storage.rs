//! `SQLite` storage for journal rows.
//!
//! Stores the physical row shape as-is: tags are kept as a JSON array
//! and never interpreted here. Interpretation belongs to
//! [`crate::record::classify`].

// SQLite operations need to hold the lock for the duration of the operation.
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, params_from_iter, Connection as SqlConnection, OptionalExtension, Row};

use super::error::{Result, StoreError};
use super::JournalStore;
use crate::record::{Connection, ConnectionStatus, EntryKind, Profile, Record, UserId};

const RECORD_COLUMNS: &str = "id, owner_id, title, content, created_at, revision, tags, kind, \
     is_shared, mood, photo_url, audio_url";

/// Next value of the table-wide write counter.
const NEXT_REVISION: &str = "(SELECT COALESCE(MAX(revision), 0) + 1 FROM records)";

/// `SQLite`-based storage for journal data.
///
/// Thread-safe wrapper around a `SQLite` connection for storing rows,
/// profiles and partner connections.
pub struct JournalStorage {
    conn: Mutex<SqlConnection>,
}

/// Row columns before tag and kind decoding.
struct RawRecord {
    id: String,
    owner_id: String,
    title: Option<String>,
    content: Option<String>,
    created_at: i64,
    revision: i64,
    tags_json: String,
    kind: String,
    is_shared: bool,
    mood: Option<String>,
    photo_url: Option<String>,
    audio_url: Option<String>,
}

impl RawRecord {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
            revision: row.get(5)?,
            tags_json: row.get(6)?,
            kind: row.get(7)?,
            is_shared: row.get(8)?,
            mood: row.get(9)?,
            photo_url: row.get(10)?,
            audio_url: row.get(11)?,
        })
    }

    fn into_record(self) -> Result<Record> {
        let tags: Vec<String> = serde_json::from_str(&self.tags_json)?;
        let kind = EntryKind::parse(&self.kind)
            .ok_or_else(|| StoreError::InvalidData(format!("Invalid kind: {}", self.kind)))?;

        Ok(Record {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            content: self.content,
            created_at: self.created_at,
            revision: self.revision,
            tags,
            kind,
            is_shared: self.is_shared,
            mood: self.mood,
            photo_url: self.photo_url,
            audio_url: self.audio_url,
        })
    }
}

fn read_connection(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn connection_from_parts(
    (id, user_id, partner_id, status_str, created_at): (String, String, String, String, i64),
) -> Result<Connection> {
    let status = ConnectionStatus::parse(&status_str)
        .ok_or_else(|| StoreError::InvalidData(format!("Invalid status: {status_str}")))?;

    Ok(Connection {
        id,
        user_id,
        partner_id,
        status,
        created_at,
    })
}

fn read_record(conn: &SqlConnection, id: &str) -> Result<Option<Record>> {
    let raw = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1"),
            params![id],
            RawRecord::read,
        )
        .optional()?;

    raw.map(RawRecord::into_record).transpose()
}

/// Writes a row with the given conflict clause and returns the number
/// of changed rows. Every write takes the next revision.
fn write_record(conn: &SqlConnection, record: &Record, on_conflict: &str) -> Result<usize> {
    let tags_json = serde_json::to_string(&record.tags)?;

    let changed = conn.execute(
        &format!(
            "INSERT INTO records (id, owner_id, title, content, created_at, revision, tags, kind, \
             is_shared, mood, photo_url, audio_url) \
             VALUES (?1, ?2, ?3, ?4, ?5, {NEXT_REVISION}, ?6, ?7, ?8, ?9, ?10, ?11) \
             ON CONFLICT(id) {on_conflict}"
        ),
        params![
            &record.id,
            &record.owner_id,
            &record.title,
            &record.content,
            record.created_at,
            &tags_json,
            record.kind.as_str(),
            record.is_shared,
            &record.mood,
            &record.photo_url,
            &record.audio_url,
        ],
    )?;

    Ok(changed)
}

const UPSERT: &str = r"DO UPDATE SET
    title = excluded.title,
    content = excluded.content,
    revision = excluded.revision,
    tags = excluded.tags,
    kind = excluded.kind,
    is_shared = excluded.is_shared,
    mood = excluded.mood,
    photo_url = excluded.photo_url,
    audio_url = excluded.audio_url";

/// Builds `?1, ?2, ...` for an `IN` clause.
fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl JournalStorage {
    /// Creates a new storage instance at the given path.
    ///
    /// Creates the database file and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = SqlConnection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// Creates an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> Result<Self> {
        let conn = SqlConnection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqlConnection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Storage(format!("Failed to acquire database lock: {e}")))
    }

    /// Initializes the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            -- One physical row shape; the role is encoded in tags
            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                owner_id TEXT NOT NULL,
                title TEXT,
                content TEXT,
                created_at INTEGER NOT NULL,
                revision INTEGER NOT NULL DEFAULT 0,
                tags TEXT NOT NULL DEFAULT '[]',
                kind TEXT NOT NULL DEFAULT 'text',
                is_shared INTEGER NOT NULL DEFAULT 0,
                mood TEXT,
                photo_url TEXT,
                audio_url TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_records_owner
                ON records (owner_id, created_at);

            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                display_name TEXT,
                avatar_url TEXT,
                email TEXT
            );

            -- Partner invitations (user_id invites partner_id)
            CREATE TABLE IF NOT EXISTS connections (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                partner_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at INTEGER NOT NULL
            );
            ",
        )?;

        // Files created before write revisions existed
        if !has_column(&conn, "records", "revision")? {
            conn.execute(
                "ALTER TABLE records ADD COLUMN revision INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
        }
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_revision ON records (revision)",
            [],
        )?;

        Ok(())
    }
}

fn has_column(conn: &SqlConnection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns.iter().any(|c| c == column))
}

impl JournalStore for JournalStorage {
    // ==================== Record Operations ====================

    fn fetch_rows_for_users(&self, user_ids: &[UserId]) -> Result<Vec<Record>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE owner_id IN ({}) \
             ORDER BY created_at DESC, seq DESC",
            placeholders(user_ids.len())
        );

        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(user_ids.iter()), RawRecord::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawRecord::into_record).collect()
    }

    fn get_record(&self, id: &str) -> Result<Option<Record>> {
        let conn = self.lock()?;
        read_record(&conn, id)
    }

    fn save_record(&self, record: &Record) -> Result<()> {
        let conn = self.lock()?;
        write_record(&conn, record, UPSERT)?;
        Ok(())
    }

    fn insert_record(&self, record: &Record) -> Result<bool> {
        let conn = self.lock()?;
        Ok(write_record(&conn, record, "DO NOTHING")? == 1)
    }

    fn update_record(
        &self,
        id: &str,
        edit: &mut dyn FnMut(&mut Record),
    ) -> Result<Option<Record>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let Some(mut record) = read_record(&tx, id)? else {
            return Ok(None);
        };
        edit(&mut record);
        write_record(&tx, &record, UPSERT)?;
        let stored = read_record(&tx, id)?;

        tx.commit()?;
        Ok(stored)
    }

    // ==================== Profile Operations ====================

    fn fetch_profiles(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, Profile>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.lock()?;
        let sql = format!(
            "SELECT id, display_name, avatar_url, email FROM profiles WHERE id IN ({})",
            placeholders(user_ids.len())
        );

        let mut stmt = conn.prepare(&sql)?;
        let profiles = stmt
            .query_map(params_from_iter(user_ids.iter()), |row| {
                Ok(Profile {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    avatar_url: row.get(2)?,
                    email: row.get(3)?,
                })
            })?
            .map(|profile| profile.map(|p| (p.id.clone(), p)))
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        Ok(profiles)
    }

    fn save_profile(&self, profile: &Profile) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r"
            INSERT INTO profiles (id, display_name, avatar_url, email)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url,
                email = excluded.email
            ",
            params![
                &profile.id,
                &profile.display_name,
                &profile.avatar_url,
                &profile.email,
            ],
        )?;

        Ok(())
    }

    // ==================== Connection Operations ====================

    fn fetch_connections(
        &self,
        user_id: &str,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Connection>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r"
            SELECT id, user_id, partner_id, status, created_at
            FROM connections
            WHERE (user_id = ?1 OR partner_id = ?1)
              AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at ASC, id ASC
            ",
        )?;

        let rows = stmt
            .query_map(
                params![user_id, status.as_ref().map(ConnectionStatus::as_str)],
                read_connection,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(connection_from_parts).collect()
    }

    fn get_connection(&self, id: &str) -> Result<Option<Connection>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                r"
                SELECT id, user_id, partner_id, status, created_at
                FROM connections
                WHERE id = ?1
                ",
                params![id],
                read_connection,
            )
            .optional()?;

        row.map(connection_from_parts).transpose()
    }

    fn save_connection(&self, connection: &Connection) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r"
            INSERT INTO connections (id, user_id, partner_id, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status
            ",
            params![
                &connection.id,
                &connection.user_id,
                &connection.partner_id,
                connection.status.as_str(),
                connection.created_at,
            ],
        )?;

        Ok(())
    }

    fn delete_connection(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM connections WHERE id = ?1", params![id])?;
        Ok(())
    }
}
