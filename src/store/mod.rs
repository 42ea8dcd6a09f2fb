//! Data access for journal rows, profiles and partner connections.
//!
//! The reconciler never touches the store directly. [`JournalStore`] is
//! the seam between the pure reconciliation logic and whatever backend
//! holds the rows; [`JournalStorage`] is the local `SQLite` backend.
//!
//! # Tables
//!
//! ```text
//! records      one physical row shape, role decided by tags
//! profiles     display name / avatar / email per user
//! connections  partner invitations (pending / connected)
//! ```

mod error;
mod storage;

use std::collections::HashMap;

pub use error::{Result, StoreError};
pub use storage::JournalStorage;

use crate::record::{Connection, ConnectionStatus, Profile, Record, UserId};

/// Abstract interface for the journal row store.
///
/// Implementations must be usable from several threads; the manager
/// holds one behind a shared reference.
pub trait JournalStore: Send + Sync {
    /// All rows owned by any of the given users, newest first.
    fn fetch_rows_for_users(&self, user_ids: &[UserId]) -> Result<Vec<Record>>;

    /// Profiles of the given users that exist.
    fn fetch_profiles(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, Profile>>;

    /// Connections where `user_id` is either party, oldest first.
    fn fetch_connections(
        &self,
        user_id: &str,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Connection>>;

    /// Retrieves a row by id.
    fn get_record(&self, id: &str) -> Result<Option<Record>>;

    /// Inserts or replaces a row.
    fn save_record(&self, record: &Record) -> Result<()>;

    /// Inserts a row unless one with the same id exists.
    ///
    /// Returns `false` when the id is taken; the stored row is left as is.
    fn insert_record(&self, record: &Record) -> Result<bool>;

    /// Reads, edits and writes back a row as one atomic step.
    ///
    /// Concurrent updates of the same row are serialized, so an edit
    /// always sees the previous edit's result. Returns the stored row,
    /// or `None` if no row has this id.
    fn update_record(
        &self,
        id: &str,
        edit: &mut dyn FnMut(&mut Record),
    ) -> Result<Option<Record>>;

    /// Inserts or replaces a profile.
    fn save_profile(&self, profile: &Profile) -> Result<()>;

    /// Retrieves a connection by id.
    fn get_connection(&self, id: &str) -> Result<Option<Connection>>;

    /// Inserts or replaces a connection.
    fn save_connection(&self, connection: &Connection) -> Result<()>;

    /// Deletes a connection.
    fn delete_connection(&self, id: &str) -> Result<()>;
}
