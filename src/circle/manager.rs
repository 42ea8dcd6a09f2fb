//! High-level circle management API.
//!
//! This module provides the [`CircleManager`] which combines the row
//! store ([`JournalStore`]) with the pure [`Reconciler`] to give the app
//! one entry point for loading circles and for the user actions that
//! write rows (create, rename, archive, add member, invitations,
//! entries, likes, facts).
//!
//! # Load policy
//!
//! Each [`CircleManager::refresh`] fetches everything it needs, then
//! reconciles. A failed fetch leaves the last applied snapshot untouched
//! so the app keeps showing stale-but-consistent state. When refreshes
//! overlap, a result is only applied if no refresh that started later
//! has already been applied.
//!
//! # Writes
//!
//! Rows a user keeps one of (an override per implicit circle, a
//! membership per member, the facts row) get ids derived from what they
//! describe, and edits go through [`JournalStore::update_record`], so
//! concurrent actions never clobber each other.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};

use super::config::{ReconcilerConfig, DEFAULT_CIRCLE_ID, PARTNER_CIRCLE_PREFIX};
use super::error::{CircleError, Result};
use super::reconciler::{ReconcileInput, Reconciler};
use super::types::ReconcileOutput;
use crate::record::tags::{self, Relation, TagBuilder};
use crate::record::{
    Connection, ConnectionStatus, Entity, EntryKind, Record, RecordRole, UserId,
};
use crate::store::{JournalStorage, JournalStore, StoreError};

/// A reconciled view of one user's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircleSnapshot {
    /// User the snapshot was built for.
    pub user_id: UserId,
    /// Refresh generation that produced it.
    pub generation: u64,
    /// When it was built (Unix timestamp).
    pub loaded_at: i64,
    /// Reconciled circles, entries and invitations.
    pub output: ReconcileOutput,
}

#[derive(Default)]
struct Applied {
    generation: u64,
    snapshot: Option<Arc<CircleSnapshot>>,
}

/// A new journal entry.
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
    /// Optional title.
    pub title: Option<String>,
    /// Body text.
    pub body: Option<String>,
    /// Content kind.
    pub kind: EntryKind,
    /// Target circle; untagged entries belong to `c1`.
    pub circle_id: Option<String>,
    /// Mood label.
    pub mood: Option<String>,
    /// Uploaded photo URL.
    pub photo_url: Option<String>,
    /// Uploaded audio URL.
    pub audio_url: Option<String>,
    /// Share with the circle.
    pub is_shared: bool,
    /// User-facing tags.
    pub tags: Vec<String>,
}

impl EntryDraft {
    /// Creates a text entry draft.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Creates a photo entry draft.
    #[must_use]
    pub fn photo(photo_url: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Photo,
            photo_url: Some(photo_url.into()),
            ..Self::default()
        }
    }

    /// Creates an audio entry draft.
    #[must_use]
    pub fn audio(audio_url: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Audio,
            audio_url: Some(audio_url.into()),
            ..Self::default()
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the target circle.
    #[must_use]
    pub fn in_circle(mut self, circle_id: impl Into<String>) -> Self {
        self.circle_id = Some(circle_id.into());
        self
    }

    /// Sets the mood.
    #[must_use]
    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    /// Adds a user tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Marks the entry as shared.
    #[must_use]
    pub const fn shared(mut self) -> Self {
        self.is_shared = true;
        self
    }

    fn validate(&self) -> Result<()> {
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        match self.kind {
            EntryKind::Photo if !has(&self.photo_url) => {
                return Err(CircleError::InvalidData(
                    "Photo entry requires a photo URL".to_string(),
                ));
            }
            EntryKind::Audio if !has(&self.audio_url) => {
                return Err(CircleError::InvalidData(
                    "Audio entry requires an audio URL".to_string(),
                ));
            }
            EntryKind::Text if !has(&self.title) && !has(&self.body) => {
                return Err(CircleError::InvalidData(
                    "Text entry requires a title or body".to_string(),
                ));
            }
            _ => {}
        }

        if let Some(circle_id) = &self.circle_id {
            if circle_id.trim().is_empty() {
                return Err(CircleError::InvalidData(
                    "Circle id must not be empty".to_string(),
                ));
            }
        }

        if let Some(tag) = self.tags.iter().find(|t| tags::is_system_tag(t)) {
            return Err(CircleError::InvalidData(format!("Reserved tag: {tag}")));
        }

        Ok(())
    }
}

/// Returns whether the id belongs to an implicit circle.
#[must_use]
pub fn is_implicit_circle_id(circle_id: &str) -> bool {
    circle_id == DEFAULT_CIRCLE_ID
        || circle_id
            .strip_prefix(PARTNER_CIRCLE_PREFIX)
            .is_some_and(|partner| !partner.is_empty())
}

/// Returns whether the string is a `#RGB` or `#RRGGBB` colour.
#[must_use]
pub fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn new_record_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Stable id for a row identified by its parts, e.g. `["facts", owner]`.
fn owned_row_id(parts: &[&str]) -> String {
    let digest = Sha256::digest(parts.join("\u{1f}").as_bytes());
    hex::encode(&digest[..16])
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn non_empty(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CircleError::InvalidData(format!("{what} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Every user id a reconciliation may need a profile for.
fn referenced_user_ids(
    self_id: &str,
    partners: &[UserId],
    rows: &[Record],
    pending: &[Connection],
) -> Vec<UserId> {
    let mut ids: BTreeSet<&str> = BTreeSet::new();
    ids.insert(self_id);
    ids.extend(partners.iter().map(String::as_str));

    for record in rows {
        ids.insert(&record.owner_id);
        if let Entity::Membership(row) = Entity::classify(record) {
            if let Relation::Found(member) = row.member {
                ids.insert(member);
            }
        }
    }
    for conn in pending {
        ids.insert(&conn.user_id);
    }

    ids.into_iter().map(ToString::to_string).collect()
}

/// High-level API for circle management.
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use hearth_core::CircleManager;
///
/// let manager = CircleManager::new(Path::new("/data/hearth"))?;
/// let snapshot = manager.refresh("user-1")?;
/// for circle in snapshot.output.active_circles() {
///     println!("{}", circle.name);
/// }
/// ```
pub struct CircleManager<S: JournalStore = JournalStorage> {
    store: S,
    reconciler: Reconciler,
    applied: Mutex<Applied>,
    next_generation: AtomicU64,
}

impl CircleManager<JournalStorage> {
    /// Creates a new circle manager backed by `SQLite`.
    ///
    /// Creates `data_dir` and `journal.db` inside it if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| {
            StoreError::Storage(format!("Failed to create data directory: {e}"))
        })?;

        let storage = JournalStorage::new(&data_dir.join("journal.db"))?;
        Ok(Self::with_store(storage, ReconcilerConfig::default()))
    }
}

impl<S: JournalStore> CircleManager<S> {
    /// Creates a manager over an existing store.
    #[must_use]
    pub fn with_store(store: S, config: ReconcilerConfig) -> Self {
        Self {
            store,
            reconciler: Reconciler::new(config),
            applied: Mutex::new(Applied::default()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    // ==================== Loading ====================

    /// Returns the last applied snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn snapshot(&self) -> Result<Option<Arc<CircleSnapshot>>> {
        Ok(self.lock_applied()?.snapshot.clone())
    }

    /// Fetches and reconciles the user's data.
    ///
    /// On failure the previously applied snapshot is kept as-is. If a
    /// refresh that started later has already been applied, that newer
    /// snapshot is returned instead of this one.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching from the store fails.
    pub fn refresh(&self, self_id: &str) -> Result<Arc<CircleSnapshot>> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let output = match self.load(self_id) {
            Ok(output) => output,
            Err(e) => {
                log::warn!("refresh {generation} for {self_id} failed, keeping prior state: {e}");
                return Err(e);
            }
        };

        let snapshot = Arc::new(CircleSnapshot {
            user_id: self_id.to_string(),
            generation,
            loaded_at: now(),
            output,
        });

        let mut applied = self.lock_applied()?;
        if applied.generation > generation {
            log::debug!(
                "refresh {generation} finished after {}, discarding",
                applied.generation
            );
            if let Some(newer) = &applied.snapshot {
                return Ok(Arc::clone(newer));
            }
        }

        applied.generation = generation;
        applied.snapshot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    fn lock_applied(&self) -> Result<std::sync::MutexGuard<'_, Applied>> {
        self.applied.lock().map_err(|e| {
            CircleError::Store(StoreError::Storage(format!(
                "Failed to acquire state lock: {e}"
            )))
        })
    }

    /// Partner ids in connection order.
    fn connected_partners(&self, self_id: &str) -> Result<Vec<UserId>> {
        Ok(self
            .store
            .fetch_connections(self_id, Some(ConnectionStatus::Connected))?
            .iter()
            .filter_map(|conn| conn.other_party(self_id))
            .map(ToString::to_string)
            .collect())
    }

    fn load(&self, self_id: &str) -> Result<ReconcileOutput> {
        let partners = self.connected_partners(self_id)?;

        let mut owners = vec![self_id.to_string()];
        for partner in &partners {
            if !owners.contains(partner) {
                owners.push(partner.clone());
            }
        }

        let rows = self.store.fetch_rows_for_users(&owners)?;
        let pending = self
            .store
            .fetch_connections(self_id, Some(ConnectionStatus::Pending))?;
        let profiles = self
            .store
            .fetch_profiles(&referenced_user_ids(self_id, &partners, &rows, &pending))?;

        Ok(self.reconciler.reconcile(&ReconcileInput {
            self_id,
            rows: &rows,
            connected_user_ids: &partners,
            profiles: &profiles,
            pending_connections: &pending,
        }))
    }

    // ==================== Circle Lifecycle ====================

    /// Creates a custom circle owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, the colour is not a hex
    /// colour, or the store fails.
    pub fn create_circle(
        &self,
        owner_id: &str,
        name: &str,
        theme_color: Option<&str>,
    ) -> Result<Record> {
        let name = non_empty(name, "Circle name")?;
        if let Some(color) = theme_color {
            if !is_hex_color(color) {
                return Err(CircleError::InvalidData(format!("Invalid colour: {color}")));
            }
        }

        let mut record = Record::new(new_record_id(), owner_id, now())
            .with_title(name)
            .with_tags(TagBuilder::circle_definition(false));
        record.content = theme_color.map(ToString::to_string);

        self.store.save_record(&record)?;
        log::info!("created circle {} for {owner_id}", record.id);
        Ok(record)
    }

    /// Renames a circle.
    ///
    /// Custom circles are renamed in place; implicit circles get a
    /// metadata override row.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, the circle does not exist,
    /// it belongs to someone else, or the store fails.
    pub fn rename_circle(&self, self_id: &str, circle_id: &str, name: &str) -> Result<Record> {
        let name = non_empty(name, "Circle name")?;
        self.edit_circle(self_id, circle_id, |record| record.title = Some(name.clone()))
    }

    /// Archives or restores a circle.
    ///
    /// # Errors
    ///
    /// Returns an error if the circle does not exist, it belongs to
    /// someone else, or the store fails.
    pub fn set_circle_archived(
        &self,
        self_id: &str,
        circle_id: &str,
        archived: bool,
    ) -> Result<Record> {
        self.edit_circle(self_id, circle_id, |record| {
            tags::set_archived(&mut record.tags, archived);
        })
    }

    fn edit_circle(
        &self,
        self_id: &str,
        circle_id: &str,
        mut edit: impl FnMut(&mut Record),
    ) -> Result<Record> {
        let record = if let Some(definition) = self.circle_definition(circle_id)? {
            if definition.owner_id != self_id {
                return Err(CircleError::MembershipConflict(format!(
                    "Circle {circle_id} is owned by another user"
                )));
            }
            self.store
                .update_record(circle_id, &mut edit)?
                .ok_or_else(|| CircleError::NotFound(circle_id.to_string()))?
        } else if is_implicit_circle_id(circle_id) {
            let id = owned_row_id(&["override", self_id, circle_id]);
            let fresh = Record::new(id, self_id, now())
                .with_tags(TagBuilder::circle_metadata(circle_id, false));
            self.upsert_row(fresh, &mut edit)?
        } else {
            return Err(CircleError::NotFound(circle_id.to_string()));
        };

        log::info!("updated circle {circle_id} via row {}", record.id);
        Ok(record)
    }

    /// Applies `edit` to the stored row with `fresh.id`, or inserts
    /// `fresh` with the edit applied when there is none yet.
    fn upsert_row(&self, mut fresh: Record, edit: &mut dyn FnMut(&mut Record)) -> Result<Record> {
        if let Some(stored) = self.store.update_record(&fresh.id, edit)? {
            return Ok(stored);
        }

        edit(&mut fresh);
        if self.store.insert_record(&fresh)? {
            return Ok(self.store.get_record(&fresh.id)?.unwrap_or(fresh));
        }

        // Lost the insert to a concurrent writer; edit their row instead.
        log::debug!("row {} appeared during insert, retrying as update", fresh.id);
        self.store
            .update_record(&fresh.id, edit)?
            .ok_or(CircleError::NotFound(fresh.id))
    }

    fn circle_definition(&self, circle_id: &str) -> Result<Option<Record>> {
        Ok(self
            .store
            .get_record(circle_id)?
            .filter(|r| RecordRole::of(r) == RecordRole::CircleDefinition))
    }

    // ==================== Member Management ====================

    /// Adds a member to a circle.
    ///
    /// # Errors
    ///
    /// Returns an error if the member id is blank, the circle does not
    /// exist, the member was already added by `actor_id`, or the store
    /// fails.
    pub fn add_member(&self, actor_id: &str, circle_id: &str, member_id: &str) -> Result<Record> {
        let member_id = non_empty(member_id, "Member id")?;

        if !is_implicit_circle_id(circle_id) && self.circle_definition(circle_id)?.is_none() {
            return Err(CircleError::NotFound(circle_id.to_string()));
        }

        let id = owned_row_id(&["member", actor_id, circle_id, &member_id]);
        let record = Record::new(id, actor_id, now())
            .with_tags(TagBuilder::circle_membership(circle_id, &member_id));
        if !self.store.insert_record(&record)? {
            return Err(CircleError::AlreadyExists(format!(
                "{member_id} in circle {circle_id}"
            )));
        }

        log::info!("added {member_id} to circle {circle_id}");
        Ok(self.store.get_record(&record.id)?.unwrap_or(record))
    }

    // ==================== Invitation Handling ====================

    /// Sends a partner invitation.
    ///
    /// # Errors
    ///
    /// Returns an error if the user invites themselves, a connection
    /// between the two already exists, or the store fails.
    pub fn send_invite(&self, from_id: &str, to_id: &str) -> Result<Connection> {
        let to_id = non_empty(to_id, "Invitee id")?;
        if from_id == to_id {
            return Err(CircleError::InvalidData(
                "Cannot invite yourself".to_string(),
            ));
        }

        let exists = self
            .store
            .fetch_connections(from_id, None)?
            .iter()
            .any(|conn| conn.other_party(from_id) == Some(to_id.as_str()));
        if exists {
            return Err(CircleError::AlreadyExists(format!(
                "Connection between {from_id} and {to_id}"
            )));
        }

        let connection = Connection {
            id: new_record_id(),
            user_id: from_id.to_string(),
            partner_id: to_id,
            status: ConnectionStatus::Pending,
            created_at: now(),
        };
        self.store.save_connection(&connection)?;
        log::info!("invitation {} sent", connection.id);
        Ok(connection)
    }

    fn pending_invite(&self, self_id: &str, invite_id: &str) -> Result<Connection> {
        let connection = self
            .store
            .get_connection(invite_id)?
            .filter(|conn| conn.partner_id == self_id)
            .ok_or_else(|| CircleError::InviteNotFound(invite_id.to_string()))?;

        if connection.status != ConnectionStatus::Pending {
            return Err(CircleError::MembershipConflict(format!(
                "Invitation already responded: {:?}",
                connection.status
            )));
        }

        Ok(connection)
    }

    /// Accepts an invitation addressed to `self_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the invitation does not exist, is not
    /// addressed to the user, is no longer pending, or the store fails.
    pub fn accept_invite(&self, self_id: &str, invite_id: &str) -> Result<Connection> {
        let mut connection = self.pending_invite(self_id, invite_id)?;
        connection.status = ConnectionStatus::Connected;
        self.store.save_connection(&connection)?;
        log::info!("invitation {invite_id} accepted");
        Ok(connection)
    }

    /// Declines an invitation addressed to `self_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the invitation does not exist, is not
    /// addressed to the user, is no longer pending, or the store fails.
    pub fn decline_invite(&self, self_id: &str, invite_id: &str) -> Result<()> {
        self.pending_invite(self_id, invite_id)?;
        self.store.delete_connection(invite_id)?;
        log::info!("invitation {invite_id} declined");
        Ok(())
    }

    // ==================== Entries ====================

    /// Writes a journal entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft has no content for its kind, uses
    /// a reserved tag, or the store fails.
    pub fn create_entry(&self, author_id: &str, draft: EntryDraft) -> Result<Record> {
        draft.validate()?;

        let mut record = Record::new(new_record_id(), author_id, now())
            .with_kind(draft.kind)
            .shared(draft.is_shared)
            .with_tags(draft.tags);
        if let Some(circle_id) = &draft.circle_id {
            record.tags.insert(0, TagBuilder::circle(circle_id.trim()));
        }
        record.title = draft.title;
        record.content = draft.body;
        record.mood = draft.mood;
        record.photo_url = draft.photo_url;
        record.audio_url = draft.audio_url;

        self.store.save_record(&record)?;
        Ok(record)
    }

    /// Toggles the user's like on an entry and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not exist or the store fails.
    pub fn toggle_like(&self, self_id: &str, entry_id: &str) -> Result<bool> {
        let not_found = || CircleError::EntryNotFound(entry_id.to_string());
        self.store
            .get_record(entry_id)?
            .filter(|r| RecordRole::of(r) == RecordRole::ContentEntry)
            .ok_or_else(not_found)?;

        let tag = TagBuilder::liked(self_id);
        let mut liked = false;
        self.store
            .update_record(entry_id, &mut |record| {
                liked = !record.has_tag(&tag);
                if liked {
                    record.tags.push(tag.clone());
                } else {
                    record.tags.retain(|t| *t != tag);
                }
            })?
            .ok_or_else(not_found)?;

        Ok(liked)
    }

    // ==================== Facts ====================

    /// Stores the user's relationship facts JSON.
    ///
    /// Updates the user's existing facts row in place, or creates one.
    ///
    /// # Errors
    ///
    /// Returns an error if `facts_json` is not valid JSON or the store
    /// fails.
    pub fn save_facts(&self, owner_id: &str, facts_json: &str) -> Result<Record> {
        serde_json::from_str::<serde_json::Value>(facts_json)
            .map_err(|e| CircleError::InvalidData(format!("Invalid facts JSON: {e}")))?;

        let fresh = Record::new(owned_row_id(&["facts", owner_id]), owner_id, now())
            .with_tags(TagBuilder::facts());
        self.upsert_row(fresh, &mut |record| {
            record.content = Some(facts_json.to_string());
        })
    }
}
