//! Reconciled types handed to the presentation layer.
//!
//! These are derived in memory on every load and never persisted. They
//! all serialize to JSON so a UI can consume them directly.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::record::{EntryKind, RecordRole, UserId};

/// Type of circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircleKind {
    /// Implicit circle shared with a connected partner.
    Couple,
    /// User-defined circle, or the solo space when no partner exists.
    Custom,
}

/// Whether a circle is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircleStatus {
    /// Shown in the circle list.
    #[default]
    Active,
    /// Hidden from the default list, rows are kept.
    Archived,
}

impl CircleStatus {
    /// Maps the archived flag.
    #[must_use]
    pub const fn from_archived(archived: bool) -> Self {
        if archived {
            Self::Archived
        } else {
            Self::Active
        }
    }
}

/// A member with a resolved (or placeholder) display profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberProfile {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    pub avatar_url: String,
}

/// A circle with resolved membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Circle {
    /// Circle id (`c1`, `partner_<id>` or a definition row id).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Type of circle.
    pub kind: CircleKind,
    /// Active or archived.
    pub status: CircleStatus,
    /// Member ids; always contains the circle owner.
    pub members: BTreeSet<UserId>,
    /// Member profiles in membership order (owner first).
    pub member_profiles: Vec<MemberProfile>,
    /// Theme colour as a hex string.
    pub theme_color: String,
    /// When the circle started (Unix timestamp), if known.
    pub start_date: Option<i64>,
}

impl Circle {
    /// Returns whether the user belongs to this circle.
    #[must_use]
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.contains(user_id)
    }

    /// Returns whether the circle is archived.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.status == CircleStatus::Archived
    }
}

/// A journal entry attributed to a circle and an author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentEntry {
    /// Row id.
    pub id: String,
    /// Circle the entry belongs to.
    pub circle_id: String,
    /// Author id.
    pub author_id: UserId,
    /// Author label (`Me` for own entries).
    pub author_name: String,
    /// Author avatar URL.
    pub author_avatar: String,
    /// Whether the current user wrote it.
    pub is_own: bool,
    /// Title.
    pub title: Option<String>,
    /// Body text.
    pub body: Option<String>,
    /// Content kind.
    pub kind: EntryKind,
    /// Mood label.
    pub mood: Option<String>,
    /// Photo URL.
    pub photo_url: Option<String>,
    /// Audio URL.
    pub audio_url: Option<String>,
    /// Whether the author shared it.
    pub is_shared: bool,
    /// Creation time (Unix timestamp).
    pub created_at: i64,
    /// Whether the current user liked it.
    pub liked: bool,
    /// 1 when anyone liked it, else 0.
    pub likes: u32,
    /// User-facing tags (system tags removed).
    pub tags: Vec<String>,
}

/// A pending partner invitation addressed to the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invite {
    /// Connection id.
    pub id: String,
    /// Who sent it.
    pub inviter_id: UserId,
    /// Inviter display name.
    pub inviter_name: String,
    /// Inviter avatar URL.
    pub inviter_avatar: String,
}

/// The user's relationship facts, passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactsBlob {
    /// Row id.
    pub record_id: String,
    /// Owner id.
    pub owner_id: UserId,
    /// Raw JSON owned by the presentation layer.
    pub content: String,
}

impl FactsBlob {
    /// Decodes the JSON content into a caller-defined shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid JSON for `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.content)
    }
}

/// Something the reconciler skipped or filled with a default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A relation tag had no value.
    MalformedTag {
        /// Row carrying the tag.
        record_id: String,
        /// Role the row was classified as.
        role: RecordRole,
        /// Raw tag text.
        tag: String,
    },
    /// A required relation tag was absent.
    MissingTag {
        /// Row missing the tag.
        record_id: String,
        /// Role the row was classified as.
        role: RecordRole,
        /// Missing tag key.
        key: String,
    },
    /// A membership row names a circle that does not exist.
    OrphanMembership {
        /// Membership row.
        record_id: String,
        /// Unknown circle id.
        circle_id: String,
    },
    /// A second facts row was found and ignored.
    DuplicateFacts {
        /// Ignored row.
        record_id: String,
    },
    /// A facts row owned by someone else was ignored.
    PartnerFacts {
        /// Ignored row.
        record_id: String,
        /// Owner of the row.
        owner_id: UserId,
    },
    /// An override for the same circle lost to one with a higher
    /// revision, or to an earlier row with the same revision.
    DuplicateOverride {
        /// Ignored row.
        record_id: String,
        /// Circle id.
        circle_id: String,
    },
    /// An override targets a circle that is not implicit.
    UnattachedOverride {
        /// Override row.
        record_id: String,
        /// Circle id.
        circle_id: String,
    },
    /// A circle definition reuses an id already produced.
    DuplicateCircle {
        /// Ignored row.
        record_id: String,
    },
    /// A partner id appeared twice in the connection list.
    DuplicatePartner {
        /// Partner id.
        user_id: UserId,
    },
    /// A profile was missing and a placeholder was used.
    PlaceholderProfile {
        /// User without a profile.
        user_id: UserId,
        /// Placeholder label used.
        label: String,
    },
}

/// Result of reconciling a user's rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutput {
    /// Implicit circles first, then custom circles in row order.
    pub circles: Vec<Circle>,
    /// Journal entries in row order.
    pub entries: Vec<ContentEntry>,
    /// Pending invitations addressed to the user.
    pub pending_invites: Vec<Invite>,
    /// The user's facts row, if any.
    pub facts: Option<FactsBlob>,
    /// Skipped or defaulted items.
    pub diagnostics: Vec<Diagnostic>,
}

impl ReconcileOutput {
    /// Looks up a circle by id.
    #[must_use]
    pub fn circle(&self, circle_id: &str) -> Option<&Circle> {
        self.circles.iter().find(|c| c.id == circle_id)
    }

    /// Entries attributed to the given circle.
    pub fn entries_in<'a>(&'a self, circle_id: &'a str) -> impl Iterator<Item = &'a ContentEntry> {
        self.entries.iter().filter(move |e| e.circle_id == circle_id)
    }

    /// Circles that are not archived.
    pub fn active_circles(&self) -> impl Iterator<Item = &Circle> {
        self.circles.iter().filter(|c| !c.is_archived())
    }
}
