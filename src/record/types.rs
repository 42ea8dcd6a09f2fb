//! Physical row shapes read from the journal store.
//!
//! Every logical entity (journal entry, circle definition, membership,
//! metadata override, facts blob) is persisted as a [`Record`]. The
//! role of a record is decided by its tags; see [`super::classify`].

use serde::{Deserialize, Serialize};

/// Stable user identifier issued by the identity provider.
pub type UserId = String;

/// Kind of journal entry content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Plain text entry.
    #[default]
    Text,
    /// Entry with an attached photo.
    Photo,
    /// Entry with an attached voice note.
    Audio,
}

impl EntryKind {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Photo => "photo",
            Self::Audio => "audio",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "photo" => Some(Self::Photo),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

/// A single stored row.
///
/// `title` and `content` are repurposed by system rows: a circle
/// definition keeps its name in `title` and its theme colour in
/// `content`, a facts blob keeps its JSON in `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Row identifier.
    pub id: String,
    /// User who owns (authored) the row.
    pub owner_id: UserId,
    /// Optional title.
    pub title: Option<String>,
    /// Optional body.
    pub content: Option<String>,
    /// When the row was created (Unix timestamp).
    pub created_at: i64,
    /// Write counter assigned by the store; a higher value was written
    /// later. Zero until the row is read back from the store.
    #[serde(default)]
    pub revision: i64,
    /// System markers and `key:value` relation tags.
    pub tags: Vec<String>,
    /// Content kind.
    pub kind: EntryKind,
    /// Whether the author shared the entry with the circle.
    pub is_shared: bool,
    /// Optional mood label.
    pub mood: Option<String>,
    /// Optional photo URL in object storage.
    pub photo_url: Option<String>,
    /// Optional audio URL in object storage.
    pub audio_url: Option<String>,
}

impl Record {
    /// Creates a bare text record with no tags.
    #[must_use]
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: None,
            content: None,
            created_at,
            revision: 0,
            tags: Vec::new(),
            kind: EntryKind::default(),
            is_shared: false,
            mood: None,
            photo_url: None,
            audio_url: None,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Adds multiple tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets the write revision.
    #[must_use]
    pub const fn with_revision(mut self, revision: i64) -> Self {
        self.revision = revision;
        self
    }

    /// Sets the content kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: EntryKind) -> Self {
        self.kind = kind;
        self
    }

    /// Marks the record as shared.
    #[must_use]
    pub const fn shared(mut self, is_shared: bool) -> Self {
        self.is_shared = is_shared;
        self
    }

    /// Returns whether the record carries the given tag verbatim.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Display profile for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// User identifier.
    pub id: UserId,
    /// Full display name.
    pub display_name: Option<String>,
    /// Avatar URL.
    pub avatar_url: Option<String>,
    /// Account email.
    pub email: Option<String>,
}

impl Profile {
    /// Creates a profile with just a display name.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(display_name.into()),
            avatar_url: None,
            email: None,
        }
    }

    /// Returns the first word of the display name, if any.
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .and_then(|name| name.split_whitespace().next())
    }
}

/// Status of a partner connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Invitation sent, not yet accepted.
    Pending,
    /// Both parties are connected.
    Connected,
}

impl ConnectionStatus {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Connected => "connected",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "connected" => Some(Self::Connected),
            _ => None,
        }
    }
}

/// A partner connection between two users.
///
/// `user_id` is the inviter, `partner_id` the invitee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Connection identifier.
    pub id: String,
    /// User who sent the invitation.
    pub user_id: UserId,
    /// User who received the invitation.
    pub partner_id: UserId,
    /// Current status.
    pub status: ConnectionStatus,
    /// When the invitation was sent (Unix timestamp).
    pub created_at: i64,
}

impl Connection {
    /// Returns the party on the other side of `me`, if `me` is part of it.
    #[must_use]
    pub fn other_party(&self, me: &str) -> Option<&str> {
        if self.user_id == me {
            Some(&self.partner_id)
        } else if self.partner_id == me {
            Some(&self.user_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_kind_roundtrips_through_str() {
        for kind in [EntryKind::Text, EntryKind::Photo, EntryKind::Audio] {
            assert_eq!(EntryKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EntryKind::parse("video"), None);
    }

    #[test]
    fn connection_status_parse() {
        assert_eq!(
            ConnectionStatus::parse("pending"),
            Some(ConnectionStatus::Pending)
        );
        assert_eq!(
            ConnectionStatus::parse("connected"),
            Some(ConnectionStatus::Connected)
        );
        assert_eq!(ConnectionStatus::parse("declined"), None);
    }

    #[test]
    fn record_builder() {
        let record = Record::new("r1", "u1", 100)
            .with_title("Hello")
            .with_content("World")
            .with_tag("circle:c1")
            .with_tags(["a", "b"])
            .with_kind(EntryKind::Photo)
            .shared(true);

        assert_eq!(record.title.as_deref(), Some("Hello"));
        assert_eq!(record.content.as_deref(), Some("World"));
        assert_eq!(record.tags, vec!["circle:c1", "a", "b"]);
        assert_eq!(record.kind, EntryKind::Photo);
        assert!(record.is_shared);
        assert!(record.has_tag("a"));
        assert!(!record.has_tag("circle:"));
    }

    #[test]
    fn first_name_takes_first_word() {
        assert_eq!(Profile::new("u1", "Ada Lovelace").first_name(), Some("Ada"));
        assert_eq!(Profile::new("u1", "  ").first_name(), None);

        let nameless = Profile {
            id: "u2".to_string(),
            display_name: None,
            avatar_url: None,
            email: None,
        };
        assert_eq!(nameless.first_name(), None);
    }

    #[test]
    fn other_party_resolves_both_directions() {
        let conn = Connection {
            id: "x".to_string(),
            user_id: "u1".to_string(),
            partner_id: "u2".to_string(),
            status: ConnectionStatus::Connected,
            created_at: 0,
        };

        assert_eq!(conn.other_party("u1"), Some("u2"));
        assert_eq!(conn.other_party("u2"), Some("u1"));
        assert_eq!(conn.other_party("u3"), None);
    }

    #[test]
    fn record_serializes_kind_lowercase() {
        let record = Record::new("r1", "u1", 0).with_kind(EntryKind::Audio);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"kind\":\"audio\""));
    }
}
