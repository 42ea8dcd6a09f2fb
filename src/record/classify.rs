//! Classification of stored rows into logical entities.
//!
//! A single pass over the rows turns each [`Record`] into exactly one
//! [`Entity`]. Tag inspection happens here and nowhere else; consumers
//! match on the variant.

use serde::Serialize;

use super::tags::{self, Relation};
use super::types::Record;

/// Logical role of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordRole {
    /// A genuine journal entry.
    ContentEntry,
    /// Declares a custom circle.
    CircleDefinition,
    /// Adds a member to a circle.
    CircleMembership,
    /// Overrides an implicit circle's name or status.
    CircleMetadataOverride,
    /// Per-user relationship facts.
    FactsBlob,
}

impl RecordRole {
    /// Decides the role from the reserved markers.
    ///
    /// When several markers are present the first of definition,
    /// membership, metadata, facts wins. No marker means content.
    #[must_use]
    pub fn of(record: &Record) -> Self {
        if record.has_tag(tags::CIRCLE_DEF) {
            Self::CircleDefinition
        } else if record.has_tag(tags::CIRCLE_MEMBER) {
            Self::CircleMembership
        } else if record.has_tag(tags::CIRCLE_METADATA) {
            Self::CircleMetadataOverride
        } else if record.has_tag(tags::FACTS) {
            Self::FactsBlob
        } else {
            Self::ContentEntry
        }
    }
}

/// A membership row with its parsed relations.
#[derive(Debug, Clone, Copy)]
pub struct MembershipRow<'a> {
    /// The underlying row.
    pub record: &'a Record,
    /// Target circle.
    pub circle: Relation<'a>,
    /// Added member.
    pub member: Relation<'a>,
}

/// A metadata override row with its parsed circle relation.
#[derive(Debug, Clone, Copy)]
pub struct OverrideRow<'a> {
    /// The underlying row.
    pub record: &'a Record,
    /// Circle being overridden.
    pub circle: Relation<'a>,
}

impl OverrideRow<'_> {
    /// Replacement name, if the title is non-blank.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        non_blank(self.record.title.as_deref())
    }

    /// Whether the override archives the circle.
    #[must_use]
    pub fn archived(&self) -> bool {
        tags::is_archived(&self.record.tags)
    }
}

/// A row interpreted as one of the five logical entities.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    /// Journal entry.
    Content(&'a Record),
    /// Custom circle definition.
    CircleDefinition(&'a Record),
    /// Extra circle member.
    Membership(MembershipRow<'a>),
    /// Implicit circle override.
    MetadataOverride(OverrideRow<'a>),
    /// Relationship facts blob.
    Facts(&'a Record),
}

impl<'a> Entity<'a> {
    /// Classifies a row.
    #[must_use]
    pub fn classify(record: &'a Record) -> Self {
        match RecordRole::of(record) {
            RecordRole::ContentEntry => Self::Content(record),
            RecordRole::CircleDefinition => Self::CircleDefinition(record),
            RecordRole::CircleMembership => Self::Membership(MembershipRow {
                record,
                circle: tags::find_relation(&record.tags, tags::CIRCLE_KEY),
                member: tags::find_relation(&record.tags, tags::MEMBER_KEY),
            }),
            RecordRole::CircleMetadataOverride => Self::MetadataOverride(OverrideRow {
                record,
                circle: tags::find_relation(&record.tags, tags::CIRCLE_KEY),
            }),
            RecordRole::FactsBlob => Self::Facts(record),
        }
    }

    /// Returns the role of this entity.
    #[must_use]
    pub const fn role(&self) -> RecordRole {
        match self {
            Self::Content(_) => RecordRole::ContentEntry,
            Self::CircleDefinition(_) => RecordRole::CircleDefinition,
            Self::Membership(_) => RecordRole::CircleMembership,
            Self::MetadataOverride(_) => RecordRole::CircleMetadataOverride,
            Self::Facts(_) => RecordRole::FactsBlob,
        }
    }

    /// Returns the underlying row.
    #[must_use]
    pub const fn record(&self) -> &'a Record {
        match self {
            Self::Content(record) | Self::CircleDefinition(record) | Self::Facts(record) => record,
            Self::Membership(row) => row.record,
            Self::MetadataOverride(row) => row.record,
        }
    }
}

/// Classifies every row, preserving order.
#[must_use]
pub fn classify_all(records: &[Record]) -> Vec<Entity<'_>> {
    records.iter().map(Entity::classify).collect()
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
