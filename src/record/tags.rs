//! Tag vocabulary for the row store.
//!
//! Rows encode their role with reserved markers and their relations with
//! `key:value` tags:
//! - `system_circle_def`, `system_circle_member`, `system_circle_metadata`,
//!   `system_facts`: role markers
//! - `circle:<id>`: the circle a row belongs to
//! - `member:<userId>`: the user a membership row adds
//! - `status:archived`: archived circle
//! - `liked:<userId>`: like flag on a journal entry

/// Marks a row declaring a custom circle.
pub const CIRCLE_DEF: &str = "system_circle_def";
/// Marks a row adding a member to a circle.
pub const CIRCLE_MEMBER: &str = "system_circle_member";
/// Marks a row holding the user's relationship facts.
pub const FACTS: &str = "system_facts";
/// Marks a row overriding an implicit circle's name or status.
pub const CIRCLE_METADATA: &str = "system_circle_metadata";

/// All reserved role markers.
pub const RESERVED_MARKERS: &[&str] = &[CIRCLE_DEF, CIRCLE_MEMBER, FACTS, CIRCLE_METADATA];

/// Key of the circle relation tag.
pub const CIRCLE_KEY: &str = "circle";
/// Key of the member relation tag.
pub const MEMBER_KEY: &str = "member";
/// Key of the status tag.
pub const STATUS_KEY: &str = "status";
/// Key of the like tag.
pub const LIKED_KEY: &str = "liked";

/// Full archived status tag.
pub const ARCHIVED: &str = "status:archived";

const RELATION_KEYS: &[&str] = &[CIRCLE_KEY, MEMBER_KEY, STATUS_KEY, LIKED_KEY];

/// Outcome of looking up a relation tag on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation<'a> {
    /// No tag with this key.
    Missing,
    /// First well-formed value.
    Found(&'a str),
    /// Only malformed tags with this key (raw tag text).
    Malformed(&'a str),
}

impl<'a> Relation<'a> {
    /// Returns the value if one was found.
    #[must_use]
    pub const fn value(self) -> Option<&'a str> {
        match self {
            Self::Found(value) => Some(value),
            Self::Missing | Self::Malformed(_) => None,
        }
    }
}

/// Splits `key:value` and returns the value when the key matches.
///
/// The value is trimmed; an empty value is returned as `Some("")` so
/// callers can tell a malformed tag from an unrelated one.
fn value_for<'a>(tag: &'a str, key: &str) -> Option<&'a str> {
    let (k, v) = tag.split_once(':')?;
    (k == key).then(|| v.trim())
}

/// Finds the first well-formed `key:<value>` tag.
#[must_use]
pub fn find_relation<'a>(tags: &'a [String], key: &str) -> Relation<'a> {
    let mut malformed = None;
    for tag in tags {
        match value_for(tag, key) {
            Some("") => {
                malformed.get_or_insert(tag.as_str());
            }
            Some(value) => return Relation::Found(value),
            None => {}
        }
    }
    malformed.map_or(Relation::Missing, Relation::Malformed)
}

/// Iterates over every well-formed value of `key`.
pub fn relation_values<'a>(tags: &'a [String], key: &'a str) -> impl Iterator<Item = &'a str> {
    tags.iter()
        .filter_map(move |tag| value_for(tag, key))
        .filter(|value| !value.is_empty())
}

/// Returns whether the tags mark an archived circle.
#[must_use]
pub fn is_archived(tags: &[String]) -> bool {
    tags.iter().any(|t| t == ARCHIVED)
}

/// Returns whether a tag belongs to the system vocabulary rather than
/// being a user-facing label.
#[must_use]
pub fn is_system_tag(tag: &str) -> bool {
    if RESERVED_MARKERS.contains(&tag) {
        return true;
    }
    tag.split_once(':')
        .is_some_and(|(key, _)| RELATION_KEYS.contains(&key))
}

/// Builder for row tags.
///
/// # Example
///
/// ```
/// use hearth_core::record::tags::TagBuilder;
///
/// assert_eq!(TagBuilder::circle("c1"), "circle:c1");
/// assert_eq!(TagBuilder::member("u2"), "member:u2");
/// ```
pub struct TagBuilder;

impl TagBuilder {
    /// Builds the `circle:<id>` tag.
    #[must_use]
    pub fn circle(circle_id: &str) -> String {
        format!("{CIRCLE_KEY}:{circle_id}")
    }

    /// Builds the `member:<userId>` tag.
    #[must_use]
    pub fn member(user_id: &str) -> String {
        format!("{MEMBER_KEY}:{user_id}")
    }

    /// Builds the `liked:<userId>` tag.
    #[must_use]
    pub fn liked(user_id: &str) -> String {
        format!("{LIKED_KEY}:{user_id}")
    }

    /// Tags for a circle definition row.
    #[must_use]
    pub fn circle_definition(archived: bool) -> Vec<String> {
        let mut tags = vec![CIRCLE_DEF.to_string()];
        if archived {
            tags.push(ARCHIVED.to_string());
        }
        tags
    }

    /// Tags for a membership row.
    #[must_use]
    pub fn circle_membership(circle_id: &str, user_id: &str) -> Vec<String> {
        vec![
            CIRCLE_MEMBER.to_string(),
            Self::circle(circle_id),
            Self::member(user_id),
        ]
    }

    /// Tags for a metadata override row.
    #[must_use]
    pub fn circle_metadata(circle_id: &str, archived: bool) -> Vec<String> {
        let mut tags = vec![CIRCLE_METADATA.to_string(), Self::circle(circle_id)];
        if archived {
            tags.push(ARCHIVED.to_string());
        }
        tags
    }

    /// Tags for the facts row.
    #[must_use]
    pub fn facts() -> Vec<String> {
        vec![FACTS.to_string()]
    }
}

/// Sets or clears the archived tag in place.
pub fn set_archived(tags: &mut Vec<String>, archived: bool) {
    tags.retain(|t| t != ARCHIVED);
    if archived {
        tags.push(ARCHIVED.to_string());
    }
}
