//! Display-profile resolution with deterministic placeholders.
//!
//! Missing profiles never fail reconciliation. The caller picks the
//! placeholder label (members, authors and inviters each have their
//! own) and the avatar is generated from a hash of the user id, so the
//! same id renders the same avatar across reloads.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::record::classify::non_blank;
use crate::record::{Profile, UserId};

/// Builds the generated avatar URL for a user id.
///
/// The id is hashed so the raw identifier is never sent to the avatar
/// service.
///
/// # Example
///
/// ```
/// use hearth_core::circle::placeholder_avatar;
///
/// let a = placeholder_avatar("https://avatars.example/?seed=", "u1");
/// assert_eq!(a, placeholder_avatar("https://avatars.example/?seed=", "u1"));
/// assert!(a.starts_with("https://avatars.example/?seed="));
/// ```
#[must_use]
pub fn placeholder_avatar(base: &str, user_id: &str) -> String {
    let digest = Sha256::digest(user_id.as_bytes());
    format!("{base}{}", hex::encode(&digest[..16]))
}

/// A resolved name and avatar, and whether the name is a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Display name or placeholder label.
    pub name: String,
    /// Profile avatar or generated avatar.
    pub avatar_url: String,
    /// Whether `name` came from the placeholder label.
    pub is_placeholder: bool,
}

/// Looks up profiles by user id.
#[derive(Debug, Clone, Copy)]
pub struct ProfileResolver<'a> {
    profiles: &'a HashMap<UserId, Profile>,
    avatar_base: &'a str,
}

impl<'a> ProfileResolver<'a> {
    /// Creates a resolver over a profile map.
    #[must_use]
    pub const fn new(profiles: &'a HashMap<UserId, Profile>, avatar_base: &'a str) -> Self {
        Self {
            profiles,
            avatar_base,
        }
    }

    /// Returns the profile for a user, if known.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<&'a Profile> {
        self.profiles.get(user_id)
    }

    /// First name of the user, if the profile has one.
    #[must_use]
    pub fn first_name(&self, user_id: &str) -> Option<&'a str> {
        self.get(user_id).and_then(Profile::first_name)
    }

    /// Generated avatar for a user.
    #[must_use]
    pub fn placeholder_avatar(&self, user_id: &str) -> String {
        placeholder_avatar(self.avatar_base, user_id)
    }

    /// Resolves name and avatar, falling back to `label` for the name.
    #[must_use]
    pub fn resolve(&self, user_id: &str, label: &str) -> Resolved {
        let profile = self.get(user_id);

        let avatar_url = profile
            .and_then(|p| non_blank(p.avatar_url.as_deref()))
            .map_or_else(|| self.placeholder_avatar(user_id), ToString::to_string);

        match profile.and_then(|p| non_blank(p.display_name.as_deref())) {
            Some(name) => Resolved {
                name: name.to_string(),
                avatar_url,
                is_placeholder: false,
            },
            None => Resolved {
                name: label.to_string(),
                avatar_url,
                is_placeholder: true,
            },
        }
    }
}
