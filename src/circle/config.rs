//! Labels and defaults used when reconciling circles.

/// Id of the first implicit circle, and of entries without a `circle:` tag.
///
/// Fixed rather than configurable: stored rows and the manager's
/// implicit-circle checks rely on this exact id.
pub const DEFAULT_CIRCLE_ID: &str = "c1";

/// Prefix of implicit circles for the second and later partners.
pub const PARTNER_CIRCLE_PREFIX: &str = "partner_";

/// Neutral gray for circles without a colour.
pub const NEUTRAL_GRAY: &str = "#9CA3AF";

/// Colour of implicit couple circles.
pub const COUPLE_ROSE: &str = "#F43F5E";

/// Generated-avatar service used for placeholders; the seed is appended.
pub const PLACEHOLDER_AVATAR_BASE: &str = "https://api.dicebear.com/7.x/avataaars/svg?seed=";

/// Configuration for the reconciler.
///
/// Every field has a default matching the shipped app; the builder
/// methods exist for localisation and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Author label on the current user's own entries.
    pub self_label: String,
    /// Placeholder name for circle members without a profile.
    pub unknown_member_label: String,
    /// Placeholder name for entry authors without a profile.
    pub unknown_author_label: String,
    /// Placeholder name for inviters without a profile.
    pub unknown_inviter_label: String,
    /// Name of custom circles with a blank title.
    pub untitled_circle_name: String,
    /// Colour of custom circles without one.
    pub default_circle_color: String,
    /// Colour of implicit couple circles.
    pub couple_circle_color: String,
    /// Base URL for generated placeholder avatars.
    pub placeholder_avatar_base: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            self_label: "Me".to_string(),
            unknown_member_label: "Unknown".to_string(),
            unknown_author_label: "Friend".to_string(),
            unknown_inviter_label: "Unknown User".to_string(),
            untitled_circle_name: "Untitled Circle".to_string(),
            default_circle_color: NEUTRAL_GRAY.to_string(),
            couple_circle_color: COUPLE_ROSE.to_string(),
            placeholder_avatar_base: PLACEHOLDER_AVATAR_BASE.to_string(),
        }
    }
}

impl ReconcilerConfig {
    /// Creates a configuration with default labels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the label on the user's own entries.
    #[must_use]
    pub fn with_self_label(mut self, label: impl Into<String>) -> Self {
        self.self_label = label.into();
        self
    }

    /// Sets the placeholder labels for members, authors and inviters.
    #[must_use]
    pub fn with_placeholder_labels(
        mut self,
        member: impl Into<String>,
        author: impl Into<String>,
        inviter: impl Into<String>,
    ) -> Self {
        self.unknown_member_label = member.into();
        self.unknown_author_label = author.into();
        self.unknown_inviter_label = inviter.into();
        self
    }

    /// Sets the name of untitled custom circles.
    #[must_use]
    pub fn with_untitled_circle_name(mut self, name: impl Into<String>) -> Self {
        self.untitled_circle_name = name.into();
        self
    }

    /// Sets the default and couple circle colours.
    #[must_use]
    pub fn with_colors(mut self, default: impl Into<String>, couple: impl Into<String>) -> Self {
        self.default_circle_color = default.into();
        self.couple_circle_color = couple.into();
        self
    }

    /// Sets the placeholder avatar base URL.
    #[must_use]
    pub fn with_avatar_base(mut self, base: impl Into<String>) -> Self {
        self.placeholder_avatar_base = base.into();
        self
    }
}
