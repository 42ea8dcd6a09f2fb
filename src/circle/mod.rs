//! Circle reconciliation for shared journaling.
//!
//! This module turns the flat row store into the user's "circles" -
//! groups of people who journal together - plus the entries attributed
//! to each circle and the invitations waiting on the user.
//!
//! # Architecture
//!
//! ```text
//! CircleManager (high-level API, refresh + user actions)
//!     ├── JournalStore (rows, profiles, connections)
//!     └── Reconciler (pure: rows -> circles / entries / invites)
//!             └── ProfileResolver (names + placeholder avatars)
//! ```
//!
//! # Circle ids
//!
//! Implicit circles come from partner connections: the first partner's
//! circle is always `c1`, later partners get `partner_<id>`. A user with
//! no partner still gets a solo `c1`. Custom circles use the id of their
//! definition row.
//!
//! # Types
//!
//! - [`Circle`]: A group with resolved members
//! - [`ContentEntry`]: A journal entry attributed to a circle
//! - [`Invite`]: A pending partner invitation
//! - [`Diagnostic`]: Something skipped or defaulted during reconciliation

mod config;
mod error;
mod manager;
mod profile;
mod reconciler;
pub mod types;

pub use config::{
    ReconcilerConfig, COUPLE_ROSE, DEFAULT_CIRCLE_ID, NEUTRAL_GRAY, PARTNER_CIRCLE_PREFIX,
    PLACEHOLDER_AVATAR_BASE,
};
pub use error::{CircleError, Result};
pub use manager::{is_hex_color, is_implicit_circle_id, CircleManager, CircleSnapshot, EntryDraft};
pub use profile::{placeholder_avatar, ProfileResolver, Resolved};
pub use reconciler::{implicit_circle_id, reconcile, ReconcileInput, Reconciler};
pub use types::{
    Circle, CircleKind, CircleStatus, ContentEntry, Diagnostic, FactsBlob, Invite, MemberProfile,
    ReconcileOutput,
};
