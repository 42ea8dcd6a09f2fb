//! Stored row shapes and their tag-based interpretation.
//!
//! The backing store has a single row shape ([`Record`]) that is
//! overloaded by its tags to carry five logical entities. This module
//! owns that encoding: the tag vocabulary ([`tags`]) and the one-pass
//! classification into the [`Entity`] sum type ([`classify`]).

pub mod classify;
pub mod tags;
pub mod types;

pub use classify::{classify_all, Entity, MembershipRow, OverrideRow, RecordRole};
pub use tags::{Relation, TagBuilder};
pub use types::{Connection, ConnectionStatus, EntryKind, Profile, Record, UserId};
