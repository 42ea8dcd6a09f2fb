//! Hearth Core Library
//!
//! Core functionality for Hearth - shared relationship journaling.
//! This crate rebuilds a user's circles, journal entries and pending
//! invitations from the flat, tag-encoded row store the app persists to.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

pub mod circle;
pub mod record;
pub mod store;

pub use circle::{reconcile, CircleManager, ReconcileInput, ReconcileOutput, Reconciler};
