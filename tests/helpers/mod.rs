//! Shared fixtures for integration tests.
//!
//! Rows are built with the same tag helpers production code uses, so a
//! fixture never drifts from the real encoding.

#![allow(dead_code)]

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use hearth_core::record::{Connection, ConnectionStatus, Profile, Record, TagBuilder, UserId};

/// Atomic counter for unique test directory names.
static HELPER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Creates a unique temporary directory path for test isolation.
pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let id = HELPER_COUNTER.fetch_add(1, Ordering::SeqCst);
    env::temp_dir().join(format!(
        "hearth_test_{}_{}_{}",
        prefix,
        std::process::id(),
        id
    ))
}

/// Removes a temporary test directory. Ignores errors silently.
pub fn cleanup_dir(dir: &PathBuf) {
    let _ = std::fs::remove_dir_all(dir);
}

/// Profile map from `(id, display name)` pairs.
pub fn profiles(entries: &[(&str, &str)]) -> HashMap<UserId, Profile> {
    entries
        .iter()
        .map(|(id, name)| ((*id).to_string(), Profile::new(*id, *name)))
        .collect()
}

/// A connection with `user_id` as inviter.
pub fn connection(id: &str, from: &str, to: &str, status: ConnectionStatus) -> Connection {
    Connection {
        id: id.to_string(),
        user_id: from.to_string(),
        partner_id: to.to_string(),
        status,
        created_at: 1_700_000_000,
    }
}

/// A plain journal entry row.
pub fn entry(id: &str, owner: &str, created_at: i64) -> Record {
    Record::new(id, owner, created_at).with_content(format!("entry {id}"))
}

/// A custom circle definition row.
pub fn definition(id: &str, owner: &str, name: &str) -> Record {
    Record::new(id, owner, 1_700_000_000)
        .with_title(name)
        .with_tags(TagBuilder::circle_definition(false))
}

/// A membership row.
pub fn membership(id: &str, owner: &str, circle: &str, member: &str) -> Record {
    Record::new(id, owner, 1_700_000_000).with_tags(TagBuilder::circle_membership(circle, member))
}

/// A metadata override row.
pub fn override_row(id: &str, owner: &str, circle: &str, title: &str) -> Record {
    Record::new(id, owner, 1_700_000_000)
        .with_title(title)
        .with_tags(TagBuilder::circle_metadata(circle, false))
}
