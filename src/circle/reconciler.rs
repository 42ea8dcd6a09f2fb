//! Circle reconciliation.
//!
//! Rebuilds a user's circles, journal entries and pending invitations
//! from the flat row store. The computation is pure: it never mutates
//! its inputs, never performs I/O and never fails. Rows it cannot make
//! sense of are skipped and reported in [`ReconcileOutput::diagnostics`].
//!
//! # Steps
//!
//! ```text
//! rows ──classify──► content / definitions / memberships / overrides / facts
//!                      │
//! partners ───────────►├─ implicit circles (c1, partner_<id>) + overrides
//!                      ├─ custom circles (definition rows)
//!                      ├─ extended membership + profile resolution
//!                      └─ entries attributed to circles
//! pending connections ──► invites
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use super::config::{ReconcilerConfig, DEFAULT_CIRCLE_ID, PARTNER_CIRCLE_PREFIX};
use super::profile::ProfileResolver;
use super::types::{
    Circle, CircleKind, CircleStatus, ContentEntry, Diagnostic, FactsBlob, Invite, MemberProfile,
    ReconcileOutput,
};
use crate::record::classify::non_blank;
use crate::record::tags::{self, Relation};
use crate::record::{
    Connection, ConnectionStatus, Entity, MembershipRow, OverrideRow, Profile, Record, RecordRole,
    UserId,
};

/// Allocates the id of an implicit partner circle.
///
/// The first connected partner gets `c1`; every later one gets
/// `partner_<partnerId>`. Other code matches on these exact ids.
#[must_use]
pub fn implicit_circle_id(index: usize, partner_id: &str) -> String {
    if index == 0 {
        DEFAULT_CIRCLE_ID.to_string()
    } else {
        format!("{PARTNER_CIRCLE_PREFIX}{partner_id}")
    }
}

/// Everything the reconciler reads.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput<'a> {
    /// Current user.
    pub self_id: &'a str,
    /// Rows owned by the user and their connected partners.
    pub rows: &'a [Record],
    /// Connected partners, in connection order.
    pub connected_user_ids: &'a [UserId],
    /// Known profiles by user id.
    pub profiles: &'a HashMap<UserId, Profile>,
    /// Raw connections to scan for pending invitations.
    pub pending_connections: &'a [Connection],
}

/// Reconciles rows into circles, entries and invitations.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use hearth_core::{ReconcileInput, Reconciler};
///
/// let profiles = HashMap::new();
/// let output = Reconciler::default().reconcile(&ReconcileInput {
///     self_id: "u1",
///     rows: &[],
///     connected_user_ids: &[],
///     profiles: &profiles,
///     pending_connections: &[],
/// });
/// assert_eq!(output.circles.len(), 1);
/// assert_eq!(output.circles[0].id, "c1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Creates a reconciler with the given configuration.
    #[must_use]
    pub const fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Runs a full reconciliation.
    #[must_use]
    pub fn reconcile(&self, input: &ReconcileInput<'_>) -> ReconcileOutput {
        let mut pass = Pass {
            config: &self.config,
            self_id: input.self_id,
            resolver: ProfileResolver::new(input.profiles, &self.config.placeholder_avatar_base),
            diagnostics: Diagnostics::default(),
        };

        let parts = pass.partition(input.rows);
        let memberships = pass.group_memberships(&parts.memberships);
        let overrides = pass.index_overrides(&parts.overrides);

        let mut circles = Vec::new();
        let mut produced: HashSet<String> = HashSet::new();

        for seed in pass.implicit_seeds(input.connected_user_ids) {
            let row = overrides.get(&seed.id);
            let seed = apply_override(seed, row);
            produced.insert(seed.id.clone());
            circles.push(pass.build_circle(seed, &memberships));
        }

        for (circle_id, row) in &overrides.ordered {
            if !produced.contains(*circle_id) {
                pass.diagnostics.push(Diagnostic::UnattachedOverride {
                    record_id: row.record.id.clone(),
                    circle_id: (*circle_id).to_string(),
                });
            }
        }

        for definition in &parts.definitions {
            if produced.contains(&definition.id) {
                pass.diagnostics.push(Diagnostic::DuplicateCircle {
                    record_id: definition.id.clone(),
                });
                continue;
            }
            let seed = pass.custom_seed(definition);
            produced.insert(seed.id.clone());
            circles.push(pass.build_circle(seed, &memberships));
        }

        for (circle_id, _, record_id) in &memberships.rows {
            if !produced.contains(*circle_id) {
                pass.diagnostics.push(Diagnostic::OrphanMembership {
                    record_id: (*record_id).to_string(),
                    circle_id: (*circle_id).to_string(),
                });
            }
        }

        let entries: Vec<ContentEntry> = parts
            .content
            .iter()
            .map(|record| pass.entry(record))
            .collect();

        let pending_invites = pass.invites(input.pending_connections);

        let facts = parts.facts.map(|record| FactsBlob {
            record_id: record.id.clone(),
            owner_id: record.owner_id.clone(),
            content: record.content.clone().unwrap_or_default(),
        });

        ReconcileOutput {
            circles,
            entries,
            pending_invites,
            facts,
            diagnostics: pass.diagnostics.items,
        }
    }
}

/// Reconciles with the default configuration.
#[must_use]
pub fn reconcile(input: &ReconcileInput<'_>) -> ReconcileOutput {
    Reconciler::default().reconcile(input)
}

/// Collects diagnostics once each, in the order first seen.
#[derive(Default)]
struct Diagnostics {
    items: Vec<Diagnostic>,
    seen: HashSet<Diagnostic>,
}

impl Diagnostics {
    fn push(&mut self, diagnostic: Diagnostic) {
        if self.seen.insert(diagnostic.clone()) {
            log::debug!("reconcile: {diagnostic:?}");
            self.items.push(diagnostic);
        }
    }
}

/// Rows split by role.
struct Partitioned<'a> {
    content: Vec<&'a Record>,
    definitions: Vec<&'a Record>,
    memberships: Vec<MembershipRow<'a>>,
    overrides: Vec<OverrideRow<'a>>,
    facts: Option<&'a Record>,
}

/// Membership rows grouped by circle id.
struct Memberships<'a> {
    by_circle: HashMap<&'a str, Vec<&'a str>>,
    /// `(circle_id, member_id, record_id)` in row order.
    rows: Vec<(&'a str, &'a str, &'a str)>,
}

/// Overrides keyed by circle id. The highest revision wins; on a tie the
/// row that came first wins.
struct Overrides<'a> {
    by_circle: HashMap<&'a str, OverrideRow<'a>>,
    ordered: Vec<(&'a str, OverrideRow<'a>)>,
}

impl<'a> Overrides<'a> {
    fn get(&self, circle_id: &str) -> Option<&OverrideRow<'a>> {
        self.by_circle.get(circle_id)
    }
}

/// A circle before membership resolution.
struct CircleSeed {
    id: String,
    name: String,
    kind: CircleKind,
    status: CircleStatus,
    base_members: Vec<UserId>,
    theme_color: String,
    start_date: Option<i64>,
}

fn apply_override(mut seed: CircleSeed, row: Option<&OverrideRow<'_>>) -> CircleSeed {
    if let Some(row) = row {
        if let Some(name) = row.name() {
            seed.name = name.to_string();
        }
        seed.status = CircleStatus::from_archived(row.archived());
    }
    seed
}

struct Pass<'a> {
    config: &'a ReconcilerConfig,
    self_id: &'a str,
    resolver: ProfileResolver<'a>,
    diagnostics: Diagnostics,
}

impl<'a> Pass<'a> {
    /// Reports a relation that is required but unusable.
    fn report_relation(&mut self, record: &Record, role: RecordRole, key: &str, rel: Relation<'_>) {
        match rel {
            Relation::Found(_) => {}
            Relation::Malformed(tag) => self.diagnostics.push(Diagnostic::MalformedTag {
                record_id: record.id.clone(),
                role,
                tag: tag.to_string(),
            }),
            Relation::Missing => self.diagnostics.push(Diagnostic::MissingTag {
                record_id: record.id.clone(),
                role,
                key: key.to_string(),
            }),
        }
    }

    fn partition(&mut self, rows: &'a [Record]) -> Partitioned<'a> {
        let mut parts = Partitioned {
            content: Vec::new(),
            definitions: Vec::new(),
            memberships: Vec::new(),
            overrides: Vec::new(),
            facts: None,
        };

        for record in rows {
            match Entity::classify(record) {
                Entity::Content(record) => parts.content.push(record),
                Entity::CircleDefinition(record) => parts.definitions.push(record),
                Entity::Membership(row) => parts.memberships.push(row),
                Entity::MetadataOverride(row) => parts.overrides.push(row),
                Entity::Facts(record) => {
                    if record.owner_id != self.self_id {
                        self.diagnostics.push(Diagnostic::PartnerFacts {
                            record_id: record.id.clone(),
                            owner_id: record.owner_id.clone(),
                        });
                    } else if parts.facts.is_some() {
                        self.diagnostics.push(Diagnostic::DuplicateFacts {
                            record_id: record.id.clone(),
                        });
                    } else {
                        parts.facts = Some(record);
                    }
                }
            }
        }

        parts
    }

    fn group_memberships(&mut self, rows: &[MembershipRow<'a>]) -> Memberships<'a> {
        let mut memberships = Memberships {
            by_circle: HashMap::new(),
            rows: Vec::new(),
        };

        for row in rows {
            let (Relation::Found(circle_id), Relation::Found(member_id)) = (row.circle, row.member)
            else {
                let role = RecordRole::CircleMembership;
                self.report_relation(row.record, role, tags::CIRCLE_KEY, row.circle);
                self.report_relation(row.record, role, tags::MEMBER_KEY, row.member);
                continue;
            };

            let record: &'a Record = row.record;
            memberships.rows.push((circle_id, member_id, record.id.as_str()));
            memberships
                .by_circle
                .entry(circle_id)
                .or_default()
                .push(member_id);
        }

        memberships
    }

    fn index_overrides(&mut self, rows: &[OverrideRow<'a>]) -> Overrides<'a> {
        let mut overrides = Overrides {
            by_circle: HashMap::new(),
            ordered: Vec::new(),
        };
        let mut positions: HashMap<&'a str, usize> = HashMap::new();

        for row in rows {
            let Relation::Found(circle_id) = row.circle else {
                self.report_relation(
                    row.record,
                    RecordRole::CircleMetadataOverride,
                    tags::CIRCLE_KEY,
                    row.circle,
                );
                continue;
            };

            let Some(&at) = positions.get(circle_id) else {
                positions.insert(circle_id, overrides.ordered.len());
                overrides.ordered.push((circle_id, *row));
                continue;
            };

            let kept = &mut overrides.ordered[at].1;
            let loser = if row.record.revision > kept.record.revision {
                std::mem::replace(kept, *row)
            } else {
                *row
            };
            self.diagnostics.push(Diagnostic::DuplicateOverride {
                record_id: loser.record.id.clone(),
                circle_id: circle_id.to_string(),
            });
        }

        overrides.by_circle = overrides
            .ordered
            .iter()
            .map(|(circle_id, row)| (*circle_id, *row))
            .collect();
        overrides
    }

    fn first_name(&self, user_id: &str) -> String {
        self.resolver
            .first_name(user_id)
            .unwrap_or(self.config.unknown_member_label.as_str())
            .to_string()
    }

    fn implicit_seeds(&mut self, connected: &[UserId]) -> Vec<CircleSeed> {
        let mut partners: Vec<&str> = Vec::with_capacity(connected.len());
        for partner in connected {
            if partners.contains(&partner.as_str()) {
                self.diagnostics.push(Diagnostic::DuplicatePartner {
                    user_id: partner.clone(),
                });
            } else {
                partners.push(partner);
            }
        }

        let self_first = self.first_name(self.self_id);

        if partners.is_empty() {
            return vec![CircleSeed {
                id: DEFAULT_CIRCLE_ID.to_string(),
                name: format!("{self_first}'s Space"),
                kind: CircleKind::Custom,
                status: CircleStatus::Active,
                base_members: vec![self.self_id.to_string()],
                theme_color: self.config.default_circle_color.clone(),
                start_date: None,
            }];
        }

        partners
            .iter()
            .enumerate()
            .map(|(index, partner)| CircleSeed {
                id: implicit_circle_id(index, partner),
                name: format!("{self_first} & {}", self.first_name(partner)),
                kind: CircleKind::Couple,
                status: CircleStatus::Active,
                base_members: vec![self.self_id.to_string(), (*partner).to_string()],
                theme_color: self.config.couple_circle_color.clone(),
                start_date: None,
            })
            .collect()
    }

    fn custom_seed(&self, definition: &Record) -> CircleSeed {
        CircleSeed {
            id: definition.id.clone(),
            name: non_blank(definition.title.as_deref())
                .unwrap_or(self.config.untitled_circle_name.as_str())
                .to_string(),
            kind: CircleKind::Custom,
            status: CircleStatus::from_archived(tags::is_archived(&definition.tags)),
            base_members: vec![definition.owner_id.clone()],
            theme_color: non_blank(definition.content.as_deref())
                .unwrap_or(self.config.default_circle_color.as_str())
                .to_string(),
            start_date: Some(definition.created_at),
        }
    }

    fn build_circle(&mut self, seed: CircleSeed, memberships: &Memberships<'_>) -> Circle {
        let extended = memberships
            .by_circle
            .get(seed.id.as_str())
            .into_iter()
            .flatten()
            .map(|member| (*member).to_string());

        let mut members = BTreeSet::new();
        let mut member_profiles = Vec::new();

        for member in seed.base_members.into_iter().chain(extended) {
            if member.is_empty() || members.contains(&member) {
                continue;
            }
            member_profiles.push(self.member_profile(&member));
            members.insert(member);
        }

        Circle {
            id: seed.id,
            name: seed.name,
            kind: seed.kind,
            status: seed.status,
            members,
            member_profiles,
            theme_color: seed.theme_color,
            start_date: seed.start_date,
        }
    }

    fn member_profile(&mut self, user_id: &str) -> MemberProfile {
        let config = self.config;
        let label = &config.unknown_member_label;
        let resolved = self.resolver.resolve(user_id, label);
        if resolved.is_placeholder {
            self.diagnostics.push(Diagnostic::PlaceholderProfile {
                user_id: user_id.to_string(),
                label: label.clone(),
            });
        }
        MemberProfile {
            id: user_id.to_string(),
            name: resolved.name,
            avatar_url: resolved.avatar_url,
        }
    }

    fn entry(&mut self, record: &Record) -> ContentEntry {
        let circle_id = match tags::find_relation(&record.tags, tags::CIRCLE_KEY) {
            Relation::Found(id) => id.to_string(),
            rel @ Relation::Malformed(_) => {
                self.report_relation(record, RecordRole::ContentEntry, tags::CIRCLE_KEY, rel);
                DEFAULT_CIRCLE_ID.to_string()
            }
            Relation::Missing => DEFAULT_CIRCLE_ID.to_string(),
        };

        let config = self.config;
        let is_own = record.owner_id == self.self_id;
        let (author_name, author_avatar) = if is_own {
            let resolved = self.resolver.resolve(self.self_id, &config.self_label);
            (config.self_label.clone(), resolved.avatar_url)
        } else {
            let label = &config.unknown_author_label;
            let resolved = self.resolver.resolve(&record.owner_id, label);
            if resolved.is_placeholder {
                self.diagnostics.push(Diagnostic::PlaceholderProfile {
                    user_id: record.owner_id.clone(),
                    label: label.clone(),
                });
            }
            (resolved.name, resolved.avatar_url)
        };

        let mut liked_by_anyone = false;
        let mut liked = false;
        for user in tags::relation_values(&record.tags, tags::LIKED_KEY) {
            liked_by_anyone = true;
            liked |= user == self.self_id;
        }

        ContentEntry {
            id: record.id.clone(),
            circle_id,
            author_id: record.owner_id.clone(),
            author_name,
            author_avatar,
            is_own,
            title: record.title.clone(),
            body: record.content.clone(),
            kind: record.kind,
            mood: record.mood.clone(),
            photo_url: record.photo_url.clone(),
            audio_url: record.audio_url.clone(),
            is_shared: record.is_shared,
            created_at: record.created_at,
            liked,
            likes: u32::from(liked_by_anyone),
            tags: record
                .tags
                .iter()
                .filter(|tag| !tags::is_system_tag(tag))
                .cloned()
                .collect(),
        }
    }

    fn invites(&mut self, connections: &[Connection]) -> Vec<Invite> {
        let config = self.config;
        let label = &config.unknown_inviter_label;
        let mut invites = Vec::new();

        for conn in connections {
            if conn.partner_id != self.self_id || conn.status != ConnectionStatus::Pending {
                continue;
            }
            let resolved = self.resolver.resolve(&conn.user_id, label);
            if resolved.is_placeholder {
                self.diagnostics.push(Diagnostic::PlaceholderProfile {
                    user_id: conn.user_id.clone(),
                    label: label.clone(),
                });
            }
            invites.push(Invite {
                id: conn.id.clone(),
                inviter_id: conn.user_id.clone(),
                inviter_name: resolved.name,
                inviter_avatar: resolved.avatar_url,
            });
        }

        invites
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TagBuilder;

    fn input<'a>(
        rows: &'a [Record],
        connected: &'a [UserId],
        profiles: &'a HashMap<UserId, Profile>,
    ) -> ReconcileInput<'a> {
        ReconcileInput {
            self_id: "u1",
            rows,
            connected_user_ids: connected,
            profiles,
            pending_connections: &[],
        }
    }

    fn profiles() -> HashMap<UserId, Profile> {
        HashMap::from([
            ("u1".to_string(), Profile::new("u1", "Ada Lovelace")),
            ("u2".to_string(), Profile::new("u2", "Grace Hopper")),
        ])
    }

    #[test]
    fn circle_id_allocator() {
        assert_eq!(implicit_circle_id(0, "u2"), "c1");
        assert_eq!(implicit_circle_id(1, "u3"), "partner_u3");
        assert_eq!(implicit_circle_id(5, "abc"), "partner_abc");
    }

    #[test]
    fn custom_config_keeps_fixed_circle_ids() {
        let profiles = profiles();
        let config = ReconcilerConfig::new()
            .with_self_label("Moi")
            .with_untitled_circle_name("Sans titre");
        let rows = vec![Record::new("e1", "u1", 1).with_content("untagged")];
        let output = Reconciler::new(config).reconcile(&input(&rows, &[], &profiles));

        assert_eq!(output.circles[0].id, DEFAULT_CIRCLE_ID);
        assert_eq!(output.entries[0].circle_id, DEFAULT_CIRCLE_ID);
        assert_eq!(implicit_circle_id(0, "u2"), DEFAULT_CIRCLE_ID);
    }

    #[test]
    fn solo_space_when_no_partner() {
        let profiles = profiles();
        let output = reconcile(&input(&[], &[], &profiles));

        assert_eq!(output.circles.len(), 1);
        let circle = &output.circles[0];
        assert_eq!(circle.id, "c1");
        assert_eq!(circle.name, "Ada's Space");
        assert_eq!(circle.kind, CircleKind::Custom);
        assert_eq!(circle.members, BTreeSet::from(["u1".to_string()]));
    }

    #[test]
    fn couple_circle_name_and_members() {
        let profiles = profiles();
        let connected = vec!["u2".to_string()];
        let output = reconcile(&input(&[], &connected, &profiles));

        let circle = output.circle("c1").unwrap();
        assert_eq!(circle.name, "Ada & Grace");
        assert_eq!(circle.kind, CircleKind::Couple);
        assert_eq!(circle.member_profiles[0].name, "Ada Lovelace");
        assert_eq!(circle.member_profiles[1].name, "Grace Hopper");
    }

    #[test]
    fn override_sets_archived_and_keeps_default_name_when_blank() {
        let profiles = profiles();
        let connected = vec!["u2".to_string()];
        let rows = vec![Record::new("o1", "u1", 5).with_tags(TagBuilder::circle_metadata("c1", true))];
        let output = reconcile(&input(&rows, &connected, &profiles));

        let circle = output.circle("c1").unwrap();
        assert_eq!(circle.name, "Ada & Grace");
        assert_eq!(circle.status, CircleStatus::Archived);
    }

    #[test]
    fn override_revision_tie_keeps_first_row() {
        let profiles = profiles();
        let rows = vec![
            Record::new("o2", "u1", 9)
                .with_title("Newest")
                .with_tags(TagBuilder::circle_metadata("c1", false)),
            Record::new("o1", "u1", 5)
                .with_title("Oldest")
                .with_tags(TagBuilder::circle_metadata("c1", true)),
        ];
        let output = reconcile(&input(&rows, &[], &profiles));

        let circle = output.circle("c1").unwrap();
        assert_eq!(circle.name, "Newest");
        assert_eq!(circle.status, CircleStatus::Active);
        assert!(output.diagnostics.contains(&Diagnostic::DuplicateOverride {
            record_id: "o1".to_string(),
            circle_id: "c1".to_string(),
        }));
    }

    #[test]
    fn later_revision_beats_newer_created_at() {
        let profiles = profiles();
        // Partner's override was created later, but ours was written last.
        let rows = vec![
            Record::new("o-partner", "u2", 9)
                .with_title("Theirs")
                .with_tags(TagBuilder::circle_metadata("c1", false))
                .with_revision(4),
            Record::new("o-own", "u1", 5)
                .with_title("Ours")
                .with_tags(TagBuilder::circle_metadata("c1", true))
                .with_revision(7),
        ];
        let connected = vec!["u2".to_string()];
        let output = reconcile(&input(&rows, &connected, &profiles));

        let circle = output.circle("c1").unwrap();
        assert_eq!(circle.name, "Ours");
        assert_eq!(circle.status, CircleStatus::Archived);
        assert!(output.diagnostics.contains(&Diagnostic::DuplicateOverride {
            record_id: "o-partner".to_string(),
            circle_id: "c1".to_string(),
        }));
    }

    #[test]
    fn override_for_custom_circle_is_unattached() {
        let profiles = profiles();
        let rows = vec![
            Record::new("d1", "u1", 1)
                .with_title("Family")
                .with_tags(TagBuilder::circle_definition(false)),
            Record::new("o1", "u1", 2)
                .with_title("Renamed")
                .with_tags(TagBuilder::circle_metadata("d1", false)),
        ];
        let output = reconcile(&input(&rows, &[], &profiles));

        assert_eq!(output.circle("d1").unwrap().name, "Family");
        assert!(output
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnattachedOverride { circle_id, .. } if circle_id == "d1")));
    }

    #[test]
    fn custom_circle_defaults() {
        let profiles = profiles();
        let rows = vec![Record::new("d1", "u1", 77)
            .with_title(" ")
            .with_tags(TagBuilder::circle_definition(true))];
        let output = reconcile(&input(&rows, &[], &profiles));

        let circle = output.circle("d1").unwrap();
        assert_eq!(circle.name, "Untitled Circle");
        assert_eq!(circle.theme_color, crate::circle::config::NEUTRAL_GRAY);
        assert_eq!(circle.status, CircleStatus::Archived);
        assert_eq!(circle.start_date, Some(77));
        assert_eq!(circle.kind, CircleKind::Custom);
    }

    #[test]
    fn definition_colliding_with_implicit_id_is_skipped() {
        let profiles = profiles();
        let rows = vec![Record::new("c1", "u1", 1).with_tags(TagBuilder::circle_definition(false))];
        let output = reconcile(&input(&rows, &[], &profiles));

        assert_eq!(output.circles.len(), 1);
        assert!(output.diagnostics.contains(&Diagnostic::DuplicateCircle {
            record_id: "c1".to_string(),
        }));
    }

    #[test]
    fn extended_member_without_profile_gets_placeholder() {
        let profiles = profiles();
        let rows = vec![Record::new("m1", "u1", 1).with_tags(TagBuilder::circle_membership("c1", "u7"))];
        let output = reconcile(&input(&rows, &[], &profiles));

        let circle = output.circle("c1").unwrap();
        assert!(circle.has_member("u7"));
        let placeholder = circle.member_profiles.iter().find(|p| p.id == "u7").unwrap();
        assert_eq!(placeholder.name, "Unknown");
        assert!(output.diagnostics.contains(&Diagnostic::PlaceholderProfile {
            user_id: "u7".to_string(),
            label: "Unknown".to_string(),
        }));
    }

    #[test]
    fn duplicate_membership_rows_collapse() {
        let profiles = profiles();
        let connected = vec!["u2".to_string()];
        let rows = vec![
            Record::new("m1", "u1", 1).with_tags(TagBuilder::circle_membership("c1", "u2")),
            Record::new("m2", "u2", 2).with_tags(TagBuilder::circle_membership("c1", "u1")),
        ];
        let output = reconcile(&input(&rows, &connected, &profiles));

        let circle = output.circle("c1").unwrap();
        assert_eq!(circle.members.len(), 2);
        assert_eq!(circle.member_profiles.len(), 2);
    }

    #[test]
    fn entry_author_labels() {
        let profiles = profiles();
        let connected = vec!["u2".to_string(), "u5".to_string()];
        let rows = vec![
            Record::new("e1", "u1", 3),
            Record::new("e2", "u2", 2),
            Record::new("e3", "u5", 1),
        ];
        let output = reconcile(&input(&rows, &connected, &profiles));

        assert_eq!(output.entries[0].author_name, "Me");
        assert!(output.entries[0].is_own);
        assert_eq!(output.entries[1].author_name, "Grace Hopper");
        assert_eq!(output.entries[2].author_name, "Friend");
        assert!(!output.entries[2].is_own);
    }

    #[test]
    fn likes_are_binary() {
        let profiles = profiles();
        let rows = vec![
            Record::new("e1", "u2", 1).with_tags(["liked:u2", "liked:u9"]),
            Record::new("e2", "u2", 1).with_tags(["liked:u1"]),
            Record::new("e3", "u2", 1),
        ];
        let output = reconcile(&input(&rows, &[], &profiles));

        assert!(!output.entries[0].liked);
        assert_eq!(output.entries[0].likes, 1);
        assert!(output.entries[1].liked);
        assert_eq!(output.entries[1].likes, 1);
        assert!(!output.entries[2].liked);
        assert_eq!(output.entries[2].likes, 0);
    }

    #[test]
    fn entry_tags_hide_system_tags() {
        let profiles = profiles();
        let rows = vec![Record::new("e1", "u1", 1).with_tags(["circle:c9", "liked:u1", "beach", "sunset"])];
        let output = reconcile(&input(&rows, &[], &profiles));

        assert_eq!(output.entries[0].circle_id, "c9");
        assert_eq!(output.entries[0].tags, vec!["beach", "sunset"]);
    }

    #[test]
    fn malformed_entry_circle_defaults_and_reports() {
        let profiles = profiles();
        let rows = vec![Record::new("e1", "u1", 1).with_tags(["circle:"])];
        let output = reconcile(&input(&rows, &[], &profiles));

        assert_eq!(output.entries[0].circle_id, "c1");
        assert!(output.diagnostics.contains(&Diagnostic::MalformedTag {
            record_id: "e1".to_string(),
            role: RecordRole::ContentEntry,
            tag: "circle:".to_string(),
        }));
    }

    #[test]
    fn facts_first_own_row_wins() {
        let profiles = profiles();
        let rows = vec![
            Record::new("f-partner", "u2", 3)
                .with_content("{\"p\":1}")
                .with_tags(TagBuilder::facts()),
            Record::new("f2", "u1", 2)
                .with_content("{\"a\":2}")
                .with_tags(TagBuilder::facts()),
            Record::new("f1", "u1", 1)
                .with_content("{\"a\":1}")
                .with_tags(TagBuilder::facts()),
        ];
        let output = reconcile(&input(&rows, &[], &profiles));

        let facts = output.facts.unwrap();
        assert_eq!(facts.record_id, "f2");
        assert_eq!(facts.content, "{\"a\":2}");
        assert!(output.diagnostics.contains(&Diagnostic::DuplicateFacts {
            record_id: "f1".to_string(),
        }));
        assert!(output.diagnostics.contains(&Diagnostic::PartnerFacts {
            record_id: "f-partner".to_string(),
            owner_id: "u2".to_string(),
        }));
    }

    #[test]
    fn duplicate_partner_ids_collapse() {
        let profiles = profiles();
        let connected = vec!["u2".to_string(), "u2".to_string()];
        let output = reconcile(&input(&[], &connected, &profiles));

        assert_eq!(output.circles.len(), 1);
        assert!(output.diagnostics.contains(&Diagnostic::DuplicatePartner {
            user_id: "u2".to_string(),
        }));
    }

    #[test]
    fn invites_only_for_pending_addressed_to_self() {
        let profiles = profiles();
        let connections = vec![
            Connection {
                id: "k1".to_string(),
                user_id: "u2".to_string(),
                partner_id: "u1".to_string(),
                status: ConnectionStatus::Pending,
                created_at: 1,
            },
            Connection {
                id: "k2".to_string(),
                user_id: "u1".to_string(),
                partner_id: "u3".to_string(),
                status: ConnectionStatus::Pending,
                created_at: 2,
            },
            Connection {
                id: "k3".to_string(),
                user_id: "u8".to_string(),
                partner_id: "u1".to_string(),
                status: ConnectionStatus::Pending,
                created_at: 3,
            },
            Connection {
                id: "k4".to_string(),
                user_id: "u4".to_string(),
                partner_id: "u1".to_string(),
                status: ConnectionStatus::Connected,
                created_at: 4,
            },
        ];
        let output = Reconciler::default().reconcile(&ReconcileInput {
            pending_connections: &connections,
            ..input(&[], &[], &profiles)
        });

        assert_eq!(output.pending_invites.len(), 2);
        assert_eq!(output.pending_invites[0].inviter_name, "Grace Hopper");
        assert_eq!(output.pending_invites[1].inviter_id, "u8");
        assert_eq!(output.pending_invites[1].inviter_name, "Unknown User");
    }

    #[test]
    fn custom_config_labels_are_used() {
        let profiles = HashMap::new();
        let reconciler = Reconciler::new(ReconcilerConfig::new().with_self_label("Moi"));
        let rows = vec![Record::new("e1", "u1", 1)];
        let output = reconciler.reconcile(&input(&rows, &[], &profiles));

        assert_eq!(reconciler.config().self_label, "Moi");
        assert_eq!(output.entries[0].author_name, "Moi");
        assert_eq!(output.circles[0].name, "Unknown's Space");
    }
}
