//! Completeness auditing of official communities.
//!
//! A community is complete when it
//!
//! - owns at least one discussion,
//! - has a description longer than [`MIN_DESCRIPTION_LENGTH`] characters,
//! - has a main page whose latest version is longer than
//!   [`MIN_MAIN_PAGE_LENGTH`] characters, and
//! - has at least one admin whose gender is not in
//!   [`EXCLUDED_ADMIN_GENDERS`].
//!
//! All four checks are mandatory and equally weighted. The report lists the
//! official communities failing at least one of them, with the individual
//! results so a reader can see which check failed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{
    domain::{Community, CommunityId, Config, Discussion, MainPage, NodeId, User},
    storage::{
        CommunityFilter, DiscussionFilter, Repository, Storage, StorageError, UnitOfWork,
    },
};

/// A description must be longer than this many characters.
pub const MIN_DESCRIPTION_LENGTH: usize = 100;

/// The latest main-page version must be longer than this many characters.
pub const MIN_MAIN_PAGE_LENGTH: usize = 100;

/// Admin genders that do not count towards the admin check.
///
/// Matching is exact and case-sensitive. This is a literal two-value list,
/// not a general classifier: any other value (including an empty one) passes.
pub const EXCLUDED_ADMIN_GENDERS: [&str; 2] = ["Man", "Male"];

/// Errors that stop an audit.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// A storage lookup failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The community has no description at all.
    #[error("community '{name}' (node {node}) has no description")]
    MissingDescription {
        /// Node of the offending community.
        node: NodeId,
        /// Name of the offending community.
        name: String,
    },

    /// The community has no main page.
    #[error("community '{name}' (node {node}) has no main page")]
    MissingMainPage {
        /// Node of the offending community.
        node: NodeId,
        /// Name of the offending community.
        name: String,
    },

    /// The community's main page has no versions.
    #[error("community '{name}' (node {node}) has no main-page version")]
    NoMainPageVersion {
        /// Node of the offending community.
        node: NodeId,
        /// Name of the offending community.
        name: String,
    },
}

/// Discussion counts keyed by owning community, built from a single bulk
/// fetch of all discussions.
#[derive(Debug, Clone, Default)]
pub struct DiscussionIndex {
    counts: HashMap<CommunityId, usize>,
}

impl DiscussionIndex {
    /// Indexes discussions by their owning community.
    #[must_use]
    pub fn new(discussions: &[Discussion]) -> Self {
        let mut counts = HashMap::new();
        for discussion in discussions {
            *counts.entry(discussion.owner_cluster_id).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Number of discussions owned by the community.
    #[must_use]
    pub fn count(&self, community: CommunityId) -> usize {
        self.counts.get(&community).copied().unwrap_or(0)
    }

    /// Whether the community owns any discussion.
    #[must_use]
    pub fn has_discussions(&self, community: CommunityId) -> bool {
        self.count(community) > 0
    }
}

/// Whether the description is longer than [`MIN_DESCRIPTION_LENGTH`]
/// characters.
///
/// # Errors
///
/// Returns [`AuditError::MissingDescription`] if the community has no
/// description.
pub fn has_description_length(community: &Community) -> Result<bool, AuditError> {
    let description =
        community
            .description
            .as_deref()
            .ok_or_else(|| AuditError::MissingDescription {
                node: community.parent_node_id,
                name: community.name.clone(),
            })?;
    Ok(description.chars().count() > MIN_DESCRIPTION_LENGTH)
}

/// Whether the latest main-page version is longer than
/// [`MIN_MAIN_PAGE_LENGTH`] characters. Earlier versions are ignored.
#[must_use]
pub fn has_main_page_length(main_page: &MainPage) -> bool {
    main_page.latest().content.chars().count() > MIN_MAIN_PAGE_LENGTH
}

/// Whether any admin has a gender outside [`EXCLUDED_ADMIN_GENDERS`].
///
/// An empty admin list fails. This only detects "not all admins are
/// recorded as men", nothing broader.
#[must_use]
pub fn has_non_exclusively_male_admin(admins: &[User]) -> bool {
    admins
        .iter()
        .any(|admin| !EXCLUDED_ADMIN_GENDERS.contains(&admin.gender.as_str()))
}

/// Results of the four completeness checks for one community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completeness {
    /// The community owns at least one discussion.
    pub has_discussions: bool,
    /// The description is long enough.
    pub has_description_length: bool,
    /// The latest main-page version is long enough.
    pub has_main_page_length: bool,
    /// At least one admin is not recorded as a man.
    #[serde(rename = "has_non_man_admin")]
    pub has_non_exclusively_male_admin: bool,
}

impl Completeness {
    /// A community is complete only if every check passes.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.has_discussions
            && self.has_description_length
            && self.has_main_page_length
            && self.has_non_exclusively_male_admin
    }
}

/// One row of the audit report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    /// Community primary key.
    pub id: CommunityId,
    /// Node the community is attached to.
    pub parent_node_id: NodeId,
    /// Community name.
    pub name: String,
    /// Canonical community URL.
    pub url: String,
    /// When the community was created.
    pub created: DateTime<Utc>,
    /// Individual check results.
    #[serde(flatten)]
    pub completeness: Completeness,
}

impl AuditRecord {
    /// Builds the record for a community.
    #[must_use]
    pub fn new(community: &Community, host: &str, completeness: Completeness) -> Self {
        Self {
            id: community.id,
            parent_node_id: community.parent_node_id,
            name: community.name.clone(),
            url: community.url(host),
            created: community.created,
            completeness,
        }
    }
}

/// Official communities that failed the audit, in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    audited: usize,
    incomplete: Vec<AuditRecord>,
}

impl AuditReport {
    /// Number of official communities evaluated.
    #[must_use]
    pub const fn audited(&self) -> usize {
        self.audited
    }

    /// The incomplete communities.
    #[must_use]
    pub fn incomplete(&self) -> &[AuditRecord] {
        &self.incomplete
    }

    /// Whether every audited community is complete.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incomplete.is_empty()
    }

    /// Consumes the report, returning the incomplete communities.
    #[must_use]
    pub fn into_records(self) -> Vec<AuditRecord> {
        self.incomplete
    }
}

/// Runs the audit in its own unit of work.
///
/// # Errors
///
/// Returns an error if a lookup fails or a community has missing data (see
/// [`AuditError`]). No partial report is returned.
pub fn build_incomplete_report<S: Storage>(
    store: &mut S,
    config: &Config,
) -> Result<AuditReport, AuditError> {
    build_incomplete_report_with_progress(store, config, &ProgressBar::hidden())
}

/// Like [`build_incomplete_report`], advancing `progress` once per evaluated
/// community.
///
/// # Errors
///
/// See [`build_incomplete_report`].
pub fn build_incomplete_report_with_progress<S: Storage>(
    store: &mut S,
    config: &Config,
    progress: &ProgressBar,
) -> Result<AuditReport, AuditError> {
    let session = store.begin()?;
    let report = incomplete_communities(&session, config.host(), progress)?;
    session.commit()?;
    Ok(report)
}

/// Evaluates every official community against an open repository.
///
/// Discussions are fetched once up front. Per-community data (description,
/// main page, admins) is looked up by parent node.
///
/// # Errors
///
/// See [`build_incomplete_report`].
#[instrument(level = "debug", skip(repo, progress))]
pub fn incomplete_communities<R: Repository + ?Sized>(
    repo: &R,
    host: &str,
    progress: &ProgressBar,
) -> Result<AuditReport, AuditError> {
    info!("Fetching communities");
    let communities = repo.communities(&CommunityFilter::official())?;

    info!("Fetching discussions");
    let discussions = DiscussionIndex::new(&repo.discussions(&DiscussionFilter::all())?);

    progress.set_length(u64::try_from(communities.len()).unwrap_or(u64::MAX));
    progress.set_message("evaluating communities");

    let evaluated = communities
        .iter()
        .filter_map(|community| {
            let completeness = evaluate(
                repo,
                community.parent_node_id,
                discussions.has_discussions(community.id),
            );
            progress.inc(1);
            match completeness {
                Ok(completeness) if completeness.is_complete() => None,
                Ok(completeness) => {
                    debug!(node = %community.parent_node_id, ?completeness, "Community is incomplete");
                    Some(Ok(AuditRecord::new(community, host, completeness)))
                }
                Err(e) => Some(Err(e)),
            }
        })
        .collect::<Result<Vec<_>, _>>();
    progress.finish_and_clear();
    let incomplete = evaluated?;

    info!(
        audited = communities.len(),
        incomplete = incomplete.len(),
        "Audit finished"
    );
    Ok(AuditReport {
        audited: communities.len(),
        incomplete,
    })
}

fn evaluate<R: Repository + ?Sized>(
    repo: &R,
    node: NodeId,
    has_discussions: bool,
) -> Result<Completeness, AuditError> {
    let community = repo.unique_community(&CommunityFilter::node(node))?;

    let has_description_length = has_description_length(&community)?;

    let versions = repo
        .main_page_versions(&community)?
        .ok_or_else(|| AuditError::MissingMainPage {
            node,
            name: community.name.clone(),
        })?;
    let main_page =
        MainPage::from_versions(versions).ok_or_else(|| AuditError::NoMainPageVersion {
            node,
            name: community.name.clone(),
        })?;

    let admins = repo.admins(&community)?;

    Ok(Completeness {
        has_discussions,
        has_description_length,
        has_main_page_length: has_main_page_length(&main_page),
        has_non_exclusively_male_admin: has_non_exclusively_male_admin(&admins),
    })
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::{
        domain::PageVersion,
        storage::SqliteStore,
        testing::{created, text, Fixture},
    };

    fn community(description: Option<String>) -> Community {
        Community {
            id: CommunityId::new(1),
            parent_node_id: NodeId::new(100),
            name: "Berlin".to_string(),
            description,
            slug: "berlin".to_string(),
            created: created(),
            is_official_cluster: true,
        }
    }

    fn page(contents: &[String]) -> MainPage {
        let versions = contents
            .iter()
            .zip(1..)
            .map(|(content, id)| PageVersion {
                id,
                content: content.clone(),
                created: created(),
            })
            .collect();
        MainPage::from_versions(versions).unwrap()
    }

    fn admins(genders: &[&str]) -> Vec<User> {
        genders
            .iter()
            .zip(1..)
            .map(|(gender, id)| User {
                id,
                username: format!("user{id}"),
                gender: (*gender).to_string(),
            })
            .collect()
    }

    fn discussion(id: i64, owner: i64) -> Discussion {
        Discussion {
            id,
            owner_cluster_id: CommunityId::new(owner),
            title: format!("Thread {id}"),
            created: created(),
        }
    }

    fn audit(store: &mut SqliteStore) -> AuditReport {
        build_incomplete_report(store, &Config::default()).unwrap()
    }

    #[test]
    fn discussion_index_counts_per_owner() {
        let index = DiscussionIndex::new(&[discussion(1, 7), discussion(2, 8), discussion(3, 7)]);

        assert_eq!(index.count(CommunityId::new(7)), 2);
        assert!(index.has_discussions(CommunityId::new(8)));
        assert!(!index.has_discussions(CommunityId::new(9)));
    }

    #[test_case(0, false; "empty")]
    #[test_case(100, false; "exactly at threshold")]
    #[test_case(101, true; "one over threshold")]
    fn description_length_boundary(len: usize, expected: bool) {
        assert_eq!(
            has_description_length(&community(Some(text(len)))).unwrap(),
            expected
        );
    }

    #[test]
    fn description_length_counts_characters() {
        let description = "é".repeat(MIN_DESCRIPTION_LENGTH);
        assert!(!has_description_length(&community(Some(description))).unwrap());
    }

    #[test]
    fn missing_description_is_an_error() {
        let error = has_description_length(&community(None)).unwrap_err();
        assert!(matches!(error, AuditError::MissingDescription { .. }));
    }

    #[test_case(&[text(101)], true; "single long version")]
    #[test_case(&[text(100)], false; "single version at threshold")]
    #[test_case(&[text(500), text(10)], false; "long first short latest")]
    #[test_case(&[text(10), text(101)], true; "short first long latest")]
    fn main_page_length_uses_latest_version(contents: &[String], expected: bool) {
        assert_eq!(has_main_page_length(&page(contents)), expected);
    }

    #[test_case(&[], false; "no admins")]
    #[test_case(&["Man"], false; "single man")]
    #[test_case(&["Man", "Male"], false; "all excluded values")]
    #[test_case(&["Woman"], true; "single woman")]
    #[test_case(&["Man", "Non-binary"], true; "one outside the list")]
    #[test_case(&["Non-binary", "Man"], true; "order does not matter")]
    #[test_case(&["man"], true; "match is case sensitive")]
    fn admin_check(genders: &[&str], expected: bool) {
        assert_eq!(has_non_exclusively_male_admin(&admins(genders)), expected);
    }

    #[test]
    fn complete_only_when_every_check_passes() {
        let all = Completeness {
            has_discussions: true,
            has_description_length: true,
            has_main_page_length: true,
            has_non_exclusively_male_admin: true,
        };
        assert!(all.is_complete());

        for failing in [
            Completeness {
                has_discussions: false,
                ..all
            },
            Completeness {
                has_description_length: false,
                ..all
            },
            Completeness {
                has_main_page_length: false,
                ..all
            },
            Completeness {
                has_non_exclusively_male_admin: false,
                ..all
            },
        ] {
            assert!(!failing.is_complete());
        }
    }

    #[test]
    fn community_without_discussions_is_reported() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            Fixture::complete(1).seed(&session);
            Fixture::complete(2).with_discussions(0).seed(&session);
            session.commit().unwrap();
        }

        let report = audit(&mut store);

        assert_eq!(report.audited(), 2);
        assert_eq!(report.incomplete().len(), 1);
        let record = &report.incomplete()[0];
        assert_eq!(record.parent_node_id, NodeId::new(2));
        assert_eq!(record.name, "Community 2");
        assert_eq!(record.url, "app.couchers.org/community/2/community-2");
        assert_eq!(record.created, created());
        assert_eq!(
            record.completeness,
            Completeness {
                has_discussions: false,
                has_description_length: true,
                has_main_page_length: true,
                has_non_exclusively_male_admin: true,
            }
        );
    }

    #[test]
    fn discussions_of_other_communities_do_not_count() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            Fixture::complete(1).with_discussions(5).seed(&session);
            Fixture::complete(2).with_discussions(0).seed(&session);
            Fixture::complete(3).with_discussions(1).seed(&session);
            session.commit().unwrap();
        }

        let report = audit(&mut store);

        assert_eq!(report.incomplete().len(), 1);
        assert_eq!(report.incomplete()[0].parent_node_id, NodeId::new(2));
        assert!(!report.incomplete()[0].completeness.has_discussions);
    }

    #[test]
    fn unofficial_communities_are_not_audited() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            Fixture::complete(1)
                .official(false)
                .with_discussions(0)
                .with_admins(Vec::new())
                .seed(&session);
            Fixture::complete(2).seed(&session);
            session.commit().unwrap();
        }

        let report = audit(&mut store);

        assert_eq!(report.audited(), 1);
        assert!(report.is_empty());
    }

    #[test]
    fn unofficial_communities_with_broken_data_are_skipped() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            Fixture::complete(1)
                .official(false)
                .with_description(None)
                .with_main_page(None)
                .seed(&session);
            session.commit().unwrap();
        }

        assert!(audit(&mut store).is_empty());
    }

    #[test]
    fn report_keeps_fetch_order_and_records_each_failure() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            Fixture::complete(30).with_admins(vec!["Male"]).seed(&session);
            Fixture::complete(10).seed(&session);
            Fixture::complete(20)
                .with_description(Some(text(100)))
                .seed(&session);
            Fixture::complete(40)
                .with_main_page(Some(vec![text(300), text(5)]))
                .seed(&session);
            session.commit().unwrap();
        }

        let report = audit(&mut store);
        let nodes: Vec<_> = report
            .incomplete()
            .iter()
            .map(|r| r.parent_node_id.get())
            .collect();

        assert_eq!(report.audited(), 4);
        assert_eq!(nodes, vec![30, 20, 40]);
        assert!(!report.incomplete()[0].completeness.has_non_exclusively_male_admin);
        assert!(!report.incomplete()[1].completeness.has_description_length);
        assert!(!report.incomplete()[2].completeness.has_main_page_length);
    }

    #[test]
    fn empty_when_every_official_community_passes() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            for node in 1..=5 {
                Fixture::complete(node).seed(&session);
            }
            session.commit().unwrap();
        }

        let report = audit(&mut store);

        assert_eq!(report.audited(), 5);
        assert!(report.is_empty());
    }

    #[test]
    fn missing_description_stops_the_audit() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            Fixture::complete(1).with_description(None).seed(&session);
            session.commit().unwrap();
        }

        let error = build_incomplete_report(&mut store, &Config::default()).unwrap_err();
        assert!(matches!(error, AuditError::MissingDescription { .. }));
    }

    #[test]
    fn main_page_without_versions_stops_the_audit() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            Fixture::complete(1)
                .with_main_page(Some(Vec::new()))
                .seed(&session);
            session.commit().unwrap();
        }

        let error = build_incomplete_report(&mut store, &Config::default()).unwrap_err();
        assert!(matches!(error, AuditError::NoMainPageVersion { .. }));
    }

    #[test]
    fn missing_main_page_stops_the_audit() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            Fixture::complete(1).with_main_page(None).seed(&session);
            session.commit().unwrap();
        }

        let error = build_incomplete_report(&mut store, &Config::default()).unwrap_err();
        assert!(matches!(error, AuditError::MissingMainPage { .. }));
    }

    #[test]
    fn duplicate_parent_node_is_a_lookup_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            Fixture::complete(1).seed(&session);
            Fixture::complete(1)
                .official(false)
                .with_admins(Vec::new())
                .seed(&session);
            session.commit().unwrap();
        }

        let error = build_incomplete_report(&mut store, &Config::default()).unwrap_err();
        assert!(matches!(
            error,
            AuditError::Storage(StorageError::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn progress_advances_per_community() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            Fixture::complete(1).seed(&session);
            Fixture::complete(2).with_discussions(0).seed(&session);
            session.commit().unwrap();
        }
        let progress = ProgressBar::hidden();

        build_incomplete_report_with_progress(&mut store, &Config::default(), &progress).unwrap();

        assert_eq!(progress.position(), 2);
        assert_eq!(progress.length(), Some(2));
    }

    #[test]
    fn progress_is_cleared_when_the_audit_fails() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        {
            let session = store.session().unwrap();
            Fixture::complete(1).seed(&session);
            Fixture::complete(2).with_main_page(None).seed(&session);
            Fixture::complete(3).seed(&session);
            session.commit().unwrap();
        }
        let progress = ProgressBar::hidden();

        let error = build_incomplete_report_with_progress(&mut store, &Config::default(), &progress)
            .unwrap_err();

        assert!(matches!(error, AuditError::MissingMainPage { .. }));
        assert!(progress.is_finished());
        assert_eq!(progress.position(), 2);
    }

    #[test]
    fn record_serializes_with_report_field_names() {
        let record = AuditRecord::new(
            &community(Some(text(10))),
            "app.couchers.org",
            Completeness {
                has_discussions: true,
                has_description_length: false,
                has_main_page_length: true,
                has_non_exclusively_male_admin: false,
            },
        );

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["parent_node_id"], 100);
        assert_eq!(json["url"], "app.couchers.org/community/100/berlin");
        assert_eq!(json["has_description_length"], false);
        assert_eq!(json["has_non_man_admin"], false);
    }
}
