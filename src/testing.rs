//! Seed data shared by tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    domain::{CommunityId, NodeId},
    storage::{NewCommunity, Role, Session},
};

pub fn created() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 9, 14, 18, 0, 0).unwrap()
}

/// A string of `len` characters.
pub fn text(len: usize) -> String {
    "x".repeat(len)
}

/// Description of a community and its related rows.
///
/// [`Fixture::complete`] passes every completeness check; the `with_*`
/// methods knock out one property at a time.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub node: i64,
    pub official: bool,
    pub discussions: usize,
    pub description: Option<String>,
    pub main_page: Option<Vec<String>>,
    pub admin_genders: Vec<&'static str>,
}

impl Fixture {
    pub fn complete(node: i64) -> Self {
        Self {
            node,
            official: true,
            discussions: 3,
            description: Some(text(150)),
            main_page: Some(vec![text(200)]),
            admin_genders: vec!["Woman"],
        }
    }

    pub fn official(mut self, official: bool) -> Self {
        self.official = official;
        self
    }

    pub fn with_discussions(mut self, discussions: usize) -> Self {
        self.discussions = discussions;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_main_page(mut self, versions: Option<Vec<String>>) -> Self {
        self.main_page = versions;
        self
    }

    pub fn with_admins(mut self, genders: Vec<&'static str>) -> Self {
        self.admin_genders = genders;
        self
    }

    pub fn seed(&self, session: &Session) -> CommunityId {
        let id = session
            .insert_community(&NewCommunity {
                parent_node_id: NodeId::new(self.node),
                name: format!("Community {}", self.node),
                description: self.description.clone(),
                slug: format!("community-{}", self.node),
                created: created(),
                is_official_cluster: self.official,
            })
            .unwrap();

        for i in 0..self.discussions {
            session
                .insert_discussion(id, &format!("Thread {i}"), created())
                .unwrap();
        }

        if let Some(versions) = &self.main_page {
            let page = session.insert_main_page(id).unwrap();
            for content in versions {
                session.insert_page_version(page, content, created()).unwrap();
            }
        }

        for (i, gender) in self.admin_genders.iter().enumerate() {
            let user = session
                .insert_user(&format!("admin-{}-{i}", self.node), gender)
                .unwrap();
            session.subscribe(id, user, Role::Admin).unwrap();
        }

        id
    }
}
