//! This bench builds the incomplete-community report over a store seeded with
//! a few hundred official communities, a third of which fail one check.

#![allow(missing_docs)]

use chrono::Utc;
use community_audit::{
    audit::build_incomplete_report,
    storage::{NewCommunity, Role},
    Config, NodeId, SqliteStore, UnitOfWork,
};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

const COMMUNITIES: i64 = 300;

fn seeded_store() -> SqliteStore {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let session = store.session().unwrap();
    let long = "x".repeat(200);

    for node in 1..=COMMUNITIES {
        let id = session
            .insert_community(&NewCommunity {
                parent_node_id: NodeId::new(node),
                name: format!("Community {node}"),
                description: Some(long.clone()),
                slug: format!("community-{node}"),
                created: Utc::now(),
                is_official_cluster: true,
            })
            .unwrap();

        if node % 3 != 0 {
            for i in 0..5 {
                session
                    .insert_discussion(id, &format!("Thread {i}"), Utc::now())
                    .unwrap();
            }
        }

        let page = session.insert_main_page(id).unwrap();
        session.insert_page_version(page, "draft", Utc::now()).unwrap();
        session.insert_page_version(page, &long, Utc::now()).unwrap();

        let user = session
            .insert_user(&format!("admin-{node}"), "Woman")
            .unwrap();
        session.subscribe(id, user, Role::Admin).unwrap();
    }

    session.commit().unwrap();
    store
}

fn audit_report(c: &mut Criterion) {
    let config = Config::default();
    c.bench_function("build incomplete report", |b| {
        b.iter_batched(
            seeded_store,
            |mut store| build_incomplete_report(&mut store, &config).unwrap(),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, audit_report);
criterion_main!(benches);
