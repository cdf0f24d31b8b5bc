use engagement_core::{
    CatalogItem, ContentKind, ContentQuery, ContentRecord, EngagementSession, FixedClock,
    MemoryKeyValueStore, PurchaseOutcome, RecommendationRequest, RecommendationSelector,
    SortOrder, SqliteKeyValueStore,
};
use std::sync::Arc;

fn open_memory_session() -> EngagementSession<MemoryKeyValueStore, Arc<FixedClock>> {
    EngagementSession::open_with(
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(FixedClock::new(100)),
        RecommendationSelector::with_seed(9),
    )
}

#[test]
fn assessment_reward_then_purchase_flow() {
    let mut session = open_memory_session();

    assert_eq!(session.complete_assessment(50.0).unwrap(), 50);
    assert_eq!(
        session.purchase_package(30.0).unwrap(),
        PurchaseOutcome::Purchased { balance: 20 }
    );
    assert_eq!(
        session.purchase_package(25.5).unwrap(),
        PurchaseOutcome::InsufficientBalance {
            balance: 20,
            cost: 25
        }
    );
    assert_eq!(session.balance(), 20);
}

#[test]
fn views_apply_queries_to_the_owned_collections() {
    let mut session = open_memory_session();
    let engagement = session.engagement_mut();
    engagement
        .add_bookmark(ContentRecord::new("b", "Zig Basics", "A", "zig", ContentKind::Course))
        .unwrap();
    engagement
        .add_bookmark(ContentRecord::new("a", "Actix", "B", "actix", ContentKind::Workshop))
        .unwrap();
    engagement
        .add_enrollment(ContentRecord::new("e", "Embedded", "C", "emb", ContentKind::Course))
        .unwrap();

    let by_title = ContentQuery {
        sort_by: SortOrder::Title,
        ..ContentQuery::default()
    };
    let titles: Vec<String> = session
        .bookmarks_view(&by_title)
        .into_iter()
        .map(|item| item.content.title)
        .collect();
    assert_eq!(titles, vec!["Actix", "Zig Basics"]);

    let courses = ContentQuery::from_params(None, "course", "all", "recent");
    assert_eq!(session.enrollments_view(&courses).len(), 1);
    assert_eq!(session.bookmarks_view(&courses).len(), 1);
}

#[test]
fn home_recommendations_fall_back_when_catalog_is_empty() {
    let mut session = open_memory_session();
    let fallback = vec![CatalogItem::new("starter", "Starter task")];
    let request = RecommendationRequest::new(3);

    let picks = session.home_recommendations(&[], &request, &fallback);
    assert_eq!(picks, fallback);

    let catalog = vec![
        CatalogItem::new("1", "One").with_labels([4]),
        CatalogItem::new("2", "Two"),
    ];
    let picks = session.home_recommendations(&catalog, &request.with_affinity([4]), &fallback);
    assert_eq!(picks.len(), 2);
    assert_eq!(picks[0].id, "1");
}

#[test]
fn teardown_and_reopen_restores_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.db");

    let mut session = EngagementSession::open(SqliteKeyValueStore::open(&path).unwrap());
    session.complete_assessment(75.0).unwrap();
    session
        .engagement_mut()
        .add_enrollment(ContentRecord::new("e", "E", "A", "e", ContentKind::Tutorial))
        .unwrap();
    let store = session.teardown();
    assert_eq!(Arc::strong_count(&store), 1);
    drop(store);

    let reopened = EngagementSession::open(SqliteKeyValueStore::open(&path).unwrap());
    assert_eq!(reopened.balance(), 75);
    assert!(reopened.engagement().is_enrolled("e"));
    assert_eq!(reopened.ledger().balance(), 75);
}
