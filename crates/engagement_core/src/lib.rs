//! Client-side engagement state for the learner front end.
//! This crate is the single source of truth for token, bookmark, enrollment
//! and recommendation invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod kv;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod query;
pub mod recommend;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngagementConfig;
pub use kv::{KeyValueStore, KvError, KvResult, MemoryKeyValueStore, SqliteKeyValueStore};
pub use ledger::token_ledger::{
    normalize_amount, LedgerError, LedgerResult, TokenLedger, TOKEN_BALANCE_KEY,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::catalog::{CatalogItem, LabelId};
pub use model::content::{
    BookmarkedContent, ContentId, ContentKind, ContentLevel, ContentRecord, EngagedContent,
    EnrolledContent,
};
pub use query::filter_sort::{
    filter_and_sort, CategoryFilter, ContentQuery, EngagedRecord, LevelFilter, SortOrder,
};
pub use recommend::selector::{
    fallback_selection, select_recommendations, RecommendationRequest, RecommendationSelector,
};
pub use service::session::{EngagementSession, PurchaseOutcome};
pub use store::engagement_store::{
    EngagementStore, KindCounts, StoreError, StoreResult, BOOKMARKS_KEY, ENROLLMENTS_KEY,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
