//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level engagement functions to Dart via FRB.
//! - Own the single process-wide engagement session behind a mutex.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every call locks the session for its whole duration, so host threads
//!   never observe a half-applied ledger or collection update.
//! - Content records cross the boundary as JSON in the remote catalog shape.

use engagement_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CatalogItem, ContentQuery, ContentRecord, EngagedRecord, EngagementConfig, EngagementSession,
    PurchaseOutcome, RecommendationRequest, SqliteKeyValueStore,
};
use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

type Session = EngagementSession<SqliteKeyValueStore>;

struct OpenSession {
    db_path: PathBuf,
    /// Resolved from `EngagementConfig` once, at `session_init`.
    default_recommendation_count: u32,
    session: Session,
}

static SESSION: Mutex<Option<OpenSession>> = Mutex::new(None);

const MAX_RECOMMENDATIONS: u32 = 12;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Opens the engagement session backed by the SQLite file at `db_path`.
///
/// Blank `db_path` resolves through `ENGAGEMENT_DB_PATH` or the temp dir.
///
/// # FFI contract
/// - Idempotent for the same path.
/// - Opening a different path while a session is open is rejected.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn session_init(db_path: String) -> String {
    let config = EngagementConfig::from_env();
    let db_path = resolve_db_path(&db_path, &config);
    let mut guard = lock_session();

    if let Some(open) = guard.as_ref() {
        if open.db_path == db_path {
            return String::new();
        }
        return format!(
            "session already open at `{}`; refusing to switch to `{}`",
            open.db_path.display(),
            db_path.display()
        );
    }

    match SqliteKeyValueStore::open(&db_path) {
        Ok(store) => {
            *guard = Some(OpenSession {
                db_path,
                // Config clamps to 1..=12, which fits in u32.
                default_recommendation_count: config.recommendation_count as u32,
                session: EngagementSession::open(store),
            });
            String::new()
        }
        Err(err) => format!("session_init failed: {err}"),
    }
}

/// Closes the open session; a no-op when none is open.
#[flutter_rust_bridge::frb(sync)]
pub fn session_teardown() -> String {
    if let Some(open) = lock_session().take() {
        drop(open.session.teardown());
    }
    String::new()
}

/// Token balance response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    /// Whether the operation was applied.
    pub ok: bool,
    /// Balance after the call (unchanged on failure).
    pub balance: u64,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Returns the current balance.
#[flutter_rust_bridge::frb(sync)]
pub fn token_balance() -> TokenResponse {
    match with_session(|session| session.balance()) {
        Ok(balance) => TokenResponse {
            ok: true,
            balance,
            message: String::new(),
        },
        Err(message) => token_failure(0, message),
    }
}

/// Credits tokens after a completed assessment.
#[flutter_rust_bridge::frb(sync)]
pub fn token_credit(amount: f64) -> TokenResponse {
    let result = with_session(|session| {
        session
            .complete_assessment(amount)
            .map_err(|err| (session.balance(), err.to_string()))
    });
    match result {
        Ok(Ok(balance)) => TokenResponse {
            ok: true,
            balance,
            message: "Tokens credited.".to_string(),
        },
        Ok(Err((balance, message))) => {
            token_failure(balance, format!("token_credit failed: {message}"))
        }
        Err(message) => token_failure(0, message),
    }
}

/// Spends tokens on a package if the balance covers `cost`.
///
/// Insufficient balance is `ok=false` with the unchanged balance.
#[flutter_rust_bridge::frb(sync)]
pub fn token_debit(cost: f64) -> TokenResponse {
    let result = with_session(|session| {
        session
            .purchase_package(cost)
            .map_err(|err| (session.balance(), err.to_string()))
    });
    match result {
        Ok(Ok(PurchaseOutcome::Purchased { balance })) => TokenResponse {
            ok: true,
            balance,
            message: "Package purchased.".to_string(),
        },
        Ok(Ok(PurchaseOutcome::InsufficientBalance { balance, cost })) => token_failure(
            balance,
            format!("Insufficient balance: {balance} available, {cost} required."),
        ),
        Ok(Err((balance, message))) => {
            token_failure(balance, format!("token_debit failed: {message}"))
        }
        Err(message) => token_failure(0, message),
    }
}

/// Content card returned to list and dashboard views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub author: String,
    /// `course|workshop|hackathon|tutorial`.
    pub kind: String,
    pub level: Option<String>,
    pub rating: Option<String>,
    pub image_url: Option<String>,
    /// Detail page route, e.g. `/courses/intro`.
    pub route: String,
    /// Bookmark or enrollment time in epoch milliseconds.
    pub engaged_at: Option<i64>,
    /// Enrollment progress; `None` for bookmarks.
    pub progress: Option<u8>,
}

/// Generic action response envelope for bookmark/enrollment mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementActionResponse {
    pub ok: bool,
    /// Bookmark/enrollment state after the call, when meaningful.
    pub active: bool,
    pub message: String,
}

impl EngagementActionResponse {
    fn success(active: bool, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            active,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            active: false,
            message: message.into(),
        }
    }
}

/// Bookmarks a content record given as catalog JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn bookmark_add(record_json: String) -> EngagementActionResponse {
    let record = match parse_record(&record_json) {
        Ok(record) => record,
        Err(message) => return EngagementActionResponse::failure(message),
    };
    engagement_action("bookmark_add", |session| {
        session.engagement_mut().add_bookmark(record).map(|()| true)
    })
}

/// Removes a bookmark; unknown ids succeed with `active=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn bookmark_remove(id: String) -> EngagementActionResponse {
    engagement_action("bookmark_remove", |session| {
        session
            .engagement_mut()
            .remove_bookmark(id.trim())
            .map(|()| false)
    })
}

/// Flips bookmark state for a content record given as catalog JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn bookmark_toggle(record_json: String) -> EngagementActionResponse {
    let record = match parse_record(&record_json) {
        Ok(record) => record,
        Err(message) => return EngagementActionResponse::failure(message),
    };
    engagement_action("bookmark_toggle", |session| {
        session.engagement_mut().toggle_bookmark(record)
    })
}

/// Enrolls in (or refreshes) a content record given as catalog JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn enrollment_add(record_json: String) -> EngagementActionResponse {
    let record = match parse_record(&record_json) {
        Ok(record) => record,
        Err(message) => return EngagementActionResponse::failure(message),
    };
    engagement_action("enrollment_add", |session| {
        session.engagement_mut().add_enrollment(record).map(|()| true)
    })
}

/// Records course-consumption progress; unknown ids are a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn enrollment_update_progress(id: String, progress: i64) -> EngagementActionResponse {
    engagement_action("enrollment_update_progress", |session| {
        let engagement = session.engagement_mut();
        let id = id.trim();
        engagement
            .update_progress(id, progress)
            .map(|()| engagement.is_enrolled(id))
    })
}

/// Returns whether `id` is bookmarked; `false` without an open session.
#[flutter_rust_bridge::frb(sync)]
pub fn is_bookmarked(id: String) -> bool {
    with_session(|session| session.engagement().is_bookmarked(id.trim())).unwrap_or(false)
}

/// Returns whether `id` is enrolled; `false` without an open session.
#[flutter_rust_bridge::frb(sync)]
pub fn is_enrolled(id: String) -> bool {
    with_session(|session| session.engagement().is_enrolled(id.trim())).unwrap_or(false)
}

/// List response envelope for bookmark/enrollment pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentListResponse {
    pub items: Vec<ContentItem>,
    pub message: String,
}

/// Bookmarks page view using query-string style criteria.
#[flutter_rust_bridge::frb(sync)]
pub fn bookmarks_list(
    search: Option<String>,
    category: String,
    level: String,
    sort: String,
) -> ContentListResponse {
    let query = ContentQuery::from_params(search.as_deref(), &category, &level, &sort);
    content_list(|session| {
        session
            .bookmarks_view(&query)
            .iter()
            .map(|item| to_content_item(item, None))
            .collect()
    })
}

/// Enrolled content page view using query-string style criteria.
#[flutter_rust_bridge::frb(sync)]
pub fn enrollments_list(
    search: Option<String>,
    category: String,
    level: String,
    sort: String,
) -> ContentListResponse {
    let query = ContentQuery::from_params(search.as_deref(), &category, &level, &sort);
    content_list(|session| {
        session
            .enrollments_view(&query)
            .iter()
            .map(|item| to_content_item(item, Some(item.progress)))
            .collect()
    })
}

/// Dashboard recommendation card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendedItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub level: Option<String>,
    pub duration: Option<String>,
    pub points: Option<u64>,
}

/// Recommendation response envelope for the home dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationResponse {
    pub items: Vec<RecommendedItem>,
    /// True when the fixed starter set replaced an empty catalog.
    pub used_fallback: bool,
    pub message: String,
    pub applied_count: u32,
}

/// Picks home dashboard recommendations from a fetched catalog.
///
/// Input semantics:
/// - `catalog_json`: JSON array in the remote catalog shape; blank or
///   unparseable input is treated as a failed fetch (empty pool).
/// - `exclude_ids`: already completed/attended ids.
/// - `affinity_labels`: learner profile label ids.
/// - `count`: `None`/0 uses the default resolved at `session_init`; clamped to 12.
#[flutter_rust_bridge::frb(sync)]
pub fn recommendations_pick(
    catalog_json: String,
    exclude_ids: Vec<String>,
    affinity_labels: Vec<u64>,
    count: Option<u32>,
) -> RecommendationResponse {
    let pool = parse_catalog(&catalog_json);
    let fallback = starter_catalog();

    let picked = with_open_session(|open| {
        let applied_count =
            normalize_recommendation_count(count, open.default_recommendation_count);
        let request = RecommendationRequest::new(applied_count as usize)
            .excluding(exclude_ids.iter().map(|id| id.trim().to_string()))
            .with_affinity(affinity_labels);
        let picks = open.session.home_recommendations(&pool, &request, &fallback);
        (applied_count, picks)
    });

    match picked {
        Ok((applied_count, picks)) => RecommendationResponse {
            items: picks.into_iter().map(to_recommended_item).collect(),
            used_fallback: pool.is_empty(),
            message: if pool.is_empty() {
                "Catalog unavailable; showing starter picks.".to_string()
            } else {
                String::new()
            },
            applied_count,
        },
        Err(message) => RecommendationResponse {
            items: Vec::new(),
            used_fallback: false,
            message,
            applied_count: 0,
        },
    }
}

fn lock_session() -> MutexGuard<'static, Option<OpenSession>> {
    SESSION.lock().unwrap_or_else(PoisonError::into_inner)
}

fn with_open_session<T>(f: impl FnOnce(&mut OpenSession) -> T) -> Result<T, String> {
    let mut guard = lock_session();
    match guard.as_mut() {
        Some(open) => Ok(f(open)),
        None => Err("engagement session is not open; call session_init first".to_string()),
    }
}

fn with_session<T>(f: impl FnOnce(&mut Session) -> T) -> Result<T, String> {
    with_open_session(|open| f(&mut open.session))
}

fn engagement_action(
    operation: &'static str,
    f: impl FnOnce(&mut Session) -> engagement_core::StoreResult<bool>,
) -> EngagementActionResponse {
    match with_session(f) {
        Ok(Ok(active)) => EngagementActionResponse::success(active, String::new()),
        Ok(Err(err)) => {
            warn!("event=ffi_action module=ffi status=error operation={operation} error={err}");
            EngagementActionResponse::failure(format!("{operation} failed: {err}"))
        }
        Err(message) => EngagementActionResponse::failure(message),
    }
}

fn content_list(f: impl FnOnce(&mut Session) -> Vec<ContentItem>) -> ContentListResponse {
    match with_session(f) {
        Ok(items) => ContentListResponse {
            message: if items.is_empty() {
                "No results.".to_string()
            } else {
                format!("Found {} item(s).", items.len())
            },
            items,
        },
        Err(message) => ContentListResponse {
            items: Vec::new(),
            message,
        },
    }
}

fn token_failure(balance: u64, message: String) -> TokenResponse {
    TokenResponse {
        ok: false,
        balance,
        message,
    }
}

fn resolve_db_path(raw: &str, config: &EngagementConfig) -> PathBuf {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        config.db_path.clone()
    } else {
        PathBuf::from(trimmed)
    }
}

fn normalize_recommendation_count(count: Option<u32>, session_default: u32) -> u32 {
    match count {
        Some(0) | None => session_default,
        Some(value) => value.min(MAX_RECOMMENDATIONS),
    }
}

fn parse_record(record_json: &str) -> Result<ContentRecord, String> {
    serde_json::from_str::<ContentRecord>(record_json)
        .map_err(|err| format!("invalid content record: {err}"))
}

fn parse_catalog(catalog_json: &str) -> Vec<CatalogItem> {
    if catalog_json.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<CatalogItem>>(catalog_json) {
        Ok(items) => items,
        Err(err) => {
            warn!("event=ffi_catalog_parse module=ffi status=error fallback=empty error={err}");
            Vec::new()
        }
    }
}

/// Fixed dashboard picks shown when the catalog fetch fails.
fn starter_catalog() -> Vec<CatalogItem> {
    let starter = |id: &str, title: &str, duration: &str, points: u64| {
        let mut item = CatalogItem::new(id, title);
        item.level = Some("Beginner".to_string());
        item.duration = Some(duration.to_string());
        item.points = Some(points);
        item
    };
    vec![
        starter("starter-profile", "Complete your learner profile", "5 min", 10),
        starter("starter-first-course", "Enroll in your first course", "10 min", 20),
        starter("starter-community", "Introduce yourself to the community", "5 min", 10),
        starter("starter-assessment", "Take the skills assessment", "20 min", 30),
    ]
}

fn to_content_item(record: &impl EngagedRecord, progress: Option<u8>) -> ContentItem {
    let content = record.content();
    ContentItem {
        id: content.id.clone(),
        title: content.title.clone(),
        author: content.author.clone(),
        kind: content.kind.as_str().to_string(),
        level: content.level.map(|level| level.as_str().to_string()),
        rating: content.rating.clone(),
        image_url: content.image_url.clone(),
        route: content.route(),
        engaged_at: record.engaged_at(),
        progress,
    }
}

fn to_recommended_item(item: CatalogItem) -> RecommendedItem {
    RecommendedItem {
        id: item.id,
        title: item.title,
        description: item.description,
        level: item.level,
        duration: item.duration,
        points: item.points,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        bookmark_add, bookmark_remove, bookmark_toggle, bookmarks_list, core_version,
        enrollment_add, enrollment_update_progress, enrollments_list, init_logging, is_bookmarked,
        is_enrolled, normalize_recommendation_count, ping, recommendations_pick, session_init,
        token_balance, token_credit, token_debit,
    };
    use std::sync::OnceLock;
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEST_DB: OnceLock<(tempfile::TempDir, String)> = OnceLock::new();

    fn ensure_session() {
        let (_, path) = TEST_DB.get_or_init(|| {
            let dir = tempfile::tempdir().expect("temp dir");
            let path = dir
                .path()
                .join("engagement_ffi.sqlite3")
                .to_str()
                .expect("utf-8 temp path")
                .to_string();
            (dir, path)
        });
        let error = session_init(path.clone());
        assert!(error.is_empty(), "{error}");
    }

    fn unique_id(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }

    fn record_json(id: &str, title: &str, kind: &str) -> String {
        format!(
            r#"{{"id":"{id}","title":"{title}","author":"Tester","slug":"{id}","type":"{kind}","level":"Beginner"}}"#
        )
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn session_init_is_idempotent_and_rejects_other_paths() {
        ensure_session();
        ensure_session();
        let error = session_init("/definitely/another/engagement.sqlite3".to_string());
        assert!(error.contains("refusing to switch"));
    }

    #[test]
    fn token_flow_reports_insufficient_balance_without_changing_it() {
        ensure_session();
        // Other tests never touch the ledger, so the balance only moves here.
        let start = token_balance();
        assert!(start.ok, "{}", start.message);

        let credited = token_credit(40.7);
        assert!(credited.ok, "{}", credited.message);
        assert_eq!(credited.balance, start.balance + 40);

        let spent = token_debit(15.0);
        assert!(spent.ok);
        assert_eq!(spent.balance, start.balance + 25);

        let refused = token_debit(1_000_000.0);
        assert!(!refused.ok);
        assert_eq!(refused.balance, start.balance + 25);
        assert!(refused.message.contains("Insufficient"));
    }

    #[test]
    fn bookmark_lifecycle_and_listing() {
        ensure_session();
        let id = unique_id("bm");
        let title = unique_id("Unique Title");

        assert!(bookmark_add(record_json(&id, &title, "workshop")).ok);
        assert!(is_bookmarked(id.clone()));

        let listed = bookmarks_list(
            Some(title.to_lowercase()),
            "workshop".to_string(),
            "all".to_string(),
            "recent".to_string(),
        );
        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].route, format!("/workshops/{id}"));
        assert_eq!(listed.items[0].progress, None);

        let toggled = bookmark_toggle(record_json(&id, &title, "workshop"));
        assert!(toggled.ok && !toggled.active);
        assert!(!is_bookmarked(id.clone()));

        let removed_again = bookmark_remove(id);
        assert!(removed_again.ok);
    }

    #[test]
    fn invalid_record_json_is_rejected() {
        ensure_session();
        let response = bookmark_add(r#"{"id": "x", "type": "podcast"}"#.to_string());
        assert!(!response.ok);
        assert!(response.message.contains("invalid content record"));
    }

    #[test]
    fn catalog_shaped_record_with_numeric_id_is_accepted() {
        ensure_session();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        let numeric_id = (nanos % 1_000_000_000_000) as i64;
        let record = format!(
            r#"{{"id":{numeric_id},"title":"Catalog Shape","author":"Tester","slug":"shape","type":"tutorial","level":"beginner"}}"#
        );

        let response = bookmark_add(record);
        assert!(response.ok, "{}", response.message);
        assert!(is_bookmarked(numeric_id.to_string()));
        assert!(bookmark_remove(numeric_id.to_string()).ok);
    }

    #[test]
    fn recommendation_count_defaults_to_session_value_and_clamps() {
        assert_eq!(normalize_recommendation_count(None, 4), 4);
        assert_eq!(normalize_recommendation_count(Some(0), 4), 4);
        assert_eq!(normalize_recommendation_count(Some(7), 4), 7);
        assert_eq!(normalize_recommendation_count(Some(99), 4), 12);
    }

    #[test]
    fn default_recommendation_count_ignores_later_env_changes() {
        ensure_session();
        let catalog = r#"[
            {"id": "c1", "title": "One"}, {"id": "c2", "title": "Two"},
            {"id": "c3", "title": "Three"}, {"id": "c4", "title": "Four"}
        ]"#;
        let before = recommendations_pick(catalog.to_string(), Vec::new(), Vec::new(), None);
        assert!(before.applied_count >= 1);

        let changed = before.applied_count % 12 + 1;
        std::env::set_var("ENGAGEMENT_RECOMMENDATION_COUNT", changed.to_string());
        let after = recommendations_pick(catalog.to_string(), Vec::new(), Vec::new(), None);
        std::env::remove_var("ENGAGEMENT_RECOMMENDATION_COUNT");

        assert_eq!(after.applied_count, before.applied_count);
    }

    #[test]
    fn enrollment_progress_is_clamped() {
        ensure_session();
        let id = unique_id("en");
        let title = unique_id("Enrolled Title");
        assert!(enrollment_add(record_json(&id, &title, "course")).ok);
        assert!(is_enrolled(id.clone()));

        let updated = enrollment_update_progress(id.clone(), 140);
        assert!(updated.ok && updated.active);

        let listed = enrollments_list(
            Some(title),
            "all".to_string(),
            "beginner".to_string(),
            "title".to_string(),
        );
        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].progress, Some(100));
    }

    #[test]
    fn recommendations_use_starter_set_when_catalog_is_unusable() {
        ensure_session();
        let response =
            recommendations_pick("not json".to_string(), Vec::new(), Vec::new(), Some(2));
        assert!(response.used_fallback);
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[0].id, "starter-profile");
    }

    #[test]
    fn recommendations_prefer_affinity_and_skip_excluded() {
        ensure_session();
        let catalog = r#"[
            {"id": 1, "title": "Match", "labels": [5]},
            {"id": 2, "title": "Done", "labels": [5]},
            {"id": 3, "title": "Other", "labels": [6]}
        ]"#;
        let response = recommendations_pick(
            catalog.to_string(),
            vec!["2".to_string()],
            vec![5],
            Some(50),
        );
        assert!(!response.used_fallback);
        assert_eq!(response.applied_count, 12);
        let ids: Vec<&str> = response.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }
}
