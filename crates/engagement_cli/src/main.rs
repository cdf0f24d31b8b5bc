//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `engagement_core` linkage.
//! - Exercise one ledger round-trip and one recommendation pick against an
//!   in-memory store, sized by `EngagementConfig`.

use engagement_core::{
    init_logging, CatalogItem, EngagementConfig, EngagementSession, MemoryKeyValueStore,
    RecommendationRequest,
};

fn main() {
    let config = EngagementConfig::from_env();
    if let Some(log_dir) = config.log_dir.as_deref() {
        if let Err(err) = init_logging(&config.log_level, &log_dir.to_string_lossy()) {
            eprintln!("engagement_core logging=error error={err}");
        }
    }

    println!("engagement_core ping={}", engagement_core::ping());
    println!("engagement_core version={}", engagement_core::core_version());

    let mut session = EngagementSession::open(MemoryKeyValueStore::new());
    match session.complete_assessment(10.0) {
        Ok(balance) => println!("engagement_core ledger_probe=ok balance={balance}"),
        Err(err) => println!("engagement_core ledger_probe=error error={err}"),
    }

    let probe_pool: Vec<CatalogItem> = (1..=5)
        .map(|n| CatalogItem::new(n.to_string(), format!("Probe {n}")))
        .collect();
    let request = RecommendationRequest::new(config.recommendation_count);
    let picked = session.home_recommendations(&probe_pool, &request, &[]);
    println!(
        "engagement_core recommend_probe=ok requested={} picked={}",
        config.recommendation_count,
        picked.len()
    );
}
