//! Recommendation selector.
//!
//! # Responsibility
//! - Pick a bounded display set from a candidate pool, preferring items whose
//!   labels intersect the learner's interests.
//!
//! # Invariants
//! - Output never contains a duplicate id, never exceeds the requested count
//!   and never contains an excluded id.
//! - Output length is `min(requested, eligible)` where eligible is the pool
//!   after exclusion and id dedup.
//! - Affinity-matching items fill the output before any non-matching item.
//! - An empty or fully excluded pool yields an empty output, not an error.
//!
//! Sampling is a Fisher-Yates shuffle followed by a prefix take, driven by an
//! injected RNG so callers can seed it.

use crate::model::catalog::{CatalogItem, LabelId};
use crate::model::content::ContentId;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashSet};

/// Selection criteria for one dashboard render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecommendationRequest {
    pub requested_count: usize,
    /// Ids already completed/attended; never recommended.
    pub exclude: HashSet<ContentId>,
    /// Learner profile labels; empty means no affinity bias.
    pub affinity_labels: BTreeSet<LabelId>,
}

impl RecommendationRequest {
    pub fn new(requested_count: usize) -> Self {
        Self {
            requested_count,
            ..Self::default()
        }
    }

    pub fn excluding<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ContentId>,
    {
        self.exclude.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_affinity(mut self, labels: impl IntoIterator<Item = LabelId>) -> Self {
        self.affinity_labels.extend(labels);
        self
    }

    fn is_excluded(&self, item: &CatalogItem) -> bool {
        self.exclude.contains(item.id.as_str())
    }
}

/// Samples up to `request.requested_count` items from `pool`.
pub fn select_recommendations<R: Rng + ?Sized>(
    pool: &[CatalogItem],
    request: &RecommendationRequest,
    rng: &mut R,
) -> Vec<CatalogItem> {
    let wanted = request.requested_count;
    let eligible = eligible_items(pool, request);
    if wanted == 0 || eligible.is_empty() {
        return Vec::new();
    }

    let (mut primary, mut fallback): (Vec<&CatalogItem>, Vec<&CatalogItem>) =
        if request.affinity_labels.is_empty() {
            (Vec::new(), eligible)
        } else {
            eligible
                .into_iter()
                .partition(|item| item.matches_any(&request.affinity_labels))
        };

    debug!(
        "event=recommend_select module=recommend requested={} primary={} fallback={}",
        wanted,
        primary.len(),
        fallback.len()
    );

    // With no affinity match the whole eligible pool is `fallback`.
    let mut selected = if primary.is_empty() {
        Vec::with_capacity(wanted.min(fallback.len()))
    } else {
        primary.shuffle(rng);
        primary.truncate(wanted);
        primary
    };

    if selected.len() < wanted {
        fallback.shuffle(rng);
        let missing = wanted - selected.len();
        selected.extend(fallback.into_iter().take(missing));
    }

    selected.into_iter().cloned().collect()
}

/// Deterministic fallback tier: the first non-excluded items of a fixed list.
pub fn fallback_selection(
    fallback: &[CatalogItem],
    request: &RecommendationRequest,
) -> Vec<CatalogItem> {
    eligible_items(fallback, request)
        .into_iter()
        .take(request.requested_count)
        .cloned()
        .collect()
}

/// Pool after exclusion; repeated ids keep their first occurrence.
fn eligible_items<'a>(
    pool: &'a [CatalogItem],
    request: &RecommendationRequest,
) -> Vec<&'a CatalogItem> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(pool.len());
    let mut eligible = Vec::with_capacity(pool.len());
    for item in pool {
        if !request.is_excluded(item) && seen.insert(item.id.as_str()) {
            eligible.push(item);
        }
    }
    eligible
}

/// Selector owning its random source.
pub struct RecommendationSelector<R: Rng = StdRng> {
    rng: R,
}

impl RecommendationSelector<StdRng> {
    /// Production wiring seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible wiring for tests and replay.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RecommendationSelector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn select(
        &mut self,
        pool: &[CatalogItem],
        request: &RecommendationRequest,
    ) -> Vec<CatalogItem> {
        select_recommendations(pool, request, &mut self.rng)
    }

    /// Like [`select`](Self::select), but an empty `pool` (e.g. the catalog
    /// fetch failed) is replaced by the fixed `fallback` list.
    pub fn select_or_fallback(
        &mut self,
        pool: &[CatalogItem],
        request: &RecommendationRequest,
        fallback: &[CatalogItem],
    ) -> Vec<CatalogItem> {
        if pool.is_empty() {
            debug!(
                "event=recommend_fallback module=recommend fallback_size={}",
                fallback.len()
            );
            return fallback_selection(fallback, request);
        }
        self.select(pool, request)
    }
}

#[cfg(test)]
mod tests {
    use super::{fallback_selection, select_recommendations, RecommendationRequest};
    use crate::model::catalog::CatalogItem;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn item(id: &str, labels: &[u64]) -> CatalogItem {
        CatalogItem::new(id, format!("Item {id}")).with_labels(labels.iter().copied())
    }

    #[test]
    fn zero_requested_returns_empty() {
        let pool = vec![item("a", &[])];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_recommendations(&pool, &RecommendationRequest::new(0), &mut rng).is_empty());
    }

    #[test]
    fn duplicate_pool_ids_are_collapsed() {
        let pool = vec![item("a", &[]), item("a", &[]), item("b", &[])];
        let mut rng = StdRng::seed_from_u64(3);
        let picked = select_recommendations(&pool, &RecommendationRequest::new(5), &mut rng);
        assert_eq!(picked.len(), 2);
        assert_ne!(picked[0].id, picked[1].id);
    }

    #[test]
    fn fallback_selection_keeps_list_order_and_skips_excluded() {
        let fixed = vec![item("x", &[]), item("y", &[]), item("z", &[])];
        let request = RecommendationRequest::new(2).excluding(["x"]);
        let picked = fallback_selection(&fixed, &request);
        let ids: Vec<&str> = picked.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["y", "z"]);
    }
}
