//! Explicit engagement session object.
//!
//! # Responsibility
//! - Own the token ledger, engagement store and recommendation selector for
//!   one learner installation, constructed once at startup.
//! - Expose the use cases page collaborators call (assessment rewards,
//!   package purchases, bookmark views, home dashboard picks).
//!
//! # Invariants
//! - Ledger and engagement store persist through the same key-value store.
//! - Every use case runs to completion inside one `&mut self` call.

use crate::clock::{Clock, SystemClock};
use crate::kv::KeyValueStore;
use crate::ledger::token_ledger::{normalize_amount, LedgerResult, TokenLedger};
use crate::model::catalog::CatalogItem;
use crate::model::content::{BookmarkedContent, EnrolledContent};
use crate::query::filter_sort::{filter_and_sort, ContentQuery};
use crate::recommend::selector::{RecommendationRequest, RecommendationSelector};
use crate::store::engagement_store::EngagementStore;
use log::info;
use std::sync::Arc;

/// Result of a token package purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Purchased { balance: u64 },
    InsufficientBalance { balance: u64, cost: u64 },
}

/// Learner-scoped engagement state.
pub struct EngagementSession<S: KeyValueStore, C: Clock = SystemClock> {
    store: Arc<S>,
    ledger: TokenLedger<Arc<S>>,
    engagement: EngagementStore<Arc<S>, C>,
    selector: RecommendationSelector,
}

impl<S: KeyValueStore> EngagementSession<S, SystemClock> {
    /// Loads state from `store` with the wall clock and an entropy-seeded RNG.
    pub fn open(store: S) -> Self {
        Self::open_with(
            Arc::new(store),
            SystemClock,
            RecommendationSelector::from_entropy(),
        )
    }
}

impl<S: KeyValueStore, C: Clock> EngagementSession<S, C> {
    pub fn open_with(store: Arc<S>, clock: C, selector: RecommendationSelector) -> Self {
        let ledger = TokenLedger::load(Arc::clone(&store));
        let engagement = EngagementStore::load_with_clock(Arc::clone(&store), clock);
        info!(
            "event=session_open module=service status=ok balance={} bookmarks={} enrollments={}",
            ledger.balance(),
            engagement.bookmarks().len(),
            engagement.enrollments().len()
        );
        Self {
            store,
            ledger,
            engagement,
            selector,
        }
    }

    pub fn ledger(&self) -> &TokenLedger<Arc<S>> {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut TokenLedger<Arc<S>> {
        &mut self.ledger
    }

    pub fn engagement(&self) -> &EngagementStore<Arc<S>, C> {
        &self.engagement
    }

    pub fn engagement_mut(&mut self) -> &mut EngagementStore<Arc<S>, C> {
        &mut self.engagement
    }

    pub fn balance(&self) -> u64 {
        self.ledger.balance()
    }

    /// Credits the reward for a passed assessment; returns the new balance.
    pub fn complete_assessment(&mut self, reward: f64) -> LedgerResult<u64> {
        let balance = self.ledger.credit(reward)?;
        info!("event=assessment_reward module=service status=ok balance={balance}");
        Ok(balance)
    }

    /// Spends `cost` tokens on a package if the balance covers it.
    pub fn purchase_package(&mut self, cost: f64) -> LedgerResult<PurchaseOutcome> {
        if self.ledger.debit(cost)? {
            let balance = self.ledger.balance();
            info!("event=package_purchase module=service status=ok balance={balance}");
            return Ok(PurchaseOutcome::Purchased { balance });
        }

        let balance = self.ledger.balance();
        info!("event=package_purchase module=service status=insufficient balance={balance}");
        Ok(PurchaseOutcome::InsufficientBalance {
            balance,
            cost: normalize_amount(cost),
        })
    }

    /// Bookmarks page view.
    pub fn bookmarks_view(&self, query: &ContentQuery) -> Vec<BookmarkedContent> {
        filter_and_sort(self.engagement.bookmarks(), query)
    }

    /// Enrolled content page view.
    pub fn enrollments_view(&self, query: &ContentQuery) -> Vec<EnrolledContent> {
        filter_and_sort(self.engagement.enrollments(), query)
    }

    /// Home dashboard picks; an empty catalog falls back to `fallback`.
    pub fn home_recommendations(
        &mut self,
        pool: &[CatalogItem],
        request: &RecommendationRequest,
        fallback: &[CatalogItem],
    ) -> Vec<CatalogItem> {
        let picks = self.selector.select_or_fallback(pool, request, fallback);
        info!(
            "event=home_recommendations module=service status=ok pool={} picked={}",
            pool.len(),
            picks.len()
        );
        picks
    }

    /// Ends the session and hands back the shared key-value store.
    pub fn teardown(self) -> Arc<S> {
        info!(
            "event=session_teardown module=service status=ok balance={}",
            self.ledger.balance()
        );
        let Self { store, .. } = self;
        store
    }
}
