//! Engagement store over bookmarked and enrolled content.
//!
//! # Invariants
//! - `add_bookmark` upserts by id and always restamps `bookmarked_at`.
//! - `add_enrollment` upserts by id; `enrolled_at` and `progress` are set on
//!   first insert and preserved on re-enrollment.
//! - Removing or updating an absent id is a silent no-op.
//! - Malformed persisted entries are dropped on load; the rest survive.

use crate::clock::{Clock, SystemClock};
use crate::kv::{KeyValueStore, KvError};
use crate::model::content::{
    clamp_progress, BookmarkedContent, ContentKind, ContentRecord, EngagedContent,
    EnrolledContent,
};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key holding the JSON array of bookmarked content.
pub const BOOKMARKS_KEY: &str = "engagement_bookmarks";
/// Key holding the JSON array of enrolled content.
pub const ENROLLMENTS_KEY: &str = "engagement_enrollments";

pub type StoreResult<T> = Result<T, StoreError>;

/// Engagement store error. Missing ids are not errors.
#[derive(Debug)]
pub enum StoreError {
    Storage(KvError),
    Encode(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "failed to persist engagement state: {err}"),
            Self::Encode(err) => write!(f, "failed to encode engagement state: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<KvError> for StoreError {
    fn from(value: KvError) -> Self {
        Self::Storage(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Per-kind engagement counts for tab badges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub bookmarked: usize,
    pub enrolled: usize,
}

/// Owned bookmark/enrollment state backed by a key-value store.
pub struct EngagementStore<S: KeyValueStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    bookmarks: Vec<BookmarkedContent>,
    enrollments: Vec<EnrolledContent>,
}

impl<S: KeyValueStore> EngagementStore<S, SystemClock> {
    /// Loads both collections using the host wall clock.
    pub fn load(store: S) -> Self {
        Self::load_with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> EngagementStore<S, C> {
    /// Loads both collections; unreadable state starts empty.
    pub fn load_with_clock(store: S, clock: C) -> Self {
        let bookmarks: Vec<BookmarkedContent> = load_collection(&store, BOOKMARKS_KEY);
        let enrollments: Vec<EnrolledContent> = load_collection(&store, ENROLLMENTS_KEY);
        info!(
            "event=engagement_load module=store status=ok bookmarks={} enrollments={}",
            bookmarks.len(),
            enrollments.len()
        );
        Self {
            store,
            clock,
            bookmarks,
            enrollments,
        }
    }

    /// Bookmarks in insertion order.
    pub fn bookmarks(&self) -> &[BookmarkedContent] {
        &self.bookmarks
    }

    /// Enrollments in insertion order.
    pub fn enrollments(&self) -> &[EnrolledContent] {
        &self.enrollments
    }

    pub fn bookmark(&self, id: &str) -> Option<&BookmarkedContent> {
        self.bookmarks.iter().find(|item| item.content.id == id)
    }

    pub fn enrollment(&self, id: &str) -> Option<&EnrolledContent> {
        self.enrollments.iter().find(|item| item.content.id == id)
    }

    pub fn is_bookmarked(&self, id: &str) -> bool {
        self.bookmark(id).is_some()
    }

    pub fn is_enrolled(&self, id: &str) -> bool {
        self.enrollment(id).is_some()
    }

    /// Inserts or replaces a bookmark and stamps `bookmarked_at` with now.
    pub fn add_bookmark(&mut self, record: ContentRecord) -> StoreResult<()> {
        let entry = BookmarkedContent {
            content: record,
            bookmarked_at: self.clock.now_ms(),
        };
        let mut next = self.bookmarks.clone();
        match position_of(&next, &entry.content.id) {
            Some(index) => next[index] = entry,
            None => next.push(entry),
        }
        self.commit_bookmarks(next)?;
        info!(
            "event=bookmark_add module=store status=ok count={}",
            self.bookmarks.len()
        );
        Ok(())
    }

    /// Deletes a bookmark; absent ids are a no-op.
    pub fn remove_bookmark(&mut self, id: &str) -> StoreResult<()> {
        let Some(index) = position_of(&self.bookmarks, id) else {
            return Ok(());
        };
        let mut next = self.bookmarks.clone();
        next.remove(index);
        self.commit_bookmarks(next)?;
        info!(
            "event=bookmark_remove module=store status=ok count={}",
            self.bookmarks.len()
        );
        Ok(())
    }

    /// Flips bookmark state for `record` and returns whether it is now bookmarked.
    pub fn toggle_bookmark(&mut self, record: ContentRecord) -> StoreResult<bool> {
        if self.is_bookmarked(&record.id) {
            self.remove_bookmark(&record.id)?;
            Ok(false)
        } else {
            self.add_bookmark(record)?;
            Ok(true)
        }
    }

    pub fn clear_bookmarks(&mut self) -> StoreResult<()> {
        if self.bookmarks.is_empty() {
            return Ok(());
        }
        self.commit_bookmarks(Vec::new())?;
        info!("event=bookmark_clear module=store status=ok");
        Ok(())
    }

    /// Inserts or updates an enrollment.
    ///
    /// Re-enrolling replaces the base fields but keeps `enrolled_at` and
    /// `progress`.
    pub fn add_enrollment(&mut self, record: ContentRecord) -> StoreResult<()> {
        let mut next = self.enrollments.clone();
        match position_of(&next, &record.id) {
            Some(index) => next[index].content = record,
            None => next.push(EnrolledContent {
                content: record,
                enrolled_at: self.clock.now_ms(),
                progress: 0,
            }),
        }
        self.commit_enrollments(next)?;
        info!(
            "event=enrollment_add module=store status=ok count={}",
            self.enrollments.len()
        );
        Ok(())
    }

    /// Sets enrollment progress, clamped to `0..=100`; absent ids are a no-op.
    pub fn update_progress(&mut self, id: &str, progress: i64) -> StoreResult<()> {
        let Some(index) = position_of(&self.enrollments, id) else {
            return Ok(());
        };
        let progress = clamp_progress(progress);
        if self.enrollments[index].progress == progress {
            return Ok(());
        }
        let mut next = self.enrollments.clone();
        next[index].progress = progress;
        self.commit_enrollments(next)?;
        info!("event=enrollment_progress module=store status=ok progress={progress}");
        Ok(())
    }

    /// Merged view: enrollments first, then bookmarks, each in insertion order.
    pub fn engaged_content(&self) -> Vec<EngagedContent> {
        self.enrollments
            .iter()
            .cloned()
            .map(EngagedContent::Enrolled)
            .chain(self.bookmarks.iter().cloned().map(EngagedContent::Bookmarked))
            .collect()
    }

    /// Bookmark/enrollment counts for every content kind (zeros included).
    pub fn counts_by_kind(&self) -> BTreeMap<ContentKind, KindCounts> {
        let mut counts: BTreeMap<ContentKind, KindCounts> = ContentKind::ALL
            .into_iter()
            .map(|kind| (kind, KindCounts::default()))
            .collect();
        for item in &self.bookmarks {
            counts.entry(item.content.kind).or_default().bookmarked += 1;
        }
        for item in &self.enrollments {
            counts.entry(item.content.kind).or_default().enrolled += 1;
        }
        counts
    }

    /// Consumes the store and returns the backing key-value store.
    pub fn into_store(self) -> S {
        self.store
    }

    fn commit_bookmarks(&mut self, next: Vec<BookmarkedContent>) -> StoreResult<()> {
        persist(&self.store, BOOKMARKS_KEY, &next)?;
        self.bookmarks = next;
        Ok(())
    }

    fn commit_enrollments(&mut self, next: Vec<EnrolledContent>) -> StoreResult<()> {
        persist(&self.store, ENROLLMENTS_KEY, &next)?;
        self.enrollments = next;
        Ok(())
    }
}

/// Identity of one collection entry.
trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for BookmarkedContent {
    fn key(&self) -> &str {
        &self.content.id
    }
}

impl Keyed for EnrolledContent {
    fn key(&self) -> &str {
        &self.content.id
    }
}

fn position_of<T: Keyed>(items: &[T], id: &str) -> Option<usize> {
    items.iter().position(|item| item.key() == id)
}

fn persist<T: Serialize>(store: &impl KeyValueStore, key: &str, items: &[T]) -> StoreResult<()> {
    let encoded = serde_json::to_string(items)?;
    if let Err(err) = store.set(key, &encoded) {
        warn!("event=engagement_persist module=store status=error key={key} error={err}");
        return Err(err.into());
    }
    Ok(())
}

fn load_collection<T>(store: &impl KeyValueStore, key: &str) -> Vec<T>
where
    T: DeserializeOwned + Keyed,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!("event=engagement_load module=store status=error key={key} fallback=empty error={err}");
            return Vec::new();
        }
    };

    let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(_) => {
            warn!("event=engagement_load module=store status=malformed key={key} fallback=empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(entries.len());
    let mut dropped = 0_usize;
    for entry in entries {
        match serde_json::from_value::<T>(entry) {
            Ok(item) => {
                if seen.insert(item.key().to_string()) {
                    items.push(item);
                } else {
                    dropped += 1;
                }
            }
            Err(_) => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!("event=engagement_load module=store status=partial key={key} dropped={dropped}");
    }
    items
}
