//! Pure filter/sort engine for bookmark and enrollment views.
//!
//! # Responsibility
//! - Turn (collection, criteria) into a display-ordered view.
//!
//! # Invariants
//! - The input slice is never mutated; output is a fresh `Vec`.
//! - Sorting is stable: equal keys keep their input order.
//! - Records without an engagement timestamp sort last for both `Recent`
//!   and `Oldest`.
//! - `Title` uses root-locale collation: accents sort with their base letter
//!   and lowercase precedes uppercase on case-only differences.

use crate::model::content::{
    BookmarkedContent, ContentKind, ContentLevel, ContentRecord, EngagedContent, EnrolledContent,
};
use icu_collator::{Collator, CollatorOptions};
use log::warn;
use std::cmp::Ordering;

/// Anything the engine can filter and sort.
pub trait EngagedRecord {
    fn content(&self) -> &ContentRecord;
    /// `enrolled_at` for enrollments, `bookmarked_at` for bookmarks.
    fn engaged_at(&self) -> Option<i64>;
}

impl EngagedRecord for ContentRecord {
    fn content(&self) -> &ContentRecord {
        self
    }

    fn engaged_at(&self) -> Option<i64> {
        None
    }
}

impl EngagedRecord for BookmarkedContent {
    fn content(&self) -> &ContentRecord {
        &self.content
    }

    fn engaged_at(&self) -> Option<i64> {
        Some(self.bookmarked_at)
    }
}

impl EngagedRecord for EnrolledContent {
    fn content(&self) -> &ContentRecord {
        &self.content
    }

    fn engaged_at(&self) -> Option<i64> {
        Some(self.enrolled_at)
    }
}

impl EngagedRecord for EngagedContent {
    fn content(&self) -> &ContentRecord {
        EngagedContent::content(self)
    }

    fn engaged_at(&self) -> Option<i64> {
        match self {
            Self::Bookmarked(item) => item.engaged_at(),
            Self::Enrolled(item) => item.engaged_at(),
        }
    }
}

/// Content kind filter; `All` bypasses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(ContentKind),
}

/// Level filter; `All` bypasses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LevelFilter {
    #[default]
    All,
    Only(ContentLevel),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Newest engagement first.
    #[default]
    Recent,
    /// Oldest engagement first.
    Oldest,
    /// Collated title, ascending.
    Title,
    /// Highest numeric rating first.
    Rating,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "recent" => Some(Self::Recent),
            "oldest" => Some(Self::Oldest),
            "title" => Some(Self::Title),
            "rating" => Some(Self::Rating),
            _ => None,
        }
    }
}

/// View criteria for one bookmarks/enrollments page render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentQuery {
    pub search_text: Option<String>,
    pub category: CategoryFilter,
    pub level: LevelFilter,
    pub sort_by: SortOrder,
}

impl ContentQuery {
    /// Builds a query from page query-string values.
    ///
    /// `"all"` and unknown values bypass the respective filter; an unknown
    /// sort falls back to `Recent`.
    pub fn from_params(search: Option<&str>, category: &str, level: &str, sort: &str) -> Self {
        Self {
            search_text: search
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
            category: ContentKind::parse(category).map_or(CategoryFilter::All, CategoryFilter::Only),
            level: ContentLevel::parse(level).map_or(LevelFilter::All, LevelFilter::Only),
            sort_by: SortOrder::parse(sort).unwrap_or_default(),
        }
    }
}

/// Filters `records` by `query` and returns them in display order.
pub fn filter_and_sort<T: EngagedRecord + Clone>(records: &[T], query: &ContentQuery) -> Vec<T> {
    let needle = query
        .search_text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_lowercase);

    let mut view: Vec<T> = records
        .iter()
        .filter(|record| {
            let content = record.content();
            matches_search(content, needle.as_deref())
                && matches_category(content, query.category)
                && matches_level(content, query.level)
        })
        .cloned()
        .collect();

    match query.sort_by {
        SortOrder::Recent => view.sort_by(|a, b| {
            compare_timestamps(a.engaged_at(), b.engaged_at(), |x, y| y.cmp(&x))
        }),
        SortOrder::Oldest => view.sort_by(|a, b| {
            compare_timestamps(a.engaged_at(), b.engaged_at(), |x, y| x.cmp(&y))
        }),
        SortOrder::Title => sort_by_title(&mut view),
        SortOrder::Rating => view.sort_by(|a, b| {
            b.content()
                .rating_value()
                .partial_cmp(&a.content().rating_value())
                .unwrap_or(Ordering::Equal)
        }),
    }

    view
}

fn matches_search(content: &ContentRecord, needle: Option<&str>) -> bool {
    let Some(needle) = needle else {
        return true;
    };
    content.title.to_lowercase().contains(needle)
        || content.author.to_lowercase().contains(needle)
        || content
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(needle))
}

fn matches_category(content: &ContentRecord, category: CategoryFilter) -> bool {
    match category {
        CategoryFilter::All => true,
        CategoryFilter::Only(kind) => content.kind == kind,
    }
}

fn matches_level(content: &ContentRecord, level: LevelFilter) -> bool {
    match level {
        LevelFilter::All => true,
        LevelFilter::Only(level) => content.level == Some(level),
    }
}

fn sort_by_title<T: EngagedRecord>(view: &mut [T]) {
    match Collator::try_new(&Default::default(), CollatorOptions::new()) {
        Ok(collator) => {
            view.sort_by(|a, b| collator.compare(&a.content().title, &b.content().title))
        }
        Err(err) => {
            warn!("event=title_collation module=query status=fallback error={err}");
            view.sort_by_cached_key(|record| record.content().title.to_lowercase());
        }
    }
}

fn compare_timestamps(
    a: Option<i64>,
    b: Option<i64>,
    present: impl Fn(i64, i64) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => present(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::{compare_timestamps, CategoryFilter, ContentQuery, LevelFilter, SortOrder};
    use crate::model::content::{ContentKind, ContentLevel};
    use std::cmp::Ordering;

    #[test]
    fn missing_timestamps_sort_after_present_ones_in_both_directions() {
        let descending = |x: i64, y: i64| y.cmp(&x);
        let ascending = |x: i64, y: i64| x.cmp(&y);
        assert_eq!(compare_timestamps(Some(1), None, descending), Ordering::Less);
        assert_eq!(compare_timestamps(None, Some(1), ascending), Ordering::Greater);
        assert_eq!(compare_timestamps(None, None, ascending), Ordering::Equal);
        assert_eq!(compare_timestamps(Some(1), Some(2), descending), Ordering::Greater);
    }

    #[test]
    fn from_params_parses_known_values() {
        let query = ContentQuery::from_params(Some("  rust "), "Workshop", "advanced", "rating");
        assert_eq!(query.search_text.as_deref(), Some("rust"));
        assert_eq!(query.category, CategoryFilter::Only(ContentKind::Workshop));
        assert_eq!(query.level, LevelFilter::Only(ContentLevel::Advanced));
        assert_eq!(query.sort_by, SortOrder::Rating);
    }

    #[test]
    fn from_params_treats_all_and_unknown_as_bypass() {
        let query = ContentQuery::from_params(Some("   "), "all", "expert", "popular");
        assert_eq!(query, ContentQuery::default());
    }
}
