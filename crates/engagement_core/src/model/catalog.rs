//! Catalog items fed into recommendation selection.
//!
//! Remote catalog lists (tasks, courses, tutorials) arrive with loosely typed
//! ids and labels. Deserialization normalizes them here so selection code only
//! sees closed types:
//! - `id` may be a JSON string or integer and is stored as a string.
//! - `labels` entries may be bare integers or objects with an integer `id`.

use crate::model::content::{deserialize_id, ContentId, ContentKind};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Interest label identifier shared by catalog items and user profiles.
pub type LabelId = u64;

/// One candidate in a recommendation pool. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: ContentId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub labels: BTreeSet<LabelId>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContentKind>,
}

impl CatalogItem {
    pub fn new(id: impl Into<ContentId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            level: None,
            duration: None,
            points: None,
            labels: BTreeSet::new(),
            kind: None,
        }
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = LabelId>) -> Self {
        self.labels = labels.into_iter().collect();
        self
    }

    /// Whether this item carries at least one of `affinity`.
    pub fn matches_any(&self, affinity: &BTreeSet<LabelId>) -> bool {
        // Label sets are small; iterate the smaller side.
        if self.labels.len() <= affinity.len() {
            self.labels.iter().any(|label| affinity.contains(label))
        } else {
            affinity.iter().any(|label| self.labels.contains(label))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Id(LabelId),
    Object { id: LabelId },
}

fn deserialize_labels<'de, D>(deserializer: D) -> Result<BTreeSet<LabelId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<RawLabel>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|label| match label {
            RawLabel::Id(id) | RawLabel::Object { id } => id,
        })
        .collect())
}
