//! Content records tracked by the engagement store.
//!
//! # Invariants
//! - `id` is unique within one collection; the same `id` may be bookmarked
//!   and enrolled at the same time.
//! - `EnrolledContent::progress` stays within `0..=100`.
//! - Timestamps are Unix epoch milliseconds.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Stable content identifier from the remote catalog.
pub type ContentId = String;

/// Upper bound for enrollment progress, in percent.
pub const MAX_PROGRESS: u8 = 100;

/// Closed set of content kinds the learner can engage with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Course,
    Workshop,
    Hackathon,
    Tutorial,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Course,
        ContentKind::Workshop,
        ContentKind::Hackathon,
        ContentKind::Tutorial,
    ];

    /// Stable lowercase id used in persisted JSON and query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Workshop => "workshop",
            Self::Hackathon => "hackathon",
            Self::Tutorial => "tutorial",
        }
    }

    /// Routing prefix for detail pages.
    pub fn route_prefix(self) -> &'static str {
        match self {
            Self::Course => "/courses",
            Self::Workshop => "/workshops",
            Self::Hackathon => "/hackathons",
            Self::Tutorial => "/tutorials",
        }
    }

    pub fn display_label(self) -> &'static str {
        match self {
            Self::Course => "Course",
            Self::Workshop => "Workshop",
            Self::Hackathon => "Hackathon",
            Self::Tutorial => "Tutorial",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "course" => Some(Self::Course),
            "workshop" => Some(Self::Workshop),
            "hackathon" => Some(Self::Hackathon),
            "tutorial" => Some(Self::Tutorial),
            _ => None,
        }
    }
}

/// Difficulty level shown on content cards.
///
/// Serializes as the display name; deserialization accepts any casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContentLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ContentLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    /// Case-insensitive parse of the display name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ContentLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).ok_or_else(|| {
            D::Error::unknown_variant(&value, &["Beginner", "Intermediate", "Advanced"])
        })
    }
}

/// Base shape shared by bookmarked and enrolled content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: ContentId,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<ContentLevel>,
    /// Display string such as "4 weeks".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// String-encoded decimal, e.g. "4.7".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub slug: String,
    /// Serialized as `type` to match the remote catalog naming.
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

impl ContentRecord {
    /// Creates a record with all optional display fields unset.
    pub fn new(
        id: impl Into<ContentId>,
        title: impl Into<String>,
        author: impl Into<String>,
        slug: impl Into<String>,
        kind: ContentKind,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            description: None,
            level: None,
            time: None,
            rating: None,
            image_url: None,
            slug: slug.into(),
            kind,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_level(mut self, level: ContentLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_rating(mut self, rating: impl Into<String>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    /// Numeric rating; missing, unparseable and non-finite values read as 0.
    pub fn rating_value(&self) -> f64 {
        self.rating
            .as_deref()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .unwrap_or(0.0)
    }

    /// Detail page route, e.g. `/courses/intro-to-rust`.
    pub fn route(&self) -> String {
        format!("{}/{}", self.kind.route_prefix(), self.slug)
    }
}

/// A content record the learner bookmarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkedContent {
    #[serde(flatten)]
    pub content: ContentRecord,
    pub bookmarked_at: i64,
}

/// A content record the learner enrolled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledContent {
    #[serde(flatten)]
    pub content: ContentRecord,
    pub enrolled_at: i64,
    /// Completion percentage in `0..=100`.
    pub progress: u8,
}

/// Either engagement variant, for merged bookmark/enrollment views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngagedContent {
    Bookmarked(BookmarkedContent),
    Enrolled(EnrolledContent),
}

impl EngagedContent {
    pub fn content(&self) -> &ContentRecord {
        match self {
            Self::Bookmarked(item) => &item.content,
            Self::Enrolled(item) => &item.content,
        }
    }

    pub fn is_enrolled(&self) -> bool {
        matches!(self, Self::Enrolled(_))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

/// Catalog ids arrive as JSON strings or integers; both become a string id.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<ContentId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(value) => value,
        RawId::Number(value) => value.to_string(),
    })
}

/// Clamps a caller-supplied progress value into `0..=100`.
pub fn clamp_progress(progress: i64) -> u8 {
    // Lossless: the clamp keeps the value within u8 range.
    progress.clamp(0, i64::from(MAX_PROGRESS)) as u8
}
