//! Engagement domain model.
//!
//! # Responsibility
//! - Define the content shapes shared by bookmarks, enrollments, filtering
//!   and recommendation.
//! - Replace loosely shaped catalog payloads with closed, typed records.
//!
//! # Invariants
//! - Every record is identified by the stable `id` assigned by the remote
//!   catalog.
//! - Bookmarked and enrolled variants share one base shape (`ContentRecord`).

pub mod catalog;
pub mod content;
