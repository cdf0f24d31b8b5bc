//! Bookmark and enrollment collections.
//!
//! # Responsibility
//! - Own the two engagement collections and their identity-based dedup.
//! - Persist full collection snapshots through the key-value store.
//!
//! # Invariants
//! - Each collection is a set keyed by content `id`, iterated in insertion
//!   order.
//! - Persisted snapshots are written before the in-memory collection changes.

pub mod engagement_store;
