//! Declarative filter/sort over engagement collections.
//!
//! # See also
//! - `store::engagement_store` for the collections these views render.

pub mod filter_sort;
