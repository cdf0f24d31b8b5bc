//! Bounded, label-biased sampling of catalog items for the home dashboard.

pub mod selector;
