//! Core use-case services.
//!
//! # Responsibility
//! - Wire ledger, store and selector into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod session;
