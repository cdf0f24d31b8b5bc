//! Token economy state.
//!
//! # Responsibility
//! - Own the learner's spendable token balance.
//! - Persist every committed balance through the key-value store.
//!
//! # See also
//! - `service::session` for the use cases that spend and earn tokens.

pub mod token_ledger;
