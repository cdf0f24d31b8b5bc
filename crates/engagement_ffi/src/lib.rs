//! Host-facing FFI surface for the engagement core.
//!
//! Generated bridge glue lives with the host app; this crate only exposes the
//! annotated use-case functions in [`api`].

pub mod api;
