//! Domain model for editorial posts.
//!
//! # Responsibility
//! - Define the post entity and the read-only writer/label projections
//!   embedded in it.
//! - Own lifecycle helpers for timestamps and initial status.
//!
//! # Invariants
//! - Post identity is assigned by the store, never by callers.
//! - A post always carries exactly one writer and a (possibly empty) label set.

pub mod post;
