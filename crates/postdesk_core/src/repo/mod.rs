//! Repository layer: post persistence and label association lookup.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Keep SQL details out of the service layer.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `Constraint`) next
//!   to transport errors; nothing is swallowed.

pub mod label_repo;
pub mod post_repo;
mod schema;
