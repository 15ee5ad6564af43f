//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own lifecycle policy (initial status, timestamps).

pub mod post_service;
