//! Core persistence and lifecycle logic for editorial posts.
//! Posts are owned by one writer and linked to labels in SQLite.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{open_db_with, ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::post::{now_epoch_ms, Label, LabelId, Post, PostId, PostStatus, Writer, WriterId};
pub use repo::label_repo::{LabelReader, SqliteLabelReader};
pub use repo::post_repo::{
    PostListQuery, PostRepository, RepoError, RepoResult, SqlitePostRepository,
};
pub use service::post_service::{PostService, PostServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
