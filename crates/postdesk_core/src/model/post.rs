//! Post domain model.
//!
//! # Responsibility
//! - Define `Post`, `Writer`, `Label` and `PostStatus`.
//! - Provide the constructor used for brand-new posts.
//!
//! # Invariants
//! - `id` is `None` until the repository has persisted the post.
//! - `created` is set once at construction and never rewritten.
//! - `updated >= created` for every post built through `Post::new`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// Store-generated post identity.
pub type PostId = i64;
/// Identity of a writer row owned by the writer subsystem.
pub type WriterId = i64;
/// Identity of a label row owned by the label subsystem.
pub type LabelId = i64;

/// Editorial workflow state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    /// Published and visible.
    Active,
    /// Waiting for editorial review. Every new post starts here.
    UnderReview,
    /// Withdrawn by an editor.
    Deleted,
}

/// Authoring identity, embedded by value in every post read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Writer {
    pub id: WriterId,
    pub first_name: String,
    pub last_name: String,
}

impl Writer {
    pub fn new(id: WriterId, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Tag attached to posts through the `post_label` link table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
}

impl Label {
    pub fn new(id: LabelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Editorial post owned by one writer and tagged with labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Assigned by the store on first save.
    pub id: Option<PostId>,
    /// Post body text.
    pub content: String,
    /// Unix epoch milliseconds, set once at creation.
    pub created: i64,
    /// Unix epoch milliseconds, refreshed by every mutation.
    pub updated: i64,
    pub status: PostStatus,
    /// Denormalized copy of the owning writer row.
    pub writer: Writer,
    /// Empty when no labels are linked or when the read skipped labels.
    pub labels: Vec<Label>,
}

impl Post {
    /// Builds an unsaved post in `UnderReview` with `created == updated == now_ms`.
    pub fn new(
        content: impl Into<String>,
        writer: Writer,
        labels: Vec<Label>,
        now_ms: i64,
    ) -> Self {
        Self {
            id: None,
            content: content.into(),
            created: now_ms,
            updated: now_ms,
            status: PostStatus::UnderReview,
            writer,
            labels,
        }
    }

    /// Returns whether the store has assigned an identity.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Label identities in ascending order, duplicates removed.
    pub fn label_ids(&self) -> BTreeSet<LabelId> {
        self.labels.iter().map(|label| label.id).collect()
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
///
/// Falls back to `0` if the system clock is set before the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
