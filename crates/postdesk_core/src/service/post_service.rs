//! Post use-case service.
//!
//! # Responsibility
//! - Build new posts with the initial lifecycle state.
//! - Route every mutation through `PostRepository::update`.
//!
//! # Invariants
//! - New posts start in `PostStatus::UnderReview` with `created == updated`.
//! - `update` is a full overwrite: status/content/label changes persist the
//!   whole entity as passed in, not a field-level patch.

use crate::model::post::{now_epoch_ms, Label, Post, PostId, PostStatus, Writer};
use crate::repo::post_repo::{PostRepository, RepoError, RepoResult};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for post use-cases.
#[derive(Debug)]
pub enum PostServiceError {
    /// Target post does not exist.
    PostNotFound(PostId),
    /// Mutation requested on a post that was never saved.
    UnsavedPost,
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for PostServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PostNotFound(id) => write!(f, "post not found: {id}"),
            Self::UnsavedPost => write!(f, "post must be saved before it can be updated"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PostServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PostServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::PostNotFound(id),
            RepoError::UnsavedPost => Self::UnsavedPost,
            other => Self::Repo(other),
        }
    }
}

/// Post service facade over repository implementations.
pub struct PostService<R: PostRepository> {
    repo: R,
}

impl<R: PostRepository> PostService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists every post with its writer. Labels are not loaded.
    pub fn get_list(&self) -> RepoResult<Vec<Post>> {
        self.repo.get_all()
    }

    /// Lists posts owned by `writer`. Labels are not loaded.
    pub fn get_list_by_writer(&self, writer: &Writer) -> RepoResult<Vec<Post>> {
        self.repo.get_all_by_writer(writer)
    }

    /// Creates and persists a new post under review.
    ///
    /// The returned post carries the store-generated id.
    pub fn save(
        &self,
        content: impl Into<String>,
        writer: Writer,
        labels: Vec<Label>,
    ) -> Result<Post, PostServiceError> {
        let mut post = Post::new(content, writer, labels, now_epoch_ms());
        let post_id = self.repo.save(&mut post)?;
        info!(
            "event=post_create module=service status=ok post_id={post_id} writer_id={} label_count={}",
            post.writer.id,
            post.labels.len()
        );
        Ok(post)
    }

    /// Gets one post with writer and labels.
    pub fn get_by_id(&self, id: PostId) -> RepoResult<Option<Post>> {
        self.repo.get_by_id(id)
    }

    /// Moves `post` to `status` and persists the whole entity.
    ///
    /// Content, writer and labels on `post` are written as they are, so
    /// callers must hold the current values before changing status.
    pub fn update_status(
        &self,
        post: &mut Post,
        status: PostStatus,
    ) -> Result<(), PostServiceError> {
        post.status = status;
        self.persist_mutation("post_update_status", post)
    }

    /// Replaces the post body and persists the whole entity.
    pub fn update_content(
        &self,
        post: &mut Post,
        content: impl Into<String>,
    ) -> Result<(), PostServiceError> {
        post.content = content.into();
        self.persist_mutation("post_update_content", post)
    }

    /// Replaces the full label set and persists the whole entity.
    pub fn replace_labels(
        &self,
        post: &mut Post,
        labels: Vec<Label>,
    ) -> Result<(), PostServiceError> {
        post.labels = labels;
        self.persist_mutation("post_replace_labels", post)
    }

    /// Deletes one post and its label links.
    pub fn delete(&self, id: PostId) -> Result<(), PostServiceError> {
        self.repo.delete_by_id(id)?;
        info!("event=post_delete module=service status=ok post_id={id}");
        Ok(())
    }

    fn persist_mutation(&self, event: &str, post: &mut Post) -> Result<(), PostServiceError> {
        if !post.is_persisted() {
            return Err(PostServiceError::UnsavedPost);
        }

        post.updated = now_epoch_ms();
        self.repo.update(post)?;
        info!(
            "event={event} module=service status=ok post_id={} status_value={:?}",
            post.id.unwrap_or_default(),
            post.status
        );
        Ok(())
    }
}
