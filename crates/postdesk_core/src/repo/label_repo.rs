//! Label association reader.
//!
//! # Responsibility
//! - Resolve the labels currently linked to one post.
//! - Let post repositories receive this lookup as a constructor argument.
//!
//! # Invariants
//! - Results are ordered by label id ascending so one read is stable.
//! - A post without links yields an empty vector, never an error.

use crate::model::post::{Label, PostId};
use crate::repo::post_repo::RepoResult;
use crate::repo::schema::ensure_table;
use rusqlite::Connection;

/// Read-only lookup of the labels linked to a post.
pub trait LabelReader {
    /// Returns labels linked to `post_id`, ordered by label id.
    fn get_by_post_id(&self, post_id: PostId) -> RepoResult<Vec<Label>>;
}

impl<T: LabelReader + ?Sized> LabelReader for &T {
    fn get_by_post_id(&self, post_id: PostId) -> RepoResult<Vec<Label>> {
        (**self).get_by_post_id(post_id)
    }
}

/// SQLite-backed reader over `post_label` joined with `label`.
pub struct SqliteLabelReader<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLabelReader<'conn> {
    /// Builds a reader after checking the `label` and `post_label` tables.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table(conn, "label", &["id", "name"])?;
        ensure_table(conn, "post_label", &["postId", "labelId"])?;
        Ok(Self { conn })
    }
}

impl LabelReader for SqliteLabelReader<'_> {
    fn get_by_post_id(&self, post_id: PostId) -> RepoResult<Vec<Label>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id AS id, l.name AS name
             FROM post_label pl
             INNER JOIN label l ON l.id = pl.labelId
             WHERE pl.postId = ?1
             ORDER BY l.id ASC;",
        )?;
        let mut rows = stmt.query([post_id])?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next()? {
            labels.push(Label {
                id: row.get("id")?,
                name: row.get("name")?,
            });
        }
        Ok(labels)
    }
}
