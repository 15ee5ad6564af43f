//! Post repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Map `post` rows (joined with `writer`) to `Post` entities.
//! - Own the `post_label` link lifecycle for save/update/delete.
//!
//! # Invariants
//! - Every multi-statement write runs in one immediate transaction; a
//!   failure part way leaves no post row without its links and no
//!   half-replaced label set.
//! - `updated` is forced by the store on update and strictly increases.
//! - Writer fields always come from the joined `writer` row.
//! - Labels are only populated when a read asks for them.

use crate::db::DbError;
use crate::model::post::{now_epoch_ms, Label, Post, PostId, PostStatus, Writer, WriterId};
use crate::repo::label_repo::{LabelReader, SqliteLabelReader};
use crate::repo::schema::ensure_table;
use log::{debug, error};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const POST_SELECT_SQL: &str = "SELECT
    p.id AS id,
    p.writerId AS writer_id,
    w.firstName AS first_name,
    w.lastName AS last_name,
    p.content AS content,
    p.created AS created,
    p.updated AS updated,
    p.status AS status
FROM post p
INNER JOIN writer w ON w.id = p.writerId";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from post/label persistence.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite or bootstrap failure.
    Db(DbError),
    /// Referential or uniqueness constraint rejected the write.
    Constraint(String),
    /// Target post row does not exist.
    NotFound(PostId),
    /// Update was asked for a post the store never assigned an id to.
    UnsavedPost,
    /// Save was asked for a post that already has an id.
    AlreadyPersisted(PostId),
    /// Insert completed without yielding a generated key.
    MissingGeneratedKey,
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted row cannot be converted into an entity.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint(message) => write!(f, "constraint violation: {message}"),
            Self::NotFound(id) => write!(f, "post not found: {id}"),
            Self::UnsavedPost => write!(f, "post has no id; save it before updating"),
            Self::AlreadyPersisted(id) => write!(f, "post already persisted with id {id}"),
            Self::MissingGeneratedKey => write!(f, "post insert returned no generated id"),
            Self::MissingRequiredTable(table) => {
                write!(f, "post repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "post repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted post data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(message.unwrap_or_else(|| failure.to_string()))
            }
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

/// Query options for listing posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostListQuery {
    /// Restrict to posts owned by this writer.
    pub writer_id: Option<WriterId>,
    /// Resolve labels for every returned post.
    pub include_labels: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for post persistence.
pub trait PostRepository {
    /// Gets one post with writer and labels, `None` when no row matches.
    fn get_by_id(&self, id: PostId) -> RepoResult<Option<Post>>;
    /// Lists posts ordered by id; labels only when `query.include_labels`.
    fn list_posts(&self, query: &PostListQuery) -> RepoResult<Vec<Post>>;
    /// Inserts the post and its label links, then assigns the generated id.
    fn save(&self, post: &mut Post) -> RepoResult<PostId>;
    /// Overwrites writer/content/status, forces `updated`, replaces labels.
    fn update(&self, post: &mut Post) -> RepoResult<()>;
    /// Deletes the post row together with its label links.
    fn delete_by_id(&self, id: PostId) -> RepoResult<()>;

    /// Every post joined with its writer. Labels are left empty.
    fn get_all(&self) -> RepoResult<Vec<Post>> {
        self.list_posts(&PostListQuery::default())
    }

    /// Posts owned by `writer`. Labels are left empty.
    fn get_all_by_writer(&self, writer: &Writer) -> RepoResult<Vec<Post>> {
        self.list_posts(&PostListQuery {
            writer_id: Some(writer.id),
            ..PostListQuery::default()
        })
    }
}

/// SQLite-backed post repository.
pub struct SqlitePostRepository<'conn, L = SqliteLabelReader<'conn>> {
    conn: &'conn Connection,
    labels: L,
}

impl<'conn> SqlitePostRepository<'conn> {
    /// Builds a repository reading labels from the same connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let labels = SqliteLabelReader::try_new(conn)?;
        Self::with_label_reader(conn, labels)
    }
}

impl<'conn, L: LabelReader> SqlitePostRepository<'conn, L> {
    /// Builds a repository using a caller-supplied label reader.
    pub fn with_label_reader(conn: &'conn Connection, labels: L) -> RepoResult<Self> {
        ensure_post_connection_ready(conn)?;
        Ok(Self { conn, labels })
    }

    fn insert_post(&self, post: &Post) -> RepoResult<PostId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let post_id = tx
            .query_row(
                "INSERT INTO post (writerId, content, created, updated, status)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id;",
                params![
                    post.writer.id,
                    post.content.as_str(),
                    post.created,
                    post.updated,
                    post_status_to_db(post.status),
                ],
                |row| row.get::<_, PostId>(0),
            )
            .optional()?
            .ok_or(RepoError::MissingGeneratedKey)?;

        insert_links(&tx, post_id, &post.labels)?;
        tx.commit()?;
        Ok(post_id)
    }

    fn overwrite_post(&self, post_id: PostId, post: &Post) -> RepoResult<i64> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let stored_updated = tx
            .query_row(
                "UPDATE post
                 SET
                    writerId = ?1,
                    content = ?2,
                    status = ?3,
                    updated = MAX(?4, updated + 1)
                 WHERE id = ?5
                 RETURNING updated;",
                params![
                    post.writer.id,
                    post.content.as_str(),
                    post_status_to_db(post.status),
                    now_epoch_ms(),
                    post_id,
                ],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .ok_or(RepoError::NotFound(post_id))?;

        tx.execute("DELETE FROM post_label WHERE postId = ?1;", [post_id])?;
        insert_links(&tx, post_id, &post.labels)?;
        tx.commit()?;
        Ok(stored_updated)
    }

    fn remove_post(&self, id: PostId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM post_label WHERE postId = ?1;", [id])?;
        let changed = tx.execute("DELETE FROM post WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        tx.commit()?;
        Ok(())
    }
}

impl<L: LabelReader> PostRepository for SqlitePostRepository<'_, L> {
    fn get_by_id(&self, id: PostId) -> RepoResult<Option<Post>> {
        // One snapshot for the row and its labels.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let post = {
            let mut stmt = tx.prepare(&format!("{POST_SELECT_SQL} WHERE p.id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => Some(parse_post_row(row)?),
                None => None,
            }
        };

        let post = match post {
            Some(mut post) => {
                post.labels = self.labels.get_by_post_id(id)?;
                Some(post)
            }
            None => None,
        };
        tx.commit()?;
        Ok(post)
    }

    fn list_posts(&self, query: &PostListQuery) -> RepoResult<Vec<Post>> {
        let mut sql = format!("{POST_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(writer_id) = query.writer_id {
            sql.push_str(" AND p.writerId = ?");
            bind_values.push(Value::Integer(writer_id));
        }

        sql.push_str(" ORDER BY p.id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let mut posts = Vec::new();
        {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            while let Some(row) = rows.next()? {
                posts.push(parse_post_row(row)?);
            }
        }

        if query.include_labels {
            for post in &mut posts {
                if let Some(post_id) = post.id {
                    post.labels = self.labels.get_by_post_id(post_id)?;
                }
            }
        }
        tx.commit()?;

        Ok(posts)
    }

    fn save(&self, post: &mut Post) -> RepoResult<PostId> {
        if let Some(existing) = post.id {
            return Err(RepoError::AlreadyPersisted(existing));
        }

        let started_at = Instant::now();
        let post_id = log_write("post_save", None, started_at, self.insert_post(post))?;
        post.id = Some(post_id);
        Ok(post_id)
    }

    fn update(&self, post: &mut Post) -> RepoResult<()> {
        let post_id = post.id.ok_or(RepoError::UnsavedPost)?;
        let started_at = Instant::now();
        let stored_updated = log_write(
            "post_update",
            Some(post_id),
            started_at,
            self.overwrite_post(post_id, post),
        )?;
        post.updated = stored_updated;
        Ok(())
    }

    fn delete_by_id(&self, id: PostId) -> RepoResult<()> {
        let started_at = Instant::now();
        log_write("post_delete", Some(id), started_at, self.remove_post(id))
    }
}

fn ensure_post_connection_ready(conn: &Connection) -> RepoResult<()> {
    ensure_table(conn, "writer", &["id", "firstName", "lastName"])?;
    ensure_table(
        conn,
        "post",
        &["id", "writerId", "content", "created", "updated", "status"],
    )?;
    ensure_table(conn, "post_label", &["postId", "labelId"])?;
    Ok(())
}

fn insert_links(tx: &Transaction<'_>, post_id: PostId, labels: &[Label]) -> RepoResult<()> {
    let mut stmt =
        tx.prepare("INSERT OR IGNORE INTO post_label (postId, labelId) VALUES (?1, ?2);")?;
    for label in labels {
        stmt.execute(params![post_id, label.id])?;
    }
    Ok(())
}

fn log_write<T>(
    event: &str,
    post_id: Option<PostId>,
    started_at: Instant,
    result: RepoResult<T>,
) -> RepoResult<T> {
    let target = post_id.map_or_else(|| "new".to_string(), |id| id.to_string());
    match &result {
        Ok(_) => debug!(
            "event={event} module=repo status=ok post_id={target} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={event} module=repo status=error post_id={target} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
    result
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<Post> {
    let status_text: String = row.get("status")?;
    let status = parse_post_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid post status `{status_text}` in post.status"))
    })?;

    Ok(Post {
        id: Some(row.get("id")?),
        content: row.get("content")?,
        created: row.get("created")?,
        updated: row.get("updated")?,
        status,
        writer: Writer {
            id: row.get("writer_id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
        },
        labels: Vec::new(),
    })
}

fn post_status_to_db(status: PostStatus) -> &'static str {
    match status {
        PostStatus::Active => "ACTIVE",
        PostStatus::UnderReview => "UNDER_REVIEW",
        PostStatus::Deleted => "DELETED",
    }
}

fn parse_post_status(value: &str) -> Option<PostStatus> {
    match value {
        "ACTIVE" => Some(PostStatus::Active),
        "UNDER_REVIEW" => Some(PostStatus::UnderReview),
        "DELETED" => Some(PostStatus::Deleted),
        _ => None,
    }
}
