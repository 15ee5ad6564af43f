use postdesk_core::db::open_db_in_memory;
use postdesk_core::{
    Label, LabelReader, Post, PostId, PostListQuery, PostRepository, PostStatus, RepoError,
    RepoResult, SqlitePostRepository, Writer,
};
use rusqlite::{params, Connection};
use std::collections::BTreeSet;

#[test]
fn save_then_get_roundtrips_content_writer_and_labels() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 7, "Ada", "Lovelace");
    let first = seed_label(&conn, 1, "rust");
    let second = seed_label(&conn, 2, "sqlite");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("hello", writer.clone(), vec![first, second], 1_000);
    let id = repo.save(&mut post).unwrap();
    assert_eq!(post.id, Some(id));

    let loaded = repo.get_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.content, "hello");
    assert_eq!(loaded.writer, writer);
    assert_eq!(loaded.label_ids(), BTreeSet::from([1, 2]));
    assert_eq!(loaded.status, PostStatus::UnderReview);
    assert_eq!(loaded.created, 1_000);
    assert_eq!(loaded.updated, 1_000);
}

#[test]
fn post_without_labels_reads_back_an_empty_label_set() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("no tags", writer, vec![], 5);
    let id = repo.save(&mut post).unwrap();

    let loaded = repo.get_by_id(id).unwrap().unwrap();
    assert!(loaded.labels.is_empty());
}

#[test]
fn get_by_id_missing_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    assert!(repo.get_by_id(404).unwrap().is_none());
}

#[test]
fn get_all_leaves_labels_empty_while_get_by_id_loads_them() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let label = seed_label(&conn, 1, "news");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut first = Post::new("first", writer.clone(), vec![label.clone()], 10);
    let mut second = Post::new("second", writer, vec![label], 20);
    let first_id = repo.save(&mut first).unwrap();
    repo.save(&mut second).unwrap();

    let all = repo.get_all().unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|post| post.labels.is_empty()));
    assert_eq!(all[0].content, "first");
    assert_eq!(all[1].content, "second");

    let single = repo.get_by_id(first_id).unwrap().unwrap();
    assert_eq!(single.labels.len(), 1);
}

#[test]
fn list_posts_loads_labels_when_requested() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let news = seed_label(&conn, 1, "news");
    let tech = seed_label(&conn, 2, "tech");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("tagged", writer, vec![tech, news], 10);
    repo.save(&mut post).unwrap();

    let listed = repo
        .list_posts(&PostListQuery {
            include_labels: true,
            ..PostListQuery::default()
        })
        .unwrap();
    let names: Vec<&str> = listed[0]
        .labels
        .iter()
        .map(|label| label.name.as_str())
        .collect();
    assert_eq!(names, vec!["news", "tech"]);
}

#[test]
fn list_posts_applies_limit_and_offset_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();
    for idx in 0..5 {
        let mut post = Post::new(format!("post {idx}"), writer.clone(), vec![], idx);
        repo.save(&mut post).unwrap();
    }

    let page = repo
        .list_posts(&PostListQuery {
            limit: Some(2),
            offset: 1,
            ..PostListQuery::default()
        })
        .unwrap();
    let contents: Vec<&str> = page.iter().map(|post| post.content.as_str()).collect();
    assert_eq!(contents, vec!["post 1", "post 2"]);

    let tail = repo
        .list_posts(&PostListQuery {
            offset: 3,
            ..PostListQuery::default()
        })
        .unwrap();
    assert_eq!(tail.len(), 2);
}

#[test]
fn get_all_by_writer_filters_and_uses_stored_writer_row() {
    let conn = open_db_in_memory().unwrap();
    let ada = seed_writer(&conn, 7, "Ada", "Lovelace");
    let grace = seed_writer(&conn, 8, "Grace", "Hopper");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut by_ada = Post::new("ada post", ada.clone(), vec![], 1);
    let mut by_grace = Post::new("grace post", grace, vec![], 2);
    repo.save(&mut by_ada).unwrap();
    repo.save(&mut by_grace).unwrap();

    let stale = Writer::new(7, "stale", "copy");
    let posts = repo.get_all_by_writer(&stale).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].content, "ada post");
    assert_eq!(posts[0].writer, ada);
    assert!(posts[0].labels.is_empty());
}

#[test]
fn update_replaces_label_set_without_residue_or_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let a = seed_label(&conn, 1, "a");
    let b = seed_label(&conn, 2, "b");
    let c = seed_label(&conn, 3, "c");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("labels", writer, vec![a, b.clone()], 10);
    let id = repo.save(&mut post).unwrap();

    post.labels = vec![b, c];
    repo.update(&mut post).unwrap();

    assert_eq!(link_rows(&conn, id), vec![2, 3]);
    let loaded = repo.get_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.label_ids(), BTreeSet::from([2, 3]));
}

#[test]
fn update_overwrites_fields_and_forces_strictly_later_updated() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let other = seed_writer(&conn, 2, "Ada", "Lovelace");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let now = postdesk_core::now_epoch_ms();
    let mut post = Post::new("draft", writer, vec![], now);
    let id = repo.save(&mut post).unwrap();
    let before = repo.get_by_id(id).unwrap().unwrap();

    post.content = "final".to_string();
    post.status = PostStatus::Active;
    post.writer = other.clone();
    post.updated = 0;
    repo.update(&mut post).unwrap();

    let after = repo.get_by_id(id).unwrap().unwrap();
    assert_eq!(after.content, "final");
    assert_eq!(after.status, PostStatus::Active);
    assert_eq!(after.writer, other);
    assert_eq!(after.created, before.created);
    assert!(after.updated > before.updated);
    assert_eq!(post.updated, after.updated);

    repo.update(&mut post).unwrap();
    let again = repo.get_by_id(id).unwrap().unwrap();
    assert!(again.updated > after.updated);
}

#[test]
fn update_missing_post_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("ghost", writer, vec![], 0);
    post.id = Some(999);
    let err = repo.update(&mut post).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(999)));
}

#[test]
fn update_unsaved_post_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("unsaved", writer, vec![], 0);
    let err = repo.update(&mut post).unwrap_err();
    assert!(matches!(err, RepoError::UnsavedPost));
}

#[test]
fn save_rejects_already_persisted_post() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("once", writer, vec![], 0);
    let id = repo.save(&mut post).unwrap();
    let err = repo.save(&mut post).unwrap_err();
    assert!(matches!(err, RepoError::AlreadyPersisted(existing) if existing == id));
    assert_eq!(post_count(&conn), 1);
}

#[test]
fn failed_update_keeps_previous_content_and_labels() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let a = seed_label(&conn, 1, "a");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("stable", writer, vec![a], 10);
    let id = repo.save(&mut post).unwrap();

    post.content = "changed".to_string();
    post.labels = vec![Label::new(77, "missing")];
    let err = repo.update(&mut post).unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)));

    let loaded = repo.get_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.content, "stable");
    assert_eq!(link_rows(&conn, id), vec![1]);
}

#[test]
fn save_with_unknown_label_leaves_no_post_row() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("orphan", writer, vec![Label::new(99, "missing")], 10);
    let err = repo.save(&mut post).unwrap_err();

    assert!(matches!(err, RepoError::Constraint(_)));
    assert_eq!(post.id, None);
    assert_eq!(post_count(&conn), 0);
}

#[test]
fn save_with_unknown_writer_is_a_constraint_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("nobody", Writer::new(42, "No", "Body"), vec![], 10);
    let err = repo.save(&mut post).unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)));
    assert_eq!(post_count(&conn), 0);
}

#[test]
fn duplicate_labels_on_entity_collapse_to_one_link() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let a = seed_label(&conn, 1, "a");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("dupes", writer, vec![a.clone(), a], 10);
    let id = repo.save(&mut post).unwrap();

    assert_eq!(link_rows(&conn, id), vec![1]);
}

#[test]
fn delete_removes_post_and_its_links() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let a = seed_label(&conn, 1, "a");
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let mut post = Post::new("bye", writer, vec![a], 10);
    let id = repo.save(&mut post).unwrap();

    repo.delete_by_id(id).unwrap();
    assert!(repo.get_by_id(id).unwrap().is_none());
    assert!(link_rows(&conn, id).is_empty());
    let labels: i64 = conn
        .query_row("SELECT COUNT(*) FROM label;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(labels, 1);
}

#[test]
fn delete_missing_post_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let err = repo.delete_by_id(5).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(5)));
}

#[test]
fn corrupted_status_is_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    seed_writer(&conn, 1, "Grace", "Hopper");
    conn.execute(
        "INSERT INTO post (id, writerId, content, created, updated, status)
         VALUES (1, 1, 'x', 0, 0, 'DRAFT');",
        [],
    )
    .unwrap();
    let repo = SqlitePostRepository::try_new(&conn).unwrap();

    let err = repo.get_by_id(1).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

struct FixedLabels(Vec<Label>);

impl LabelReader for FixedLabels {
    fn get_by_post_id(&self, _post_id: PostId) -> RepoResult<Vec<Label>> {
        Ok(self.0.clone())
    }
}

#[test]
fn injected_label_reader_supplies_labels_for_get_by_id() {
    let conn = open_db_in_memory().unwrap();
    let writer = seed_writer(&conn, 1, "Grace", "Hopper");
    let reader = FixedLabels(vec![Label::new(500, "injected")]);
    let repo = SqlitePostRepository::with_label_reader(&conn, &reader).unwrap();

    let mut post = Post::new("stubbed", writer, vec![], 10);
    let id = repo.save(&mut post).unwrap();

    let loaded = repo.get_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.labels, vec![Label::new(500, "injected")]);
}

#[test]
fn try_new_rejects_connection_without_schema() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqlitePostRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("label")));

    let err = SqlitePostRepository::with_label_reader(&conn, FixedLabels(vec![]))
        .err()
        .unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("writer")));
}

fn seed_writer(conn: &Connection, id: i64, first_name: &str, last_name: &str) -> Writer {
    conn.execute(
        "INSERT INTO writer (id, firstName, lastName) VALUES (?1, ?2, ?3);",
        params![id, first_name, last_name],
    )
    .unwrap();
    Writer::new(id, first_name, last_name)
}

fn seed_label(conn: &Connection, id: i64, name: &str) -> Label {
    conn.execute(
        "INSERT INTO label (id, name) VALUES (?1, ?2);",
        params![id, name],
    )
    .unwrap();
    Label::new(id, name)
}

fn link_rows(conn: &Connection, post_id: PostId) -> Vec<i64> {
    let mut stmt = conn
        .prepare("SELECT labelId FROM post_label WHERE postId = ?1 ORDER BY labelId ASC;")
        .unwrap();
    stmt.query_map([post_id], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<i64>, _>>()
        .unwrap()
}

fn post_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM post;", [], |row| row.get(0))
        .unwrap()
}
