use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::db::models::{CategoryRef, LocationRef, NewPost, Post};
use crate::db::{parse_db_time, to_db_time};
use crate::pagination::{Page, PageWindow};
use crate::visibility::FeedScope;

const POST_SELECT: &str = "
    SELECT p.id, p.title, p.text, p.pub_date, p.image, p.is_published, p.created_at,
           p.author_id, u.username,
           c.id, c.title, c.slug, c.is_published,
           l.id, l.name, l.is_published,
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id";

fn map_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    let pub_date: String = row.get(3)?;
    let created_at: String = row.get(6)?;

    let category = match row.get::<_, Option<i64>>(9)? {
        Some(id) => Some(CategoryRef {
            id,
            title: row.get(10)?,
            slug: row.get(11)?,
            is_published: row.get(12)?,
        }),
        None => None,
    };
    let location = match row.get::<_, Option<i64>>(13)? {
        Some(id) => Some(LocationRef {
            id,
            name: row.get(14)?,
            is_published: row.get(15)?,
        }),
        None => None,
    };

    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        pub_date: parse_db_time(3, &pub_date)?.and_utc(),
        image: row.get(4)?,
        is_published: row.get(5)?,
        created_at: parse_db_time(6, &created_at)?.and_utc(),
        author_id: row.get(7)?,
        author_username: row.get(8)?,
        category,
        location,
        comment_count: row.get(16)?,
    })
}

/// Looks a post up by id regardless of visibility.
pub fn find(conn: &Connection, id: i64) -> rusqlite::Result<Option<Post>> {
    conn.query_row(
        &format!("{} WHERE p.id = ?1", POST_SELECT),
        params![id],
        map_post,
    )
    .optional()
}

/// One page of `scope`, newest publish date first, annotated with comment counts.
pub fn feed(
    conn: &Connection,
    scope: FeedScope,
    now: DateTime<Utc>,
    page: Option<&str>,
) -> rusqlite::Result<Page<Post>> {
    let (predicate, mut values) = scope.predicate(now);

    let total: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM posts p
             LEFT JOIN categories c ON c.id = p.category_id
             WHERE {}",
            predicate
        ),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let window = PageWindow::resolve(page, total);
    values.push(window.limit.into());
    values.push(window.offset.into());

    let mut stmt = conn.prepare(&format!(
        "{} WHERE {} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?",
        POST_SELECT, predicate
    ))?;
    let items = stmt
        .query_map(params_from_iter(values.iter()), map_post)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(window.with_items(items, total))
}

pub fn insert(conn: &Connection, author_id: i64, post: &NewPost) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO posts (title, text, pub_date, image, author_id, category_id, location_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            post.title,
            post.text,
            to_db_time(&post.pub_date),
            post.image,
            author_id,
            post.category_id,
            post.location_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrites the author-editable fields; author and publication flag are kept.
pub fn update(conn: &Connection, id: i64, post: &NewPost) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE posts SET title = ?1, text = ?2, pub_date = ?3, image = ?4,
                          category_id = ?5, location_id = ?6
         WHERE id = ?7",
        params![
            post.title,
            post.text,
            to_db_time(&post.pub_date),
            post.image,
            post.category_id,
            post.location_id,
            id
        ],
    )?;
    Ok(())
}

/// Removes a post and its comments in one transaction.
pub fn delete_with_comments(conn: &mut Connection, id: i64) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM comments WHERE post_id = ?1", params![id])?;
    tx.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    tx.commit()
}

/// Returns false when no post has `id`.
pub fn set_published(conn: &Connection, id: i64, published: bool) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE posts SET is_published = ?1 WHERE id = ?2",
        params![published, id],
    )?;
    Ok(changed > 0)
}
