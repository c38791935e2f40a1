use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::Comment;
use crate::db::parse_db_time;

const COMMENT_SELECT: &str = "
    SELECT cm.id, cm.post_id, cm.text, cm.author_id, u.username, cm.created_at
    FROM comments cm
    JOIN users u ON u.id = cm.author_id";

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    let created_at: String = row.get(5)?;
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        text: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row.get(4)?,
        created_at: parse_db_time(5, &created_at)?.and_utc(),
    })
}

pub fn insert(conn: &Connection, post_id: i64, author_id: i64, text: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO comments (post_id, author_id, text) VALUES (?1, ?2, ?3)",
        params![post_id, author_id, text],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Comments of a post, oldest first.
pub fn for_post(conn: &Connection, post_id: i64) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE cm.post_id = ?1 ORDER BY cm.created_at ASC, cm.id ASC",
        COMMENT_SELECT
    ))?;
    let rows = stmt.query_map(params![post_id], map_comment)?;
    rows.collect()
}

/// A comment is only addressable through the post it belongs to.
pub fn find_in_post(
    conn: &Connection,
    post_id: i64,
    comment_id: i64,
) -> rusqlite::Result<Option<Comment>> {
    conn.query_row(
        &format!("{} WHERE cm.id = ?1 AND cm.post_id = ?2", COMMENT_SELECT),
        params![comment_id, post_id],
        map_comment,
    )
    .optional()
}

pub fn update_text(conn: &Connection, id: i64, text: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE comments SET text = ?1 WHERE id = ?2",
        params![text, id],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    Ok(())
}
