use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{NewUser, ProfileUpdate, User};

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, email, password_hash, created_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        password_hash: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert(conn: &Connection, user: &NewUser) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (username, first_name, last_name, email, password_hash)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.username,
            user.first_name,
            user.last_name,
            user.email,
            user.password_hash
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
        params![username],
        map_user,
    )
    .optional()
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![id],
        map_user,
    )
    .optional()
}

/// Whether `username` belongs to someone other than `except_id`.
pub fn username_taken(
    conn: &Connection,
    username: &str,
    except_id: Option<i64>,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1 AND id != ?2",
        params![username, except_id.unwrap_or(-1)],
        |row| row.get(0),
    )
}

pub fn update_profile(conn: &Connection, id: i64, update: &ProfileUpdate) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET username = ?1, first_name = ?2, last_name = ?3, email = ?4
         WHERE id = ?5",
        params![
            update.username,
            update.first_name,
            update.last_name,
            update.email,
            id
        ],
    )?;
    Ok(())
}
