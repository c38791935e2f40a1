//! Categories and locations: seeded by administrators, picked by authors.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Category, Location};

const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";
const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";

fn map_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        slug: row.get(3)?,
        is_published: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_location(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        is_published: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn insert_category(
    conn: &Connection,
    title: &str,
    slug: &str,
    description: &str,
    is_published: bool,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO categories (title, slug, description, is_published) VALUES (?1, ?2, ?3, ?4)",
        params![title, slug, description, is_published],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_location(conn: &Connection, name: &str, is_published: bool) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO locations (name, is_published) VALUES (?1, ?2)",
        params![name, is_published],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn all_categories(conn: &Connection) -> rusqlite::Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM categories ORDER BY title, id",
        CATEGORY_COLUMNS
    ))?;
    let rows = stmt.query_map([], map_category)?;
    rows.collect()
}

pub fn all_locations(conn: &Connection) -> rusqlite::Result<Vec<Location>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM locations ORDER BY name, id",
        LOCATION_COLUMNS
    ))?;
    let rows = stmt.query_map([], map_location)?;
    rows.collect()
}

/// Locations an author may pick, ordered by name.
pub fn published_locations(conn: &Connection) -> rusqlite::Result<Vec<Location>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM locations WHERE is_published = 1 ORDER BY name, id",
        LOCATION_COLUMNS
    ))?;
    let rows = stmt.query_map([], map_location)?;
    rows.collect()
}

pub fn published_category_by_slug(
    conn: &Connection,
    slug: &str,
) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM categories WHERE slug = ?1 AND is_published = 1",
            CATEGORY_COLUMNS
        ),
        params![slug],
        map_category,
    )
    .optional()
}

/// Returns false when no category has `id`.
pub fn set_category_published(conn: &Connection, id: i64, published: bool) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE categories SET is_published = ?1 WHERE id = ?2",
        params![published, id],
    )?;
    Ok(changed > 0)
}

/// Returns false when no location has `id`.
pub fn set_location_published(conn: &Connection, id: i64, published: bool) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE locations SET is_published = ?1 WHERE id = ?2",
        params![published, id],
    )?;
    Ok(changed > 0)
}
