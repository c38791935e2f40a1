//! Administrative commands for the things authors cannot manage themselves:
//! categories, locations, and moderation of posts.

use rusqlite::Connection;

use crate::config::{Command, EntityKind, ListKind};
use crate::db::{posts, taxonomy};

/// Run one admin command and return the lines to print.
pub fn run(conn: &Connection, command: &Command) -> anyhow::Result<Vec<String>> {
    match command {
        Command::Serve => anyhow::bail!("`serve` is not an admin command"),
        Command::AddCategory {
            title,
            slug,
            description,
            hidden,
        } => {
            let id = taxonomy::insert_category(conn, title, slug, description, !hidden)?;
            tracing::info!(id, slug = %slug, "Category created");
            Ok(vec![format!("Created category {} ({})", id, slug)])
        }
        Command::AddLocation { name, hidden } => {
            let id = taxonomy::insert_location(conn, name, !hidden)?;
            tracing::info!(id, "Location created");
            Ok(vec![format!("Created location {} ({})", id, name)])
        }
        Command::Publish { kind, id } => set_published(conn, *kind, *id, true),
        Command::Unpublish { kind, id } => set_published(conn, *kind, *id, false),
        Command::List { kind } => list(conn, *kind),
    }
}

fn set_published(
    conn: &Connection,
    kind: EntityKind,
    id: i64,
    published: bool,
) -> anyhow::Result<Vec<String>> {
    let (found, label) = match kind {
        EntityKind::Category => (taxonomy::set_category_published(conn, id, published)?, "category"),
        EntityKind::Location => (taxonomy::set_location_published(conn, id, published)?, "location"),
        EntityKind::Post => (posts::set_published(conn, id, published)?, "post"),
    };
    if !found {
        anyhow::bail!("No {} with id {}", label, id);
    }

    let state = if published { "published" } else { "unpublished" };
    tracing::info!(id, kind = label, state, "Visibility changed");
    Ok(vec![format!("{} {} {}", label, id, state)])
}

fn list(conn: &Connection, kind: ListKind) -> anyhow::Result<Vec<String>> {
    let mark = |published: bool| if published { "" } else { " [hidden]" };
    let lines = match kind {
        ListKind::Categories => taxonomy::all_categories(conn)?
            .into_iter()
            .map(|c| format!("{}\t{}\t{}{}", c.id, c.slug, c.title, mark(c.is_published)))
            .collect(),
        ListKind::Locations => taxonomy::all_locations(conn)?
            .into_iter()
            .map(|l| format!("{}\t{}{}", l.id, l.name, mark(l.is_published)))
            .collect(),
    };
    Ok(lines)
}
