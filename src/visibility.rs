//! Who may see a post.
//!
//! A post is public when it is published, its publish date has passed and its
//! category (if any) is published. Authors always see their own posts on the
//! detail page and on their own profile; the global and category feeds apply
//! the public rule to everyone.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;

use crate::db::models::Post;
use crate::db::to_db_time;

/// Public rule: the viewer is not taken into account.
pub fn is_public(post: &Post, now: DateTime<Utc>) -> bool {
    post.is_published
        && post.pub_date <= now
        && post.category.as_ref().map_or(true, |c| c.is_published)
}

/// Detail-page rule: authors see their own posts whatever their flags.
pub fn is_visible(post: &Post, viewer: Option<i64>, now: DateTime<Utc>) -> bool {
    viewer == Some(post.author_id) || is_public(post, now)
}

/// The set of posts a feed lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// Site-wide feed.
    Public,
    /// Posts of one category. The category itself is checked by the caller.
    Category(i64),
    /// Posts of one author; `owner` when the author is looking at their own profile.
    Author { author_id: i64, owner: bool },
}

impl FeedScope {
    pub fn for_profile(author_id: i64, viewer: Option<i64>) -> Self {
        FeedScope::Author {
            author_id,
            owner: viewer == Some(author_id),
        }
    }

    /// SQL predicate over `posts p LEFT JOIN categories c`, with its positional values.
    pub fn predicate(&self, now: DateTime<Utc>) -> (String, Vec<Value>) {
        const PUBLIC: &str = "p.is_published = 1 AND p.pub_date <= ? \
                              AND (p.category_id IS NULL OR c.is_published = 1)";
        let now = Value::Text(to_db_time(&now));

        match *self {
            FeedScope::Public => (PUBLIC.to_string(), vec![now]),
            FeedScope::Category(id) => (
                format!("p.category_id = ? AND {}", PUBLIC),
                vec![Value::Integer(id), now],
            ),
            FeedScope::Author {
                author_id,
                owner: true,
            } => ("p.author_id = ?".to_string(), vec![Value::Integer(author_id)]),
            FeedScope::Author {
                author_id,
                owner: false,
            } => (
                format!("p.author_id = ? AND {}", PUBLIC),
                vec![Value::Integer(author_id), now],
            ),
        }
    }
}
