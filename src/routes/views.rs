//! Display-ready shapes of posts and comments for the templates.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use crate::db::models::{Comment, Post};
use crate::routes::profile_url;
use crate::uploads::image_url;
use crate::visibility;

const EXCERPT_WORDS: usize = 30;

pub struct CategoryLink {
    pub title: String,
    pub slug: String,
}

pub struct PostView {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub author: String,
    pub author_url: String,
    pub category: Option<CategoryLink>,
    /// Only shown while the location itself is published.
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub comment_count: i64,
    /// Listed only because the viewer is the author.
    pub hidden: bool,
    pub can_edit: bool,
}

impl PostView {
    pub fn new(post: Post, viewer: Option<i64>, tz: FixedOffset, now: DateTime<Utc>) -> Self {
        let hidden = !visibility::is_public(&post, now);
        PostView {
            id: post.id,
            pub_date: format_local(&post.pub_date, tz),
            author_url: profile_url(&post.author_username),
            author: post.author_username,
            category: post.category.map(|c| CategoryLink {
                title: c.title,
                slug: c.slug,
            }),
            location: post.location.filter(|l| l.is_published).map(|l| l.name),
            image_url: post.image.as_deref().map(image_url),
            comment_count: post.comment_count,
            hidden,
            can_edit: viewer == Some(post.author_id),
            title: post.title,
            text: post.text,
        }
    }

    /// The first words of the text, for feed cards.
    pub fn excerpt(&self) -> String {
        let mut words = self.text.split_whitespace();
        let head: Vec<&str> = words.by_ref().take(EXCERPT_WORDS).collect();
        let mut excerpt = head.join(" ");
        if words.next().is_some() {
            excerpt.push_str(" …");
        }
        excerpt
    }
}

pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    pub author: String,
    pub author_url: String,
    pub created_at: String,
    pub can_edit: bool,
}

impl CommentView {
    pub fn new(comment: Comment, viewer: Option<i64>) -> Self {
        CommentView {
            id: comment.id,
            post_id: comment.post_id,
            created_at: format_relative_time(&comment.created_at.naive_utc()),
            can_edit: viewer == Some(comment.author_id),
            author_url: profile_url(&comment.author_username),
            author: comment.author_username,
            text: comment.text,
        }
    }
}

pub fn format_local(dt: &DateTime<Utc>, tz: FixedOffset) -> String {
    dt.with_timezone(&tz).format("%-d %B %Y, %H:%M").to_string()
}

pub fn format_relative_time(dt: &NaiveDateTime) -> String {
    let now = Utc::now().naive_utc();
    let diff = now.signed_duration_since(*dt);

    let seconds = diff.num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }

    dt.format("%b %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CategoryRef, LocationRef};
    use chrono::{Duration, NaiveDate, TimeZone};

    fn post() -> Post {
        Post {
            id: 5,
            title: "Title".into(),
            text: "word ".repeat(40),
            pub_date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap(),
            image: Some("posts_images/x.png".into()),
            is_published: true,
            created_at: Utc::now(),
            author_id: 2,
            author_username: "bob".into(),
            category: Some(CategoryRef {
                id: 1,
                title: "Travel".into(),
                slug: "travel".into(),
                is_published: true,
            }),
            location: Some(LocationRef {
                id: 1,
                name: "Nowhere".into(),
                is_published: false,
            }),
            comment_count: 3,
        }
    }

    #[test]
    fn post_view_localises_and_filters() {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let view = PostView::new(post(), Some(2), tz, Utc::now());
        assert_eq!(view.pub_date, "1 March 2024, 12:05");
        assert_eq!(view.author_url, "/profile/bob");
        assert_eq!(view.location, None);
        assert_eq!(view.image_url.as_deref(), Some("/media/posts_images/x.png"));
        assert!(view.can_edit);
        assert!(!view.hidden);

        let view = PostView::new(post(), Some(3), tz, Utc::now());
        assert!(!view.can_edit);
    }

    #[test]
    fn hidden_marks_non_public_posts() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let mut p = post();
        p.is_published = false;
        assert!(PostView::new(p, Some(2), tz, Utc::now()).hidden);
    }

    #[test]
    fn excerpt_truncates_long_text() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let view = PostView::new(post(), None, tz, Utc::now());
        let excerpt = view.excerpt();
        assert!(excerpt.ends_with('…'));
        assert_eq!(excerpt.split_whitespace().count(), EXCERPT_WORDS + 1);
    }

    #[test]
    fn format_relative_time_just_now() {
        let now = Utc::now().naive_utc();
        assert_eq!(format_relative_time(&now), "just now");
    }

    #[test]
    fn format_relative_time_minutes() {
        let dt = Utc::now().naive_utc() - Duration::minutes(5);
        assert_eq!(format_relative_time(&dt), "5m ago");
    }

    #[test]
    fn format_relative_time_days() {
        let dt = Utc::now().naive_utc() - Duration::days(2);
        assert_eq!(format_relative_time(&dt), "2d ago");
    }

    #[test]
    fn format_relative_time_old_date() {
        let dt = NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(format_relative_time(&dt), "Jan 15, 2025");
    }
}
