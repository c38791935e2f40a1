use askama::Template;
use axum::extract::{Path, Query, State};
use chrono::Utc;

use crate::db::models::Category;
use crate::db::{posts, taxonomy};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::pagination::Page;
use crate::routes::home::{Html, PageQuery};
use crate::routes::views::PostView;
use crate::state::AppState;
use crate::visibility::FeedScope;

#[derive(Template)]
#[template(path = "blog/category.html")]
pub struct CategoryTemplate {
    pub user: Option<CurrentUser>,
    pub category: Category,
    pub page: Page<PostView>,
}

/// GET /category/{slug} — 404 unless the category is published.
pub async fn category_posts(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<CategoryTemplate>> {
    let now = Utc::now();
    let tz = state.config.local_offset();
    let viewer = user.as_ref().map(|u| u.id);

    let (category, page) = {
        let conn = state.db.get()?;
        let category =
            taxonomy::published_category_by_slug(&conn, &slug)?.ok_or(AppError::NotFound)?;
        let page = posts::feed(
            &conn,
            FeedScope::Category(category.id),
            now,
            query.page.as_deref(),
        )?;
        (category, page)
    };

    Ok(Html(CategoryTemplate {
        category,
        page: page.map(|p| PostView::new(p, viewer, tz, now)),
        user,
    }))
}
