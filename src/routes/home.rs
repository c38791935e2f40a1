use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;

use crate::db::posts;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::pagination::Page;
use crate::routes::views::PostView;
use crate::state::AppState;
use crate::visibility::FeedScope;

/// `?page=` as typed; anything unparsable falls back to the first page.
#[derive(Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Template)]
#[template(path = "blog/index.html")]
pub struct IndexTemplate {
    pub user: Option<CurrentUser>,
    pub page: Page<PostView>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<IndexTemplate>> {
    let now = Utc::now();
    let tz = state.config.local_offset();
    let viewer = user.as_ref().map(|u| u.id);

    let page = {
        let conn = state.db.get()?;
        posts::feed(&conn, FeedScope::Public, now, query.page.as_deref())?
    };

    Ok(Html(IndexTemplate {
        page: page.map(|p| PostView::new(p, viewer, tz, now)),
        user,
    }))
}
