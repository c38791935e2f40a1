use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use rusqlite::Connection;

use crate::db::models::Comment;
use crate::db::{comments, posts};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::forms::comment::CommentForm;
use crate::routes::{detail_url, parse_id};
use crate::routes::home::Html;
use crate::routes::views::CommentView;
use crate::state::AppState;

/// Edit form and delete confirmation share one page.
#[derive(Template)]
#[template(path = "blog/comment.html")]
pub struct CommentTemplate {
    pub user: Option<CurrentUser>,
    pub comment: CommentView,
    pub form: CommentForm,
    pub deleting: bool,
}

fn owned_comment(
    conn: &Connection,
    post_id: i64,
    comment_id: i64,
    user: &CurrentUser,
) -> AppResult<Result<Comment, Response>> {
    let comment = comments::find_in_post(conn, post_id, comment_id)?.ok_or(AppError::NotFound)?;
    if comment.author_id != user.id {
        tracing::info!(
            post_id,
            comment_id,
            user_id = user.id,
            "Refusing change to another author's comment"
        );
        return Ok(Err(Redirect::to(&detail_url(post_id)).into_response()));
    }
    Ok(Ok(comment))
}

fn comment_page(user: CurrentUser, comment: Comment, form: CommentForm, deleting: bool) -> Response {
    let view = CommentView::new(comment, Some(user.id));
    Html(CommentTemplate {
        user: Some(user),
        comment: view,
        form,
        deleting,
    })
    .into_response()
}

/// POST /posts/{id}/comment
///
/// Always lands back on the post; blank comments are dropped.
pub async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    Form(mut form): Form<CommentForm>,
) -> AppResult<Redirect> {
    let post_id = parse_id(&post_id)?;
    let conn = state.db.get()?;
    posts::find(&conn, post_id)?.ok_or(AppError::NotFound)?;

    if let Some(text) = form.validate() {
        let comment_id = comments::insert(&conn, post_id, user.id, &text)?;
        tracing::info!(post_id, comment_id, user_id = user.id, "Comment added");
    }

    Ok(Redirect::to(&detail_url(post_id)))
}

/// GET /posts/{id}/comment/{comment_id}/edit
pub async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> AppResult<Response> {
    let (post_id, comment_id) = (parse_id(&post_id)?, parse_id(&comment_id)?);
    let comment = {
        let conn = state.db.get()?;
        match owned_comment(&conn, post_id, comment_id, &user)? {
            Ok(comment) => comment,
            Err(redirect) => return Ok(redirect),
        }
    };

    let form = CommentForm::with_text(&comment.text);
    Ok(comment_page(user, comment, form, false))
}

/// POST /posts/{id}/comment/{comment_id}/edit
pub async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
    Form(mut form): Form<CommentForm>,
) -> AppResult<Response> {
    let (post_id, comment_id) = (parse_id(&post_id)?, parse_id(&comment_id)?);
    let conn = state.db.get()?;
    let comment = match owned_comment(&conn, post_id, comment_id, &user)? {
        Ok(comment) => comment,
        Err(redirect) => return Ok(redirect),
    };

    let Some(text) = form.validate() else {
        return Ok(comment_page(user, comment, form, false));
    };

    comments::update_text(&conn, comment_id, &text)?;
    tracing::info!(post_id, comment_id, user_id = user.id, "Comment updated");
    Ok(Redirect::to(&detail_url(post_id)).into_response())
}

/// GET /posts/{id}/comment/{comment_id}/delete
pub async fn delete_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> AppResult<Response> {
    let (post_id, comment_id) = (parse_id(&post_id)?, parse_id(&comment_id)?);
    let comment = {
        let conn = state.db.get()?;
        match owned_comment(&conn, post_id, comment_id, &user)? {
            Ok(comment) => comment,
            Err(redirect) => return Ok(redirect),
        }
    };

    Ok(comment_page(user, comment, CommentForm::default(), true))
}

/// POST /posts/{id}/comment/{comment_id}/delete
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> AppResult<Response> {
    let (post_id, comment_id) = (parse_id(&post_id)?, parse_id(&comment_id)?);
    let conn = state.db.get()?;
    if let Err(redirect) = owned_comment(&conn, post_id, comment_id, &user)? {
        return Ok(redirect);
    }

    comments::delete(&conn, comment_id)?;
    tracing::info!(post_id, comment_id, user_id = user.id, "Comment deleted");
    Ok(Redirect::to(&detail_url(post_id)).into_response())
}
