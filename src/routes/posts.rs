use askama::Template;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;
use rusqlite::Connection;

use crate::db::models::Post;
use crate::db::{comments, posts, taxonomy};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::forms::comment::CommentForm;
use crate::forms::post::{ImageChange, PostChoices, PostForm};
use crate::forms::SelectOption;
use crate::routes::home::Html;
use crate::routes::views::{CommentView, PostView};
use crate::routes::{detail_url, parse_id, profile_url};
use crate::state::AppState;
use crate::uploads;
use crate::visibility;

#[derive(Template)]
#[template(path = "blog/detail.html")]
pub struct DetailTemplate {
    pub user: Option<CurrentUser>,
    pub post: PostView,
    pub comments: Vec<CommentView>,
    pub form: CommentForm,
}

#[derive(Template)]
#[template(path = "blog/create.html")]
pub struct PostFormTemplate {
    pub user: Option<CurrentUser>,
    pub form: PostForm,
    pub category_options: Vec<SelectOption>,
    pub location_options: Vec<SelectOption>,
    pub action: String,
    pub editing: bool,
    pub current_image: Option<String>,
}

#[derive(Template)]
#[template(path = "blog/delete.html")]
pub struct DeletePostTemplate {
    pub user: Option<CurrentUser>,
    pub post: PostView,
}

fn load_choices(conn: &Connection, current_location: Option<i64>) -> AppResult<PostChoices> {
    Ok(PostChoices {
        categories: taxonomy::all_categories(conn)?,
        locations: taxonomy::published_locations(conn)?,
        current_location,
    })
}

fn form_page(
    user: CurrentUser,
    form: PostForm,
    choices: &PostChoices,
    existing: Option<&Post>,
) -> Html<PostFormTemplate> {
    let action = match existing {
        Some(post) => format!("/posts/{}/edit", post.id),
        None => "/posts/create".to_string(),
    };
    Html(PostFormTemplate {
        user: Some(user),
        category_options: form.category_options(choices),
        location_options: form.location_options(choices),
        form,
        action,
        editing: existing.is_some(),
        current_image: existing
            .and_then(|p| p.image.as_deref())
            .map(uploads::image_url),
    })
}

/// Existence first, then ownership: strangers are sent back to the post.
fn owned_post(conn: &Connection, id: i64, user: &CurrentUser) -> AppResult<Result<Post, Response>> {
    let post = posts::find(conn, id)?.ok_or(AppError::NotFound)?;
    if post.author_id != user.id {
        tracing::info!(post_id = id, user_id = user.id, "Refusing change to another author's post");
        return Ok(Err(Redirect::to(&detail_url(id)).into_response()));
    }
    Ok(Ok(post))
}

/// Store an uploaded image and work out the value of the `image` column.
async fn apply_image(
    state: &AppState,
    change: &ImageChange,
    current: Option<&str>,
) -> AppResult<Option<String>> {
    match change {
        ImageChange::Keep => Ok(current.map(str::to_owned)),
        ImageChange::Clear => Ok(None),
        ImageChange::Replace(upload) => {
            Ok(Some(uploads::save_image(&state.config.media_path(), upload).await?))
        }
    }
}

/// GET /posts/{id}
pub async fn detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Html<DetailTemplate>> {
    let id = parse_id(&id)?;
    let now = Utc::now();
    let viewer = user.as_ref().map(|u| u.id);

    let (post, comments) = {
        let conn = state.db.get()?;
        let post = posts::find(&conn, id)?.ok_or(AppError::NotFound)?;
        if !visibility::is_visible(&post, viewer, now) {
            return Err(AppError::NotFound);
        }
        let comments = comments::for_post(&conn, id)?;
        (post, comments)
    };

    Ok(Html(DetailTemplate {
        post: PostView::new(post, viewer, state.config.local_offset(), now),
        comments: comments
            .into_iter()
            .map(|c| CommentView::new(c, viewer))
            .collect(),
        form: CommentForm::default(),
        user,
    }))
}

/// GET /posts/create
pub async fn create_page(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Html<PostFormTemplate>> {
    let choices = {
        let conn = state.db.get()?;
        load_choices(&conn, None)?
    };
    Ok(form_page(user, PostForm::default(), &choices, None))
}

/// POST /posts/create — the author always comes from the session.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = PostForm::from_multipart(multipart).await?;
    let choices = {
        let conn = state.db.get()?;
        load_choices(&conn, None)?
    };

    let Some(clean) = form.validate(&choices, state.config.local_offset()) else {
        return Ok(form_page(user, form, &choices, None).into_response());
    };

    let image = apply_image(&state, &clean.image, None).await?;
    let new_post = clean.into_new_post(image);

    let inserted = {
        let conn = state.db.get()?;
        posts::insert(&conn, user.id, &new_post)
    };
    let post_id = match inserted {
        Ok(id) => id,
        Err(e) => {
            uploads::discard_unsaved(&state.config.media_path(), new_post.image.as_deref(), None)
                .await;
            return Err(e.into());
        }
    };

    tracing::info!(post_id, user_id = user.id, "Post created");
    Ok(Redirect::to(&profile_url(&user.username)).into_response())
}

/// GET /posts/{id}/edit
pub async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    let (post, choices) = {
        let conn = state.db.get()?;
        let post = match owned_post(&conn, id, &user)? {
            Ok(post) => post,
            Err(redirect) => return Ok(redirect),
        };
        let choices = load_choices(&conn, post.location.as_ref().map(|l| l.id))?;
        (post, choices)
    };

    let form = PostForm::from_post(&post, state.config.local_offset());
    Ok(form_page(user, form, &choices, Some(&post)).into_response())
}

/// POST /posts/{id}/edit
pub async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    let (post, choices) = {
        let conn = state.db.get()?;
        let post = match owned_post(&conn, id, &user)? {
            Ok(post) => post,
            Err(redirect) => return Ok(redirect),
        };
        let choices = load_choices(&conn, post.location.as_ref().map(|l| l.id))?;
        (post, choices)
    };

    let mut form = PostForm::from_multipart(multipart).await?;
    let Some(clean) = form.validate(&choices, state.config.local_offset()) else {
        return Ok(form_page(user, form, &choices, Some(&post)).into_response());
    };

    let image = apply_image(&state, &clean.image, post.image.as_deref()).await?;
    let updated = clean.into_new_post(image);
    let saved = {
        let conn = state.db.get()?;
        posts::update(&conn, id, &updated)
    };
    if let Err(e) = saved {
        uploads::discard_unsaved(
            &state.config.media_path(),
            updated.image.as_deref(),
            post.image.as_deref(),
        )
        .await;
        return Err(e.into());
    }

    if let Some(old) = &post.image {
        if updated.image.as_deref() != Some(old.as_str()) {
            uploads::remove_image(&state.config.media_path(), old).await;
        }
    }

    tracing::info!(post_id = id, user_id = user.id, "Post updated");
    Ok(Redirect::to(&detail_url(id)).into_response())
}

/// GET /posts/{id}/delete — confirmation page.
pub async fn delete_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    let post = {
        let conn = state.db.get()?;
        match owned_post(&conn, id, &user)? {
            Ok(post) => post,
            Err(redirect) => return Ok(redirect),
        }
    };

    let view = PostView::new(post, Some(user.id), state.config.local_offset(), Utc::now());
    Ok(Html(DeletePostTemplate {
        user: Some(user),
        post: view,
    })
    .into_response())
}

/// POST /posts/{id}/delete — removes the post and its comments together.
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_id(&id)?;
    let post = {
        let mut conn = state.db.get()?;
        let post = match owned_post(&conn, id, &user)? {
            Ok(post) => post,
            Err(redirect) => return Ok(redirect),
        };
        posts::delete_with_comments(&mut conn, id)?;
        post
    };

    if let Some(image) = &post.image {
        uploads::remove_image(&state.config.media_path(), image).await;
    }

    tracing::info!(post_id = id, user_id = user.id, "Post deleted");
    Ok(Redirect::to(&profile_url(&user.username)).into_response())
}
