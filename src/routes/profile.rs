use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use chrono::Utc;

use crate::db::models::User;
use crate::db::{self, posts, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::forms::account::ProfileForm;
use crate::pagination::Page;
use crate::routes::home::{Html, PageQuery};
use crate::routes::profile_url;
use crate::routes::views::PostView;
use crate::state::AppState;
use crate::visibility::FeedScope;

#[derive(Template)]
#[template(path = "blog/profile.html")]
pub struct ProfileTemplate {
    pub user: Option<CurrentUser>,
    pub profile: User,
    pub is_owner: bool,
    pub page: Page<PostView>,
}

#[derive(Template)]
#[template(path = "blog/user.html")]
pub struct EditProfileTemplate {
    pub user: Option<CurrentUser>,
    pub form: ProfileForm,
}

/// GET /profile/{username} — the owner also sees their hidden and scheduled posts.
pub async fn profile(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<ProfileTemplate>> {
    let now = Utc::now();
    let tz = state.config.local_offset();
    let viewer = user.as_ref().map(|u| u.id);

    let (profile, page) = {
        let conn = state.db.get()?;
        let profile = users::find_by_username(&conn, &username)?.ok_or(AppError::NotFound)?;
        let scope = FeedScope::for_profile(profile.id, viewer);
        let page = posts::feed(&conn, scope, now, query.page.as_deref())?;
        (profile, page)
    };

    Ok(Html(ProfileTemplate {
        is_owner: viewer == Some(profile.id),
        page: page.map(|p| PostView::new(p, viewer, tz, now)),
        profile,
        user,
    }))
}

/// GET /profile/edit
pub async fn edit_page(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Html<EditProfileTemplate>> {
    let account = {
        let conn = state.db.get()?;
        users::find_by_id(&conn, user.id)?.ok_or(AppError::NotFound)?
    };

    Ok(Html(EditProfileTemplate {
        form: ProfileForm::from_user(&account),
        user: Some(user),
    }))
}

/// POST /profile/edit — always the signed-in account, never another one.
pub async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(mut form): Form<ProfileForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let Some(update) = form.validate(&conn, user.id)? else {
        return Ok(Html(EditProfileTemplate {
            user: Some(user),
            form,
        })
        .into_response());
    };

    match users::update_profile(&conn, user.id, &update) {
        Ok(()) => {}
        Err(e) if db::is_constraint_violation(&e) => {
            form.errors
                .add("username", "A user with that username already exists.");
            return Ok(Html(EditProfileTemplate {
                user: Some(user),
                form,
            })
            .into_response());
        }
        Err(e) => return Err(e.into()),
    }
    tracing::info!(user_id = user.id, username = %update.username, "Profile updated");
    Ok(Redirect::to(&profile_url(&update.username)).into_response())
}
