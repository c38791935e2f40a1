pub mod assets;
pub mod auth;
pub mod category;
pub mod comments;
pub mod home;
pub mod media;
pub mod posts;
pub mod profile;
pub mod views;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The whole site, ready to serve.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        .route("/", get(home::index))
        .route("/category/{slug}", get(category::category_posts))
        .merge(post_routes())
        .merge(profile_routes())
        .merge(auth::router())
        .route("/assets/{*path}", get(assets::serve))
        .route("/media/{*path}", get(media::serve))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts/create", get(posts::create_page).post(posts::create))
        .route("/posts/{id}", get(posts::detail))
        .route("/posts/{id}/edit", get(posts::edit_page).post(posts::edit))
        .route("/posts/{id}/delete", get(posts::delete_page).post(posts::delete))
        .route("/posts/{id}/comment", axum::routing::post(comments::add_comment))
        .route(
            "/posts/{id}/comment/{comment_id}/edit",
            get(comments::edit_page).post(comments::edit),
        )
        .route(
            "/posts/{id}/comment/{comment_id}/delete",
            get(comments::delete_page).post(comments::delete),
        )
}

fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile/edit", get(profile::edit_page).post(profile::edit))
        .route("/profile/{username}", get(profile::profile))
}

/// Ids arrive as raw path segments; anything that is not a number names no row.
pub fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse().map_err(|_| AppError::NotFound)
}

pub fn detail_url(post_id: i64) -> String {
    format!("/posts/{}", post_id)
}

/// Usernames may hold characters that are not valid in a `Location` header as-is.
pub fn profile_url(username: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{}", encoded)
}
