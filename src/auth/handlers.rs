use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::{password, session};
use crate::db::models::NewUser;
use crate::db::{self, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{extract_session_token, CurrentUser, MaybeUser};
use crate::forms::account::{LoginForm, RegistrationForm};
use crate::routes::home::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "registration/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub form: LoginForm,
}

#[derive(Template)]
#[template(path = "registration/registration_form.html")]
pub struct RegistrationTemplate {
    pub user: Option<CurrentUser>,
    pub form: RegistrationForm,
}

// -- Request types --

#[derive(Deserialize, Default)]
pub struct NextQuery {
    #[serde(default)]
    pub next: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

/// bcrypt is deliberately slow, keep it off the async workers.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
}

// -- Login handlers --

/// GET /auth/login
pub async fn login_page(
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
) -> Html<LoginTemplate> {
    Html(LoginTemplate {
        user,
        form: LoginForm {
            next: query.next,
            ..LoginForm::default()
        },
    })
}

/// POST /auth/login — check credentials, start a session and follow `next`.
pub async fn login(
    State(state): State<AppState>,
    Form(mut form): Form<LoginForm>,
) -> AppResult<Response> {
    let found = {
        let conn = state.db.get()?;
        users::find_by_username(&conn, form.username.trim())?
    };

    let verified = match found {
        Some(user) => {
            let candidate = form.password.clone();
            let hash = user.password_hash.clone();
            let ok = blocking(move || Ok(password::verify_password(&candidate, &hash))).await?;
            ok.then_some(user)
        }
        None => None,
    };

    let Some(user) = verified else {
        tracing::info!(username = %form.username.trim(), "Failed login");
        form.reject();
        return Ok(Html(LoginTemplate { user: None, form }).into_response());
    };

    let token = {
        let conn = state.db.get()?;
        session::create_session(&conn, user.id, state.config.auth.session_hours)?
    };
    tracing::info!(user_id = user.id, "User logged in");

    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to(form.safe_next()),
    )
        .into_response())
}

// -- Logout handler --

/// POST /auth/logout — delete session and redirect
pub async fn logout(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> AppResult<Response> {
    let (parts, _body) = request.into_parts();
    let cookie_name = &state.config.auth.cookie_name;

    if let Some(token) = extract_session_token(&parts, cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
        tracing::info!("User logged out");
    }

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, clear_session_cookie(cookie_name)),
        ],
        "",
    )
        .into_response())
}

// -- Registration handlers --

/// GET /register
pub async fn register_page(MaybeUser(user): MaybeUser) -> Html<RegistrationTemplate> {
    Html(RegistrationTemplate {
        user,
        form: RegistrationForm::default(),
    })
}

/// POST /register — create the account, then send the new user to the login page.
pub async fn register(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(mut form): Form<RegistrationForm>,
) -> AppResult<Response> {
    let clean = {
        let conn = state.db.get()?;
        form.validate(&conn)?
    };
    let Some(clean) = clean else {
        return Ok(Html(RegistrationTemplate { user, form }).into_response());
    };

    let cost = state.config.auth.bcrypt_cost;
    let plain = clean.password;
    let password_hash = blocking(move || password::hash_password(&plain, cost)).await?;

    let profile = clean.profile;
    let inserted = {
        let conn = state.db.get()?;
        users::insert(
            &conn,
            &NewUser {
                username: profile.username.clone(),
                first_name: profile.first_name,
                last_name: profile.last_name,
                email: profile.email,
                password_hash,
            },
        )
    };

    match inserted {
        Ok(user_id) => {
            tracing::info!(user_id, username = %profile.username, "User registered");
            Ok(Redirect::to("/auth/login").into_response())
        }
        // Lost a race for the username against another registration.
        Err(e) if db::is_constraint_violation(&e) => {
            form.errors
                .add("username", "A user with that username already exists.");
            Ok(Html(RegistrationTemplate { user, form }).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_format() {
        let cookie = session_cookie("blogicum_session", "abc123", 2);
        assert!(cookie.starts_with("blogicum_session=abc123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=7200"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie("blogicum_session");
        assert!(cookie.starts_with("blogicum_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
