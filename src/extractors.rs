use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::session;
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

impl CurrentUser {
    pub fn profile_url(&self) -> String {
        crate::routes::profile_url(&self.username)
    }
}

/// Extractor that requires authentication.
/// Anonymous requests are redirected to the login page, remembering where they were going.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let login_required = || AppError::LoginRequired {
            next: parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| "/".to_string()),
        };

        let token = extract_session_token(parts, &state.config.auth.cookie_name)
            .ok_or_else(login_required)?;

        let conn = state.db.get()?;
        let (id, username) = session::lookup(&conn, token)?.ok_or_else(login_required)?;

        Ok(CurrentUser { id, username })
    }
}

/// Optional user extractor — returns None instead of redirecting when not authenticated.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::LoginRequired { .. }) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

pub(crate) fn extract_session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(cookie: &str) -> Parts {
        let (parts, _) = Request::builder()
            .uri("/")
            .header(header::COOKIE, cookie)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn finds_named_cookie_among_others() {
        let parts = parts_with_cookie("theme=dark; blogicum_session=abc123; lang=en");
        assert_eq!(
            extract_session_token(&parts, "blogicum_session"),
            Some("abc123")
        );
    }

    #[test]
    fn ignores_empty_and_missing_cookie() {
        let parts = parts_with_cookie("blogicum_session=");
        assert_eq!(extract_session_token(&parts, "blogicum_session"), None);

        let parts = parts_with_cookie("other=1");
        assert_eq!(extract_session_token(&parts, "blogicum_session"), None);
    }
}
