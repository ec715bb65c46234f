use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::CookieJar;

use crate::http::server::AppState;

/// The logged-in user, attached to requests that passed the session check.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

/// Session cookie gate for everything except the login page.
///
/// Page loads are redirected to `/login`; API calls and form posts get 401.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let username = jar
        .get(&state.cookie.name)
        .and_then(|cookie| state.sessions.validate(cookie.value()));

    match username {
        Some(username) => {
            request.extensions_mut().insert(AuthUser { username });
            next.run(request).await
        }
        None => {
            let path = request.uri().path();
            tracing::debug!(path = %path, method = %request.method(), "Unauthenticated request");
            if request.method() == Method::GET && !path.starts_with("/api") {
                Redirect::to("/login").into_response()
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({ "message": "login required" })),
                )
                    .into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
