use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::AuthUser;
use crate::http::server::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserInfo {
    pub username: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<LoginRequest>,
) -> Response {
    let users = state.users.clone();
    let username = req.username.clone();

    // bcrypt verification blocks for tens of milliseconds.
    let valid = tokio::task::spawn_blocking(move || users.verify(&req.username, &req.password))
        .await
        .unwrap_or(false);

    if !valid {
        tracing::warn!(username = %username, "Login failed");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "message": "invalid username or password" })),
        )
            .into_response();
    }

    let token = state.sessions.issue(&username);
    let cookie = Cookie::build((state.cookie.name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.cookie.secure)
        .build();

    tracing::info!(username = %username, "Login succeeded");
    (jar.add(cookie), Redirect::to("/")).into_response()
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(&state.cookie.name) {
        state.sessions.revoke(cookie.value());
    }
    let jar = jar.remove(Cookie::build((state.cookie.name.clone(), "")).path("/"));
    (jar, Redirect::to("/login"))
}

pub async fn current_user(user: AuthUser) -> Json<UserInfo> {
    Json(UserInfo {
        username: user.username,
    })
}
