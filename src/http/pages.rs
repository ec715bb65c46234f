//! Embedded HTML pages.

use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use axum::extract::State;

use crate::http::server::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const LOGIN_HTML: &str = include_str!("../../static/login.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Logged-in users are sent straight to the editor.
pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let logged_in = jar
        .get(&state.cookie.name)
        .and_then(|cookie| state.sessions.validate(cookie.value()))
        .is_some();

    if logged_in {
        Redirect::to("/").into_response()
    } else {
        Html(LOGIN_HTML).into_response()
    }
}
