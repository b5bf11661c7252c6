use askama::Template;
use axum::{debug_handler, extract::{Query, State}, http::StatusCode, response::{IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    authz::Actor,
    res::render,
    session::{self, local_return_url},
    store::identity,
    AppError, AppResult, AppState,
};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    return_url: Option<String>,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginPage {
    actor: Actor,
    username: String,
    return_url: String,
    error: Option<String>,
}

fn login_form(actor: Actor, username: String, return_url: Option<String>, error: Option<String>) -> AppResult<Response> {
    let return_url = return_url.unwrap_or_default();
    Ok(render(LoginPage { actor, username, return_url, error })?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn login_page(
    actor: Actor,
    Query(LoginQuery { return_url }): Query<LoginQuery>,
) -> AppResult<Response> {
    if actor.identity().is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    login_form(actor, String::new(), return_url, None)
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
    session: Session,

    Form(LoginForm { username, password, return_url }): Form<LoginForm>,
) -> AppResult<Response> {
    match identity::authenticate(&db_pool, &username, &password).await {
        Ok(identity) => {
            session::log_in(&session, &identity).await?;
            tracing::info!("welcome @{}#{}", identity.username, identity.id);
            Ok(Redirect::to(&local_return_url(return_url)).into_response())
        }
        Err(err @ AppError::InvalidCredentials) => {
            let mut response = login_form(actor, username, return_url, Some(err.to_string()))?;
            *response.status_mut() = StatusCode::UNAUTHORIZED;
            Ok(response)
        }
        Err(err) => Err(err),
    }
}
