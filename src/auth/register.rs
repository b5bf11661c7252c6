use askama::Template;
use axum::{debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Redirect, Response}, Form};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    authz::Actor,
    res::render,
    session,
    store::identity::{self, Registration},
    AppError, AppResult, AppState,
};

/// Passwords are never echoed back into the form.
#[derive(Template)]
#[template(path = "auth/register.html")]
struct RegisterPage {
    actor: Actor,
    form: Registration,
    error: Option<String>,
}

fn register_form(actor: Actor, form: Registration, error: Option<String>) -> AppResult<Response> {
    Ok(render(RegisterPage { actor, form, error })?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn register_page(actor: Actor) -> AppResult<Response> {
    register_form(actor, Registration::default(), None)
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
    session: Session,

    Form(form): Form<Registration>,
) -> AppResult<Response> {
    match identity::register(&db_pool, &form).await {
        Ok(identity) => {
            session::log_in(&session, &identity).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(AppError::ValidationFailed(error)) => {
            Ok((StatusCode::BAD_REQUEST, register_form(actor, form, Some(error))?).into_response())
        }
        Err(err) => Err(err),
    }
}
