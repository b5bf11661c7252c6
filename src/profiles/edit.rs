use askama::Template;
use axum::{debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Redirect, Response}, Form};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    authz::Actor,
    res::render,
    store::identity::{self, ProfileUpdate},
    AppError, AppResult, AppState,
};

#[derive(Template)]
#[template(path = "profiles/profile_form.html")]
struct ProfileForm {
    actor: Actor,
    id: Uuid,
    form: ProfileUpdate,
    error: Option<String>,
}

fn profile_form(actor: Actor, id: Uuid, form: ProfileUpdate, error: Option<String>) -> AppResult<Response> {
    Ok(render(ProfileForm { actor, id, form, error })?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit_profile_page(actor: Actor) -> AppResult<Response> {
    let me = actor.require()?;
    let id = me.id;
    let form = ProfileUpdate {
        username: me.username.clone(),
        avatar: me.avatar.clone().unwrap_or_default(),
    };
    profile_form(actor, id, form, None)
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit_profile(
    State(db_pool): State<SqlitePool>,
    actor: Actor,

    Form(form): Form<ProfileUpdate>,
) -> AppResult<Response> {
    let id = actor.require()?.id;

    match identity::update_profile(&db_pool, &actor, &form).await {
        Ok(updated) => Ok(Redirect::to(&format!("/p/{}", updated.id)).into_response()),
        Err(AppError::ValidationFailed(error)) => {
            Ok((StatusCode::BAD_REQUEST, profile_form(actor, id, form, Some(error))?).into_response())
        }
        Err(err) => Err(err),
    }
}
