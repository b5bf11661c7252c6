use axum::{debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Redirect, Response}, Form};
use sqlx::SqlitePool;

use crate::{
    authz::Actor,
    store::catalog::{self, RoomDraft},
    AppError, AppResult, AppState,
};

use super::room_form;

const HEADING: &str = "Create room";

#[debug_handler(state = AppState)]
pub(crate) async fn new_room_page(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
) -> AppResult<Response> {
    actor.require()?;

    Ok(room_form(&db_pool, actor, HEADING, "Create", RoomDraft::default(), None)
        .await?
        .into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_room(
    State(db_pool): State<SqlitePool>,
    actor: Actor,

    Form(draft): Form<RoomDraft>,
) -> AppResult<Response> {
    match catalog::create_room(&db_pool, &actor, &draft).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(AppError::ValidationFailed(error)) => Ok((
            StatusCode::BAD_REQUEST,
            room_form(&db_pool, actor, HEADING, "Create", draft, Some(error)).await?,
        )
            .into_response()),
        Err(err) => Err(err),
    }
}
