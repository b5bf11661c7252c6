use axum::{debug_handler, extract::{Path, State}, http::StatusCode, response::{IntoResponse, Redirect, Response}, Form};
use sqlx::SqlitePool;

use crate::{
    authz::Actor,
    db::parse_id,
    store::catalog::{self, RoomDraft},
    AppError, AppResult, AppState,
};

use super::room_form;

const HEADING: &str = "Update room";

#[debug_handler(state = AppState)]
pub(crate) async fn edit_room_page(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
    Path(room_id): Path<String>,
) -> AppResult<Response> {
    let room = catalog::authorize_room(&db_pool, &actor, parse_id(&room_id, "room")?).await?;

    Ok(room_form(&db_pool, actor, HEADING, "Update", RoomDraft::from_room(&room), None)
        .await?
        .into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn edit_room(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
    Path(room_id): Path<String>,

    Form(draft): Form<RoomDraft>,
) -> AppResult<Response> {
    let room_id = parse_id(&room_id, "room")?;

    match catalog::update_room(&db_pool, &actor, room_id, &draft).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        // only reachable once the actor has been confirmed as host
        Err(AppError::ValidationFailed(error)) => Ok((
            StatusCode::BAD_REQUEST,
            room_form(&db_pool, actor, HEADING, "Update", draft, Some(error)).await?,
        )
            .into_response()),
        Err(err) => Err(err),
    }
}
