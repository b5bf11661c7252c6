use axum::{debug_handler, extract::{Path, State}, response::{IntoResponse, Redirect, Response}};
use sqlx::SqlitePool;

use crate::{
    authz::Actor,
    db::parse_id,
    res::render,
    store::catalog,
    AppResult, AppState,
};

use super::DeletePage;

#[debug_handler(state = AppState)]
pub(crate) async fn delete_room_page(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
    Path(room_id): Path<String>,
) -> AppResult<Response> {
    let room = catalog::authorize_room(&db_pool, &actor, parse_id(&room_id, "room")?).await?;

    let back = format!("/r/{}", room.id);
    Ok(render(DeletePage { actor, heading: "Delete room", obj: room.name, back })?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_room(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
    Path(room_id): Path<String>,
) -> AppResult<Response> {
    catalog::delete_room(&db_pool, &actor, parse_id(&room_id, "room")?).await?;
    Ok(Redirect::to("/").into_response())
}
