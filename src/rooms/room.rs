use askama::Template;
use axum::{debug_handler, extract::{Path, State}, response::{IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    authz::Actor,
    db::{parse_id, Identity, Message, Room},
    res::render,
    store::{activity, catalog},
    AppResult, AppState,
};

#[derive(Debug, Deserialize)]
pub(crate) struct MessageForm {
    #[serde(default)]
    body: String,
}

#[derive(Template)]
#[template(path = "rooms/room.html")]
struct RoomPage {
    actor: Actor,
    room: Room,
    messages: Vec<Message>,
    participants: Vec<Identity>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn room(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
    Path(room_id): Path<String>,
) -> AppResult<Response> {
    let room = catalog::get_room(&db_pool, parse_id(&room_id, "room")?).await?;
    let messages = activity::room_messages(&db_pool, room.id).await?;
    let participants = activity::participants(&db_pool, room.id).await?;

    Ok(render(RoomPage { actor, room, messages, participants })?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn post_message(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
    Path(room_id): Path<String>,

    Form(MessageForm { body }): Form<MessageForm>,
) -> AppResult<Response> {
    let room_id = parse_id(&room_id, "room")?;
    activity::post_message(&db_pool, &actor, room_id, &body).await?;

    Ok(Redirect::to(&format!("/r/{room_id}")).into_response())
}
