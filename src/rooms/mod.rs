mod delete;
mod edit;
mod msg;
mod new;
mod room;

use askama::Template;
use axum::{response::Html, routing::get, Router};
use sqlx::SqlitePool;

use crate::{
    authz::Actor,
    db::TopicCount,
    res::render,
    store::catalog::{self, RoomDraft},
    AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/new", get(new::new_room_page).post(new::new_room))
        .route("/{id}", get(room::room).post(room::post_message))
        .route("/{id}/edit", get(edit::edit_room_page).post(edit::edit_room))
        .route("/{id}/delete", get(delete::delete_room_page).post(delete::delete_room))
}

pub fn message_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/delete", get(msg::delete_message_page).post(msg::delete_message))
}

#[derive(Template)]
#[template(path = "rooms/room_form.html")]
struct RoomForm {
    actor: Actor,
    heading: &'static str,
    submit: &'static str,
    draft: RoomDraft,
    topics: Vec<TopicCount>,
    error: Option<String>,
}

/// Confirmation page for deleting a room or a message.
#[derive(Template)]
#[template(path = "delete.html")]
pub(crate) struct DeletePage {
    actor: Actor,
    heading: &'static str,
    obj: String,
    back: String,
}

/// The create/update form, optionally with the error that sent it back.
pub(crate) async fn room_form(
    db_pool: &SqlitePool,
    actor: Actor,
    heading: &'static str,
    submit: &'static str,
    draft: RoomDraft,
    error: Option<String>,
) -> AppResult<Html<String>> {
    let topics = catalog::topics(db_pool, "", None).await?;
    render(RoomForm { actor, heading, submit, draft, topics, error })
}
