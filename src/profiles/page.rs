use askama::Template;
use axum::{debug_handler, extract::{Path, State}, response::{IntoResponse, Response}};
use sqlx::SqlitePool;

use crate::{
    authz::Actor,
    db::{parse_id, Identity, Message, Room, TopicCount},
    res::render,
    store::{activity, catalog, identity},
    AppResult, AppState,
};

const RECENT: i64 = 20;

#[derive(Template)]
#[template(path = "profiles/profile.html")]
struct ProfilePage {
    actor: Actor,
    user: Identity,
    rooms: Vec<Room>,
    activity: Vec<Message>,
    topics: Vec<TopicCount>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    Path(profile_id): Path<String>,
    State(db_pool): State<SqlitePool>,
    actor: Actor,
) -> AppResult<Response> {
    let user = identity::get(&db_pool, parse_id(&profile_id, "profile")?).await?;

    let rooms = catalog::rooms_hosted_by(&db_pool, user.id).await?;
    let activity = activity::messages_by(&db_pool, user.id, RECENT).await?;
    let topics = catalog::topics(&db_pool, "", None).await?;

    Ok(render(ProfilePage { actor, user, rooms, activity, topics })?.into_response())
}
